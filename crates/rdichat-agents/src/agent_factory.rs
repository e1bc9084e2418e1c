use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use rdichat_llm_api::{BackendType, ClientFactory, LlmClient, LlmSettings};
use rdichat_retrieval::{CollectionStore, Retriever};

use crate::agent::Agent;
use crate::participant::{ParticipantSpec, ReplyMode};

/// Name used for the speaker-selection model in logs and errors
pub const MANAGER_NAME: &str = "chat_manager";

/// Supplies the language model behind each participant
pub trait ClientProvider: Send + Sync {
    fn client_for(&self, spec: &ParticipantSpec) -> Result<Arc<dyn LlmClient>>;

    /// Model used to pick the next speaker under automatic selection
    fn manager_client(&self) -> Result<Arc<dyn LlmClient>>;

    /// The same endpoint serving `model` instead, when the provider can switch
    fn with_model(&self, _model: &str) -> Option<Arc<dyn ClientProvider>> {
        None
    }
}

/// Builds clients from one provider endpoint and the shared settings,
/// applying each participant's overrides
#[derive(Debug, Clone)]
pub struct FactoryClients {
    pub backend: BackendType,
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: Option<String>,
    pub settings: LlmSettings,
}

impl ClientProvider for FactoryClients {
    fn client_for(&self, spec: &ParticipantSpec) -> Result<Arc<dyn LlmClient>> {
        ClientFactory::create(
            self.backend,
            self.api_key.clone(),
            self.model.clone(),
            self.api_url.clone(),
            &spec.name,
            spec.settings(&self.settings),
        )
    }

    fn manager_client(&self) -> Result<Arc<dyn LlmClient>> {
        ClientFactory::create(
            self.backend,
            self.api_key.clone(),
            self.model.clone(),
            self.api_url.clone(),
            MANAGER_NAME,
            self.settings.clone(),
        )
    }

    fn with_model(&self, model: &str) -> Option<Arc<dyn ClientProvider>> {
        Some(Arc::new(FactoryClients {
            model: model.to_string(),
            ..self.clone()
        }))
    }
}

/// Retrievers of a roster, by participant name
pub type Retrievers = HashMap<String, Arc<dyn Retriever>>;

/// Open the retrieval collection of every participant that has one.
///
/// Returns the name of the participant that failed alongside the error.
pub async fn resolve_retrievers(
    roster: &[ParticipantSpec],
    collections: &Arc<CollectionStore>,
) -> Result<Retrievers, (String, anyhow::Error)> {
    let mut retrievers = Retrievers::new();

    for spec in roster {
        let Some(config) = spec.retrieve.clone() else {
            continue;
        };
        let store = Arc::clone(collections);
        // Corpus indexing reads files synchronously
        let retriever = tokio::task::spawn_blocking(move || store.get_or_create(&config))
            .await
            .map_err(|e| (spec.name.clone(), anyhow::Error::new(e)))?
            .map_err(|e| (spec.name.clone(), anyhow::Error::new(e)))?;
        retrievers.insert(spec.name.clone(), retriever as Arc<dyn Retriever>);
    }

    Ok(retrievers)
}

/// Build fresh runtime agents for one session.
///
/// Returns the name of the participant that failed alongside the error.
pub fn build_agents(
    roster: &[ParticipantSpec],
    clients: &dyn ClientProvider,
    retrievers: &Retrievers,
) -> Result<Vec<Agent>, (String, anyhow::Error)> {
    let mut agents = Vec::with_capacity(roster.len());

    for spec in roster {
        let mut agent = Agent::new(spec.clone());

        if spec.reply_mode == ReplyMode::Llm {
            let client = clients.client_for(spec).map_err(|e| (spec.name.clone(), e))?;
            agent = agent.with_client(client);
        }

        if let Some(retriever) = retrievers.get(&spec.name) {
            agent = agent.with_retriever(Arc::clone(retriever));
        }

        agents.push(agent);
    }

    Ok(agents)
}
