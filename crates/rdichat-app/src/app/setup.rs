use anyhow::{Context, Result};
use colored::Colorize;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use rdichat_agents::{
    ClientProvider, FactoryClients, ParticipantSpec, RoleRegistry, SessionController, DEFAULT_GROUP,
};
use rdichat_llm_api::{BackendType, LlmSettings};
use rdichat_types::SelectionPolicy;

use crate::cli::Cli;
use crate::config::load_config_list;

/// Application configuration derived from CLI arguments and environment
pub struct AppConfig {
    /// Every known role, group members or not
    pub roles: Vec<ParticipantSpec>,
    pub controller: Arc<SessionController>,
    /// Models used when a request carries no API key of its own
    pub default_clients: Option<Arc<dyn ClientProvider>>,
    pub settings: LlmSettings,
    pub max_rounds: usize,
    pub policy: SelectionPolicy,
    /// Conversation logs go to `<log_root>/logs`
    pub log_root: Option<PathBuf>,
}

impl AppConfig {
    /// Configuration around an already built roster and client provider
    pub fn new(roster: Vec<ParticipantSpec>, default_clients: Option<Arc<dyn ClientProvider>>) -> Self {
        let fallback: Arc<dyn ClientProvider> = match &default_clients {
            Some(clients) => Arc::clone(clients),
            None => Arc::new(env_clients("gpt-4o", LlmSettings::default())),
        };
        Self {
            roles: roster.clone(),
            controller: Arc::new(SessionController::new(roster, fallback)),
            default_clients,
            settings: LlmSettings::default(),
            max_rounds: rdichat_types::DEFAULT_MAX_ROUNDS,
            policy: SelectionPolicy::RoundRobin,
            log_root: None,
        }
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.controller.roster().iter().map(|s| s.name.as_str()).collect()
    }
}

/// OpenAI with the key taken from `OPENAI_API_KEY` at request time
fn env_clients(model: &str, settings: LlmSettings) -> FactoryClients {
    FactoryClients {
        backend: BackendType::OpenAI,
        api_key: None,
        model: model.to_string(),
        api_url: None,
        settings,
    }
}

/// Set up application configuration from CLI arguments
pub async fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let settings = LlmSettings {
        log_requests: cli.log_requests,
        ..LlmSettings::default()
    };

    let mut registry = RoleRegistry::load(&cli.roles_dir)
        .await
        .with_context(|| format!("Failed to load roles from {}", cli.roles_dir.display()))?;
    if !cli.docs.is_empty() {
        registry.set_docs_path(&cli.docs);
    }
    registry.set_chunk_token_size(cli.chunk_tokens);

    let roster = registry
        .roster(&DEFAULT_GROUP)
        .context("Failed to assemble the group chat")?;

    let default_clients: Option<Arc<dyn ClientProvider>> = match &cli.config_list {
        Some(source) => {
            let entry = load_config_list(source, &cli.model)?
                .into_iter()
                .next()
                .context("config list has no usable entry")?;
            let clients = entry.into_clients(settings.clone());
            println!(
                "{} {} via {}",
                "Model:".bright_black(),
                clients.model.bright_cyan(),
                clients.backend.as_str()
            );
            let clients: Arc<dyn ClientProvider> = Arc::new(clients);
            Some(clients)
        }
        None if env::var("OPENAI_API_KEY").is_ok() => {
            println!("{} {} (OPENAI_API_KEY)", "Model:".bright_black(), cli.model.bright_cyan());
            let clients: Arc<dyn ClientProvider> = Arc::new(env_clients(&cli.model, settings.clone()));
            Some(clients)
        }
        None => None,
    };

    let fallback: Arc<dyn ClientProvider> = match &default_clients {
        Some(clients) => Arc::clone(clients),
        None => Arc::new(env_clients(&cli.model, settings.clone())),
    };

    let log_root = match rdichat_logging::get_rdichat_dir() {
        Ok(dir) => Some(dir),
        Err(e) => {
            tracing::warn!("conversation logging disabled: {}", e);
            None
        }
    };

    let roles: Vec<ParticipantSpec> = registry
        .names()
        .iter()
        .filter_map(|name| registry.get(name).cloned())
        .collect();

    println!(
        "{} {}",
        "Group:".bright_black(),
        DEFAULT_GROUP.join(", ").bright_white()
    );

    Ok(AppConfig {
        roles,
        controller: Arc::new(SessionController::new(roster, fallback)),
        default_clients,
        settings,
        max_rounds: cli.max_rounds,
        policy: cli.policy,
        log_root,
    })
}
