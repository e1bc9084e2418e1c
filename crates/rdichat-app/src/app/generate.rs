use serde::{Deserialize, Serialize};
use std::sync::Arc;

use rdichat_agents::{
    ClientProvider, FactoryClients, SessionError, SessionOutcome, SessionTask, TranscriptSink,
};
use rdichat_llm_api::BackendType;
use rdichat_types::SelectionPolicy;

use crate::app::session_log::record_session;
use crate::app::AppConfig;
use crate::config::{validate_ui_credentials, ConfigError};

/// A request to run the code-generation conversation on a problem statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub problem: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub max_rounds: Option<usize>,
    #[serde(default)]
    pub policy: Option<String>,
}

impl GenerateRequest {
    pub fn new(problem: impl Into<String>) -> Self {
        Self {
            problem: problem.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl GenerateError {
    /// Configuration problems: shown as warnings, no session was started
    pub fn is_config_error(&self) -> bool {
        match self {
            GenerateError::Config(_) => true,
            GenerateError::Session(e) => e.is_config_error(),
        }
    }
}

/// Resolve the request against the server defaults and run one session,
/// handing each message to `sink` as it is emitted
pub async fn generate(
    app: &AppConfig,
    request: GenerateRequest,
    sink: &dyn TranscriptSink,
) -> Result<SessionOutcome, GenerateError> {
    let (api_key, model) =
        validate_ui_credentials(request.api_key.as_deref(), request.model.as_deref())?;
    let model_requested = request
        .model
        .as_deref()
        .is_some_and(|m| !m.trim().is_empty());

    let policy = match request.policy.as_deref() {
        Some(p) if !p.trim().is_empty() => p.parse::<SelectionPolicy>().map_err(ConfigError::from)?,
        _ => app.policy,
    };
    let max_rounds = request.max_rounds.unwrap_or(app.max_rounds);
    let task = SessionTask::from_problem(&request.problem);

    let clients: Arc<dyn ClientProvider> = match api_key {
        Some(key) => Arc::new(FactoryClients {
            backend: BackendType::OpenAI,
            api_key: Some(key),
            model: model.as_str().to_string(),
            api_url: None,
            settings: app.settings.clone(),
        }),
        None => {
            let default = app
                .default_clients
                .as_ref()
                .ok_or(ConfigError::MissingApiKey)?;
            // The server key serves whichever model the page picked
            match model_requested.then(|| default.with_model(model.as_str())).flatten() {
                Some(switched) => switched,
                None => Arc::clone(default),
            }
        }
    };

    let result = app
        .controller
        .run_session_with(clients.as_ref(), &task, max_rounds, policy, sink)
        .await;

    if let Some(log_root) = &app.log_root {
        record_session(log_root, &task.message, &result).await;
    }

    Ok(result?)
}
