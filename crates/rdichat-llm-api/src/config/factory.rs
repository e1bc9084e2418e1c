use std::env;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::client::{anthropic::AnthropicLlmClient, openai::OpenAiCompatibleClient, LlmClient};
use crate::config::{get_default_url_for_backend, normalize_api_url, BackendType, LlmSettings};

/// Client factory for creating LLM clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create an LLM client based on the specified backend type
    ///
    /// # Arguments
    /// * `backend` - The backend type to use
    /// * `api_key` - API key; falls back to the backend's environment variable
    /// * `model` - Model name to use
    /// * `api_url` - Optional custom API URL (uses the backend default if None)
    /// * `agent_name` - Participant name, used in request logs
    /// * `settings` - Sampling and timeout settings
    pub fn create(
        backend: BackendType,
        api_key: Option<String>,
        model: String,
        api_url: Option<String>,
        agent_name: &str,
        settings: LlmSettings,
    ) -> Result<Arc<dyn LlmClient>> {
        let api_url = api_url
            .or_else(|| get_default_url_for_backend(&backend))
            .ok_or_else(|| anyhow!("{} backend requires base_url to be specified", backend.as_str()))?;

        let client: Arc<dyn LlmClient> = match backend {
            BackendType::Anthropic => {
                let key = api_key
                    .or_else(|| env::var("ANTHROPIC_API_KEY").ok())
                    .unwrap_or_default();
                Arc::new(AnthropicLlmClient::new(key, model, api_url, agent_name.to_string(), settings))
            }
            BackendType::OpenAI | BackendType::Azure | BackendType::Groq | BackendType::Llama => {
                let key_var = match backend {
                    BackendType::Groq => Some("GROQ_API_KEY"),
                    BackendType::Llama => None,
                    _ => Some("OPENAI_API_KEY"),
                };
                let key = api_key.or_else(|| key_var.and_then(|var| env::var(var).ok()));
                Arc::new(OpenAiCompatibleClient::new(
                    backend,
                    key,
                    model,
                    normalize_api_url(&api_url),
                    agent_name.to_string(),
                    settings,
                ))
            }
        };

        Ok(client)
    }
}
