use anyhow::{Context, Result};
use async_trait::async_trait;
use rdichat_models::{ChatRequest, ChatResponse, Message};

use super::{ChatMessage, LlmClient, LlmResponse, TokenUsage};
use crate::config::{BackendType, LlmSettings};

/// Client for any endpoint speaking the OpenAI chat-completions format
/// (OpenAI itself, Azure deployments, Groq and llama.cpp servers)
pub struct OpenAiCompatibleClient {
    backend: BackendType,
    api_key: Option<String>,
    model: String,
    api_url: String,
    agent_name: String,
    settings: LlmSettings,
    client: reqwest::Client,
}

impl OpenAiCompatibleClient {
    pub fn new(
        backend: BackendType,
        api_key: Option<String>,
        model: String,
        api_url: String,
        agent_name: String,
        settings: LlmSettings,
    ) -> Self {
        let client = settings.http_client();
        Self {
            backend,
            api_key: api_key.filter(|k| !k.is_empty()),
            model,
            api_url,
            agent_name,
            settings,
            client,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn build_chat_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let messages = messages
            .into_iter()
            .map(|msg| Message {
                role: msg.role,
                content: msg.content,
                name: msg.name,
            })
            .collect();

        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(self.settings.temperature),
            max_tokens: Some(self.settings.max_tokens),
            // llama.cpp rejects unknown sampling fields on older builds
            seed: if self.backend == BackendType::Llama { None } else { self.settings.seed },
            stream: Some(false),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.api_key, self.backend) {
            (Some(key), BackendType::Azure) => request.header("api-key", key),
            (Some(key), _) => request.header("Authorization", format!("Bearer {}", key)),
            (None, _) => request,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse> {
        let request = self.build_chat_request(messages);
        let request_json = serde_json::to_value(&request)?;

        let log_timestamp = if self.settings.log_requests {
            rdichat_logging::log_request_to_file(
                &self.api_url,
                &request_json,
                &self.model,
                &self.agent_name,
                self.api_key.as_deref().unwrap_or(""),
            )
            .map_err(|e| tracing::warn!("request log failed: {}", e))
            .ok()
        } else {
            None
        };

        tracing::debug!(
            agent = %self.agent_name,
            model = %self.model,
            backend = self.backend.as_str(),
            messages = request.messages.len(),
            "sending chat request"
        );

        let response = self
            .authorize(self.client.post(&self.api_url))
            .header("Content-Type", "application/json")
            .json(&request_json)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.api_url))?;

        let status = response.status();
        let response_text = response.text().await?;

        if let Some(ts) = log_timestamp {
            let _ = rdichat_logging::log_response_to_file(
                status,
                &response_text,
                ts,
                &self.model,
                &self.agent_name,
            );
        }

        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "{} API error: {} - {}",
                self.backend.as_str(),
                status,
                response_text
            ));
        }

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .with_context(|| format!("malformed chat response from {}", self.api_url))?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| ChatMessage {
                role: if choice.message.role.is_empty() {
                    "assistant".to_string()
                } else {
                    choice.message.role
                },
                content: choice.message.content,
                name: None,
            })
            .ok_or_else(|| anyhow::anyhow!("response contained no choices"))?;

        Ok(LlmResponse {
            message,
            usage: chat_response.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens as u32,
                completion_tokens: usage.completion_tokens as u32,
                total_tokens: usage.total_tokens as u32,
            }),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
