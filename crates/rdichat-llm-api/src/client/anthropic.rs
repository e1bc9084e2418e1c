use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::{ChatMessage, LlmClient, LlmResponse, TokenUsage};
use crate::config::LlmSettings;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client
pub struct AnthropicLlmClient {
    api_key: String,
    model: String,
    base_url: String,
    agent_name: String,
    settings: LlmSettings,
    client: reqwest::Client,
}

impl AnthropicLlmClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        agent_name: String,
        settings: LlmSettings,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = settings.http_client();
        Self {
            api_key,
            model,
            base_url,
            agent_name,
            settings,
            client,
        }
    }

    fn get_messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    /// System prompts go in the top-level `system` field; consecutive
    /// same-role turns are merged since the API requires alternation.
    fn build_request(&self, messages: Vec<ChatMessage>) -> Value {
        let system: Vec<String> = messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.clone())
            .collect();

        let mut turns: Vec<(String, String)> = Vec::new();
        for msg in messages.into_iter().filter(|m| m.role != "system") {
            let role = if msg.role == "assistant" { "assistant" } else { "user" };
            let text = match &msg.name {
                Some(name) if role == "user" => format!("{}: {}", name, msg.content),
                _ => msg.content,
            };
            match turns.last_mut() {
                Some((last_role, last_text)) if last_role == role => {
                    last_text.push_str("\n\n");
                    last_text.push_str(&text);
                }
                _ => turns.push((role.to_string(), text)),
            }
        }

        // The first turn must come from the user
        if turns.first().map(|(role, _)| role == "assistant").unwrap_or(true) {
            turns.insert(0, ("user".to_string(), "Begin.".to_string()));
        }

        let mut request = serde_json::json!({
            "model": self.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "messages": turns
                .into_iter()
                .map(|(role, text)| serde_json::json!({
                    "role": role,
                    "content": [{"type": "text", "text": text}]
                }))
                .collect::<Vec<_>>(),
        });

        if !system.is_empty() {
            request["system"] = Value::String(system.join("\n\n"));
        }
        request
    }

    fn convert_response(response: &Value) -> LlmResponse {
        let text: String = response["content"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter(|item| item["type"] == "text")
                    .filter_map(|item| item["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = response.get("usage").map(|u| {
            let input = u["input_tokens"].as_u64().unwrap_or(0) as u32;
            let output = u["output_tokens"].as_u64().unwrap_or(0) as u32;
            TokenUsage {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input + output,
            }
        });

        LlmResponse {
            message: ChatMessage {
                role: response["role"].as_str().unwrap_or("assistant").to_string(),
                content: text,
                name: None,
            },
            usage,
        }
    }
}

#[async_trait]
impl LlmClient for AnthropicLlmClient {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse> {
        let url = self.get_messages_url();
        let request = self.build_request(messages);

        let log_timestamp = if self.settings.log_requests {
            rdichat_logging::log_request_to_file(&url, &request, &self.model, &self.agent_name, &self.api_key)
                .map_err(|e| tracing::warn!("request log failed: {}", e))
                .ok()
        } else {
            None
        };

        tracing::debug!(agent = %self.agent_name, model = %self.model, "sending anthropic request");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        let status = response.status();
        let body = response.text().await?;

        if let Some(ts) = log_timestamp {
            let _ = rdichat_logging::log_response_to_file(status, &body, ts, &self.model, &self.agent_name);
        }

        if !status.is_success() {
            return Err(anyhow::anyhow!("Anthropic API error: {} - {}", status, body));
        }

        let json: Value = serde_json::from_str(&body).context("malformed Anthropic response")?;
        Ok(Self::convert_response(&json))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
