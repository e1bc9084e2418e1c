use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod anthropic;
pub mod openai;

/// Chat message structure (OpenAI-compatible format)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            name: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
            name: None,
        }
    }

    /// Attach the speaker name (sanitized to what providers accept in `name`)
    pub fn with_name(mut self, name: &str) -> Self {
        let sanitized: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .take(64)
            .collect();
        self.name = if sanitized.is_empty() { None } else { Some(sanitized) };
        self
    }
}

/// LLM client trait - unified interface for all providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Non-streaming chat completion
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse>;

    /// Model identifier sent with every request
    fn model(&self) -> &str;

    /// Convenience wrapper returning only the reply text
    async fn chat_completion(&self, messages: &[ChatMessage]) -> Result<String> {
        let response = self.chat(messages.to_vec()).await?;
        Ok(response.message.content)
    }
}

/// LLM response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub message: ChatMessage,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}
