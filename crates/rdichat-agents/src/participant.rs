use rdichat_llm_api::LlmSettings;
use rdichat_retrieval::RetrieveConfig;
use rdichat_types::DEFAULT_AUTO_REPLY;
use serde::{Deserialize, Serialize};

/// How a participant produces its replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Ask the language model, prompted with the role and the conversation
    #[default]
    Llm,
    /// Answer with a fixed reply (user-proxy roles)
    AutoReply,
}

/// Per-participant adjustments to the shared sampling settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmOverrides {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Static description of a participant, loaded from role JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSpec {
    pub name: String,
    /// Shown to the manager model during automatic speaker selection
    pub description: String,
    pub system_prompt: String,
    #[serde(default)]
    pub reply_mode: ReplyMode,
    #[serde(default)]
    pub default_auto_reply: Option<String>,
    #[serde(default)]
    pub max_consecutive_auto_reply: Option<u32>,
    #[serde(default)]
    pub retrieve: Option<RetrieveConfig>,
    #[serde(default)]
    pub llm: Option<LlmOverrides>,
}

impl ParticipantSpec {
    /// A model-backed participant with no retrieval
    pub fn llm(name: &str, description: &str, system_prompt: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            system_prompt: system_prompt.to_string(),
            reply_mode: ReplyMode::Llm,
            default_auto_reply: None,
            max_consecutive_auto_reply: None,
            retrieve: None,
            llm: None,
        }
    }

    /// A user-proxy participant answering with `reply`
    pub fn auto_reply(name: &str, description: &str, reply: &str) -> Self {
        Self {
            reply_mode: ReplyMode::AutoReply,
            default_auto_reply: Some(reply.to_string()),
            ..Self::llm(name, description, "")
        }
    }

    pub fn with_max_auto_replies(mut self, max: u32) -> Self {
        self.max_consecutive_auto_reply = Some(max);
        self
    }

    pub fn with_retrieval(mut self, config: RetrieveConfig) -> Self {
        self.retrieve = Some(config);
        self
    }

    pub fn auto_reply_text(&self) -> &str {
        self.default_auto_reply.as_deref().unwrap_or(DEFAULT_AUTO_REPLY)
    }

    /// Shared settings adjusted by this participant's overrides
    pub fn settings(&self, base: &LlmSettings) -> LlmSettings {
        match &self.llm {
            Some(o) => base.with_overrides(o.timeout_secs, o.seed),
            None => base.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Participant name cannot be empty".to_string());
        }

        if self.name.chars().any(char::is_whitespace) {
            return Err(format!("Participant name '{}' cannot contain whitespace", self.name));
        }

        if self.description.trim().is_empty() {
            return Err(format!("Participant '{}' needs a description", self.name));
        }

        if self.reply_mode == ReplyMode::Llm && self.system_prompt.trim().is_empty() {
            return Err(format!("Participant '{}' needs a system prompt", self.name));
        }

        if self.max_consecutive_auto_reply.is_some() && self.reply_mode != ReplyMode::AutoReply {
            return Err(format!(
                "Participant '{}' sets max_consecutive_auto_reply but does not auto-reply",
                self.name
            ));
        }

        if let Some(retrieve) = &self.retrieve {
            if retrieve.chunk_token_size == 0 {
                return Err(format!("Participant '{}' has chunk_token_size 0", self.name));
            }
            if retrieve.collection_name.trim().is_empty() {
                return Err(format!("Participant '{}' has an empty collection name", self.name));
            }
        }

        Ok(())
    }
}
