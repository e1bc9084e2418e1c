use std::sync::Arc;

use anyhow::{Context, Result};
use rdichat_llm_api::{ChatMessage, LlmClient};
use rdichat_retrieval::{augment_task, Retriever, DEFAULT_N_RESULTS};
use rdichat_types::Message;

use crate::participant::{ParticipantSpec, ReplyMode};

/// What a participant produced when asked to speak
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Content(String),
    /// An auto-reply participant has used up its consecutive replies
    Exhausted,
}

/// Runtime participant: a spec plus the collaborators and memory of one session
pub struct Agent {
    spec: ParticipantSpec,
    client: Option<Arc<dyn LlmClient>>,
    retriever: Option<Arc<dyn Retriever>>,
    memory: Vec<Message>,
    auto_replies: u32,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.spec.name)
            .field("reply_mode", &self.spec.reply_mode)
            .field("has_client", &self.client.is_some())
            .field("has_retriever", &self.retriever.is_some())
            .field("memory", &self.memory.len())
            .field("auto_replies", &self.auto_replies)
            .finish()
    }
}

impl Agent {
    pub fn new(spec: ParticipantSpec) -> Self {
        Self {
            spec,
            client: None,
            retriever: None,
            memory: Vec::new(),
            auto_replies: 0,
        }
    }

    pub fn with_client(mut self, client: Arc<dyn LlmClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &ParticipantSpec {
        &self.spec
    }

    /// Messages this participant has seen, in order
    pub fn memory(&self) -> &[Message] {
        &self.memory
    }

    pub fn auto_replies(&self) -> u32 {
        self.auto_replies
    }

    /// Forget the conversation and the auto-reply count
    pub fn reset(&mut self) {
        self.memory.clear();
        self.auto_replies = 0;
    }

    /// Record a message emitted by anyone in the group (including self)
    pub fn receive(&mut self, message: &Message) {
        self.memory.push(message.clone());
    }

    /// Opening message for a conversation this participant starts.
    ///
    /// A participant with a retriever appends the chunks that best match
    /// `query` to `message`.
    pub async fn initiate(&self, message: &str, query: &str) -> Result<String> {
        let Some(retriever) = &self.retriever else {
            return Ok(message.to_string());
        };

        let n_results = self
            .spec
            .retrieve
            .as_ref()
            .map(|r| r.n_results)
            .unwrap_or(DEFAULT_N_RESULTS);
        let hits = retriever
            .retrieve(query, n_results)
            .await
            .context("retrieval failed")?;
        tracing::debug!(agent = %self.spec.name, hits = hits.len(), "retrieved context for task");
        Ok(augment_task(message, &hits))
    }

    /// Produce the next message from this participant's point of view
    pub async fn generate_reply(&mut self) -> Result<Reply> {
        match self.spec.reply_mode {
            ReplyMode::AutoReply => {
                if let Some(max) = self.spec.max_consecutive_auto_reply {
                    if self.auto_replies >= max {
                        return Ok(Reply::Exhausted);
                    }
                }
                self.auto_replies += 1;
                Ok(Reply::Content(self.spec.auto_reply_text().to_string()))
            }
            ReplyMode::Llm => {
                let client = self
                    .client
                    .as_ref()
                    .with_context(|| format!("no language model configured for {}", self.spec.name))?;
                let response = client.chat(self.build_prompt()).await?;
                Ok(Reply::Content(response.message.content))
            }
        }
    }

    /// System prompt, then the conversation: own messages as `assistant`,
    /// everyone else's as `user` tagged with the sender name
    pub fn build_prompt(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.memory.len() + 1);
        if !self.spec.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.spec.system_prompt.clone()));
        }
        for msg in &self.memory {
            if msg.sender == self.spec.name {
                messages.push(ChatMessage::assistant(msg.content.clone()));
            } else {
                messages.push(ChatMessage::user(msg.content.clone()).with_name(&msg.sender));
            }
        }
        messages
    }
}
