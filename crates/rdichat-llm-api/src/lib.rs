//! # rdichat-llm-api
//!
//! A unified interface over the chat-completion providers a group
//! conversation can be pointed at:
//! - OpenAI (and Azure OpenAI deployments)
//! - Groq
//! - llama.cpp servers with the OpenAI-compatible endpoint
//! - Anthropic
//!
//! Every client applies the same [`LlmSettings`] (timeout, temperature,
//! seed, max tokens) so all participants of a session sample alike.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rdichat_llm_api::{BackendType, ChatMessage, ClientFactory, LlmSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ClientFactory::create(
//!         BackendType::OpenAI,
//!         Some("your-api-key".to_string()),
//!         "gpt-4o".to_string(),
//!         None,
//!         "Test_Engineer",
//!         LlmSettings::default(),
//!     )?;
//!
//!     let reply = client
//!         .chat(vec![ChatMessage::user("Hello!")])
//!         .await?;
//!     println!("Response: {}", reply.message.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;


// Re-export commonly used types
pub use client::{
    ChatMessage,
    LlmClient,
    LlmResponse,
    TokenUsage,
};

pub use config::{
    BackendType,
    ClientFactory,
    LlmSettings,
    ANTHROPIC_API_URL,
    GROQ_API_URL,
    OPENAI_API_URL,
    get_default_url_for_backend,
    normalize_api_url,
};
