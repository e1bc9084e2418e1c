use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod factory;
pub use factory::ClientFactory;

/// Backend type for LLM models
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    OpenAI,
    Azure,
    Groq,
    Anthropic,
    Llama,
}

impl BackendType {
    /// Parse backend type from string (the `api_type` field of a config entry)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "open_ai" => Some(Self::OpenAI),
            "azure" => Some(Self::Azure),
            "groq" => Some(Self::Groq),
            "anthropic" | "claude" => Some(Self::Anthropic),
            "llama" | "llamacpp" | "llama.cpp" | "llama-cpp" => Some(Self::Llama),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::OpenAI => "openai",
            Self::Azure => "azure",
            Self::Groq => "groq",
            Self::Anthropic => "anthropic",
            Self::Llama => "llama",
        }
    }

    /// Pick a backend from an explicit api type, then from the URL, then OpenAI
    pub fn detect(api_type: Option<&str>, base_url: Option<&str>) -> Self {
        if let Some(backend) = api_type.and_then(Self::from_str) {
            return backend;
        }
        match base_url {
            Some(url) if url.contains("anthropic") => Self::Anthropic,
            Some(url) if url.contains("groq") => Self::Groq,
            Some(url) if url.contains("azure") => Self::Azure,
            Some(url) if url.contains("localhost") || url.contains("127.0.0.1") => Self::Llama,
            _ => Self::OpenAI,
        }
    }

    /// Whether requests go through the OpenAI chat-completions wire format
    pub fn is_openai_compatible(&self) -> bool {
        !matches!(self, Self::Anthropic)
    }
}

/// Default OpenAI API URL
pub const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Default Groq API URL
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Default Anthropic API URL
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Get the default URL for a given backend type
pub fn get_default_url_for_backend(backend: &BackendType) -> Option<String> {
    match backend {
        BackendType::OpenAI => Some(OPENAI_API_URL.to_string()),
        BackendType::Groq => Some(GROQ_API_URL.to_string()),
        BackendType::Anthropic => Some(ANTHROPIC_API_URL.to_string()),
        // Deployment specific, must come from the config entry
        BackendType::Azure | BackendType::Llama => None,
    }
}

/// Normalize API URL by ensuring it has the correct path for OpenAI-compatible endpoints
pub fn normalize_api_url(url: &str) -> String {
    // If URL already contains a path with "completions", use it as-is
    if url.contains("/completions") || url.contains("/chat") {
        return url.to_string();
    }

    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/v1") {
        format!("{}/chat/completions", trimmed)
    } else {
        format!("{}/v1/chat/completions", trimmed)
    }
}

/// Sampling and transport settings shared by every participant of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub temperature: f32,
    pub seed: Option<u64>,
    pub max_tokens: u32,
    /// Write every request/response pair under ~/.rdichat/logs
    #[serde(default)]
    pub log_requests: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            temperature: 0.8,
            seed: Some(1234),
            max_tokens: 2048,
            log_requests: false,
        }
    }
}

impl LlmSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Same settings with a longer timeout and a different seed (the coder role)
    pub fn with_overrides(&self, timeout_secs: Option<u64>, seed: Option<u64>) -> Self {
        let mut settings = self.clone();
        if let Some(timeout) = timeout_secs {
            settings.timeout_secs = timeout;
        }
        if seed.is_some() {
            settings.seed = seed;
        }
        settings
    }

    pub(crate) fn http_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            })
    }
}
