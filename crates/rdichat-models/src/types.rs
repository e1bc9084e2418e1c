use serde::{Deserialize, Deserializer, Serialize};

/// Models offered in the web UI model picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelChoice {
    Gpt4o,
    Gpt4oMini,
    Gpt4Turbo,
    Gpt35Turbo,
}

impl ModelChoice {
    pub const ALL: [ModelChoice; 4] = [
        ModelChoice::Gpt4o,
        ModelChoice::Gpt4oMini,
        ModelChoice::Gpt4Turbo,
        ModelChoice::Gpt35Turbo,
    ];

    /// Model identifier sent to the provider
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Gpt4o => "gpt-4o",
            ModelChoice::Gpt4oMini => "gpt-4o-mini",
            ModelChoice::Gpt4Turbo => "gpt-4-turbo",
            ModelChoice::Gpt35Turbo => "gpt-3.5-turbo",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelChoice::Gpt4o => "GPT-4o",
            ModelChoice::Gpt4oMini => "GPT-4o mini",
            ModelChoice::Gpt4Turbo => "GPT-4 Turbo",
            ModelChoice::Gpt35Turbo => "GPT-3.5 Turbo",
        }
    }

    /// Parse a model identifier; anything outside the fixed set is rejected
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gpt-4o" | "gpt4o" => Some(ModelChoice::Gpt4o),
            "gpt-4o-mini" | "gpt4o-mini" => Some(ModelChoice::Gpt4oMini),
            "gpt-4-turbo" | "gpt4-turbo" => Some(ModelChoice::Gpt4Turbo),
            "gpt-3.5-turbo" | "gpt35-turbo" => Some(ModelChoice::Gpt35Turbo),
            _ => None,
        }
    }
}

impl Default for ModelChoice {
    fn default() -> Self {
        ModelChoice::Gpt4o
    }
}

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        _ => Ok(String::new()),
    }
}

/// Message structure for chat API
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Message {
    #[serde(default)]
    pub role: String,
    #[serde(deserialize_with = "deserialize_string_or_null", default)]
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
}
