// Model endpoint configuration: OAI config lists and UI-supplied credentials
use serde::Deserialize;
use std::env;
use std::path::Path;

use rdichat_agents::FactoryClients;
use rdichat_llm_api::{BackendType, LlmSettings};
use rdichat_models::ModelChoice;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config list '{0}' is neither an environment variable nor a readable file")]
    ConfigListNotFound(String),

    #[error("failed to read config list {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config list '{origin}' is not a JSON array of model entries: {source}")]
    Parse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no entry for model '{0}' in the config list")]
    NoMatchingModel(String),

    #[error("unknown model '{0}' (expected one of gpt-4o, gpt-4o-mini, gpt-4-turbo, gpt-3.5-turbo)")]
    UnknownModel(String),

    #[error("no API key: enter one in the page or start the server with --config-list or OPENAI_API_KEY")]
    MissingApiKey,

    #[error(transparent)]
    Policy(#[from] rdichat_types::ParsePolicyError),
}

/// One entry of an OAI config list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OaiConfig {
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_type: Option<String>,
}

impl OaiConfig {
    /// Client provider for every participant of a session
    pub fn into_clients(self, settings: LlmSettings) -> FactoryClients {
        let backend = BackendType::detect(self.api_type.as_deref(), self.base_url.as_deref());
        FactoryClients {
            backend,
            api_key: self.api_key.filter(|k| !k.trim().is_empty()),
            model: self.model,
            api_url: self.base_url,
            settings,
        }
    }
}

/// Load an OAI config list and keep the entries for `model`.
///
/// `source` names an environment variable holding the JSON; when no such
/// variable is set it is read as a file path.
pub fn load_config_list(source: &str, model: &str) -> Result<Vec<OaiConfig>, ConfigError> {
    let json = match env::var(source) {
        Ok(value) => value,
        Err(_) => {
            let path = Path::new(source);
            if !path.is_file() {
                return Err(ConfigError::ConfigListNotFound(source.to_string()));
            }
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
                path: source.to_string(),
                source: e,
            })?
        }
    };

    let entries: Vec<OaiConfig> = serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
        origin: source.to_string(),
        source: e,
    })?;

    let matching: Vec<OaiConfig> = entries.into_iter().filter(|c| c.model == model).collect();
    if matching.is_empty() {
        return Err(ConfigError::NoMatchingModel(model.to_string()));
    }
    tracing::debug!(source, model, entries = matching.len(), "loaded config list");
    Ok(matching)
}

/// Check the API key and model typed into the web page.
///
/// A blank key is `None` so the server-side default can apply; a model
/// outside the offered set is rejected.
pub fn validate_ui_credentials(
    api_key: Option<&str>,
    model: Option<&str>,
) -> Result<(Option<String>, ModelChoice), ConfigError> {
    let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => ModelChoice::from_str(m).ok_or_else(|| ConfigError::UnknownModel(m.to_string()))?,
        None => ModelChoice::default(),
    };
    let api_key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string);
    Ok((api_key, model))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;

    const LIST: &str = r#"[
        {"model": "gpt-4o", "api_key": "sk-one"},
        {"model": "gpt-4o-mini", "api_key": "sk-two", "base_url": "https://example.openai.azure.com", "api_type": "azure"}
    ]"#;

    #[test]
    #[serial]
    fn test_config_list_from_env_var() {
        env::set_var("RDICHAT_TEST_CONFIG_LIST", LIST);
        let entries = load_config_list("RDICHAT_TEST_CONFIG_LIST", "gpt-4o").unwrap();
        env::remove_var("RDICHAT_TEST_CONFIG_LIST");

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].api_key.as_deref(), Some("sk-one"));
    }

    #[test]
    #[serial]
    fn test_config_list_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIST.as_bytes()).unwrap();
        let path = file.path().to_string_lossy().to_string();

        let entries = load_config_list(&path, "gpt-4o-mini").unwrap();
        let clients = entries[0].clone().into_clients(LlmSettings::default());
        assert_eq!(clients.backend, BackendType::Azure);
        assert_eq!(clients.model, "gpt-4o-mini");
        assert_eq!(clients.api_url.as_deref(), Some("https://example.openai.azure.com"));
    }

    #[test]
    #[serial]
    fn test_config_list_without_matching_model() {
        env::set_var("RDICHAT_TEST_CONFIG_LIST", LIST);
        let err = load_config_list("RDICHAT_TEST_CONFIG_LIST", "gpt-4-turbo").unwrap_err();
        env::remove_var("RDICHAT_TEST_CONFIG_LIST");
        assert!(matches!(err, ConfigError::NoMatchingModel(m) if m == "gpt-4-turbo"));
    }

    #[test]
    #[serial]
    fn test_config_list_missing_and_malformed() {
        assert!(matches!(
            load_config_list("RDICHAT_NO_SUCH_LIST", "gpt-4o"),
            Err(ConfigError::ConfigListNotFound(_))
        ));

        env::set_var("RDICHAT_TEST_CONFIG_LIST", "{\"model\": \"gpt-4o\"}");
        let err = load_config_list("RDICHAT_TEST_CONFIG_LIST", "gpt-4o").unwrap_err();
        env::remove_var("RDICHAT_TEST_CONFIG_LIST");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_ui_credentials() {
        let (key, model) = validate_ui_credentials(Some("  sk-abc "), Some("gpt-4o-mini")).unwrap();
        assert_eq!(key.as_deref(), Some("sk-abc"));
        assert_eq!(model, ModelChoice::Gpt4oMini);

        let (key, model) = validate_ui_credentials(Some(""), None).unwrap();
        assert_eq!(key, None);
        assert_eq!(model, ModelChoice::Gpt4o);

        assert!(matches!(
            validate_ui_credentials(Some("sk"), Some("claude-3")),
            Err(ConfigError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_blank_key_in_config_entry_is_dropped() {
        let entry = OaiConfig {
            model: "gpt-4o".into(),
            api_key: Some(" ".into()),
            base_url: None,
            api_type: None,
        };
        let clients = entry.into_clients(LlmSettings::default());
        assert_eq!(clients.backend, BackendType::OpenAI);
        assert_eq!(clients.api_key, None);
    }
}
