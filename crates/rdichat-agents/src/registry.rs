use std::collections::HashMap;
use std::path::Path;

use crate::embedded_configs::get_embedded_role_configs;
use crate::participant::ParticipantSpec;

/// Participants of the code-generation group chat, in speaking order
pub const DEFAULT_GROUP: [&str; 4] = [
    "Boss_Assistant",
    "Test_Engineering_Manager",
    "Test_Engineer",
    "Code_Reviewer",
];

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read role file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse role file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid role in {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("unknown participant '{0}'")]
    UnknownParticipant(String),

    #[error("participant '{0}' listed twice")]
    DuplicateParticipant(String),
}

/// All known participant roles, by name
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: HashMap<String, ParticipantSpec>,
}

impl RoleRegistry {
    /// Only the roles compiled into the binary
    pub fn embedded() -> Self {
        let mut registry = Self::default();
        for (stem, json) in get_embedded_role_configs() {
            match serde_json::from_str::<ParticipantSpec>(json) {
                Ok(spec) => {
                    if let Err(e) = spec.validate() {
                        tracing::warn!("invalid embedded role {}: {}", stem, e);
                        continue;
                    }
                    registry.roles.insert(spec.name.clone(), spec);
                }
                Err(e) => tracing::warn!("failed to parse embedded role {}: {}", stem, e),
            }
        }
        tracing::debug!("loaded {} embedded roles", registry.roles.len());
        registry
    }

    /// Embedded roles, then every `*.json` in `roles_dir` (overriding by name)
    pub async fn load(roles_dir: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::embedded();

        if !roles_dir.exists() {
            tracing::debug!(
                "roles directory not found: {} (using embedded roles only)",
                roles_dir.display()
            );
            return Ok(registry);
        }

        let io_err = |path: &Path| {
            let path = path.display().to_string();
            move |source| RegistryError::Io { path, source }
        };

        let mut entries = tokio::fs::read_dir(roles_dir).await.map_err(io_err(roles_dir))?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err(roles_dir))? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let content = tokio::fs::read_to_string(&path).await.map_err(io_err(&path))?;
            let spec: ParticipantSpec =
                serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            spec.validate().map_err(|message| RegistryError::Invalid {
                path: path.display().to_string(),
                message,
            })?;

            if registry.roles.contains_key(&spec.name) {
                tracing::info!("overriding embedded role with {}", path.display());
            } else {
                tracing::info!("loaded role {} from {}", spec.name, path.display());
            }
            registry.roles.insert(spec.name.clone(), spec);
        }

        Ok(registry)
    }

    pub fn get(&self, name: &str) -> Option<&ParticipantSpec> {
        self.roles.get(name)
    }

    pub fn insert(&mut self, spec: ParticipantSpec) {
        self.roles.insert(spec.name.clone(), spec);
    }

    /// Sorted role names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.roles.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// The specs for `names`, in that order
    pub fn roster<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<ParticipantSpec>, RegistryError> {
        let mut roster: Vec<ParticipantSpec> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if roster.iter().any(|s| s.name == name) {
                return Err(RegistryError::DuplicateParticipant(name.to_string()));
            }
            let spec = self
                .get(name)
                .ok_or_else(|| RegistryError::UnknownParticipant(name.to_string()))?;
            roster.push(spec.clone());
        }
        Ok(roster)
    }

    /// Point every retrieval participant at `docs`
    pub fn set_docs_path(&mut self, docs: &[String]) {
        for spec in self.roles.values_mut() {
            if let Some(retrieve) = spec.retrieve.as_mut() {
                retrieve.docs_path = docs.to_vec();
            }
        }
    }

    /// Set the chunk size of every retrieval participant
    pub fn set_chunk_token_size(&mut self, tokens: usize) {
        for spec in self.roles.values_mut() {
            if let Some(retrieve) = spec.retrieve.as_mut() {
                retrieve.chunk_token_size = tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::participant::ReplyMode;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_embedded_roles_are_complete() {
        let registry = RoleRegistry::embedded();
        assert_eq!(
            registry.names(),
            vec![
                "Boss",
                "Boss_Assistant",
                "Code_Reviewer",
                "Test_Engineer",
                "Test_Engineering_Manager"
            ]
        );

        let assistant = registry.get("Boss_Assistant").unwrap();
        assert_eq!(assistant.reply_mode, ReplyMode::AutoReply);
        assert_eq!(assistant.max_consecutive_auto_reply, Some(3));
        let retrieve = assistant.retrieve.as_ref().unwrap();
        assert_eq!(retrieve.chunk_token_size, 2000);
        assert_eq!(retrieve.collection_name, "groupchat");
        assert_eq!(retrieve.n_results, 3);

        let coder = registry.get("Test_Engineer").unwrap();
        let overrides = coder.llm.as_ref().unwrap();
        assert_eq!(overrides.timeout_secs, Some(600));
        assert_eq!(overrides.seed, Some(42));
    }

    #[test]
    fn test_default_group_resolves_in_order() {
        let roster = RoleRegistry::embedded().roster(&DEFAULT_GROUP).unwrap();
        let names: Vec<_> = roster.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, DEFAULT_GROUP.to_vec());
    }

    #[test]
    fn test_roster_rejects_unknown_and_duplicates() {
        let registry = RoleRegistry::embedded();
        assert!(matches!(
            registry.roster(&["Boss", "Nobody"]),
            Err(RegistryError::UnknownParticipant(n)) if n == "Nobody"
        ));
        assert!(matches!(
            registry.roster(&["Boss", "Boss"]),
            Err(RegistryError::DuplicateParticipant(_))
        ));
    }

    #[tokio::test]
    async fn test_filesystem_role_overrides_embedded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("reviewer.json"),
            r#"{"name": "Code_Reviewer", "description": "strict", "system_prompt": "Be strict."}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("extra.json"),
            r#"{"name": "Test_Planner", "description": "plans", "system_prompt": "Plan."}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = RoleRegistry::load(dir.path()).await.unwrap();
        assert_eq!(registry.len(), 6);
        assert_eq!(registry.get("Code_Reviewer").unwrap().system_prompt, "Be strict.");
        assert!(registry.get("Test_Planner").is_some());
    }

    #[tokio::test]
    async fn test_invalid_role_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("bad.json"),
            r#"{"name": "", "description": "x", "system_prompt": "y"}"#,
        )
        .unwrap();
        assert!(matches!(
            RoleRegistry::load(dir.path()).await,
            Err(RegistryError::Invalid { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_dir_uses_embedded() {
        let registry = RoleRegistry::load(Path::new("/definitely/not/here")).await.unwrap();
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_docs_override_only_touches_retrieval_roles() {
        let mut registry = RoleRegistry::embedded();
        registry.set_docs_path(&["manual/*.txt".to_string()]);
        registry.set_chunk_token_size(500);
        let retrieve = registry.get("Boss_Assistant").unwrap().retrieve.clone().unwrap();
        assert_eq!(retrieve.docs_path, vec!["manual/*.txt".to_string()]);
        assert_eq!(retrieve.chunk_token_size, 500);
        assert!(registry.get("Code_Reviewer").unwrap().retrieve.is_none());
    }
}
