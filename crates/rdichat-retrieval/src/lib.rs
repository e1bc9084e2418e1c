//! Document retrieval for participants that ground the conversation in a
//! reference corpus (e.g. the SmartRDI manual).
//!
//! Documents are split into token-bounded chunks and stored in named
//! collections. The default [`KeywordRetriever`] ranks chunks by term
//! overlap with the query; anything implementing [`Retriever`] can stand
//! in for it.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod corpus;
pub mod keyword;
pub mod store;

pub use corpus::{chunk_text, estimate_tokens, load_corpus, Chunk, Document};
pub use keyword::KeywordRetriever;
pub use store::CollectionStore;

/// Default chunk size, in approximate tokens
pub const DEFAULT_CHUNK_TOKEN_SIZE: usize = 2000;

/// Default collection name shared by a group conversation
pub const DEFAULT_COLLECTION: &str = "groupchat";

/// Default number of chunks returned per query
pub const DEFAULT_N_RESULTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("invalid docs pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("collection '{0}' already exists and get_or_create is disabled")]
    CollectionExists(String),

    #[error("chunk_token_size must be greater than zero")]
    InvalidChunkSize,
}

/// Retrieval settings attached to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrieveConfig {
    /// Files, directories or glob patterns making up the corpus
    #[serde(default)]
    pub docs_path: Vec<String>,
    #[serde(default = "default_chunk_token_size")]
    pub chunk_token_size: usize,
    #[serde(default = "default_collection")]
    pub collection_name: String,
    /// Reuse an existing collection of the same name instead of failing
    #[serde(default = "default_get_or_create")]
    pub get_or_create: bool,
    #[serde(default = "default_n_results")]
    pub n_results: usize,
}

fn default_chunk_token_size() -> usize {
    DEFAULT_CHUNK_TOKEN_SIZE
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_get_or_create() -> bool {
    true
}

fn default_n_results() -> usize {
    DEFAULT_N_RESULTS
}

impl Default for RetrieveConfig {
    fn default() -> Self {
        Self {
            docs_path: Vec::new(),
            chunk_token_size: DEFAULT_CHUNK_TOKEN_SIZE,
            collection_name: DEFAULT_COLLECTION.to_string(),
            get_or_create: true,
            n_results: DEFAULT_N_RESULTS,
        }
    }
}

/// A chunk returned for a query, with its relevance score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Source of context for a query
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return at most `n_results` chunks, most relevant first
    async fn retrieve(&self, query: &str, n_results: usize) -> Result<Vec<ScoredChunk>, RetrievalError>;

    /// Number of chunks available to this retriever
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Combine a task with retrieved context into the initiating message
pub fn augment_task(task: &str, hits: &[ScoredChunk]) -> String {
    if hits.is_empty() {
        return task.to_string();
    }

    let mut message = String::from(task);
    message.push_str("\n\nContext is:\n");
    for hit in hits {
        message.push_str(&format!("\n[{}]\n{}\n", hit.chunk.source, hit.chunk.text.trim()));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_retrieve_config_defaults_from_partial_json() {
        let config: RetrieveConfig =
            serde_json::from_str(r#"{"docs_path": ["docs/SmartRDI_overall.txt"]}"#).unwrap();
        assert_eq!(config.chunk_token_size, 2000);
        assert_eq!(config.collection_name, "groupchat");
        assert!(config.get_or_create);
        assert_eq!(config.n_results, 3);
        assert_eq!(config.docs_path, vec!["docs/SmartRDI_overall.txt".to_string()]);
    }

    #[test]
    fn test_augment_task_without_hits_is_the_task() {
        assert_eq!(augment_task("write a test", &[]), "write a test");
    }

    #[test]
    fn test_augment_task_lists_sources() {
        let hits = vec![ScoredChunk {
            chunk: Chunk {
                id: 0,
                source: "manual.txt".to_string(),
                text: "rdi.smartVec()\n".to_string(),
            },
            score: 10.0,
        }];
        let message = augment_task("write a test", &hits);
        assert!(message.starts_with("write a test\n\nContext is:\n"));
        assert!(message.contains("[manual.txt]\nrdi.smartVec()"));
    }
}
