use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::corpus::{chunk_documents, load_corpus};
use crate::keyword::KeywordRetriever;
use crate::{RetrievalError, RetrieveConfig};

/// Named collections of indexed chunks, shared across sessions
#[derive(Debug, Default)]
pub struct CollectionStore {
    collections: Mutex<HashMap<String, Arc<KeywordRetriever>>>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the collection named by `config`, indexing the corpus on
    /// first use.
    ///
    /// With `get_or_create` an existing collection is reused as-is; without
    /// it, asking for an existing name is an error.
    pub fn get_or_create(&self, config: &RetrieveConfig) -> Result<Arc<KeywordRetriever>, RetrievalError> {
        let mut collections = self.collections.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(existing) = collections.get(&config.collection_name) {
            if config.get_or_create {
                tracing::debug!("reusing collection '{}'", config.collection_name);
                return Ok(Arc::clone(existing));
            }
            return Err(RetrievalError::CollectionExists(config.collection_name.clone()));
        }

        let documents = load_corpus(&config.docs_path)?;
        let chunks = chunk_documents(&documents, config.chunk_token_size)?;
        tracing::info!(
            "created collection '{}' with {} chunks from {} documents",
            config.collection_name,
            chunks.len(),
            documents.len()
        );

        let retriever = Arc::new(KeywordRetriever::new(chunks));
        collections.insert(config.collection_name.clone(), Arc::clone(&retriever));
        Ok(retriever)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collections
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(name)
    }
}
