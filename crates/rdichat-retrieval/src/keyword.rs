use std::collections::HashSet;

use async_trait::async_trait;

use crate::corpus::Chunk;
use crate::{RetrievalError, Retriever, ScoredChunk};

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "from", "as", "is", "was", "are", "were", "be", "have", "has", "had", "do", "does", "did",
    "will", "would", "should", "could", "may", "might", "must", "can", "this", "that", "these",
    "those", "i", "you", "we", "they", "it", "my", "your", "our", "their", "now", "want",
    "also", "don't", "include", "any", "using", "following", "task",
];

/// Lower-cased terms longer than two characters, minus stop words
fn terms(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '\'')
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

/// Ranks chunks by term overlap with the query.
///
/// Exact term matches score 10, substring matches (e.g. "leak" in
/// "leakage") score 5. Each distinct query term counts once per chunk.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    chunks: Vec<Chunk>,
    chunk_terms: Vec<HashSet<String>>,
}

impl KeywordRetriever {
    pub fn new(chunks: Vec<Chunk>) -> Self {
        let chunk_terms = chunks
            .iter()
            .map(|c| terms(&c.text).into_iter().collect())
            .collect();
        Self { chunks, chunk_terms }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    fn score(query_terms: &HashSet<String>, chunk_terms: &HashSet<String>) -> f32 {
        let mut score = 0.0;
        for q in query_terms {
            if chunk_terms.contains(q) {
                score += 10.0;
            } else if chunk_terms
                .iter()
                .any(|c| c.len() > 3 && q.len() > 3 && (c.contains(q.as_str()) || q.contains(c.as_str())))
            {
                score += 5.0;
            }
        }
        score
    }

    /// Synchronous ranking used by the [`Retriever`] impl
    pub fn rank(&self, query: &str, n_results: usize) -> Vec<ScoredChunk> {
        let query_terms: HashSet<String> = terms(query).into_iter().collect();
        if query_terms.is_empty() || n_results == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(&self.chunk_terms)
            .filter_map(|(chunk, chunk_terms)| {
                let score = Self::score(&query_terms, chunk_terms);
                (score > 0.0).then(|| ScoredChunk {
                    chunk: chunk.clone(),
                    score,
                })
            })
            .collect();

        // Stable sort keeps corpus order among ties
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(n_results);
        scored
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, n_results: usize) -> Result<Vec<ScoredChunk>, RetrievalError> {
        let hits = self.rank(query, n_results);
        tracing::debug!(hits = hits.len(), chunks = self.chunks.len(), "keyword retrieval");
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.chunks.len()
    }
}
