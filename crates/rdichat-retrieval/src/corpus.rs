use std::fs;
use std::path::{Path, PathBuf};

use crate::RetrievalError;

/// A file of the corpus, read as UTF-8 text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub source: String,
    pub text: String,
}

/// A token-bounded slice of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the collection
    pub id: usize,
    pub source: String,
    pub text: String,
}

/// Rough token count: one token per four characters, at least one per word
pub fn estimate_tokens(text: &str) -> usize {
    let by_chars = text.chars().count().div_ceil(4);
    let by_words = text.split_whitespace().count();
    by_chars.max(by_words)
}

/// Split `text` into chunks of at most `max_tokens` estimated tokens.
///
/// Lines are kept whole where possible; a single oversized line is split on
/// word boundaries.
pub fn chunk_text(text: &str, max_tokens: usize) -> Result<Vec<String>, RetrievalError> {
    if max_tokens == 0 {
        return Err(RetrievalError::InvalidChunkSize);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    let flush = |current: &mut String, chunks: &mut Vec<String>| {
        if !current.trim().is_empty() {
            chunks.push(std::mem::take(current));
        } else {
            current.clear();
        }
    };

    for line in text.lines() {
        if estimate_tokens(line) > max_tokens {
            flush(&mut current, &mut chunks);
            for piece in split_long_line(line, max_tokens) {
                chunks.push(piece);
            }
            continue;
        }

        let candidate_len = estimate_tokens(&current) + estimate_tokens(line) + 1;
        if !current.is_empty() && candidate_len > max_tokens {
            flush(&mut current, &mut chunks);
        }
        current.push_str(line);
        current.push('\n');
    }
    flush(&mut current, &mut chunks);

    Ok(chunks)
}

fn split_long_line(line: &str, max_tokens: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let next = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if !current.is_empty() && estimate_tokens(&next) > max_tokens {
            pieces.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = next;
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Read every file named by `paths`.
///
/// Entries may be files, directories (read recursively) or glob patterns.
/// Files that are not valid UTF-8 and paths that do not exist are skipped
/// with a warning.
pub fn load_corpus(paths: &[String]) -> Result<Vec<Document>, RetrievalError> {
    let mut files = Vec::new();

    for entry in paths {
        let path = Path::new(entry);
        if path.is_dir() {
            collect_dir(path, &mut files)?;
        } else if path.is_file() {
            files.push(path.to_path_buf());
        } else {
            let matches = glob::glob(entry).map_err(|e| RetrievalError::InvalidPattern {
                pattern: entry.clone(),
                message: e.to_string(),
            })?;
            let before = files.len();
            for matched in matches.flatten() {
                if matched.is_file() {
                    files.push(matched);
                }
            }
            if files.len() == before {
                tracing::warn!("docs path '{}' matched no files", entry);
            }
        }
    }

    files.sort();
    files.dedup();

    let mut documents = Vec::new();
    for file in files {
        let bytes = fs::read(&file).map_err(|source| RetrievalError::Io {
            path: file.clone(),
            source,
        })?;
        match String::from_utf8(bytes) {
            Ok(text) => documents.push(Document {
                source: file.display().to_string(),
                text,
            }),
            Err(_) => tracing::warn!("skipping {}: not UTF-8 text", file.display()),
        }
    }

    tracing::info!("loaded {} documents for retrieval", documents.len());
    Ok(documents)
}

fn collect_dir(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), RetrievalError> {
    let entries = fs::read_dir(dir).map_err(|source| RetrievalError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_dir(&path, files)?;
        } else if path.is_file() {
            files.push(path);
        }
    }
    Ok(())
}

/// Chunk every document, numbering chunks across the whole corpus
pub fn chunk_documents(documents: &[Document], max_tokens: usize) -> Result<Vec<Chunk>, RetrievalError> {
    let mut chunks = Vec::new();
    for doc in documents {
        for text in chunk_text(&doc.text, max_tokens)? {
            chunks.push(Chunk {
                id: chunks.len(),
                source: doc.source.clone(),
                text,
            });
        }
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("a b c d e"), 5);
    }

    #[test]
    fn test_chunk_zero_size_rejected() {
        assert!(matches!(chunk_text("x", 0), Err(RetrievalError::InvalidChunkSize)));
    }

    #[test]
    fn test_small_text_is_one_chunk() {
        let chunks = chunk_text("line one\nline two\n", 100).unwrap();
        assert_eq!(chunks, vec!["line one\nline two\n".to_string()]);
    }

    #[test]
    fn test_chunks_respect_token_bound() {
        let text = (0..50).map(|i| format!("statement number {}", i)).collect::<Vec<_>>().join("\n");
        let chunks = chunk_text(&text, 20).unwrap();
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(estimate_tokens(chunk) <= 21, "chunk too large: {:?}", chunk);
        }
        let rejoined: String = chunks.concat();
        assert!(rejoined.contains("statement number 0"));
        assert!(rejoined.contains("statement number 49"));
    }

    #[test]
    fn test_oversized_line_split_on_words() {
        let line = vec!["word"; 40].join(" ");
        let chunks = chunk_text(&line, 10).unwrap();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| estimate_tokens(c) <= 10));
    }

    #[test]
    fn test_load_corpus_skips_binary_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("manual.txt"), "rdi.dc().vForce(5 V)").unwrap();
        fs::write(dir.path().join("manual.pdf"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let docs = load_corpus(&[dir.path().display().to_string()]).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].source.ends_with("manual.txt"));
    }

    #[test]
    fn test_load_corpus_glob_and_missing_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.md"), "alpha").unwrap();
        fs::write(dir.path().join("b.md"), "beta").unwrap();
        fs::write(dir.path().join("c.txt"), "gamma").unwrap();

        let pattern = format!("{}/*.md", dir.path().display());
        let missing = format!("{}/nope.txt", dir.path().display());
        let docs = load_corpus(&[pattern, missing]).unwrap();
        let texts: Vec<_> = docs.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_chunk_ids_are_global() {
        let docs = vec![
            Document { source: "a".into(), text: "one".into() },
            Document { source: "b".into(), text: "two".into() },
        ];
        let chunks = chunk_documents(&docs, 100).unwrap();
        assert_eq!(chunks.iter().map(|c| c.id).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(chunks[1].source, "b");
    }
}
