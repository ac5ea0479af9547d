//! Task Kinds
//!
//! The closed set of jobs a worker can run, and the handler that runs them.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

// == Task Kind ==
/// A unit of CPU-bound work. Serialized as `{"type": ..., "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskKind {
    /// SHA-256 of the text, hex encoded
    Hash { text: String },
    /// Parses the text as JSON
    ParseJson { text: String },
    /// Character, word, line and sentence counts
    TextStats { text: String },
    /// Case-insensitive term matching over documents
    Search { documents: Vec<String>, query: String },
    /// Splits the text into overlapping character windows
    Chunk {
        text: String,
        chunk_size: usize,
        #[serde(default)]
        overlap: usize,
    },
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Hash { .. } => "hash",
            TaskKind::ParseJson { .. } => "parse_json",
            TaskKind::TextStats { .. } => "text_stats",
            TaskKind::Search { .. } => "search",
            TaskKind::Chunk { .. } => "chunk",
        }
    }
}

// == Task Handler ==
/// Runs a task on a blocking thread. An `Err` becomes a task error reply;
/// a panic becomes a worker fault.
pub trait TaskHandler: Send + Sync + 'static {
    fn handle(&self, task: &TaskKind) -> Result<Value, String>;
}

/// Handler for the built-in [`TaskKind`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTasks;

impl TaskHandler for BuiltinTasks {
    fn handle(&self, task: &TaskKind) -> Result<Value, String> {
        match task {
            TaskKind::Hash { text } => Ok(hash(text)),
            TaskKind::ParseJson { text } => {
                serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))
            }
            TaskKind::TextStats { text } => Ok(text_stats(text)),
            TaskKind::Search { documents, query } => search(documents, query),
            TaskKind::Chunk {
                text,
                chunk_size,
                overlap,
            } => chunk(text, *chunk_size, *overlap),
        }
    }
}

fn hash(text: &str) -> Value {
    let digest = Sha256::digest(text.as_bytes());
    json!({
        "algorithm": "sha256",
        "hash": hex::encode(digest),
    })
}

fn text_stats(text: &str) -> Value {
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    json!({
        "characters": text.chars().count(),
        "words": text.split_whitespace().count(),
        "lines": text.lines().count(),
        "sentences": sentences,
    })
}

/// Scores each document by occurrences of the query terms. Documents with no
/// match are left out; the rest are ordered by score, then index.
fn search(documents: &[String], query: &str) -> Result<Value, String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|term| term.to_lowercase())
        .collect();
    if terms.is_empty() {
        return Err("empty query".to_string());
    }

    let mut matches: Vec<(usize, usize)> = documents
        .iter()
        .enumerate()
        .map(|(index, document)| {
            let document = document.to_lowercase();
            let score = terms
                .iter()
                .map(|term| document.matches(term.as_str()).count())
                .sum();
            (index, score)
        })
        .filter(|(_, score)| *score > 0)
        .collect();
    matches.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    Ok(json!({
        "total": matches.len(),
        "matches": matches
            .iter()
            .map(|(index, score)| json!({"index": index, "score": score}))
            .collect::<Vec<_>>(),
    }))
}

fn chunk(text: &str, chunk_size: usize, overlap: usize) -> Result<Value, String> {
    if chunk_size == 0 {
        return Err("chunk_size must be positive".to_string());
    }
    if overlap >= chunk_size {
        return Err(format!(
            "overlap {} must be smaller than chunk_size {}",
            overlap, chunk_size
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect::<String>());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(json!({
        "count": chunks.len(),
        "chunks": chunks,
    }))
}
