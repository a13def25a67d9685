//! Turns a named document into chunk drafts ready for the store.

use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::IngestError;
use crate::traits::Vectorizer;
use crate::types::{clamp_unit, truncate_chars, ChunkDraft, ChunkType, MAX_CONTENT_CHARS, NEUTRAL_RATING};

/// File extensions picked up when walking a directory.
pub const DOCUMENT_EXTENSIONS: [&str; 5] = ["txt", "md", "log", "json", "csv"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Fragments shorter than this (after trimming) are noise.
    pub min_fragment_chars: usize,
    pub max_content_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { min_fragment_chars: 20, max_content_chars: MAX_CONTENT_CHARS }
    }
}

/// Classify a document by name. Rules are checked in order and the first
/// match wins; they are never combined. Extensions match case-sensitively,
/// the policy keywords do not.
pub fn classify_source(name: &str) -> (ChunkType, f64) {
    if name.ends_with(".log") {
        (ChunkType::Log, 0.8)
    } else if name.ends_with(".md") || name.ends_with(".txt") {
        (ChunkType::Kb, 0.7)
    } else if contains_policy_keyword(name) {
        (ChunkType::Policy, 0.9)
    } else {
        (ChunkType::Ingested, 0.5)
    }
}

fn contains_policy_keyword(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("policy") || lower.contains("sop")
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").expect("valid paragraph pattern"))
}

/// Split on one or more blank lines.
pub fn split_paragraphs(text: &str) -> Vec<&str> {
    paragraph_break().split(text).collect()
}

/// Strict UTF-8 decoding; anything else is unreadable.
pub fn decode_document<'a>(name: &str, bytes: &'a [u8]) -> Result<&'a str, IngestError> {
    std::str::from_utf8(bytes).map_err(|e| IngestError::UnreadableContent {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

#[derive(Default)]
pub struct DocumentProcessor {
    config: IngestConfig,
}

impl DocumentProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_config(config: IngestConfig) -> Self { Self { config } }

    /// Produce drafts for every surviving paragraph of `text`. Any vectorizer
    /// failure aborts the whole document.
    pub fn process(&self, name: &str, text: &str, vectorizer: &dyn Vectorizer) -> Result<Vec<ChunkDraft>, IngestError> {
        let (chunk_type, reliability) = classify_source(name);
        let ingested_at = Utc::now().date_naive();
        let dimensionality = vectorizer.dim();

        let max_chars = self.config.max_content_chars.min(MAX_CONTENT_CHARS);
        let mut contents = Vec::new();
        for (index, fragment) in split_paragraphs(text).into_iter().enumerate() {
            let fragment = fragment.trim();
            let len = fragment.chars().count();
            if len < self.config.min_fragment_chars {
                debug!(document = name, index, len, "dropping short fragment");
                continue;
            }
            contents.push(truncate_chars(fragment, max_chars));
        }
        if contents.is_empty() {
            return Ok(Vec::new());
        }

        let vectorizer_error = |reason: String| IngestError::Vectorizer { name: name.to_string(), reason };
        let scores = vectorizer.score_fragments(&contents, text).map_err(|e| vectorizer_error(e.to_string()))?;
        if scores.len() != contents.len() {
            return Err(vectorizer_error(format!("{} scores for {} fragments", scores.len(), contents.len())));
        }

        let drafts: Vec<ChunkDraft> = contents
            .into_iter()
            .zip(scores)
            .map(|(content, score)| ChunkDraft {
                content,
                source: name.to_string(),
                chunk_type,
                dimensionality,
                ingested_at,
                base_vector_score: clamp_unit(score),
                avg_user_rating: NEUTRAL_RATING,
                source_reliability: reliability,
            })
            .collect();
        debug!(document = name, %chunk_type, kept = drafts.len(), "document processed");
        Ok(drafts)
    }

    pub fn process_bytes(&self, name: &str, bytes: &[u8], vectorizer: &dyn Vectorizer) -> Result<Vec<ChunkDraft>, IngestError> {
        let text = decode_document(name, bytes)?;
        self.process(name, text, vectorizer)
    }
}

/// Recursively list ingestible documents under `root`, sorted by path.
pub fn list_documents(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
        if ext.is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str())) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    files
}
