//! Domain types shared by the store, the ingestion pipeline and the reranker.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub type ChunkId = String;

/// Upper bound on `Chunk::content`, in characters.
pub const MAX_CONTENT_CHARS: usize = 500;
/// Rating every freshly ingested chunk starts with.
pub const NEUTRAL_RATING: f64 = 3.0;
pub const MIN_RATING: f64 = 1.0;
pub const MAX_RATING: f64 = 5.0;

/// Provenance class of a chunk. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChunkType {
    Sop,
    Log,
    Kb,
    Policy,
    Ingested,
}

impl ChunkType {
    pub const ALL: [ChunkType; 5] = [
        ChunkType::Sop,
        ChunkType::Log,
        ChunkType::Kb,
        ChunkType::Policy,
        ChunkType::Ingested,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChunkType::Sop => "SOP",
            ChunkType::Log => "LOG",
            ChunkType::Kb => "KB",
            ChunkType::Policy => "POLICY",
            ChunkType::Ingested => "INGESTED",
        }
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ChunkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChunkType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Parse(format!("unknown chunk type '{s}'")))
    }
}

/// A scorable unit of retrievable text.
///
/// - `id`: assigned by the store on append, never reused
/// - `content`: at most `MAX_CONTENT_CHARS` characters
/// - `source`: provenance label, usually the document name
/// - `dimensionality`: width reported by the vectorizer, informational only
/// - `base_vector_score`, `source_reliability`: in `[0, 1]`
/// - `avg_user_rating`: in `[1, 5]`, only changed through feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub source: String,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    pub dimensionality: usize,
    pub ingested_at: NaiveDate,
    pub base_vector_score: f64,
    pub avg_user_rating: f64,
    pub source_reliability: f64,
}

/// Everything a chunk carries except its id. Produced by ingestion and
/// turned into a `Chunk` by the repository when it is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkDraft {
    pub content: String,
    pub source: String,
    pub chunk_type: ChunkType,
    pub dimensionality: usize,
    pub ingested_at: NaiveDate,
    pub base_vector_score: f64,
    pub avg_user_rating: f64,
    pub source_reliability: f64,
}

impl ChunkDraft {
    /// Attach an id. Scores are clamped into their bounds and content is cut
    /// at `MAX_CONTENT_CHARS`, so every `Chunk` in circulation is valid.
    pub fn into_chunk(self, id: ChunkId) -> Chunk {
        Chunk {
            id,
            content: truncate_chars(&self.content, MAX_CONTENT_CHARS),
            source: self.source,
            chunk_type: self.chunk_type,
            dimensionality: self.dimensionality,
            ingested_at: self.ingested_at,
            base_vector_score: clamp_unit(self.base_vector_score),
            avg_user_rating: clamp_rating(self.avg_user_rating),
            source_reliability: clamp_unit(self.source_reliability),
        }
    }
}

/// Tunable weights for one retrieval. Values outside `[0, 1]` are clamped
/// before use rather than rejected; they need not sum to one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightSet {
    pub w_vector: f64,
    pub w_reliability: f64,
    pub w_rating: f64,
    pub hybrid_enabled: bool,
}

impl Default for WeightSet {
    fn default() -> Self {
        Self { w_vector: 0.45, w_reliability: 0.25, w_rating: 0.30, hybrid_enabled: true }
    }
}

impl WeightSet {
    pub fn clamped(self) -> Self {
        Self {
            w_vector: clamp_unit(self.w_vector),
            w_reliability: clamp_unit(self.w_reliability),
            w_rating: clamp_unit(self.w_rating),
            hybrid_enabled: self.hybrid_enabled,
        }
    }
}

/// A chunk together with the effective score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub effective_score: f64,
}

/// Clamp into `[0, 1]`; NaN maps to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Clamp into `[MIN_RATING, MAX_RATING]`; NaN maps to the neutral rating.
pub fn clamp_rating(x: f64) -> f64 {
    if x.is_nan() { NEUTRAL_RATING } else { x.clamp(MIN_RATING, MAX_RATING) }
}

/// First `max` characters of `s` (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
