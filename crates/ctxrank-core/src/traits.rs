use std::sync::Arc;

use crate::error::RatingError;
use crate::types::{Chunk, ChunkDraft, ChunkId};

/// Source of the baseline similarity signal.
///
/// Implementations may be slow (model calls, I/O); the ingestion pipeline
/// calls them outside of any store lock. Output is clamped to `[0, 1]` by
/// the caller, so implementations need not be exact about bounds.
pub trait Vectorizer: Send + Sync {
    /// Embedding width, recorded on each chunk for display.
    fn dim(&self) -> usize;
    fn similarity(&self, fragment: &str, context: &str) -> anyhow::Result<f64>;

    /// Score every fragment of one document against the same context, one
    /// score per fragment in order. Override when the context is expensive
    /// to prepare so it is prepared once per document.
    fn score_fragments(&self, fragments: &[String], context: &str) -> anyhow::Result<Vec<f64>> {
        fragments.iter().map(|f| self.similarity(f, context)).collect()
    }
}

/// Append-only chunk storage.
pub trait ChunkRepository: Send + Sync {
    /// Prepend one document's chunks as a single atomic step and return the
    /// ids they were given, in batch order.
    fn append(&self, batch: Vec<ChunkDraft>) -> Vec<ChunkId>;

    /// Point-in-time view, most recently ingested first.
    fn snapshot(&self) -> Arc<Vec<Chunk>>;

    /// Replace a chunk's average rating with `update(current)` under the
    /// writer lock and return the stored value.
    fn update_rating(&self, id: &str, update: &dyn Fn(f64) -> f64) -> Result<f64, RatingError>;

    fn len(&self) -> usize {
        self.snapshot().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, id: &str) -> Option<Chunk> {
        self.snapshot().iter().find(|c| c.id == id).cloned()
    }
}

impl<R: ChunkRepository + ?Sized> ChunkRepository for Arc<R> {
    fn append(&self, batch: Vec<ChunkDraft>) -> Vec<ChunkId> {
        (**self).append(batch)
    }
    fn snapshot(&self) -> Arc<Vec<Chunk>> {
        (**self).snapshot()
    }
    fn update_rating(&self, id: &str, update: &dyn Fn(f64) -> f64) -> Result<f64, RatingError> {
        (**self).update_rating(id, update)
    }
}
