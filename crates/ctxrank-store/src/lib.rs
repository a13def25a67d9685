//! ctxrank-store
//!
//! In-memory `ChunkRepository`. The corpus lives in an `Arc<Vec<Chunk>>`
//! behind a `RwLock`: readers clone the `Arc` and release the lock at once,
//! writers copy-on-write, so a snapshot never changes after it is taken.

use std::collections::HashSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use ctxrank_core::error::RatingError;
use ctxrank_core::traits::ChunkRepository;
use ctxrank_core::types::{clamp_rating, Chunk, ChunkDraft, ChunkId};

#[derive(Default)]
struct Inner {
    chunks: Arc<Vec<Chunk>>,
    ids: HashSet<ChunkId>,
    next_seq: u64,
}

impl Inner {
    fn next_id(&mut self) -> ChunkId {
        loop {
            self.next_seq += 1;
            let id = format!("vec_{}", self.next_seq);
            if !self.ids.contains(&id) {
                return id;
            }
        }
    }
}

#[derive(Default)]
pub struct InMemoryChunkStore {
    inner: RwLock<Inner>,
}

impl InMemoryChunkStore {
    pub fn new() -> Self { Self::default() }

    /// Seed with pre-built chunks, kept in the given order. Later duplicates
    /// of an id are dropped.
    pub fn with_chunks(chunks: Vec<Chunk>) -> Self {
        let mut ids = HashSet::new();
        let chunks: Vec<Chunk> = chunks.into_iter().filter(|c| ids.insert(c.id.clone())).collect();
        Self { inner: RwLock::new(Inner { chunks: Arc::new(chunks), ids, next_seq: 0 }) }
    }

    // A panic while holding the lock cannot leave `Inner` half-written: every
    // mutation builds its new state before swapping it in.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChunkRepository for InMemoryChunkStore {
    fn append(&self, batch: Vec<ChunkDraft>) -> Vec<ChunkId> {
        if batch.is_empty() {
            return Vec::new();
        }
        let mut inner = self.write();
        let mut assigned = Vec::with_capacity(batch.len());
        let mut next = Vec::with_capacity(batch.len() + inner.chunks.len());
        for draft in batch {
            let id = inner.next_id();
            inner.ids.insert(id.clone());
            assigned.push(id.clone());
            next.push(draft.into_chunk(id));
        }
        next.extend(inner.chunks.iter().cloned());
        inner.chunks = Arc::new(next);
        debug!(added = assigned.len(), total = inner.chunks.len(), "appended batch");
        assigned
    }

    fn snapshot(&self) -> Arc<Vec<Chunk>> {
        Arc::clone(&self.read().chunks)
    }

    fn update_rating(&self, id: &str, update: &dyn Fn(f64) -> f64) -> Result<f64, RatingError> {
        let mut inner = self.write();
        let pos = inner
            .chunks
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| RatingError::UnknownChunk(id.to_string()))?;
        let updated = clamp_rating(update(inner.chunks[pos].avg_user_rating));
        Arc::make_mut(&mut inner.chunks)[pos].avg_user_rating = updated;
        Ok(updated)
    }

    fn len(&self) -> usize {
        self.read().chunks.len()
    }
}
