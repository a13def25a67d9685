//! ctxrank-hybrid
//!
//! Reranks a small corpus by blending vector similarity, source reliability
//! and user rating under query-sensitive weights. `HybridRetriever` is the
//! entry point; the submodules hold the pure pieces.

use anyhow::Result;
use tracing::{debug, info, warn};

use ctxrank_core::config::{EngineSettings, RetrievalConfig};
use ctxrank_core::data_processor::DocumentProcessor;
use ctxrank_core::error::{IngestError, RatingError};
use ctxrank_core::traits::{ChunkRepository, Vectorizer};
use ctxrank_core::types::{Chunk, ChunkDraft, ChunkType, ScoredChunk, WeightSet};
use ctxrank_embed::build_vectorizer;
use ctxrank_store::InMemoryChunkStore;

pub mod feedback;
pub mod scoring;
pub mod weights;

use weights::{adapt, AdaptedWeights, TuningHandle};

pub struct HybridRetriever<R>
where
    R: ChunkRepository,
{
    store: R,
    vectorizer: Box<dyn Vectorizer>,
    processor: DocumentProcessor,
    tuning: TuningHandle,
    retrieval: RetrievalConfig,
}

impl HybridRetriever<InMemoryChunkStore> {
    /// In-memory store, optionally seeded, with everything else from `settings`.
    pub fn from_settings(settings: &EngineSettings, seed: Vec<Chunk>) -> Result<Self> {
        settings.validate()?;
        let store = InMemoryChunkStore::with_chunks(seed);
        Ok(Self::with_settings(store, build_vectorizer(&settings.vectorizer), settings))
    }
}

impl<R> HybridRetriever<R>
where
    R: ChunkRepository,
{
    pub fn new(store: R, vectorizer: Box<dyn Vectorizer>) -> Self {
        Self::with_settings(store, vectorizer, &EngineSettings::default())
    }

    pub fn with_settings(store: R, vectorizer: Box<dyn Vectorizer>, settings: &EngineSettings) -> Self {
        Self {
            store,
            vectorizer,
            processor: DocumentProcessor::with_config(settings.ingest.clone()),
            tuning: TuningHandle::new(settings.weights),
            retrieval: settings.retrieval,
        }
    }

    pub fn store(&self) -> &R { &self.store }

    pub fn tuning(&self) -> &TuningHandle { &self.tuning }

    pub fn retrieval_config(&self) -> &RetrievalConfig { &self.retrieval }

    /// Chunk, classify and score `raw_text`, then append the result as one
    /// batch. Returns how many chunks were added.
    pub fn ingest(&self, name: &str, raw_text: &str) -> Result<usize, IngestError> {
        let drafts = self.processor.process(name, raw_text, self.vectorizer.as_ref()).inspect_err(|e| warn!(document = name, error = %e, "ingestion aborted"))?;
        self.commit(name, drafts)
    }

    /// Like `ingest`, for raw bytes that must be valid UTF-8.
    pub fn ingest_bytes(&self, name: &str, bytes: &[u8]) -> Result<usize, IngestError> {
        let drafts = self.processor.process_bytes(name, bytes, self.vectorizer.as_ref()).inspect_err(|e| warn!(document = name, error = %e, "ingestion aborted"))?;
        self.commit(name, drafts)
    }

    fn commit(&self, name: &str, drafts: Vec<ChunkDraft>) -> Result<usize, IngestError> {
        if drafts.is_empty() {
            info!(document = name, "nothing to ingest");
            return Ok(0);
        }
        let ids = self.store.append(drafts);
        info!(document = name, chunks = ids.len(), "ingested");
        Ok(ids.len())
    }

    /// Current weights adapted to `query`. The tuning tuple is read once.
    pub fn weights_for(&self, query: &str) -> AdaptedWeights {
        let w = adapt(self.tuning.get(), query);
        debug!(intent = %w.intent, w_vector = w.w_vector, w_reliability = w.w_reliability, w_rating = w.w_rating, "adapted weights");
        w
    }

    /// Top-k chunks formatted for the generation step; empty when the store is.
    pub fn retrieve_context(&self, query: &str) -> String {
        let weights = self.weights_for(query);
        let snapshot = self.store.snapshot();
        scoring::assemble_context(&snapshot, &weights, self.retrieval.top_k)
    }

    pub fn list_ranked(&self, query: &str, type_filter: Option<ChunkType>, min_score: f64) -> Vec<ScoredChunk> {
        let weights = self.weights_for(query);
        let snapshot = self.store.snapshot();
        scoring::list(&snapshot, &weights, type_filter, min_score)
    }

    pub fn rate(&self, chunk_id: &str, rating: i64) -> Result<f64, RatingError> {
        feedback::apply_rating(&self.store, chunk_id, rating)
    }

    pub fn set_weights(&self, weights: WeightSet) {
        self.tuning.set(weights);
    }
}
