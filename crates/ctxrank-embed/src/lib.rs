//! ctxrank-embed
//!
//! Vectorizer implementations producing the baseline similarity signal.
//! None of them is a real embedding model; `HashedVectorizer` is a cheap
//! deterministic stand-in and the other two exist for demos and tests.

use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use tracing::info;

use ctxrank_core::config::{VectorizerConfig, VectorizerKind};
use ctxrank_core::traits::Vectorizer;

mod hashed;

pub use hashed::{cosine, HashedVectorizer};

/// Returns the same score for every fragment.
pub struct FixedVectorizer {
    score: f64,
    dim: usize,
}

impl FixedVectorizer {
    pub fn new(score: f64, dim: usize) -> Self { Self { score, dim } }
}

impl Vectorizer for FixedVectorizer {
    fn dim(&self) -> usize { self.dim }
    fn similarity(&self, _fragment: &str, _context: &str) -> Result<f64> { Ok(self.score) }
}

/// Uniform score in `[0.75, 0.95)`: looks like a strong match in a demo.
/// Seeded, so a given seed replays the same sequence.
pub struct JitterVectorizer {
    rng: Mutex<StdRng>,
    dim: usize,
}

impl JitterVectorizer {
    pub const FLOOR: f64 = 0.75;
    pub const SPREAD: f64 = 0.2;

    pub fn new(seed: u64, dim: usize) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)), dim }
    }
}

impl Vectorizer for JitterVectorizer {
    fn dim(&self) -> usize { self.dim }

    fn similarity(&self, _fragment: &str, _context: &str) -> Result<f64> {
        let mut rng = self.rng.lock().map_err(|_| anyhow!("jitter rng lock poisoned"))?;
        Ok(Self::FLOOR + rng.gen::<f64>() * Self::SPREAD)
    }
}

pub fn build_vectorizer(config: &VectorizerConfig) -> Box<dyn Vectorizer> {
    match config.kind {
        VectorizerKind::Hashed => {
            info!(dim = config.dim, "Using HashedVectorizer");
            Box::new(HashedVectorizer::new(config.dim))
        }
        VectorizerKind::Fixed => {
            info!(score = config.score, "Using FixedVectorizer");
            Box::new(FixedVectorizer::new(config.score, config.dim))
        }
        VectorizerKind::Jitter => {
            info!(seed = config.seed, "Using JitterVectorizer");
            Box::new(JitterVectorizer::new(config.seed, config.dim))
        }
    }
}
