use anyhow::Result;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

use ctxrank_core::traits::Vectorizer;

/// Feature-hashed term frequencies. Each lowercase alphanumeric token adds
/// one to one of `dim` buckets; vectors are L2-normalized, non-negative, so cosine
/// similarity stays in `[0, 1]`.
pub struct HashedVectorizer {
    dim: usize,
}

impl HashedVectorizer {
    pub fn new(dim: usize) -> Self { Self { dim: dim.max(1) } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        let lower = text.to_lowercase();
        for token in lower.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        v
    }
}

impl Vectorizer for HashedVectorizer {
    fn dim(&self) -> usize { self.dim }

    fn similarity(&self, fragment: &str, context: &str) -> Result<f64> {
        Ok(f64::from(cosine(&self.embed_text(fragment), &self.embed_text(context))))
    }

    fn score_fragments(&self, fragments: &[String], context: &str) -> Result<Vec<f64>> {
        let context = self.embed_text(context);
        Ok(fragments.iter().map(|f| f64::from(cosine(&self.embed_text(f), &context))).collect())
    }
}

/// Cosine similarity; 0 when either side is the zero vector.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na < 1e-6 || nb < 1e-6 { 0.0 } else { (dot / (na * nb)).clamp(0.0, 1.0) }
}
