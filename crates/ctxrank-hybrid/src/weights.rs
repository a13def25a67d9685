//! Query-sensitive weighting of the three relevance signals.

use std::fmt;
use std::sync::RwLock;

use ctxrank_core::types::WeightSet;

/// No signal is pushed below this by an intent boost.
pub const WEIGHT_FLOOR: f64 = 0.1;

pub const AUTHORITY_KEYWORDS: [&str; 4] = ["sop", "policy", "standard", "compliance"];
pub const TROUBLESHOOTING_KEYWORDS: [&str; 4] = ["fix", "solution", "resolved", "recommend"];
pub const ERROR_TRACE_KEYWORDS: [&str; 4] = ["error", "exception", "stack", "log"];

/// What the query seems to be after. At most one intent applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Hybrid scoring is off; only the vector signal counts.
    VectorOnly,
    Authority,
    Troubleshooting,
    ErrorTrace,
    Neutral,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Intent::VectorOnly => "vector-only",
            Intent::Authority => "authority",
            Intent::Troubleshooting => "troubleshooting",
            Intent::ErrorTrace => "error-trace",
            Intent::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Normalized weights for a single retrieval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptedWeights {
    pub w_vector: f64,
    pub w_reliability: f64,
    pub w_rating: f64,
    pub intent: Intent,
}

impl AdaptedWeights {
    pub fn vector_only() -> Self {
        Self { w_vector: 1.0, w_reliability: 0.0, w_rating: 0.0, intent: Intent::VectorOnly }
    }

    pub fn sum(&self) -> f64 {
        self.w_vector + self.w_reliability + self.w_rating
    }
}

/// Keyword categories in priority order; first hit wins.
pub fn detect_intent(query: &str) -> Intent {
    let q = query.to_lowercase();
    if contains_any(&q, &AUTHORITY_KEYWORDS) {
        Intent::Authority
    } else if contains_any(&q, &TROUBLESHOOTING_KEYWORDS) {
        Intent::Troubleshooting
    } else if contains_any(&q, &ERROR_TRACE_KEYWORDS) {
        Intent::ErrorTrace
    } else {
        Intent::Neutral
    }
}

fn contains_any(haystack: &str, words: &[&str]) -> bool {
    words.iter().any(|w| haystack.contains(w))
}

fn lowered(w: f64, by: f64) -> f64 {
    (w - by).max(WEIGHT_FLOOR)
}

/// Turn raw tuning weights plus the query into a triple summing to one.
///
/// With hybrid off the result is exactly `(1, 0, 0)`. Otherwise the clamped
/// raw weights get at most one intent boost, the other two signals give up
/// half the boost each (floored at `WEIGHT_FLOOR`), and the triple is divided
/// by its sum. A zero sum is treated as one, which can only happen for all-zero
/// raw weights on a neutral query.
pub fn adapt(raw: WeightSet, query: &str) -> AdaptedWeights {
    if !raw.hybrid_enabled {
        return AdaptedWeights::vector_only();
    }
    let w = raw.clamped();
    let (mut v, mut rel, mut rat) = (w.w_vector, w.w_reliability, w.w_rating);

    let intent = detect_intent(query);
    match intent {
        Intent::Authority => {
            let boost = 0.25;
            rel += boost;
            v = lowered(v, boost / 2.0);
            rat = lowered(rat, boost / 2.0);
        }
        Intent::Troubleshooting => {
            let boost = 0.20;
            rat += boost;
            v = lowered(v, boost / 2.0);
            rel = lowered(rel, boost / 2.0);
        }
        Intent::ErrorTrace => {
            let boost = 0.20;
            v += boost;
            rel = lowered(rel, boost / 2.0);
            rat = lowered(rat, boost / 2.0);
        }
        Intent::Neutral | Intent::VectorOnly => {}
    }

    let total = v + rel + rat;
    let total = if total == 0.0 { 1.0 } else { total };
    AdaptedWeights { w_vector: v / total, w_reliability: rel / total, w_rating: rat / total, intent }
}

/// Shared, mutable tuning input. Every read hands out a full copy taken under
/// one lock acquisition, so a retrieval never sees a half-applied update.
#[derive(Debug, Default)]
pub struct TuningHandle {
    weights: RwLock<WeightSet>,
}

impl TuningHandle {
    pub fn new(weights: WeightSet) -> Self {
        Self { weights: RwLock::new(weights) }
    }

    pub fn get(&self) -> WeightSet {
        *self.weights.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set(&self, weights: WeightSet) {
        self.update(|w| *w = weights);
    }

    pub fn w_vector(&self) -> f64 { self.get().w_vector }
    pub fn w_reliability(&self) -> f64 { self.get().w_reliability }
    pub fn w_rating(&self) -> f64 { self.get().w_rating }
    pub fn hybrid_enabled(&self) -> bool { self.get().hybrid_enabled }

    pub fn set_w_vector(&self, value: f64) { self.update(|w| w.w_vector = value); }
    pub fn set_w_reliability(&self, value: f64) { self.update(|w| w.w_reliability = value); }
    pub fn set_w_rating(&self, value: f64) { self.update(|w| w.w_rating = value); }
    pub fn set_hybrid_enabled(&self, value: bool) { self.update(|w| w.hybrid_enabled = value); }

    /// Flip hybrid scoring and return the new state.
    pub fn toggle_hybrid(&self) -> bool {
        let mut out = false;
        self.update(|w| {
            w.hybrid_enabled = !w.hybrid_enabled;
            out = w.hybrid_enabled;
        });
        out
    }

    fn update(&self, f: impl FnOnce(&mut WeightSet)) {
        let mut guard = self.weights.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard);
    }
}
