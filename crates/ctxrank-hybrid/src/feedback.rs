//! Folding user ratings into a chunk's running average.

use tracing::{info, warn};

use ctxrank_core::error::RatingError;
use ctxrank_core::traits::ChunkRepository;

/// The stored average counts as this many prior observations.
pub const PRIOR_WEIGHT: f64 = 10.0;

pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

pub fn validate_rating(rating: i64) -> Result<u8, RatingError> {
    u8::try_from(rating).ok().filter(|r| (1..=5).contains(r)).ok_or(RatingError::OutOfRange(rating))
}

/// `round1((current * 10 + rating) / 11)`
pub fn moving_average(current: f64, rating: u8) -> f64 {
    round1((current * PRIOR_WEIGHT + f64::from(rating)) / (PRIOR_WEIGHT + 1.0))
}

/// Validate and apply one rating. Nothing changes on error.
pub fn apply_rating(store: &dyn ChunkRepository, chunk_id: &str, rating: i64) -> Result<f64, RatingError> {
    let rating = validate_rating(rating).inspect_err(|_| warn!(chunk_id, rating, "rejected out-of-range rating"))?;
    let updated = store.update_rating(chunk_id, &|current| moving_average(current, rating))?;
    info!(chunk_id, rating, avg = updated, "rating applied");
    Ok(updated)
}
