use ctxrank_core::types::{Chunk, ChunkType, ScoredChunk, MAX_RATING};

use crate::weights::AdaptedWeights;

pub fn effective_score(chunk: &Chunk, weights: &AdaptedWeights) -> f64 {
    let norm_rating = chunk.avg_user_rating / MAX_RATING;
    chunk.base_vector_score * weights.w_vector
        + chunk.source_reliability * weights.w_reliability
        + norm_rating * weights.w_rating
}

/// Score every chunk and sort descending. The sort is stable, so equal
/// scores keep snapshot order: the newest batch wins across documents, and
/// earlier paragraphs win within one document.
pub fn rank<'a, I>(chunks: I, weights: &AdaptedWeights) -> Vec<ScoredChunk>
where
    I: IntoIterator<Item = &'a Chunk>,
{
    let mut scored: Vec<ScoredChunk> = chunks
        .into_iter()
        .map(|c| ScoredChunk { chunk: c.clone(), effective_score: effective_score(c, weights) })
        .collect();
    scored.sort_by(|a, b| b.effective_score.total_cmp(&a.effective_score));
    scored
}

pub fn render_block(item: &ScoredChunk) -> String {
    let c = &item.chunk;
    format!(
        "[ID: {}] [Type: {}] [Relevance: {:.2}] [Rel: {}] [Rating: {}/5]\nSource: {}\nContent: \"{}\"",
        c.id, c.chunk_type, item.effective_score, c.source_reliability, c.avg_user_rating, c.source, c.content
    )
}

/// Context-assembly mode: the `top_k` best chunks rendered for prompt
/// injection, separated by a blank line. Empty input gives an empty string.
pub fn assemble_context(chunks: &[Chunk], weights: &AdaptedWeights, top_k: usize) -> String {
    rank(chunks, weights).iter().take(top_k).map(render_block).collect::<Vec<_>>().join("\n\n")
}

/// Listing mode: every chunk at or above `min_score`, optionally of one type.
pub fn list(chunks: &[Chunk], weights: &AdaptedWeights, type_filter: Option<ChunkType>, min_score: f64) -> Vec<ScoredChunk> {
    let candidates = chunks.iter().filter(|c| type_filter.map_or(true, |t| c.chunk_type == t));
    rank(candidates, weights).into_iter().filter(|s| s.effective_score >= min_score).collect()
}
