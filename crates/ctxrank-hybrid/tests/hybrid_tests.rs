use std::sync::Arc;
use std::time::{Duration, Instant};

use ctxrank_core::config::EngineSettings;
use ctxrank_core::error::{IngestError, RatingError};
use ctxrank_core::seed::demo_corpus;
use ctxrank_core::traits::{ChunkRepository, Vectorizer};
use ctxrank_core::types::{Chunk, ChunkDraft, ChunkType, WeightSet};
use ctxrank_embed::FixedVectorizer;
use ctxrank_hybrid::scoring::{assemble_context, effective_score, list, render_block};
use ctxrank_hybrid::weights::{AdaptedWeights, Intent};
use ctxrank_hybrid::HybridRetriever;
use ctxrank_store::InMemoryChunkStore;

fn chunk(id: &str, base: f64, reliability: f64, rating: f64) -> Chunk {
    ChunkDraft {
        content: format!("content of {id}"),
        source: format!("{id}.txt"),
        chunk_type: ChunkType::Kb,
        dimensionality: 4096,
        ingested_at: chrono::Utc::now().date_naive(),
        base_vector_score: base,
        avg_user_rating: rating,
        source_reliability: reliability,
    }
    .into_chunk(id.to_string())
}

fn weights(v: f64, rel: f64, rat: f64) -> AdaptedWeights {
    AdaptedWeights { w_vector: v, w_reliability: rel, w_rating: rat, intent: Intent::Neutral }
}

fn retriever(seed: Vec<Chunk>) -> HybridRetriever<InMemoryChunkStore> {
    HybridRetriever::new(InMemoryChunkStore::with_chunks(seed), Box::new(FixedVectorizer::new(0.8, 4096)))
}

/// Extract the `[Relevance: x]` values of a rendered context, in order.
fn relevances(context: &str) -> Vec<f64> {
    context
        .lines()
        .filter_map(|l| l.split("[Relevance: ").nth(1))
        .filter_map(|rest| rest.split(']').next())
        .filter_map(|s| s.parse().ok())
        .collect()
}

#[test]
fn effective_score_blends_three_signals() {
    let c = chunk("a", 0.9, 0.8, 4.0);
    let score = effective_score(&c, &weights(0.5, 0.3, 0.2));
    assert!((score - 0.85).abs() < 1e-12, "score={score}");
}

#[test]
fn hybrid_off_uses_vector_score_only() {
    let r = retriever(vec![chunk("a", 0.37, 1.0, 5.0)]);
    r.set_weights(WeightSet { w_vector: 0.1, w_reliability: 0.9, w_rating: 0.9, hybrid_enabled: false });
    let listed = r.list_ranked("policy", None, 0.0);
    assert_eq!(listed[0].effective_score, 0.37);
}

#[test]
fn retrieve_context_on_empty_store_is_empty() {
    assert_eq!(retriever(Vec::new()).retrieve_context("anything"), "");
}

#[test]
fn retrieve_context_returns_top_three_descending() {
    let r = retriever(vec![
        chunk("a", 0.10, 0.1, 1.0),
        chunk("b", 0.90, 0.9, 5.0),
        chunk("c", 0.50, 0.5, 3.0),
        chunk("d", 0.70, 0.7, 4.0),
        chunk("e", 0.30, 0.3, 2.0),
    ]);
    let context = r.retrieve_context("printer queue");
    let blocks: Vec<&str> = context.split("\n\n").collect();
    assert_eq!(blocks.len(), 3);
    assert!(blocks[0].starts_with("[ID: b]"));
    assert!(blocks[1].starts_with("[ID: d]"));
    assert!(blocks[2].starts_with("[ID: c]"));

    let scores = relevances(&context);
    assert_eq!(scores.len(), 3);
    assert!(scores.windows(2).all(|w| w[0] > w[1]), "scores={scores:?}");
}

#[test]
fn render_block_layout() {
    let c = chunk("vec_1", 0.9, 0.8, 4.0);
    let scored = ctxrank_core::types::ScoredChunk { chunk: c, effective_score: 0.8512 };
    assert_eq!(
        render_block(&scored),
        "[ID: vec_1] [Type: KB] [Relevance: 0.85] [Rel: 0.8] [Rating: 4/5]\nSource: vec_1.txt\nContent: \"content of vec_1\""
    );
}

#[test]
fn equal_scores_keep_snapshot_order() {
    let chunks = vec![chunk("first", 0.5, 0.5, 3.0), chunk("second", 0.5, 0.5, 3.0), chunk("third", 0.5, 0.5, 3.0)];
    let context = assemble_context(&chunks, &weights(0.4, 0.3, 0.3), 2);
    assert!(context.starts_with("[ID: first]"));
    assert!(context.contains("[ID: second]"));
    assert!(!context.contains("[ID: third]"));
}

#[test]
fn listing_filters_by_floor_and_type() {
    let mut chunks = vec![chunk("low", 0.1, 0.1, 1.0), chunk("high", 0.9, 0.9, 5.0), chunk("mid", 0.5, 0.5, 3.0)];
    chunks[2].chunk_type = ChunkType::Log;
    let w = weights(0.5, 0.25, 0.25);

    let all = list(&chunks, &w, None, 0.0);
    assert_eq!(all.iter().map(|s| s.chunk.id.as_str()).collect::<Vec<_>>(), vec!["high", "mid", "low"]);

    let floored = list(&chunks, &w, None, 0.4);
    assert_eq!(floored.len(), 2);
    assert!(floored.iter().all(|s| s.effective_score >= 0.4));

    let logs = list(&chunks, &w, Some(ChunkType::Log), 0.0);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].chunk.id, "mid");
}

#[test]
fn policy_query_favours_reliable_sources() {
    let r = retriever(demo_corpus());
    let neutral = r.weights_for("printer queue");
    let policy = r.weights_for("what does the password policy say");
    assert_eq!(policy.intent, Intent::Authority);
    assert!(policy.w_reliability > neutral.w_reliability);
}

#[test]
fn ingest_plain_text_keeps_long_fragments_only() {
    let r = retriever(Vec::new());
    let text = format!("{}\n\n{}", "A".repeat(25), "B".repeat(5));
    assert_eq!(r.ingest("notes.txt", &text).expect("ingest"), 1);

    let snapshot = r.store().snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].content, "A".repeat(25));
    assert_eq!(snapshot[0].chunk_type, ChunkType::Kb);
    assert_eq!(snapshot[0].source_reliability, 0.7);
    assert_eq!(snapshot[0].avg_user_rating, 3.0);
    assert_eq!(snapshot[0].base_vector_score, 0.8);
}

#[test]
fn ingest_classifies_log_extension_before_keyword() {
    let r = retriever(Vec::new());
    r.ingest("security_policy.log", "2024-01-01 ERROR disk quota exceeded on /var").expect("ingest");
    let c = &r.store().snapshot()[0];
    assert_eq!(c.chunk_type, ChunkType::Log);
    assert_eq!(c.source_reliability, 0.8);
}

#[test]
fn ties_favour_newest_document_then_paragraph_order() {
    let r = retriever(Vec::new());
    r.ingest("older.txt", "older document, first paragraph\n\nolder document, second paragraph").expect("ingest");
    r.ingest("newer.txt", "newer document, only paragraph").expect("ingest");
    let contents: Vec<String> = r.list_ranked("", None, 0.0).into_iter().map(|s| s.chunk.content).collect();
    assert_eq!(
        contents,
        vec![
            "newer document, only paragraph".to_string(),
            "older document, first paragraph".to_string(),
            "older document, second paragraph".to_string(),
        ]
    );
}

#[test]
fn hashed_ingestion_grows_linearly_with_document_size() {
    let r = HybridRetriever::from_settings(&EngineSettings::default(), Vec::new()).expect("retriever");
    let text = (0..4000)
        .map(|i| format!("paragraph {i}: restart the spooler service and clear queue {}", i % 17))
        .collect::<Vec<_>>()
        .join("\n\n");
    let started = Instant::now();
    assert_eq!(r.ingest("big.log", &text).expect("ingest"), 4000);
    let elapsed = started.elapsed();
    assert!(elapsed < Duration::from_secs(30), "4000 paragraphs took {elapsed:?}");
}

#[test]
fn ingest_newest_document_first() {
    let r = retriever(demo_corpus());
    r.ingest("fresh.md", "a freshly written knowledge base paragraph").expect("ingest");
    let snapshot = r.store().snapshot();
    assert_eq!(snapshot.len(), 6);
    assert_eq!(snapshot[0].source, "fresh.md");
}

#[test]
fn empty_document_adds_nothing() {
    let r = retriever(Vec::new());
    assert_eq!(r.ingest("empty.txt", "").expect("ingest"), 0);
    assert_eq!(r.ingest("tiny.txt", "too short\n\nalso short").expect("ingest"), 0);
    assert!(r.store().is_empty());
}

#[test]
fn unreadable_document_leaves_store_untouched() {
    let r = retriever(demo_corpus());
    let err = r.ingest_bytes("broken.log", b"valid start \xc3\x28 then garbage").expect_err("invalid utf-8");
    assert!(matches!(err, IngestError::UnreadableContent { .. }));
    assert_eq!(r.store().len(), 5);
}

struct FailsOnSecond(std::sync::atomic::AtomicUsize);

impl Vectorizer for FailsOnSecond {
    fn dim(&self) -> usize { 4 }
    fn similarity(&self, _fragment: &str, _context: &str) -> anyhow::Result<f64> {
        if self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 1 { anyhow::bail!("timeout") }
        Ok(0.5)
    }
}

#[test]
fn vectorizer_failure_persists_no_partial_chunks() {
    let r = HybridRetriever::new(InMemoryChunkStore::new(), Box::new(FailsOnSecond(Default::default())));
    let text = "first paragraph long enough to keep\n\nsecond paragraph long enough too\n\nthird one as well, long enough";
    let err = r.ingest("doc.txt", text).expect_err("vectorizer fails");
    assert!(matches!(err, IngestError::Vectorizer { .. }));
    assert!(r.store().is_empty());
}

#[test]
fn rating_updates_moving_average() {
    let r = retriever(vec![chunk("vec_1", 0.5, 0.5, 3.0)]);
    assert_eq!(r.rate("vec_1", 5).expect("rate"), 3.2);
    assert_eq!(r.store().get("vec_1").map(|c| c.avg_user_rating), Some(3.2));
}

#[test]
fn out_of_range_rating_is_rejected() {
    let r = retriever(vec![chunk("vec_1", 0.5, 0.5, 3.0)]);
    assert_eq!(r.rate("vec_1", 6), Err(RatingError::OutOfRange(6)));
    assert_eq!(r.rate("vec_1", 0), Err(RatingError::OutOfRange(0)));
    assert_eq!(r.rate("vec_1", -3), Err(RatingError::OutOfRange(-3)));
    assert_eq!(r.store().get("vec_1").map(|c| c.avg_user_rating), Some(3.0));
}

#[test]
fn rating_unknown_chunk_fails() {
    let r = retriever(demo_corpus());
    assert_eq!(r.rate("vec_missing", 4), Err(RatingError::UnknownChunk("vec_missing".into())));
}

#[test]
fn rating_feeds_back_into_ranking() {
    let r = retriever(vec![chunk("a", 0.5, 0.5, 3.0), chunk("b", 0.5, 0.5, 3.0)]);
    for _ in 0..5 { r.rate("b", 5).expect("rate"); }
    let listed = r.list_ranked("printer", None, 0.0);
    assert_eq!(listed[0].chunk.id, "b");
}

#[test]
fn tuning_changes_apply_to_next_retrieval() {
    let r = retriever(vec![chunk("vector", 0.95, 0.1, 1.0), chunk("trusted", 0.2, 1.0, 5.0)]);
    r.tuning().set_w_vector(1.0);
    r.tuning().set_w_reliability(0.0);
    r.tuning().set_w_rating(0.0);
    assert_eq!(r.list_ranked("printer", None, 0.0)[0].chunk.id, "vector");

    r.tuning().set_w_vector(0.0);
    r.tuning().set_w_reliability(1.0);
    assert_eq!(r.list_ranked("printer", None, 0.0)[0].chunk.id, "trusted");

    assert!(!r.tuning().toggle_hybrid());
    assert!(!r.tuning().hybrid_enabled());
    assert_eq!(r.list_ranked("printer", None, 0.0)[0].chunk.id, "vector");
}

#[test]
fn demo_corpus_context_mentions_policy_for_compliance_query() {
    let r = retriever(demo_corpus());
    let context = r.retrieve_context("password compliance standard");
    assert_eq!(context.split("\n\n").count(), 3);
    assert!(context.contains("[ID: vec_002]"), "{context}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_ingestion_isolates_failures() {
    let r = Arc::new(retriever(Vec::new()));
    let mut set = tokio::task::JoinSet::new();
    for i in 0..16 {
        let r = Arc::clone(&r);
        set.spawn_blocking(move || {
            let name = format!("doc-{i}.txt");
            if i % 4 == 0 {
                r.ingest_bytes(&name, &[0xff, 0xfe, 0xfd])
            } else {
                let text = format!("paragraph one of document {i}\n\nparagraph two of document {i}");
                r.ingest_bytes(&name, text.as_bytes())
            }
        });
    }

    let mut ok = 0;
    let mut failed = 0;
    while let Some(res) = set.join_next().await {
        match res.expect("join") {
            Ok(n) => { assert_eq!(n, 2); ok += 1; }
            Err(_) => failed += 1,
        }
    }
    assert_eq!((ok, failed), (12, 4));

    let snapshot = r.store().snapshot();
    assert_eq!(snapshot.len(), 24);
    for pair in snapshot.chunks(2) {
        assert_eq!(pair[0].source, pair[1].source, "documents are appended whole");
        assert!(pair[0].content.starts_with("paragraph one"));
    }
}
