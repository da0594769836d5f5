use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ragdb_core::config::RetrievalConfig;
use ragdb_core::error::Error;
use ragdb_core::traits::{Embedder, PairScorer};
use ragdb_core::types::{Chunk, Document};
use ragdb_embed::{HashEmbedder, OverlapScorer};
use ragdb_hybrid::{HybridEngine, Reranker};

fn corpus() -> Vec<Document> {
    vec![
        Document::new("a.txt", 1, "pho recipe with rice noodles and fresh herbs"),
        Document::new("b.txt", 1, "pho broth simmered with beef bones and spices"),
        Document::new("c.txt", 1, "the sky is blue above the quiet mountains"),
    ]
}

fn engine_with_defaults() -> HybridEngine {
    HybridEngine::build(
        &corpus(),
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build")
}

/// Succeeds for the corpus-embedding call, fails for every later call.
/// Models an embedding service that goes down after startup.
struct FailAfterBuildEmbedder {
    inner: HashEmbedder,
    calls: AtomicUsize,
}

impl FailAfterBuildEmbedder {
    fn new() -> Self {
        Self { inner: HashEmbedder::default(), calls: AtomicUsize::new(0) }
    }
}

impl Embedder for FailAfterBuildEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.embed_batch(texts)
        } else {
            Err(anyhow::anyhow!("embedding service unreachable"))
        }
    }
}

/// Returns vectors of inconsistent width, as a misbehaving embedding
/// collaborator would.
struct RaggedEmbedder;

impl Embedder for RaggedEmbedder {
    fn dim(&self) -> usize {
        768
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, _)| if i == 0 { vec![0.1; 768] } else { vec![0.1; 384] })
            .collect())
    }
}

/// Fails every pair whose passage contains the marker token.
struct MarkerFailScorer;

impl PairScorer for MarkerFailScorer {
    fn score_batch(&self, query: &str, passages: &[String]) -> Vec<anyhow::Result<f32>> {
        let _ = query;
        passages
            .iter()
            .map(|p| {
                if p.contains("broth") {
                    Err(anyhow::anyhow!("scoring backend rejected pair"))
                } else {
                    Ok(p.len() as f32)
                }
            })
            .collect()
    }
}

/// Sleeps per batch so deadline expiry is observable.
struct SlowScorer;

impl PairScorer for SlowScorer {
    fn score_batch(&self, _query: &str, passages: &[String]) -> Vec<anyhow::Result<f32>> {
        std::thread::sleep(Duration::from_millis(50));
        passages.iter().map(|p| Ok(p.len() as f32)).collect()
    }
}

fn chunk(id: &str, text: &str) -> Chunk {
    Chunk {
        id: id.to_string(),
        source: "test.txt".to_string(),
        page: 1,
        offset: 0,
        text: text.to_string(),
        chunk_index: 0,
    }
}

#[test]
fn end_to_end_pho_recipe_example() {
    let engine = engine_with_defaults();
    let passages = engine.search("pho recipe", 2).expect("search");
    assert_eq!(passages.len(), 2);
    assert_eq!(passages[0].source, "a.txt", "both query terms outrank one");
    assert_eq!(passages[1].source, "b.txt");
    assert!(passages.iter().all(|p| p.source != "c.txt"));
}

#[test]
fn repeated_searches_are_idempotent() {
    let engine = engine_with_defaults();
    let first = engine.search("pho broth spices", 3).expect("search");
    let second = engine.search("pho broth spices", 3).expect("search");
    let sources_a: Vec<_> = first.iter().map(|p| p.source.as_str()).collect();
    let sources_b: Vec<_> = second.iter().map(|p| p.source.as_str()).collect();
    assert_eq!(sources_a, sources_b);
    assert_eq!(
        first.iter().map(|p| p.text.as_str()).collect::<Vec<_>>(),
        second.iter().map(|p| p.text.as_str()).collect::<Vec<_>>()
    );
}

#[test]
fn build_rejects_empty_corpus() {
    let result = HybridEngine::build(
        &[],
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    );
    assert!(matches!(result, Err(Error::IndexBuild(_))));
}

#[test]
fn inconsistent_embedding_dims_fail_at_build_not_query() {
    let result = HybridEngine::build(
        &corpus(),
        Some(Arc::new(RaggedEmbedder)),
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    );
    assert!(matches!(result, Err(Error::DimensionMismatch { expected: 768, got: 384 })));
}

#[test]
fn embedder_outage_degrades_to_lexical_only() {
    let engine = HybridEngine::build(
        &corpus(),
        Some(Arc::new(FailAfterBuildEmbedder::new())),
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build");
    let outcome = engine.retrieve("pho recipe", 2, None).expect("lexical-only retrieval");
    assert!(outcome.lexical_only);
    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.results[0].chunk.source, "a.txt");
}

#[test]
fn embedder_outage_is_fatal_when_fallback_disabled() {
    let mut config = RetrievalConfig::default();
    config.lexical_fallback = false;
    let engine = HybridEngine::build(
        &corpus(),
        Some(Arc::new(FailAfterBuildEmbedder::new())),
        Arc::new(OverlapScorer),
        config,
    )
    .expect("engine build");
    assert!(matches!(
        engine.retrieve("pho recipe", 2, None),
        Err(Error::RetrieverUnavailable { .. })
    ));
}

#[test]
fn failed_pairs_are_dropped_not_fatal() {
    let engine = HybridEngine::build(
        &corpus(),
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(MarkerFailScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build");
    let outcome = engine.retrieve("pho recipe broth", 3, None).expect("retrieve");
    assert_eq!(outcome.dropped_pairs, 1, "the broth chunk fails scoring");
    assert!(outcome.results.iter().all(|r| !r.chunk.text.contains("broth")));
    assert!(!outcome.results.is_empty());
}

#[test]
fn expired_deadline_falls_back_to_fused_order() {
    let engine = HybridEngine::build(
        &corpus(),
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(SlowScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build");
    let outcome = engine.retrieve("pho recipe", 2, Some(Instant::now())).expect("retrieve");
    assert!(outcome.timed_out);
    assert_eq!(outcome.results.len(), 2, "fused order stands in for rerank");
}

#[test]
fn mid_flight_deadline_returns_already_scored_candidates() {
    let mut config = RetrievalConfig::default();
    config.rerank.batch_size = 1;
    let documents: Vec<Document> = (0..5)
        .map(|i| Document::new(format!("d{i}.txt"), 1, format!("pho dish variant number {i}")))
        .collect();
    let engine = HybridEngine::build(
        &documents,
        Some(Arc::new(HashEmbedder::default())),
        Arc::new(SlowScorer),
        config,
    )
    .expect("engine build");
    let deadline = Instant::now() + Duration::from_millis(75);
    let outcome = engine.retrieve("pho dish", 5, Some(deadline)).expect("retrieve");
    assert!(outcome.timed_out);
    assert!(!outcome.results.is_empty());
    assert!(outcome.results.len() < 5, "unscored candidates are not ranked");
}

#[test]
fn rerank_order_is_invariant_under_input_permutation() {
    let reranker =
        Reranker::new(Arc::new(OverlapScorer), &RetrievalConfig::default().rerank);
    let candidates = vec![
        chunk("low", "nothing relevant here at all"),
        chunk("high", "pho recipe pho recipe noodles"),
        chunk("mid", "a pho mention only"),
    ];
    let mut reversed = candidates.clone();
    reversed.reverse();

    let forward = reranker.rerank("pho recipe", candidates, 3, None);
    let backward = reranker.rerank("pho recipe", reversed, 3, None);
    let ids_f: Vec<_> = forward.ranked.iter().map(|r| r.chunk.id.as_str()).collect();
    let ids_b: Vec<_> = backward.ranked.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids_f, vec!["high", "mid", "low"]);
    assert_eq!(ids_f, ids_b);
}

#[test]
fn lexical_only_configuration_skips_dense_index() {
    let engine = HybridEngine::build(
        &corpus(),
        None,
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build");
    let passages = engine.search("pho recipe", 2).expect("search");
    assert_eq!(passages[0].source, "a.txt");
}

#[test]
fn punctuation_only_query_returns_empty_not_error() {
    let engine = HybridEngine::build(
        &corpus(),
        None,
        Arc::new(OverlapScorer),
        RetrievalConfig::default(),
    )
    .expect("engine build");
    let passages = engine.search("?!", 3).expect("search");
    assert!(passages.is_empty());
}

#[test]
fn format_context_joins_in_rank_order() {
    let engine = engine_with_defaults();
    let passages = engine.search("pho recipe", 2).expect("search");
    let context = HybridEngine::format_context(&passages);
    let first = context.find("recipe").expect("first passage present");
    let second = context.find("broth").expect("second passage present");
    assert!(first < second);
    assert!(context.contains("\n\n"));
}

#[test]
fn zero_k_returns_empty() {
    let engine = engine_with_defaults();
    assert!(engine.search("pho", 0).expect("search").is_empty());
}
