//! Cross-encoder style reranking over fused candidates.
//!
//! Pairs are scored in batches to amortize the external model's fixed
//! overhead. A failed pair is dropped and logged, never fatal. An
//! optional caller deadline is checked between batches; expiry aborts
//! the remainder and ranks whatever was already scored.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use ragdb_core::config::{Activation, RerankConfig};
use ragdb_core::traits::PairScorer;
use ragdb_core::types::{Chunk, RankedResult};

/// Result of one rerank call. `dropped` counts pairs whose scoring call
/// failed; `unscored` counts pairs skipped after the deadline expired.
#[derive(Debug)]
pub struct RerankOutcome {
    pub ranked: Vec<RankedResult>,
    pub dropped: usize,
    pub unscored: usize,
}

pub struct Reranker {
    scorer: Arc<dyn PairScorer>,
    batch_size: usize,
    activation: Activation,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairScorer>, config: &RerankConfig) -> Self {
        Self { scorer, batch_size: config.batch_size.max(1), activation: config.activation }
    }

    /// Score every (query, candidate) pair, sort descending, keep `top_k`.
    ///
    /// Candidates arrive in fusion order; equal scores keep that order
    /// (stable sort), so permuting equally-scored input cannot reorder
    /// output beyond its fusion ranks.
    pub fn rerank(
        &self,
        query: &str,
        candidates: Vec<Chunk>,
        top_k: usize,
        deadline: Option<Instant>,
    ) -> RerankOutcome {
        let total = candidates.len();
        let mut scored: Vec<(Chunk, f32)> = Vec::with_capacity(total);
        let mut dropped = 0usize;
        let mut unscored = 0usize;

        let mut remaining = candidates;
        while !remaining.is_empty() {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                unscored = remaining.len();
                warn!(unscored, "rerank deadline expired; aborting remaining batches");
                break;
            }
            let take = self.batch_size.min(remaining.len());
            let batch: Vec<Chunk> = remaining.drain(..take).collect();
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let mut results = self.scorer.score_batch(query, &texts).into_iter();
            for chunk in batch {
                match results.next() {
                    Some(Ok(raw)) => scored.push((chunk, self.activate(raw))),
                    Some(Err(error)) => {
                        dropped += 1;
                        warn!(chunk = %chunk.id, %error, "pair scoring failed; dropping candidate");
                    }
                    None => {
                        dropped += 1;
                        warn!(chunk = %chunk.id, "scorer returned too few scores; dropping candidate");
                    }
                }
            }
        }

        // Stable sort: ties keep fusion order.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        RerankOutcome {
            ranked: scored.into_iter().map(|(chunk, score)| RankedResult { chunk, score }).collect(),
            dropped,
            unscored,
        }
    }

    /// Monotonic, so relative order is unaffected either way.
    fn activate(&self, raw: f32) -> f32 {
        match self.activation {
            Activation::Raw => raw,
            Activation::Sigmoid => 1.0 / (1.0 + (-raw).exp()),
        }
    }
}
