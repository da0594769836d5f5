//! ragdb-embed
//!
//! Local, deterministic implementations of the engine's external model
//! capabilities. `HashEmbedder` buckets token hashes into a fixed-dim
//! unit-norm vector; `OverlapScorer` approximates a cross-encoder with
//! query/passage term overlap. Both exist so the engine, CLI, and tests
//! run fully offline; production deployments provide model-backed
//! `Embedder`/`PairScorer` implementations instead.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use twox_hash::XxHash64;

use ragdb_core::traits::{Embedder, PairScorer};

pub const DEFAULT_DIM: usize = 256;

/// Hash-bucket embedder: every token lands in `hash % dim`, the vector is
/// L2-normalized. Same text always maps to the same vector.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dim];
        for token in tokens(text) {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let hashed = hasher.finish();
            let idx = (hashed as usize) % self.dim;
            vector[idx] += (((hashed >> 32) as u32) as f32) / (u32::MAX as f32) + 0.5;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut vector {
            *x /= norm;
        }
        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl Embedder for HashEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

/// Pairwise relevance stand-in: the fraction of query tokens present in
/// the passage. Monotone in term overlap, range `[0, 1]`.
pub struct OverlapScorer;

impl PairScorer for OverlapScorer {
    fn score_batch(&self, query: &str, passages: &[String]) -> Vec<anyhow::Result<f32>> {
        let query_tokens: Vec<String> = tokens(query).collect();
        passages
            .iter()
            .map(|passage| {
                let passage_tokens: HashSet<String> = tokens(passage).collect();
                let hits = query_tokens.iter().filter(|t| passage_tokens.contains(*t)).count();
                Ok(hits as f32 / query_tokens.len().max(1) as f32)
            })
            .collect()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}
