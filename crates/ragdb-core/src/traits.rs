//! Capability seams between the engine and its external collaborators.
//!
//! The embedding model and the pairwise relevance model are external
//! services; the engine only knows them through `Embedder` and
//! `PairScorer`. `CandidateSource` is the internal seam every index
//! implements so the ensemble can treat them uniformly.

use crate::error::Result;
use crate::types::{IndexKind, ScoredCandidate};

/// External embedding capability: `embed(text) -> fixed-length vector`.
pub trait Embedder: Send + Sync {
    /// Output dimension of every vector this embedder produces.
    fn dim(&self) -> usize;

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// External pairwise relevance capability: `score(query, passage) -> float`.
///
/// Returns one result per passage, in order. A per-pair `Err` marks that
/// pair as unscorable without failing the rest of the batch. Absolute
/// score scale is irrelevant; only relative order within one call matters.
pub trait PairScorer: Send + Sync {
    fn score_batch(&self, query: &str, passages: &[String]) -> Vec<anyhow::Result<f32>>;
}

/// Query state prepared once per search and shared by every index.
///
/// `embedding` is `None` when the embedding collaborator was unavailable;
/// lexical indexes ignore it, the dense index reports itself unavailable.
#[derive(Debug, Clone, Copy)]
pub struct QueryContext<'a> {
    pub text: &'a str,
    pub embedding: Option<&'a [f32]>,
}

/// One retrieval signal consulted by the ensemble.
pub trait CandidateSource: Send + Sync {
    fn kind(&self) -> IndexKind;

    /// Top-`k` candidates by this index's own scoring, best first.
    fn query(&self, ctx: &QueryContext<'_>, k: usize) -> Result<Vec<ScoredCandidate>>;
}
