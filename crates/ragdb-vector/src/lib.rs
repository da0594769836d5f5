//! ragdb-vector
//!
//! In-memory dense vector index. Embeddings are produced by an external
//! collaborator and supplied 1:1 with chunks at build time; the index
//! only stores and scores them. Whole-corpus rebuilds, no persistence.

use std::cmp::Ordering;

use ragdb_core::config::Similarity;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{CandidateSource, QueryContext};
use ragdb_core::types::{Chunk, ChunkId, IndexKind, ScoredCandidate};

pub struct DenseIndex {
    dim: usize,
    /// Row-major `ids.len() x dim` embedding matrix.
    data: Vec<f32>,
    /// Row norms, precomputed for cosine scoring.
    norms: Vec<f32>,
    ids: Vec<ChunkId>,
    metric: Similarity,
}

impl DenseIndex {
    /// Build from an order-preserving 1:1 chunk/embedding correspondence.
    /// The first vector fixes the index dimension; any disagreement is a
    /// build-time `DimensionMismatch`, before any query is served.
    pub fn build(chunks: &[Chunk], embeddings: Vec<Vec<f32>>, metric: Similarity) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::IndexBuild("dense: corpus contains no chunks".into()));
        }
        if embeddings.len() != chunks.len() {
            return Err(Error::IndexBuild(format!(
                "dense: {} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }
        let dim = embeddings[0].len();
        if dim == 0 {
            return Err(Error::IndexBuild("dense: zero-dimension embeddings".into()));
        }
        for vector in &embeddings {
            if vector.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, got: vector.len() });
            }
        }

        let mut data = Vec::with_capacity(chunks.len() * dim);
        let mut norms = Vec::with_capacity(chunks.len());
        for vector in &embeddings {
            let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
            norms.push(norm.max(f32::EPSILON));
            data.extend_from_slice(vector);
        }

        Ok(Self { dim, data, norms, ids: chunks.iter().map(|c| c.id.clone()).collect(), metric })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Top-`k` chunks by similarity to `query`, descending; ties broken
    /// by chunk insertion order.
    pub fn query_vec(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>> {
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, got: query.len() });
        }
        let query_norm = query.iter().map(|x| x * x).sum::<f32>().sqrt().max(f32::EPSILON);

        let mut scored: Vec<(u32, f32)> = Vec::with_capacity(self.ids.len());
        for row in 0..self.ids.len() {
            let offset = row * self.dim;
            let dot: f32 = self.data[offset..offset + self.dim]
                .iter()
                .zip(query)
                .map(|(a, b)| a * b)
                .sum();
            let score = match self.metric {
                Similarity::Cosine => dot / (self.norms[row] * query_norm),
                Similarity::Dot => dot,
            };
            scored.push((row as u32, score));
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
        });
        scored.truncate(k);
        Ok(scored
            .into_iter()
            .map(|(row, score)| ScoredCandidate {
                id: self.ids[row as usize].clone(),
                score,
                index: IndexKind::Dense,
            })
            .collect())
    }
}

impl CandidateSource for DenseIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Dense
    }

    fn query(&self, ctx: &QueryContext<'_>, k: usize) -> Result<Vec<ScoredCandidate>> {
        let embedding = ctx.embedding.ok_or_else(|| Error::RetrieverUnavailable {
            kind: IndexKind::Dense,
            reason: "no query embedding available".into(),
        })?;
        self.query_vec(embedding, k)
    }
}
