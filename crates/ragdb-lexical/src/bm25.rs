//! BM25 inverted index with tunable `k1`/`b`.
//!
//! Query cost is bounded to the union of the posting lists the query
//! terms touch: chunks sharing no term with the query are never scored.

use std::collections::HashMap;

use ragdb_core::config::Bm25Params;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{CandidateSource, QueryContext};
use ragdb_core::types::{Chunk, ChunkId, IndexKind, ScoredCandidate};

use crate::tokenize::tokenize;
use crate::{build_postings, count_terms, top_k, Posting};

pub struct Bm25Index {
    postings: HashMap<String, Vec<Posting>>,
    ids: Vec<ChunkId>,
    lengths: Vec<u32>,
    avg_len: f32,
    k1: f32,
    b: f32,
}

impl Bm25Index {
    pub fn build(chunks: &[Chunk], params: &Bm25Params) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::IndexBuild("bm25: corpus contains no chunks".into()));
        }
        let counted = count_terms(chunks);
        let (postings, lengths) = build_postings(&counted);
        if postings.is_empty() {
            return Err(Error::IndexBuild("bm25: corpus contains no indexable tokens".into()));
        }
        let avg_len = lengths.iter().sum::<u32>() as f32 / lengths.len() as f32;
        Ok(Self {
            postings,
            ids: chunks.iter().map(|c| c.id.clone()).collect(),
            lengths,
            avg_len: avg_len.max(1.0),
            k1: params.k1,
            b: params.b,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Top-`k` chunks by BM25, descending; ties broken by insertion order.
    /// A query that normalizes to zero tokens matches nothing.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
        let terms = tokenize(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let total = self.ids.len() as f32;
        let mut accumulated: HashMap<u32, f32> = HashMap::new();
        for term in &terms {
            let Some(list) = self.postings.get(term) else { continue };
            let df = list.len() as f32;
            // Always-positive idf variant, so common terms cannot
            // subtract from a chunk's score.
            let idf = (1.0 + (total - df + 0.5) / (df + 0.5)).ln();
            for posting in list {
                let tf = posting.tf as f32;
                let len_norm = 1.0 - self.b
                    + self.b * self.lengths[posting.chunk as usize] as f32 / self.avg_len;
                let gain = idf * tf * (self.k1 + 1.0) / (tf + self.k1 * len_norm);
                *accumulated.entry(posting.chunk).or_default() += gain;
            }
        }
        Ok(top_k(accumulated, &self.ids, k, IndexKind::Bm25))
    }
}

impl CandidateSource for Bm25Index {
    fn kind(&self) -> IndexKind {
        IndexKind::Bm25
    }

    fn query(&self, ctx: &QueryContext<'_>, k: usize) -> Result<Vec<ScoredCandidate>> {
        Bm25Index::query(self, ctx.text, k)
    }
}
