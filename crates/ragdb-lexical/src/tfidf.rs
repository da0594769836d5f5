//! TF-IDF cosine index.
//!
//! Deliberately kept separate from BM25: no tf saturation and no length
//! normalization, so rare discriminative terms weigh in harder. The two
//! indexes give the ensemble complementary lexical recall profiles.

use std::collections::HashMap;

use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{CandidateSource, QueryContext};
use ragdb_core::types::{Chunk, ChunkId, IndexKind, ScoredCandidate};

use crate::tokenize::tokenize;
use crate::{build_postings, count_terms, top_k, Posting};

pub struct TfidfIndex {
    postings: HashMap<String, Vec<Posting>>,
    idf: HashMap<String, f32>,
    ids: Vec<ChunkId>,
    /// Euclidean norm of each chunk's tf-idf vector, precomputed at build.
    norms: Vec<f32>,
}

impl TfidfIndex {
    pub fn build(chunks: &[Chunk]) -> Result<Self> {
        if chunks.is_empty() {
            return Err(Error::IndexBuild("tfidf: corpus contains no chunks".into()));
        }
        let counted = count_terms(chunks);
        let (postings, _lengths) = build_postings(&counted);
        if postings.is_empty() {
            return Err(Error::IndexBuild("tfidf: corpus contains no indexable tokens".into()));
        }

        let total = chunks.len() as f32;
        let idf: HashMap<String, f32> = postings
            .iter()
            .map(|(term, list)| {
                // Smoothed idf, strictly positive even for ubiquitous terms.
                (term.clone(), ((1.0 + total) / (1.0 + list.len() as f32)).ln() + 1.0)
            })
            .collect();

        let mut norms = vec![0.0f32; chunks.len()];
        for (term, list) in &postings {
            let term_idf = idf[term];
            for posting in list {
                let weight = posting.tf as f32 * term_idf;
                norms[posting.chunk as usize] += weight * weight;
            }
        }
        for norm in &mut norms {
            *norm = norm.sqrt().max(f32::EPSILON);
        }

        Ok(Self { postings, idf, ids: chunks.iter().map(|c| c.id.clone()).collect(), norms })
    }

    /// Top-`k` chunks by cosine similarity between the query's tf-idf
    /// vector and each chunk's, over chunks sharing at least one term.
    /// A query that normalizes to zero tokens matches nothing.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredCandidate>> {
        let terms = tokenize(text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_tf: HashMap<&str, u32> = HashMap::new();
        for term in &terms {
            *query_tf.entry(term.as_str()).or_default() += 1;
        }

        let mut query_norm = 0.0f32;
        let mut accumulated: HashMap<u32, f32> = HashMap::new();
        for (term, tf) in &query_tf {
            let Some(term_idf) = self.idf.get(*term) else { continue };
            let query_weight = *tf as f32 * term_idf;
            query_norm += query_weight * query_weight;
            if let Some(list) = self.postings.get(*term) {
                for posting in list {
                    let chunk_weight = posting.tf as f32 * term_idf;
                    *accumulated.entry(posting.chunk).or_default() += query_weight * chunk_weight;
                }
            }
        }
        let query_norm = query_norm.sqrt().max(f32::EPSILON);
        for (ordinal, dot) in accumulated.iter_mut() {
            *dot /= query_norm * self.norms[*ordinal as usize];
        }
        Ok(top_k(accumulated, &self.ids, k, IndexKind::Tfidf))
    }
}

impl CandidateSource for TfidfIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Tfidf
    }

    fn query(&self, ctx: &QueryContext<'_>, k: usize) -> Result<Vec<ScoredCandidate>> {
        TfidfIndex::query(self, ctx.text, k)
    }
}
