//! ragdb-lexical
//!
//! In-memory inverted indexes over chunk tokens: BM25 (saturating tf with
//! length normalization) and TF-IDF cosine (rare-term biased, no length
//! normalization). Both share one tokenizer so corpus and query text are
//! normalized identically.

pub mod bm25;
pub mod tfidf;
pub mod tokenize;

pub use bm25::Bm25Index;
pub use tfidf::TfidfIndex;
pub use tokenize::tokenize;

use std::cmp::Ordering;
use std::collections::HashMap;

use rayon::prelude::*;

use ragdb_core::types::{Chunk, ChunkId, IndexKind, ScoredCandidate};

/// One posting: a chunk (by dense ordinal) and the term's frequency in it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Posting {
    pub chunk: u32,
    pub tf: u32,
}

/// Per-chunk term frequencies plus the chunk's token count.
pub(crate) type TermCounts = (Vec<(String, u32)>, u32);

/// Tokenize and count terms for every chunk. Chunks are processed in
/// parallel with independent accumulators; the caller merges them in
/// chunk order so posting lists stay sorted by insertion order.
pub(crate) fn count_terms(chunks: &[Chunk]) -> Vec<TermCounts> {
    chunks
        .par_iter()
        .map(|chunk| {
            let tokens = tokenize(&chunk.text);
            let len = tokens.len() as u32;
            let mut counts: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *counts.entry(token).or_default() += 1;
            }
            let mut counts: Vec<(String, u32)> = counts.into_iter().collect();
            counts.sort_unstable();
            (counts, len)
        })
        .collect()
}

/// Merge per-chunk counts into an inverted index. Posting lists end up
/// ordered by chunk insertion order.
pub(crate) fn build_postings(counted: &[TermCounts]) -> (HashMap<String, Vec<Posting>>, Vec<u32>) {
    let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
    let mut lengths = Vec::with_capacity(counted.len());
    for (ordinal, (counts, len)) in counted.iter().enumerate() {
        lengths.push(*len);
        for (term, tf) in counts {
            postings
                .entry(term.clone())
                .or_default()
                .push(Posting { chunk: ordinal as u32, tf: *tf });
        }
    }
    (postings, lengths)
}

/// Top-`k` accumulated scores, descending; ties broken by chunk insertion
/// order so results are deterministic.
pub(crate) fn top_k(
    accumulated: HashMap<u32, f32>,
    ids: &[ChunkId],
    k: usize,
    kind: IndexKind,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<(u32, f32)> = accumulated.into_iter().collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(k);
    scored
        .into_iter()
        .map(|(ordinal, score)| ScoredCandidate {
            id: ids[ordinal as usize].clone(),
            score,
            index: kind,
        })
        .collect()
}
