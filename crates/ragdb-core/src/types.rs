//! Domain types shared by the lexical, dense, and hybrid engines.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;

/// A source document with provenance. Immutable once created.
///
/// `page` is 1-based for paginated sources and 0 for sources without
/// page structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source: String,
    pub page: usize,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, page: usize, text: impl Into<String>) -> Self {
        Self { source: source.into(), page, text: text.into() }
    }
}

/// A contiguous slice of a `Document` that is independently indexed.
///
/// `id` is derived from `(source, page, offset range)` and is therefore
/// stable across rebuilds of the same corpus snapshot. `offset` and the
/// range inside `id` count characters within the parent document's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub source: String,
    pub page: usize,
    pub offset: usize,
    pub text: String,
    /// Position within the parent document, left to right.
    pub chunk_index: usize,
}

impl Chunk {
    pub fn chunk_id(source: &str, page: usize, start: usize, end: usize) -> ChunkId {
        format!("{source}:{page}:{start}-{end}")
    }
}

/// Identifies which index produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Bm25,
    Tfidf,
    Dense,
}

/// One entry of a single index's ranked candidate list.
///
/// `id` matches `Chunk::id`. `score` is index-specific and not comparable
/// across indexes, but higher is always better within one list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub id: ChunkId,
    pub score: f32,
    pub index: IndexKind,
}

/// A final (chunk, score) pair. Callers may rely on descending score with
/// ties broken by fusion rank.
#[derive(Debug, Clone)]
pub struct RankedResult {
    pub chunk: Chunk,
    pub score: f32,
}

/// The flat surface handed to the prompt-assembly layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source: String,
    pub page: usize,
}

impl From<Chunk> for Passage {
    fn from(chunk: Chunk) -> Self {
        Self { text: chunk.text, source: chunk.source, page: chunk.page }
    }
}
