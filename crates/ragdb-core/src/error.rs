use thiserror::Error;

use crate::types::IndexKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Corpus-level integrity failure while building indexes. Fatal at
    /// startup: an empty index must never be produced silently.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// An embedding vector's length disagrees with the index dimension.
    /// Fatal at build time; at query time the query is rejected.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A query text an index backend could not tokenize. The built-in
    /// lexical indexes never produce this (a query normalizing to zero
    /// tokens simply matches nothing); the variant is for backends with
    /// fallible analyzers.
    #[error("query produced no tokens: {0:?}")]
    QueryTokenization(String),

    /// One index backend could not serve the query. Recoverable: the
    /// ensemble proceeds with the remaining indexes.
    #[error("{kind:?} index unavailable: {reason}")]
    RetrieverUnavailable { kind: IndexKind, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
