//! ragdb-hybrid
//!
//! The ensemble layer: weighted reciprocal-rank fusion over per-index
//! candidate lists, cross-encoder style reranking, and the `HybridEngine`
//! orchestrator that exposes `search(query, final_k)`.

pub mod engine;
pub mod fusion;
pub mod rerank;

pub use engine::{HybridEngine, SearchOutcome};
pub use fusion::{fuse, FusedCandidate, RankedList};
pub use rerank::{Reranker, RerankOutcome};
