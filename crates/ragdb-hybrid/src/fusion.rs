//! Weighted Reciprocal Rank Fusion: score = Σ weight_i / (rrf_k + rank_i)
//!
//! Combines independently-ranked lists into one consensus ranking without
//! normalizing the incompatible score scales of the underlying indexes.

use std::collections::{HashMap, HashSet};

use ragdb_core::types::{ChunkId, IndexKind, ScoredCandidate};

/// One index's contribution to fusion: its kind, configured weight, and
/// ranked candidate list (best first).
#[derive(Debug, Clone)]
pub struct RankedList {
    pub kind: IndexKind,
    pub weight: f32,
    pub candidates: Vec<ScoredCandidate>,
}

/// A chunk's aggregate standing after fusion.
#[derive(Debug, Clone)]
pub struct FusedCandidate {
    pub id: ChunkId,
    pub score: f64,
}

/// Fuse ranked lists. Every list contributes `weight / (rrf_k + rank)`
/// (rank is 1-based) for each chunk it returned; a chunk returned by
/// several lists accumulates all contributions but appears once. Absence
/// from a list contributes nothing; it is not a penalty. Ties are broken
/// by the order the lists were supplied, then by rank within a list, so
/// fusion is deterministic for a fixed index configuration.
pub fn fuse(lists: &[RankedList], rrf_k: f64) -> Vec<FusedCandidate> {
    // id -> (aggregate score, first-seen order for stable tie-breaks)
    let mut scores: HashMap<ChunkId, (f64, usize)> = HashMap::new();
    let mut first_seen = 0usize;

    for list in lists {
        let mut seen_in_list: HashSet<&str> = HashSet::with_capacity(list.candidates.len());
        for (rank, candidate) in list.candidates.iter().enumerate() {
            // A malformed list repeating a chunk id must not double-count.
            if !seen_in_list.insert(candidate.id.as_str()) {
                continue;
            }
            let contribution = f64::from(list.weight) / (rrf_k + rank as f64 + 1.0);
            match scores.get_mut(&candidate.id) {
                Some(entry) => entry.0 += contribution,
                None => {
                    scores.insert(candidate.id.clone(), (contribution, first_seen));
                    first_seen += 1;
                }
            }
        }
    }

    let mut fused: Vec<(ChunkId, f64, usize)> =
        scores.into_iter().map(|(id, (score, order))| (id, score, order)).collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.2.cmp(&b.2))
    });
    fused.into_iter().map(|(id, score, _)| FusedCandidate { id, score }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, kind: IndexKind) -> ScoredCandidate {
        ScoredCandidate { id: id.to_string(), score: 0.0, index: kind }
    }

    fn list(kind: IndexKind, weight: f32, ids: &[&str]) -> RankedList {
        RankedList {
            kind,
            weight,
            candidates: ids.iter().map(|id| candidate(id, kind)).collect(),
        }
    }

    #[test]
    fn consensus_first_place_wins() {
        let lists = vec![
            list(IndexKind::Bm25, 1.0, &["a", "b", "c"]),
            list(IndexKind::Tfidf, 1.0, &["a", "c", "b"]),
            list(IndexKind::Dense, 1.0, &["a", "b"]),
        ];
        let fused = fuse(&lists, 60.0);
        assert_eq!(fused[0].id, "a");
        // Rank #1 in all three lists is the maximum attainable score.
        let max_score = 3.0 / 61.0;
        assert!((fused[0].score - max_score).abs() < 1e-12);
    }

    #[test]
    fn single_list_member_survives_fusion() {
        let lists = vec![
            list(IndexKind::Bm25, 1.0, &["a", "b"]),
            list(IndexKind::Dense, 1.0, &["a", "z"]),
        ];
        let fused = fuse(&lists, 60.0);
        assert!(fused.iter().any(|f| f.id == "z"));
    }

    #[test]
    fn shared_chunks_accumulate_without_duplication() {
        let lists = vec![
            list(IndexKind::Bm25, 1.0, &["a"]),
            list(IndexKind::Dense, 1.0, &["a"]),
        ];
        let fused = fuse(&lists, 60.0);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 2.0 / 61.0).abs() < 1e-12);
    }

    #[test]
    fn weights_shift_the_consensus() {
        let lists = vec![
            list(IndexKind::Bm25, 0.1, &["lexical_pick"]),
            list(IndexKind::Dense, 10.0, &["dense_pick"]),
        ];
        let fused = fuse(&lists, 60.0);
        assert_eq!(fused[0].id, "dense_pick");
    }

    #[test]
    fn ties_follow_list_configuration_order() {
        let lists = vec![
            list(IndexKind::Bm25, 1.0, &["from_bm25"]),
            list(IndexKind::Dense, 1.0, &["from_dense"]),
        ];
        let fused = fuse(&lists, 60.0);
        // Identical contributions; the earlier-configured index wins.
        assert_eq!(fused[0].id, "from_bm25");
        assert_eq!(fused[1].id, "from_dense");
    }

    #[test]
    fn duplicate_ids_within_one_list_count_once() {
        let lists = vec![list(IndexKind::Bm25, 1.0, &["a", "a", "b"])];
        let fused = fuse(&lists, 60.0);
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - 1.0 / 61.0).abs() < 1e-12);
    }
}
