//! `HybridEngine`: builds every enabled index over a corpus snapshot and
//! orchestrates query → ensemble → fusion → rerank → passages.
//!
//! Indexes are built once and never mutated, so concurrent queries need
//! no locking; each `search` call is stateless given the built indexes.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use ragdb_core::chunker::Chunker;
use ragdb_core::config::RetrievalConfig;
use ragdb_core::error::{Error, Result};
use ragdb_core::traits::{CandidateSource, Embedder, PairScorer, QueryContext};
use ragdb_core::types::{
    Chunk, ChunkId, Document, IndexKind, Passage, RankedResult, ScoredCandidate,
};
use ragdb_lexical::{Bm25Index, TfidfIndex};
use ragdb_vector::DenseIndex;

use crate::fusion::{fuse, RankedList};
use crate::rerank::Reranker;

/// One query's results plus its degradation facts.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Descending final score; ties keep fusion order.
    pub results: Vec<RankedResult>,
    /// Reranker pairs that failed scoring and were dropped.
    pub dropped_pairs: usize,
    /// True when the embedding collaborator was unavailable and the query
    /// ran over the lexical indexes alone.
    pub lexical_only: bool,
    /// True when the caller's deadline cut reranking short.
    pub timed_out: bool,
}

pub struct HybridEngine {
    chunks: Vec<Chunk>,
    by_id: HashMap<ChunkId, usize>,
    sources: Vec<Box<dyn CandidateSource>>,
    embedder: Option<Arc<dyn Embedder>>,
    reranker: Reranker,
    config: RetrievalConfig,
}

impl HybridEngine {
    /// Chunk the corpus and build every enabled index. Fatal on an empty
    /// or token-free corpus and on embedding shape disagreements; a
    /// silently empty index is never produced.
    pub fn build(
        documents: &[Document],
        embedder: Option<Arc<dyn Embedder>>,
        scorer: Arc<dyn PairScorer>,
        config: RetrievalConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chunks = Chunker::new(&config.chunking)?.split(documents);
        if chunks.is_empty() {
            return Err(Error::IndexBuild("corpus produced no chunks".into()));
        }
        info!(documents = documents.len(), chunks = chunks.len(), "chunked corpus");

        let mut sources: Vec<Box<dyn CandidateSource>> = Vec::new();
        if config.lexical.bm25 {
            sources.push(Box::new(Bm25Index::build(&chunks, &config.bm25)?));
        }
        if config.lexical.tfidf {
            sources.push(Box::new(TfidfIndex::build(&chunks)?));
        }
        if let Some(embedder) = &embedder {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            let embeddings = embedder
                .embed_batch(&texts)
                .map_err(|e| Error::IndexBuild(format!("corpus embedding failed: {e}")))?;
            sources.push(Box::new(DenseIndex::build(&chunks, embeddings, config.similarity)?));
        }
        if sources.is_empty() {
            return Err(Error::IndexBuild("no index enabled in configuration".into()));
        }
        let kinds: Vec<IndexKind> = sources.iter().map(|s| s.kind()).collect();
        info!(?kinds, "indexes built");

        let by_id = chunks.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        let reranker = Reranker::new(scorer, &config.rerank);
        Ok(Self { chunks, by_id, sources, embedder, reranker, config })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The single operational entry point: top-`final_k` passages for the
    /// prompt-assembly layer, best first.
    pub fn search(&self, query: &str, final_k: usize) -> Result<Vec<Passage>> {
        let outcome = self.retrieve(query, final_k, None)?;
        Ok(outcome.results.into_iter().map(|r| Passage::from(r.chunk)).collect())
    }

    /// `search` with a caller-supplied deadline, propagated to the
    /// reranker (the only step expected to sit on the network).
    pub fn search_with_deadline(
        &self,
        query: &str,
        final_k: usize,
        deadline: Instant,
    ) -> Result<Vec<Passage>> {
        let outcome = self.retrieve(query, final_k, Some(deadline))?;
        Ok(outcome.results.into_iter().map(|r| Passage::from(r.chunk)).collect())
    }

    /// Newline-join passage texts in rank order for prompt assembly.
    pub fn format_context(passages: &[Passage]) -> String {
        passages.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }

    /// Full pipeline with scores and degradation facts exposed.
    pub fn retrieve(
        &self,
        query: &str,
        final_k: usize,
        deadline: Option<Instant>,
    ) -> Result<SearchOutcome> {
        if final_k == 0 {
            return Ok(SearchOutcome {
                results: Vec::new(),
                dropped_pairs: 0,
                lexical_only: false,
                timed_out: false,
            });
        }
        let overfetch = final_k.max(self.config.fusion.overfetch_k);

        // Embed the query once; on failure degrade to lexical-only
        // retrieval when configured to, instead of failing the query.
        let mut lexical_only = false;
        let embedding: Option<Vec<f32>> = match &self.embedder {
            Some(embedder) => match embedder.embed(query) {
                Ok(vector) => Some(vector),
                Err(error) => {
                    if !self.config.lexical_fallback {
                        return Err(Error::RetrieverUnavailable {
                            kind: IndexKind::Dense,
                            reason: error.to_string(),
                        });
                    }
                    warn!(%error, "embedder unavailable; degrading to lexical-only retrieval");
                    lexical_only = true;
                    None
                }
            },
            None => None,
        };

        let ctx = QueryContext { text: query, embedding: embedding.as_deref() };
        let lists = self.dispatch(ctx, overfetch)?;
        debug!(lists = lists.len(), overfetch, "index dispatch complete");

        let mut fused = fuse(&lists, f64::from(self.config.fusion.rrf_k));
        fused.truncate(overfetch);
        debug!(candidates = fused.len(), "fusion complete");

        let candidates: Vec<Chunk> = fused
            .iter()
            .filter_map(|f| self.by_id.get(&f.id).map(|&i| self.chunks[i].clone()))
            .collect();
        let outcome = self.reranker.rerank(query, candidates, final_k, deadline);
        let timed_out = outcome.unscored > 0;
        if outcome.dropped > 0 {
            debug!(dropped = outcome.dropped, "rerank dropped failed pairs");
        }

        // Deadline expired before anything was scored: fall back to the
        // fused order rather than returning nothing.
        let results = if outcome.ranked.is_empty() && timed_out {
            warn!("deadline expired before any rerank batch; returning fused order");
            fused
                .iter()
                .take(final_k)
                .filter_map(|f| {
                    self.by_id.get(&f.id).map(|&i| RankedResult {
                        chunk: self.chunks[i].clone(),
                        score: f.score as f32,
                    })
                })
                .collect()
        } else {
            outcome.ranked
        };

        debug!(results = results.len(), "search complete");
        Ok(SearchOutcome { results, dropped_pairs: outcome.dropped, lexical_only, timed_out })
    }

    /// Query every index concurrently; a failing index is logged and
    /// skipped so one backend cannot take the whole query down. Fails
    /// only when every index failed.
    fn dispatch(&self, ctx: QueryContext<'_>, k: usize) -> Result<Vec<RankedList>> {
        let joined: Vec<(IndexKind, Result<Vec<ScoredCandidate>>)> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .sources
                .iter()
                .map(|source| {
                    let kind = source.kind();
                    (kind, scope.spawn(move || source.query(&ctx, k)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(kind, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(Error::RetrieverUnavailable {
                            kind,
                            reason: "index query thread panicked".into(),
                        })
                    });
                    (kind, result)
                })
                .collect()
        });

        let mut lists = Vec::with_capacity(joined.len());
        let mut last_error = None;
        for (kind, result) in joined {
            match result {
                Ok(candidates) => lists.push(RankedList {
                    kind,
                    weight: self.config.fusion.weight(kind),
                    candidates,
                }),
                Err(error) => {
                    warn!(index = ?kind, %error, "index unavailable for this query; continuing");
                    last_error = Some(error);
                }
            }
        }
        match (lists.is_empty(), last_error) {
            (true, Some(error)) => Err(error),
            (true, None) => Err(Error::IndexBuild("no index available".into())),
            (false, _) => Ok(lists),
        }
    }
}
