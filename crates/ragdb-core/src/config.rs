//! Retrieval configuration.
//!
//! One immutable `RetrievalConfig` is built up front (from defaults, a
//! `config.toml` + `config.<env>.toml` merge, and `APP_*` env vars) and
//! passed by value into each component's constructor. Nothing in the
//! engine reads process-wide state.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::IndexKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters shared between consecutive chunks of one document.
    /// Must be smaller than `chunk_size`.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 300, chunk_overlap: 50 }
    }
}

/// BM25 tuning constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

/// Which lexical indexes participate in retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalConfig {
    pub bm25: bool,
    pub tfidf: bool,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self { bm25: true, tfidf: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    Cosine,
    Dot,
}

/// Per-index contribution weights for rank fusion. Equal by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    pub bm25: f32,
    pub tfidf: f32,
    pub dense: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self { bm25: 1.0, tfidf: 1.0, dense: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Reciprocal-rank smoothing constant. Higher values flatten the
    /// advantage of top ranks within any single list.
    pub rrf_k: f32,
    pub weights: FusionWeights,
    /// Per-index candidate count requested before fusion; the effective
    /// count is `max(final_k, overfetch_k)` so fusion always has room.
    pub overfetch_k: usize,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { rrf_k: 60.0, weights: FusionWeights::default(), overfetch_k: 10 }
    }
}

impl FusionConfig {
    pub fn weight(&self, kind: IndexKind) -> f32 {
        match kind {
            IndexKind::Bm25 => self.weights.bm25,
            IndexKind::Tfidf => self.weights.tfidf,
            IndexKind::Dense => self.weights.dense,
        }
    }
}

/// How raw pair-scorer outputs are interpreted. Both options are
/// monotonic, so the ranking is identical; the knob exists because
/// cross-encoders variously return logits or probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Raw,
    #[default]
    Sigmoid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankConfig {
    /// Pairs submitted per scoring call.
    pub batch_size: usize,
    pub activation: Activation,
}

impl Default for RerankConfig {
    fn default() -> Self {
        Self { batch_size: 16, activation: Activation::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunking: ChunkingConfig,
    pub bm25: Bm25Params,
    pub lexical: LexicalConfig,
    pub similarity: Similarity,
    pub fusion: FusionConfig,
    pub rerank: RerankConfig,
    /// Degrade to lexical-only retrieval when the embedding collaborator
    /// fails at query time, instead of failing the query.
    pub lexical_fallback: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            chunking: ChunkingConfig::default(),
            bm25: Bm25Params::default(),
            lexical: LexicalConfig::default(),
            similarity: Similarity::default(),
            fusion: FusionConfig::default(),
            rerank: RerankConfig::default(),
            lexical_fallback: true,
        }
    }
}

impl RetrievalConfig {
    /// Merge defaults, `config.toml`, the `RUST_ENV` overlay, and `APP_*`
    /// env vars (e.g. `APP_FUSION__RRF_K=30`).
    pub fn load() -> anyhow::Result<Self> {
        let env_name = std::env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment =
            Figment::from(Serialized::defaults(Self::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.bm25.k1 < 0.0 || !(0.0..=1.0).contains(&self.bm25.b) {
            return Err(Error::InvalidConfig("bm25 requires k1 >= 0 and 0 <= b <= 1".into()));
        }
        if self.rerank.batch_size == 0 {
            return Err(Error::InvalidConfig("rerank batch_size must be positive".into()));
        }
        Ok(())
    }
}
