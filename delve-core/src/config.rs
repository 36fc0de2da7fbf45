//! Configuration system for the Delve engine.
//!
//! Uses `figment` for layered configuration: built-in defaults -> `delve.toml`
//! in the working directory -> `DELVE_*` environment variables.

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Ceilings for a single research session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Maximum wall-clock time for the session, in milliseconds.
    pub max_time_ms: u64,
    /// Maximum retrieval API calls.
    pub max_api_calls: u64,
    /// Maximum tokens read from retrieved documents.
    pub max_tokens: u64,
    /// Maximum loop iterations.
    pub max_iterations: u64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_time_ms: 300_000,
            max_api_calls: 50,
            max_tokens: 100_000,
            max_iterations: 10,
        }
    }
}

/// Weights for combining the five relevance sub-scores.
///
/// `quality` weights the inverse of the bias score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub semantic: f64,
    pub topical: f64,
    pub temporal: f64,
    pub credibility: f64,
    pub quality: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            semantic: 0.3,
            topical: 0.25,
            temporal: 0.15,
            credibility: 0.2,
            quality: 0.1,
        }
    }
}

/// Scoring thresholds and weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub weights: ScoreWeights,
    /// Facts below this confidence spawn follow-up questions.
    pub question_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            question_threshold: 0.7,
        }
    }
}

/// Retrieval concurrency and resilience settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Concurrent retrieval calls per batch within one iteration.
    pub fan_out: usize,
    /// Pause between batches, to respect external rate limits.
    pub batch_pause_ms: u64,
    /// Capped same-engine retries per call.
    pub max_retries: u32,
    /// Per-call timeout ceiling; the effective deadline is the smaller of this
    /// and the session's remaining time budget.
    pub call_timeout_ms: u64,
    /// Shared requests-per-minute limit per backend (0 = unlimited).
    pub requests_per_minute: usize,
    /// Search terms dispatched per iteration (original query + top-N questions).
    pub terms_per_iteration: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            fan_out: 3,
            batch_pause_ms: 200,
            max_retries: 2,
            call_timeout_ms: 10_000,
            requests_per_minute: 60,
            terms_per_iteration: 3,
        }
    }
}

/// Capacity and promotion thresholds for the memory tiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Short-term ring buffer capacity.
    pub short_term_capacity: usize,
    /// Short-term item expiry, in seconds.
    pub short_term_max_age_secs: u64,
    /// Working-memory focus window size.
    pub working_capacity: usize,
    /// Promote short->long when importance exceeds this.
    pub promote_importance: f64,
    /// Promote short->long when access count exceeds this.
    pub promote_access_count: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            short_term_capacity: 50,
            short_term_max_age_secs: 3_600,
            working_capacity: 7,
            promote_importance: 0.6,
            promote_access_count: 3,
        }
    }
}

/// Default goal-completion thresholds.
///
/// Goal completion is a pluggable predicate on the orchestrator; these values
/// only parameterise the built-in fact-count heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalConfig {
    pub min_facts: usize,
    pub min_iterations: u64,
}

impl Default for GoalConfig {
    fn default() -> Self {
        Self {
            min_facts: 25,
            min_iterations: 3,
        }
    }
}

/// Top-level configuration for the Delve engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelveConfig {
    pub budget: BudgetConfig,
    pub scoring: ScoringConfig,
    pub retrieval: RetrievalConfig,
    pub memory: MemoryConfig,
    pub goal: GoalConfig,
    /// Embedding dimensionality for the vector index.
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,
}

// Manual impl: a derived Default would zero `embedding_dimensions`, since
// serde defaults only apply during deserialization.
impl Default for DelveConfig {
    fn default() -> Self {
        Self {
            budget: BudgetConfig::default(),
            scoring: ScoringConfig::default(),
            retrieval: RetrievalConfig::default(),
            memory: MemoryConfig::default(),
            goal: GoalConfig::default(),
            embedding_dimensions: default_embedding_dimensions(),
        }
    }
}

fn default_embedding_dimensions() -> usize {
    128
}

impl DelveConfig {
    /// Load configuration: defaults -> `delve.toml` -> `DELVE_*` env vars.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new("delve.toml"))
    }

    /// Load configuration from an explicit TOML path (still layered with env).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("DELVE_").split("__"))
            .extract()
            .map_err(|e| ConfigError::LoadError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate invariants that figment cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.scoring.weights;
        let sum = w.semantic + w.topical + w.temporal + w.credibility + w.quality;
        if !(0.99..=1.01).contains(&sum) {
            return Err(ConfigError::Invalid {
                message: format!("score weights must sum to 1.0, got {sum:.3}"),
            });
        }
        if self.retrieval.fan_out == 0 {
            return Err(ConfigError::Invalid {
                message: "retrieval.fan_out must be at least 1".into(),
            });
        }
        if self.embedding_dimensions == 0 {
            return Err(ConfigError::Invalid {
                message: "embedding_dimensions must be at least 1".into(),
            });
        }
        Ok(())
    }
}
