//! Multi-dimensional document scoring.
//!
//! Combines five independently computable sub-scores — semantic, topical,
//! temporal, credibility, and bias — into an overall relevance score and a
//! final category. Each sub-score sits behind a narrow strategy trait so a
//! trained model can replace any heuristic without touching the orchestrator.

pub mod bias;
pub mod credibility;
pub mod semantic;

pub use bias::{BiasDetector, BiasScore, HeuristicBiasDetector};
pub use credibility::CredibilityScorer;
pub use semantic::{SemanticScorer, TemporalScorer, TopicalScorer};

use crate::config::ScoreWeights;
use crate::types::{clamp01, Document, QueryAnalysis};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Query-side context a document is scored against.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub query: String,
    pub analysis: QueryAnalysis,
    /// Research goals derived from the query.
    pub goals: Vec<String>,
    /// Reference time for recency decay.
    pub now: DateTime<Utc>,
}

impl ScoringContext {
    pub fn new(query: impl Into<String>, analysis: QueryAnalysis) -> Self {
        Self {
            query: query.into(),
            analysis,
            goals: Vec::new(),
            now: Utc::now(),
        }
    }

    pub fn with_goals(mut self, goals: Vec<String>) -> Self {
        self.goals = goals;
        self
    }
}

/// A single pluggable sub-score: `(document, context) -> [0,1]`.
pub trait ScoreStrategy: Send + Sync {
    fn score(&self, document: &Document, context: &ScoringContext) -> f64;
}

/// Final categorization of a scored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceCategory {
    Core,
    Peripheral,
    Contradictory,
    Irrelevant,
}

/// Composite relevance score for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub semantic: f64,
    pub topical: f64,
    pub temporal: f64,
    pub credibility: f64,
    pub bias: BiasScore,
    /// Weighted combination of the five sub-scores.
    pub overall: f64,
    pub category: RelevanceCategory,
}

/// Stateless scoring engine combining the five sub-scorers.
pub struct ScoringEngine {
    weights: ScoreWeights,
    semantic: Box<dyn ScoreStrategy>,
    topical: Box<dyn ScoreStrategy>,
    temporal: Box<dyn ScoreStrategy>,
    credibility: Box<dyn ScoreStrategy>,
    bias: Box<dyn BiasDetector>,
}

impl ScoringEngine {
    /// Create an engine with the default heuristic strategies.
    pub fn new(weights: ScoreWeights) -> Self {
        Self {
            weights,
            semantic: Box::new(SemanticScorer::new()),
            topical: Box::new(TopicalScorer::new()),
            temporal: Box::new(TemporalScorer::new()),
            credibility: Box::new(CredibilityScorer::new()),
            bias: Box::new(HeuristicBiasDetector::new()),
        }
    }

    /// Replace the semantic strategy.
    pub fn with_semantic(mut self, strategy: Box<dyn ScoreStrategy>) -> Self {
        self.semantic = strategy;
        self
    }

    /// Replace the bias detector.
    pub fn with_bias_detector(mut self, detector: Box<dyn BiasDetector>) -> Self {
        self.bias = detector;
        self
    }

    /// Score a single document against the query context.
    pub fn score(&self, document: &Document, context: &ScoringContext) -> RelevanceScore {
        let semantic = clamp01(self.semantic.score(document, context));
        let topical = clamp01(self.topical.score(document, context));
        let temporal = clamp01(self.temporal.score(document, context));
        let credibility = clamp01(self.credibility.score(document, context));
        let bias = self.bias.detect(document, context);

        let w = &self.weights;
        let overall = clamp01(
            semantic * w.semantic
                + topical * w.topical
                + temporal * w.temporal
                + credibility * w.credibility
                + (1.0 - bias.overall) * w.quality,
        );

        let category = categorize(overall, semantic, bias.overall);

        RelevanceScore {
            semantic,
            topical,
            temporal,
            credibility,
            bias,
            overall,
            category,
        }
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ScoreWeights::default())
    }
}

/// Categorization thresholds. Heavily biased documents are flagged
/// contradictory regardless of how well they match the query.
fn categorize(overall: f64, semantic: f64, bias_overall: f64) -> RelevanceCategory {
    if bias_overall > 0.8 {
        RelevanceCategory::Contradictory
    } else if overall > 0.7 && semantic > 0.6 {
        RelevanceCategory::Core
    } else if overall > 0.4 {
        RelevanceCategory::Peripheral
    } else {
        RelevanceCategory::Irrelevant
    }
}
