//! Bias detection over retrieved documents.
//!
//! Four keyword-driven sub-detectors (political, commercial, demographic,
//! confirmation) averaged into an overall bias score. Deliberately simple and
//! deterministic; the `BiasDetector` trait is the seam where a trained
//! classifier slots in.

use super::ScoringContext;
use crate::types::{clamp01, Document};
use serde::{Deserialize, Serialize};

/// Per-dimension bias scores, all in [0,1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasScore {
    pub political: f64,
    pub commercial: f64,
    pub demographic: f64,
    pub confirmation: f64,
    /// Mean of the four sub-detectors.
    pub overall: f64,
}

impl BiasScore {
    pub fn from_components(
        political: f64,
        commercial: f64,
        demographic: f64,
        confirmation: f64,
    ) -> Self {
        let political = clamp01(political);
        let commercial = clamp01(commercial);
        let demographic = clamp01(demographic);
        let confirmation = clamp01(confirmation);
        Self {
            political,
            commercial,
            demographic,
            confirmation,
            overall: (political + commercial + demographic + confirmation) / 4.0,
        }
    }
}

/// Pluggable bias detector.
pub trait BiasDetector: Send + Sync {
    fn detect(&self, document: &Document, context: &ScoringContext) -> BiasScore;
}

/// Keyword-frequency bias detector.
pub struct HeuristicBiasDetector;

const POLITICAL_MARKERS: &[&str] = &[
    "radical", "extremist", "corrupt", "regime", "propaganda", "agenda", "leftist", "rightist",
    "globalist", "patriot",
];

const COMMERCIAL_MARKERS: &[&str] = &[
    "buy now", "limited offer", "discount", "sponsored", "affiliate", "best deal", "exclusive",
    "sign up today", "free trial",
];

const DEMOGRAPHIC_MARKERS: &[&str] = &[
    "those people", "typical of", "all men", "all women", "young people always",
    "boomers", "millennials are",
];

const CONFIRMATION_MARKERS: &[&str] = &[
    "obviously", "everyone knows", "undeniably", "without question", "it is clear that",
    "no doubt", "proves beyond",
];

impl HeuristicBiasDetector {
    pub fn new() -> Self {
        Self
    }

    /// Marker density scaled so roughly three hits saturate the signal.
    fn marker_score(text: &str, markers: &[&str]) -> f64 {
        let hits = markers.iter().filter(|m| text.contains(*m)).count();
        clamp01(hits as f64 / 3.0)
    }
}

impl Default for HeuristicBiasDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl BiasDetector for HeuristicBiasDetector {
    fn detect(&self, document: &Document, _context: &ScoringContext) -> BiasScore {
        let text = format!("{} {}", document.title, document.content).to_lowercase();

        BiasScore::from_components(
            Self::marker_score(&text, POLITICAL_MARKERS),
            Self::marker_score(&text, COMMERCIAL_MARKERS),
            Self::marker_score(&text, DEMOGRAPHIC_MARKERS),
            Self::marker_score(&text, CONFIRMATION_MARKERS),
        )
    }
}
