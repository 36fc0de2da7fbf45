//! Source credibility scoring.
//!
//! Weighted composite of seven signals. Signals the retrieval layer could not
//! observe fall back to source-type priors, so the scorer stays total over
//! arbitrary documents.

use super::{ScoreStrategy, ScoringContext};
use crate::types::{clamp01, Document};

/// Relative weight of each credibility signal.
const W_AUTHOR_EXPERTISE: f64 = 0.20;
const W_DOMAIN_AUTHORITY: f64 = 0.25;
const W_TRANSPARENCY: f64 = 0.15;
const W_FACTUAL_ACCURACY: f64 = 0.20;
const W_RECENCY: f64 = 0.10;
const W_PEER_VALIDATION: f64 = 0.05;
const W_METHODOLOGY: f64 = 0.05;

/// Weighted-composite credibility scorer.
pub struct CredibilityScorer;

impl CredibilityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Recency signal: documents dated within the last two years score full
    /// marks, decaying linearly to 0.2 at ten years. Undated is neutral.
    fn recency_signal(document: &Document, context: &ScoringContext) -> f64 {
        let Some(published) = document.published_at else {
            return 0.5;
        };
        let age_years = (context.now - published).num_days() as f64 / 365.25;
        if age_years <= 2.0 {
            1.0
        } else if age_years >= 10.0 {
            0.2
        } else {
            1.0 - 0.8 * (age_years - 2.0) / 8.0
        }
    }

    /// Transparency prior: sources that typically cite and attribute score
    /// higher when no explicit signal is present.
    fn transparency_prior(document: &Document) -> f64 {
        let has_url = document.url.is_some();
        let base = document.source_type.authority_prior();
        if has_url {
            (base + 0.1).min(1.0)
        } else {
            base * 0.8
        }
    }
}

impl Default for CredibilityScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStrategy for CredibilityScorer {
    fn score(&self, document: &Document, context: &ScoringContext) -> f64 {
        let prior = document.source_type.authority_prior();
        let s = &document.signals;

        let author = s.author_expertise.unwrap_or(prior);
        let authority = s.domain_authority.unwrap_or(prior);
        let transparency = s.transparency.unwrap_or_else(|| Self::transparency_prior(document));
        let accuracy = s.factual_accuracy.unwrap_or(prior);
        let recency = Self::recency_signal(document, context);
        let peer = s.peer_validation.unwrap_or(prior * 0.8);
        let methodology = s.methodology.unwrap_or(prior * 0.8);

        clamp01(
            clamp01(author) * W_AUTHOR_EXPERTISE
                + clamp01(authority) * W_DOMAIN_AUTHORITY
                + clamp01(transparency) * W_TRANSPARENCY
                + clamp01(accuracy) * W_FACTUAL_ACCURACY
                + clamp01(recency) * W_RECENCY
                + clamp01(peer) * W_PEER_VALIDATION
                + clamp01(methodology) * W_METHODOLOGY,
        )
    }
}
