//! Semantic, topical, and temporal sub-scorers.

use super::{ScoreStrategy, ScoringContext};
use crate::types::{clamp01, keyword_overlap, keywords, Document, SourceType};
use std::collections::HashMap;

/// Term-overlap semantic scorer with a TF-weighted component and an
/// exact-phrase boost.
pub struct SemanticScorer {
    phrase_boost: f64,
}

impl SemanticScorer {
    pub fn new() -> Self {
        Self { phrase_boost: 0.2 }
    }
}

impl Default for SemanticScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStrategy for SemanticScorer {
    fn score(&self, document: &Document, context: &ScoringContext) -> f64 {
        let query_terms = &context.analysis.keywords;
        if query_terms.is_empty() {
            return 0.0;
        }

        let text = format!("{} {}", document.title, document.content);
        let doc_terms = keywords(&text);
        if doc_terms.is_empty() {
            return 0.0;
        }

        // Set overlap between query and document vocabularies.
        let overlap = keyword_overlap(query_terms, &doc_terms);

        // Coverage: fraction of query terms present, with a log-TF bonus for
        // repeated mentions.
        let mut tf: HashMap<&str, usize> = HashMap::new();
        for term in &doc_terms {
            *tf.entry(term.as_str()).or_insert(0) += 1;
        }
        let mut present = 0usize;
        let mut tf_weight = 0.0;
        for term in query_terms {
            let count = tf.get(term.as_str()).copied().unwrap_or(0);
            if count > 0 {
                present += 1;
                tf_weight += (1.0 + count as f64).ln();
            }
        }
        let coverage = present as f64 / query_terms.len() as f64;
        let tf_bonus = (tf_weight / (query_terms.len() as f64 * 3.0)).min(1.0);

        let mut score = overlap * 0.3 + coverage * 0.5 + tf_bonus * 0.2;

        // Exact-phrase match is a strong signal.
        if text.to_lowercase().contains(&context.query.to_lowercase()) {
            score += self.phrase_boost;
        }

        clamp01(score)
    }
}

/// Domain/goal alignment scorer.
pub struct TopicalScorer;

impl TopicalScorer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TopicalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStrategy for TopicalScorer {
    fn score(&self, document: &Document, context: &ScoringContext) -> f64 {
        let mut score: f64 = 0.0;

        // Domain agreement between query analysis and document label.
        match (&context.analysis.domain, &document.domain) {
            (Some(query_domain), Some(doc_domain)) => {
                if query_domain.eq_ignore_ascii_case(doc_domain) {
                    score += 0.5;
                } else {
                    score += 0.1;
                }
            }
            // Unlabeled on either side is neutral rather than penalising.
            _ => score += 0.3,
        }

        // Goal alignment: fraction of research goals the document touches.
        if !context.goals.is_empty() {
            let doc_terms = keywords(&format!("{} {}", document.title, document.content));
            let touched = context
                .goals
                .iter()
                .filter(|goal| keyword_overlap(&keywords(goal), &doc_terms) > 0.1)
                .count();
            score += 0.5 * (touched as f64 / context.goals.len() as f64);
        } else {
            // Fall back to entity mentions from the query analysis.
            let text = document.content.to_lowercase();
            let mentioned = context
                .analysis
                .entities
                .iter()
                .filter(|e| text.contains(&e.to_lowercase()))
                .count();
            if !context.analysis.entities.is_empty() {
                score += 0.5 * (mentioned as f64 / context.analysis.entities.len() as f64);
            } else {
                score += 0.2;
            }
        }

        clamp01(score)
    }
}

/// Exponential recency decay with domain-specific boosts.
///
/// News decays fastest; academic work and books stay relevant far longer.
/// Undated documents get a neutral midpoint rather than zero.
pub struct TemporalScorer;

impl TemporalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Half-life in days for each source type.
    fn half_life_days(source_type: SourceType) -> f64 {
        match source_type {
            SourceType::News => 30.0,
            SourceType::BlogPost => 180.0,
            SourceType::Forum => 180.0,
            SourceType::Documentation => 365.0,
            SourceType::AcademicPaper => 1_460.0,
            SourceType::Book => 1_825.0,
            SourceType::Other => 365.0,
        }
    }
}

impl Default for TemporalScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ScoreStrategy for TemporalScorer {
    fn score(&self, document: &Document, context: &ScoringContext) -> f64 {
        let Some(published) = document.published_at else {
            return 0.5;
        };

        let age_days = (context.now - published).num_seconds() as f64 / 86_400.0;
        if age_days <= 0.0 {
            return 1.0;
        }

        let half_life = Self::half_life_days(document.source_type);
        clamp01((-std::f64::consts::LN_2 * age_days / half_life).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QueryAnalysis, QueryIntent};
    use chrono::{Duration, Utc};

    fn make_context(query: &str) -> ScoringContext {
        ScoringContext::new(
            query,
            QueryAnalysis {
                intent: QueryIntent::Factual,
                entities: vec![],
                domain: None,
                keywords: keywords(query),
            },
        )
    }

    #[test]
    fn test_semantic_exact_phrase_boost() {
        let scorer = SemanticScorer::new();
        let context = make_context("prompt caching");

        let with_phrase = Document::new("doc", "prompt caching is widely used");
        let without_phrase = Document::new("doc", "caching of prompts is widely used");

        assert!(
            scorer.score(&with_phrase, &context) > scorer.score(&without_phrase, &context),
            "exact phrase should outrank scattered terms"
        );
    }

    #[test]
    fn test_semantic_empty_document() {
        let scorer = SemanticScorer::new();
        let context = make_context("prompt caching");
        let doc = Document::new("", "");
        assert_eq!(scorer.score(&doc, &context), 0.0);
    }

    #[test]
    fn test_topical_domain_match() {
        let scorer = TopicalScorer::new();
        let mut context = make_context("transformer architectures");
        context.analysis.domain = Some("machine-learning".into());

        let mut matching = Document::new("doc", "attention is all you need");
        matching.domain = Some("machine-learning".into());
        let mut other = Document::new("doc", "attention is all you need");
        other.domain = Some("cooking".into());

        assert!(scorer.score(&matching, &context) > scorer.score(&other, &context));
    }

    #[test]
    fn test_temporal_news_decays_faster_than_papers() {
        let scorer = TemporalScorer::new();
        let context = make_context("q");
        let published = Some(Utc::now() - Duration::days(365));

        let mut news = Document::new("doc", "c");
        news.source_type = SourceType::News;
        news.published_at = published;

        let mut paper = Document::new("doc", "c");
        paper.source_type = SourceType::AcademicPaper;
        paper.published_at = published;

        assert!(scorer.score(&paper, &context) > scorer.score(&news, &context));
    }

    #[test]
    fn test_temporal_undated_is_neutral() {
        let scorer = TemporalScorer::new();
        let context = make_context("q");
        let doc = Document::new("doc", "c");
        assert_eq!(scorer.score(&doc, &context), 0.5);
    }

    #[test]
    fn test_temporal_fresh_is_full_score() {
        let scorer = TemporalScorer::new();
        let context = make_context("q");
        let mut doc = Document::new("doc", "c");
        doc.published_at = Some(Utc::now() + Duration::minutes(1));
        assert_eq!(scorer.score(&doc, &context), 1.0);
    }
}
