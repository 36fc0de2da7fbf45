//! Contradiction detection between claims.
//!
//! The strength measure is pluggable (`ContradictionScorer`) so a trained
//! NLI classifier can replace the default heuristic, which combines keyword
//! overlap with negation asymmetry and numeric disagreement.

use super::graph::KnowledgeClaim;
use crate::types::{keyword_overlap, keywords};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use uuid::Uuid;

/// A detected conflict between two claims sharing at least one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub claim_a_id: Uuid,
    pub claim_b_id: Uuid,
    pub claim_a_statement: String,
    pub claim_b_statement: String,
    /// Contradiction strength in [0,1].
    pub strength: f64,
}

/// Pluggable, symmetric contradiction-strength measure.
pub trait ContradictionScorer: Send + Sync {
    /// Strength in [0,1] that the two claims contradict each other.
    /// Must be symmetric: `strength(a, b) == strength(b, a)`.
    fn strength(&self, a: &KnowledgeClaim, b: &KnowledgeClaim) -> f64;
}

/// Default heuristic: claims about the same topic where exactly one side
/// negates, or where both quote diverging numbers, are contradictory.
pub struct NegationOverlapScorer {
    min_overlap: f64,
}

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "neither", "without", "lack", "doesn't", "don't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "cannot",
];

fn number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("static regex"))
}

impl NegationOverlapScorer {
    pub fn new() -> Self {
        Self { min_overlap: 0.3 }
    }

    fn has_negation(text: &str) -> bool {
        let lower = text.to_lowercase();
        NEGATION_WORDS.iter().any(|w| {
            lower
                .split(|c: char| !c.is_alphanumeric() && c != '\'')
                .any(|token| token == *w)
        })
    }

    fn extract_numbers(text: &str) -> Vec<f64> {
        number_pattern()
            .find_iter(text)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect()
    }

    /// Compare sorted number sequences pairwise; a mismatch beyond 10%
    /// relative difference counts as disagreement. Comparing aligned positions
    /// avoids flagging two claims that both quote "120 million in 2024".
    fn numbers_disagree(a: &[f64], b: &[f64]) -> bool {
        if a.is_empty() || b.is_empty() {
            return false;
        }
        let mut sorted_a = a.to_vec();
        let mut sorted_b = b.to_vec();
        sorted_a.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));
        sorted_b.sort_by(|x, y| x.partial_cmp(y).unwrap_or(std::cmp::Ordering::Equal));

        sorted_a
            .iter()
            .zip(sorted_b.iter())
            .any(|(na, nb)| (na - nb).abs() / na.abs().max(1.0) > 0.1)
    }
}

impl Default for NegationOverlapScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContradictionScorer for NegationOverlapScorer {
    fn strength(&self, a: &KnowledgeClaim, b: &KnowledgeClaim) -> f64 {
        let words_a = keywords(&a.statement);
        let words_b = keywords(&b.statement);

        let overlap = keyword_overlap(&words_a, &words_b);
        if overlap < self.min_overlap {
            // Not about the same topic.
            return 0.0;
        }

        // Negation asymmetry: same topic, one side negated.
        let negation_mismatch =
            Self::has_negation(&a.statement) != Self::has_negation(&b.statement);
        if negation_mismatch {
            // Scale with topical overlap; saturates near 1.0 for near-identical
            // statements that differ only in polarity.
            return (0.5 + overlap * 0.5).min(1.0);
        }

        // Numeric disagreement on a shared topic.
        let nums_a = Self::extract_numbers(&a.statement);
        let nums_b = Self::extract_numbers(&b.statement);
        if Self::numbers_disagree(&nums_a, &nums_b) {
            return (0.4 + overlap * 0.5).min(1.0);
        }

        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::graph::Evidence;

    fn make_claim(statement: &str) -> KnowledgeClaim {
        KnowledgeClaim::new(statement, 0.8, Evidence::new(Uuid::new_v4(), 0.8, 0.8))
    }

    #[test]
    fn test_negation_pair_is_strong() {
        let scorer = NegationOverlapScorer::new();
        let a = make_claim("Prompt caching significantly reduces inference latency");
        let b = make_claim("Prompt caching does not significantly reduce inference latency");

        let strength = scorer.strength(&a, &b);
        assert!(strength > 0.7, "strength was {strength}");
    }

    #[test]
    fn test_symmetric() {
        let scorer = NegationOverlapScorer::new();
        let a = make_claim("The cache never evicts hot entries");
        let b = make_claim("The cache evicts hot entries under pressure");

        assert!((scorer.strength(&a, &b) - scorer.strength(&b, &a)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unrelated_claims_zero() {
        let scorer = NegationOverlapScorer::new();
        let a = make_claim("The sky appears blue during daytime");
        let b = make_claim("Rust enforces memory safety without garbage collection");

        assert_eq!(scorer.strength(&a, &b), 0.0);
    }

    #[test]
    fn test_numeric_disagreement() {
        let scorer = NegationOverlapScorer::new();
        let a = make_claim("Acme revenue reached 120 million in 2024");
        let b = make_claim("Acme revenue reached 45 million in 2024");

        assert!(scorer.strength(&a, &b) > 0.0);
    }

    #[test]
    fn test_agreeing_numbers_not_flagged() {
        let scorer = NegationOverlapScorer::new();
        let a = make_claim("Acme revenue reached 120 million in 2024");
        let b = make_claim("Acme revenue reached 120 million in 2024");

        assert_eq!(scorer.strength(&a, &b), 0.0);
    }

    #[test]
    fn test_negation_word_boundary() {
        // "knot" contains "not" but is not a negation.
        assert!(!NegationOverlapScorer::has_negation("The knot held firm"));
        assert!(NegationOverlapScorer::has_negation("It does not hold"));
    }
}
