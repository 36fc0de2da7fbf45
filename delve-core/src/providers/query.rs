//! Query analysis and decomposition into prioritized sub-questions.

use crate::types::{keywords, QueryAnalysis, QueryIntent, SubQuestion};
use uuid::Uuid;

/// Pluggable query understanding. The heuristic implementation is
/// deterministic; an LLM-backed processor can replace it behind this trait.
pub trait QueryProcessor: Send + Sync {
    fn analyze(&self, query: &str) -> QueryAnalysis;
    fn decompose(&self, query: &str, analysis: &QueryAnalysis) -> Vec<SubQuestion>;
}

/// Structural query processor: intent from the leading interrogative,
/// entities from capitalization, decomposition from comparative connectives.
pub struct HeuristicQueryProcessor;

const COMPARATIVE_SEPARATORS: &[&str] = &[" vs ", " versus ", " compared to "];

const DOMAIN_HINTS: &[(&str, &[&str])] = &[
    (
        "technology",
        &["software", "algorithm", "database", "cache", "caching", "api", "compiler", "network"],
    ),
    (
        "science",
        &["experiment", "physics", "chemistry", "biology", "quantum", "genome"],
    ),
    (
        "health",
        &["disease", "vaccine", "treatment", "clinical", "patient", "diet"],
    ),
    (
        "finance",
        &["revenue", "market", "investment", "stock", "inflation", "earnings"],
    ),
];

impl HeuristicQueryProcessor {
    pub fn new() -> Self {
        Self
    }

    fn detect_intent(query: &str) -> QueryIntent {
        let lower = query.to_lowercase();
        if COMPARATIVE_SEPARATORS.iter().any(|s| lower.contains(s))
            || lower.contains("compare")
            || lower.contains("difference between")
        {
            return QueryIntent::Comparative;
        }
        if lower.starts_with("how ") {
            return QueryIntent::Procedural;
        }
        if lower.starts_with("what")
            || lower.starts_with("who")
            || lower.starts_with("when")
            || lower.starts_with("where")
            || lower.starts_with("which")
        {
            return QueryIntent::Factual;
        }
        QueryIntent::Exploratory
    }

    /// Capitalized mid-sentence tokens are treated as named entities.
    fn detect_entities(query: &str) -> Vec<String> {
        let mut entities = Vec::new();
        for (i, token) in query.split_whitespace().enumerate() {
            let cleaned: String = token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect();
            if cleaned.len() < 2 {
                continue;
            }
            let starts_upper = cleaned.chars().next().is_some_and(char::is_uppercase);
            // The first word of an English question is capitalized regardless.
            if starts_upper && i > 0 && !entities.contains(&cleaned) {
                entities.push(cleaned);
            }
        }
        entities
    }

    fn detect_domain(words: &[String]) -> Option<String> {
        DOMAIN_HINTS
            .iter()
            .find(|(_, hints)| words.iter().any(|w| hints.contains(&w.as_str())))
            .map(|(domain, _)| (*domain).to_string())
    }

    fn split_comparative(query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        for sep in COMPARATIVE_SEPARATORS {
            if let Some(pos) = lower.find(sep) {
                let left = query[..pos].trim();
                let right = query[pos + sep.len()..].trim();
                if !left.is_empty() && !right.is_empty() {
                    return vec![left.to_string(), right.to_string()];
                }
            }
        }
        vec![query.to_string()]
    }
}

impl Default for HeuristicQueryProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryProcessor for HeuristicQueryProcessor {
    fn analyze(&self, query: &str) -> QueryAnalysis {
        let words = keywords(query);
        QueryAnalysis {
            intent: Self::detect_intent(query),
            entities: Self::detect_entities(query),
            domain: Self::detect_domain(&words),
            keywords: words,
        }
    }

    fn decompose(&self, query: &str, analysis: &QueryAnalysis) -> Vec<SubQuestion> {
        let mut questions = Vec::new();

        match analysis.intent {
            QueryIntent::Comparative => {
                // Each side of the comparison becomes its own question, plus a
                // lower-priority question about the comparison itself.
                for (i, part) in Self::split_comparative(query).into_iter().enumerate() {
                    questions.push(SubQuestion {
                        id: Uuid::new_v4(),
                        text: format!("What are the key characteristics of {part}?"),
                        priority: (i + 1) as u32,
                        expected_gain: 0.8,
                    });
                }
                questions.push(SubQuestion {
                    id: Uuid::new_v4(),
                    text: format!("How do the options in \"{query}\" differ in practice?"),
                    priority: 5,
                    expected_gain: 0.6,
                });
            }
            QueryIntent::Procedural => {
                questions.push(SubQuestion {
                    id: Uuid::new_v4(),
                    text: format!("What are the practical steps for: {query}"),
                    priority: 1,
                    expected_gain: 0.8,
                });
                questions.push(SubQuestion {
                    id: Uuid::new_v4(),
                    text: format!("What are common pitfalls when: {query}"),
                    priority: 3,
                    expected_gain: 0.5,
                });
            }
            QueryIntent::Factual | QueryIntent::Exploratory => {
                for (i, entity) in analysis.entities.iter().take(3).enumerate() {
                    questions.push(SubQuestion {
                        id: Uuid::new_v4(),
                        text: format!("What is known about {entity} in the context of \"{query}\"?"),
                        priority: (i + 1) as u32,
                        expected_gain: 0.7,
                    });
                }
                if questions.is_empty() {
                    questions.push(SubQuestion {
                        id: Uuid::new_v4(),
                        text: format!("What background is needed to answer: {query}"),
                        priority: 2,
                        expected_gain: 0.5,
                    });
                }
            }
        }

        questions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factual_intent() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("What is prompt caching?");
        assert_eq!(analysis.intent, QueryIntent::Factual);
    }

    #[test]
    fn test_comparative_intent_and_split() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("Redis vs Memcached for session storage");
        assert_eq!(analysis.intent, QueryIntent::Comparative);

        let questions = processor.decompose("Redis vs Memcached for session storage", &analysis);
        // Two sides plus the comparison question.
        assert_eq!(questions.len(), 3);
        assert!(questions[0].text.contains("Redis"));
        assert!(questions[1].text.contains("Memcached"));
        assert!(questions[0].priority < questions[2].priority);
    }

    #[test]
    fn test_procedural_intent() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("How to deploy a Rust service on Kubernetes?");
        assert_eq!(analysis.intent, QueryIntent::Procedural);

        let questions = processor.decompose("How to deploy a Rust service on Kubernetes?", &analysis);
        assert!(questions.iter().any(|q| q.text.contains("practical steps")));
    }

    #[test]
    fn test_entity_detection_skips_leading_word() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("What acquisitions has Acme made since 2020?");
        assert_eq!(analysis.entities, vec!["Acme".to_string()]);
    }

    #[test]
    fn test_domain_detection() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("impact of caching on database performance");
        assert_eq!(analysis.domain.as_deref(), Some("technology"));

        let none = processor.analyze("history of garden gnomes");
        assert_eq!(none.domain, None);
    }

    #[test]
    fn test_exploratory_fallback_question() {
        let processor = HeuristicQueryProcessor::new();
        let analysis = processor.analyze("emerging trends in distributed tracing");
        assert_eq!(analysis.intent, QueryIntent::Exploratory);

        let questions = processor.decompose("emerging trends in distributed tracing", &analysis);
        assert!(!questions.is_empty());
    }
}
