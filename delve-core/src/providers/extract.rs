//! Extraction of statements, entities, and relations from documents.
//!
//! The heuristic extractor is sentence-based and deterministic. Like the other
//! provider seams, the trait exists so an LLM or NER model can replace it.

use crate::error::ExtractionError;
use crate::types::Document;

/// A declarative statement lifted from a document.
#[derive(Debug, Clone)]
pub struct ExtractedStatement {
    pub text: String,
    /// Extraction confidence in [0,1], before any source scoring.
    pub confidence: f64,
    /// Entity names mentioned in the statement.
    pub entity_names: Vec<String>,
}

/// A named entity found in a document.
#[derive(Debug, Clone)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: String,
    pub confidence: f64,
}

/// A relation between two named entities, inferred from one sentence.
#[derive(Debug, Clone)]
pub struct ExtractedRelation {
    pub source_name: String,
    pub target_name: String,
    pub relation_type: String,
    pub strength: f64,
    /// The sentence the relation was inferred from.
    pub evidence: String,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub statements: Vec<ExtractedStatement>,
    pub entities: Vec<ExtractedEntity>,
    pub relations: Vec<ExtractedRelation>,
}

/// Pluggable document extractor.
pub trait Extractor: Send + Sync {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionError>;
}

/// Sentence-splitting heuristic extractor.
pub struct KeywordExtractor {
    min_sentence_len: usize,
    max_sentence_len: usize,
}

const ORG_SUFFIXES: &[&str] = &["Inc", "Corp", "Ltd", "LLC", "GmbH", "AG"];

const RELATION_VERBS: &[&str] = &[
    "acquired", "owns", "uses", "supplies", "founded", "supports", "develops", "competes",
    "partnered", "invested",
];

impl KeywordExtractor {
    pub fn new() -> Self {
        Self {
            min_sentence_len: 25,
            max_sentence_len: 400,
        }
    }

    fn split_sentences(text: &str) -> Vec<&str> {
        text.split(['.', '!', '?', '\n'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Capitalized tokens past the first word of a sentence.
    fn sentence_entities(sentence: &str) -> Vec<String> {
        let mut entities = Vec::new();
        for (i, token) in sentence.split_whitespace().enumerate() {
            let cleaned: String = token.chars().filter(|c| c.is_alphanumeric()).collect();
            if cleaned.len() < 2 || i == 0 {
                continue;
            }
            let starts_upper = cleaned.chars().next().is_some_and(char::is_uppercase);
            if starts_upper && !entities.contains(&cleaned) {
                entities.push(cleaned);
            }
        }
        entities
    }

    fn entity_type(name: &str) -> &'static str {
        if ORG_SUFFIXES.iter().any(|s| name.ends_with(s))
            || name.chars().all(|c| c.is_uppercase() || c.is_numeric())
        {
            "organization"
        } else {
            "concept"
        }
    }

    fn statement_confidence(sentence: &str, entity_count: usize) -> f64 {
        let mut confidence: f64 = 0.5;
        if sentence.chars().any(|c| c.is_numeric()) {
            confidence += 0.1;
        }
        if entity_count > 0 {
            confidence += 0.1;
        }
        confidence.min(1.0)
    }
}

impl Default for KeywordExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for KeywordExtractor {
    fn extract(&self, document: &Document) -> Result<Extraction, ExtractionError> {
        if document.content.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument {
                document_id: document.id,
            });
        }

        let sentences = Self::split_sentences(&document.content);
        if sentences.is_empty() {
            return Err(ExtractionError::Unprocessable {
                document_id: document.id,
                reason: "no sentences found".into(),
            });
        }

        let mut extraction = Extraction::default();

        for sentence in sentences {
            if sentence.len() < self.min_sentence_len || sentence.len() > self.max_sentence_len {
                continue;
            }

            let entities = Self::sentence_entities(sentence);

            for name in &entities {
                if !extraction.entities.iter().any(|e| e.name == *name) {
                    extraction.entities.push(ExtractedEntity {
                        name: name.clone(),
                        entity_type: Self::entity_type(name).to_string(),
                        confidence: 0.6,
                    });
                }
            }

            // Two entities plus a relation verb make an edge; the verb is the
            // relation type and the sentence is the evidence.
            if entities.len() >= 2 {
                let lower = sentence.to_lowercase();
                if let Some(verb) = RELATION_VERBS.iter().find(|v| {
                    lower
                        .split(|c: char| !c.is_alphanumeric())
                        .any(|token| token == **v)
                }) {
                    extraction.relations.push(ExtractedRelation {
                        source_name: entities[0].clone(),
                        target_name: entities[1].clone(),
                        relation_type: (*verb).to_string(),
                        strength: 0.5,
                        evidence: sentence.to_string(),
                    });
                }
            }

            extraction.statements.push(ExtractedStatement {
                text: sentence.to_string(),
                confidence: Self::statement_confidence(sentence, entities.len()),
                entity_names: entities,
            });
        }

        if extraction.statements.is_empty() {
            return Err(ExtractionError::Unprocessable {
                document_id: document.id,
                reason: "no usable sentences".into(),
            });
        }

        Ok(extraction)
    }
}
