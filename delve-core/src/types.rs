//! Fundamental value types shared across the engine: retrieved documents,
//! query analysis, sources, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which retrieval backend a document came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchBackend {
    Web,
    Academic,
    News,
}

impl std::fmt::Display for SearchBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Web => write!(f, "web"),
            Self::Academic => write!(f, "academic"),
            Self::News => write!(f, "news"),
        }
    }
}

/// Type of a retrieved source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    AcademicPaper,
    Documentation,
    BlogPost,
    Forum,
    News,
    Book,
    Other,
}

impl SourceType {
    /// Baseline domain-authority prior for the source type, used by the
    /// credibility scorer when no per-document signal is available.
    pub fn authority_prior(&self) -> f64 {
        match self {
            Self::AcademicPaper => 0.9,
            Self::Documentation => 0.8,
            Self::Book => 0.8,
            Self::News => 0.6,
            Self::BlogPost => 0.4,
            Self::Forum => 0.3,
            Self::Other => 0.3,
        }
    }
}

/// Per-document credibility signals supplied by the retrieval layer.
///
/// All values are in [0,1]; `None` means the signal was not observable and
/// the scorer falls back to a source-type prior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSignals {
    pub author_expertise: Option<f64>,
    pub domain_authority: Option<f64>,
    pub transparency: Option<f64>,
    pub factual_accuracy: Option<f64>,
    pub peer_validation: Option<f64>,
    pub methodology: Option<f64>,
}

/// A raw document returned by the retrieval provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub content: String,
    pub source_type: SourceType,
    pub backend: SearchBackend,
    /// Domain/topic label assigned by the backend, if any.
    pub domain: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub signals: SourceSignals,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            url: None,
            content: content.into(),
            source_type: SourceType::Other,
            backend: SearchBackend::Web,
            domain: None,
            published_at: None,
            signals: SourceSignals::default(),
        }
    }

    /// Rough token estimate (~4 chars per token) used for budget accounting.
    pub fn estimated_tokens(&self) -> u64 {
        ((self.title.len() + self.content.len()) / 4) as u64
    }
}

/// Broad intent classification of the research query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    Factual,
    Comparative,
    Procedural,
    Exploratory,
}

/// Output of the query processor's analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub intent: QueryIntent,
    /// Named entities mentioned in the query.
    pub entities: Vec<String>,
    /// Detected subject domain, if any.
    pub domain: Option<String>,
    /// Content keywords (lowercased, stop-words removed).
    pub keywords: Vec<String>,
}

/// A sub-question derived from the original query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuestion {
    pub id: Uuid,
    pub text: String,
    /// Lower values are dispatched first; 1 is most urgent.
    pub priority: u32,
    /// Expected information gain (0.0-1.0).
    pub expected_gain: f64,
}

/// A source recorded in the session's provenance list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: Uuid,
    pub title: String,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub backend: SearchBackend,
    /// Credibility sub-score the document received when scored.
    pub credibility: f64,
    pub retrieved_at: DateTime<Utc>,
}

impl SourceRecord {
    pub fn from_document(doc: &Document, credibility: f64) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            url: doc.url.clone(),
            source_type: doc.source_type,
            backend: doc.backend,
            credibility,
            retrieved_at: Utc::now(),
        }
    }
}

/// Output format for generated reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Summary,
    DetailedReport,
}

/// A generated research report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub query: String,
    pub format: ReportFormat,
    pub content: String,
    /// Overall confidence (0.0-1.0).
    pub confidence: f64,
    pub sources_cited: usize,
    pub contradictions_found: usize,
}

/// Clamp a score into the valid [0,1] range.
pub(crate) fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Tokenize text into lowercased content keywords with stop-words removed.
pub(crate) fn keywords(text: &str) -> Vec<String> {
    const STOP_WORDS: &[&str] = &[
        "the", "a", "an", "is", "are", "was", "were", "be", "been", "being", "have", "has", "had",
        "do", "does", "did", "will", "would", "shall", "should", "may", "might", "must", "can",
        "could", "of", "in", "to", "for", "with", "on", "at", "from", "by", "about", "as", "into",
        "through", "during", "before", "after", "above", "below", "between", "this", "that",
        "these", "those", "it", "its", "and", "but", "or", "what", "which", "who", "how", "why",
        "when", "where",
    ];

    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !STOP_WORDS.contains(w))
        .map(String::from)
        .collect()
}

/// Jaccard similarity between two keyword sets.
pub(crate) fn keyword_overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: std::collections::HashSet<&str> = a.iter().map(|s| s.as_str()).collect();
    let set_b: std::collections::HashSet<&str> = b.iter().map(|s| s.as_str()).collect();
    let intersection = set_a.intersection(&set_b).count();
    let union = set_a.union(&set_b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
