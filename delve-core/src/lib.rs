//! # Delve Core
//!
//! Core library for the Delve research engine. Provides budget-governed
//! research sessions, multi-dimensional document scoring, a cross-session
//! knowledge store (graph + vector index), tiered memory, and pluggable
//! retrieval/extraction/synthesis providers.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod knowledge;
pub mod memory;
pub mod providers;
pub mod scoring;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root.
pub use config::{BudgetConfig, DelveConfig, ScoreWeights};
pub use error::{DelveError, Result};
pub use knowledge::{KnowledgeClaim, KnowledgeEntity, KnowledgeRelation, KnowledgeStore};
pub use memory::{MemoryItem, MemoryTiers};
pub use providers::{Extractor, QueryProcessor, RetrievalProvider, StaticRetriever, Synthesizer};
pub use scoring::{RelevanceCategory, RelevanceScore, ScoringEngine};
pub use session::{
    BudgetUsage, ResearchService, SessionContext, SessionEvent, SessionSnapshot, SessionStatus,
};
pub use types::{Document, Report, ReportFormat, SearchBackend, SourceType};
