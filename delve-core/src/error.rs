//! Error types for the Delve research engine.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering retrieval providers, extraction, the knowledge store, memory,
//! configuration, and session orchestration.
//!
//! Budget exhaustion is deliberately *not* an error: running out of time,
//! tokens, calls, or iterations is the normal way a session ends and is
//! handled by the orchestrator's continuation check.

use uuid::Uuid;

/// Top-level error type for the Delve core library.
#[derive(Debug, thiserror::Error)]
pub enum DelveError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from a single retrieval-provider call.
///
/// These are absorbed per query term: one failed engine call reduces the
/// iteration's yield but never aborts the session.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Search engine '{engine}' failed: {message}")]
    EngineFailed { engine: String, message: String },

    #[error("Rate limited by engine '{engine}', retry after {retry_after_ms}ms")]
    RateLimited { engine: String, retry_after_ms: u64 },

    #[error("Retrieval call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Authentication failed for engine '{engine}'")]
    AuthFailed { engine: String },
}

/// Errors from document extraction.
///
/// Absorbed per document: a malformed document is dropped without affecting
/// the rest of the batch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractionError {
    #[error("Document {document_id} could not be processed: {reason}")]
    Unprocessable { document_id: Uuid, reason: String },

    #[error("Document {document_id} has no extractable content")]
    EmptyDocument { document_id: Uuid },
}

/// Errors from the knowledge store.
#[derive(Debug, Clone, thiserror::Error)]
pub enum KnowledgeError {
    #[error("Claim not found: {id}")]
    ClaimNotFound { id: Uuid },

    #[error("Entity not found: {id}")]
    EntityNotFound { id: Uuid },

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Errors from the memory tiers.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MemoryError {
    #[error("Memory item not found: {id}")]
    ItemNotFound { id: Uuid },

    #[error("Memory persistence error: {message}")]
    PersistenceError { message: String },
}

/// Errors from session orchestration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {id}")]
    NotFound { id: Uuid },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Session failed: {message}")]
    Fatal { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Configuration load error: {message}")]
    LoadError { message: String },
}

/// A type alias for results using the top-level `DelveError`.
pub type Result<T> = std::result::Result<T, DelveError>;
