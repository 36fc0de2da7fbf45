//! Pluggable providers: query understanding, retrieval, extraction, and
//! synthesis, plus the shared rate limiter the retrieval executor leans on.

pub mod extract;
pub mod query;
pub mod rate_limiter;
pub mod retrieval;
pub mod synthesis;

pub use extract::{
    ExtractedEntity, ExtractedRelation, ExtractedStatement, Extraction, Extractor,
    KeywordExtractor,
};
pub use query::{HeuristicQueryProcessor, QueryProcessor};
pub use rate_limiter::RateLimiter;
pub use retrieval::{RetrievalOutcome, RetrievalProvider, Retriever, StaticRetriever};
pub use synthesis::{SynthesisInput, Synthesizer, TemplateSynthesizer};
