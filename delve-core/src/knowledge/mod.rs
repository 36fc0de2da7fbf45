//! Cross-session knowledge: graph, vector index, conflict detection, and the
//! store facade tying them together.

pub mod conflict;
pub mod graph;
pub mod store;
pub mod vector;

pub use conflict::{Contradiction, ContradictionScorer, NegationOverlapScorer};
pub use graph::{Evidence, KnowledgeClaim, KnowledgeEntity, KnowledgeRelation, VerificationStatus};
pub use store::{EvidenceOutcome, KnowledgeStore, QueryResults, SharedKnowledgeStore};
pub use vector::{VectorHit, VectorIndex};
