//! Session state: lifecycle status, per-session memory, and the serializable
//! snapshot published to observers.

use super::budget::BudgetUsage;
use crate::error::SessionError;
use crate::scoring::RelevanceCategory;
use crate::types::{QueryAnalysis, Report, SourceRecord, SubQuestion};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// Lifecycle of a research session.
///
/// The loop cycles Searching -> Reading -> Reasoning; Synthesizing runs once
/// on the way out. Completed, Failed, and Stopped are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    Searching,
    Reading,
    Reasoning,
    Synthesizing,
    Completed,
    Failed,
    Stopped,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Stopped)
    }

    /// Whether moving to `next` is a legal lifecycle step.
    pub fn can_transition(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        // Any non-terminal state may fail or be stopped.
        if !self.is_terminal() && matches!(next, Failed | Stopped) {
            return true;
        }
        matches!(
            (self, next),
            (Initializing, Searching)
                | (Searching, Reading)
                | (Reading, Reasoning)
                | (Reasoning, Searching)
                | (Reasoning, Synthesizing)
                // Budget can run out before the first search completes.
                | (Initializing, Synthesizing)
                | (Searching, Synthesizing)
                | (Synthesizing, Completed)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Searching => "searching",
            Self::Reading => "reading",
            Self::Reasoning => "reasoning",
            Self::Synthesizing => "synthesizing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Stopped => "stopped",
        };
        write!(f, "{name}")
    }
}

/// An accepted finding, scored and attributed to its sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fact {
    pub id: Uuid,
    pub content: String,
    pub confidence: f64,
    pub source_ids: Vec<Uuid>,
    pub category: RelevanceCategory,
}

impl Fact {
    pub fn new(
        content: impl Into<String>,
        confidence: f64,
        source_ids: Vec<Uuid>,
        category: RelevanceCategory,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            confidence: confidence.clamp(0.0, 1.0),
            source_ids,
            category,
        }
    }
}

/// Per-session accumulation: facts, open questions, provenance, and the set
/// of already-explored search terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMemory {
    pub facts: Vec<Fact>,
    pub pending_questions: Vec<SubQuestion>,
    pub explored_queries: HashSet<String>,
    pub sources: Vec<SourceRecord>,
}

impl SessionMemory {
    pub fn add_fact(&mut self, fact: Fact) {
        // A fact whose content contains a pending question (case-insensitively)
        // answers it: retire the question and mark it explored so it is never
        // requeued.
        let content = fact.content.to_lowercase();
        let answered: Vec<String> = self
            .pending_questions
            .iter()
            .filter(|q| content.contains(&q.text.to_lowercase()))
            .map(|q| q.text.to_lowercase())
            .collect();
        if !answered.is_empty() {
            self.pending_questions
                .retain(|q| !content.contains(&q.text.to_lowercase()));
            self.explored_queries.extend(answered);
        }

        // Re-discovered facts merge by content: keep the higher confidence and
        // union the provenance.
        if let Some(existing) = self.facts.iter_mut().find(|f| f.content == fact.content) {
            existing.confidence = existing.confidence.max(fact.confidence);
            for source_id in fact.source_ids {
                if !existing.source_ids.contains(&source_id) {
                    existing.source_ids.push(source_id);
                }
            }
        } else {
            self.facts.push(fact);
        }
    }

    /// Queue a follow-up question unless its text was already explored or
    /// queued.
    pub fn add_question(&mut self, question: SubQuestion) {
        let normalized = question.text.to_lowercase();
        let already_explored = self.explored_queries.contains(&normalized);
        let already_queued = self
            .pending_questions
            .iter()
            .any(|q| q.text.to_lowercase() == normalized);
        if !already_explored && !already_queued {
            self.pending_questions.push(question);
        }
    }

    /// Take the top `n` questions by priority (lower number first), marking
    /// them explored.
    pub fn take_questions(&mut self, n: usize) -> Vec<SubQuestion> {
        self.pending_questions.sort_by_key(|q| q.priority);
        let taken: Vec<SubQuestion> = self
            .pending_questions
            .drain(..n.min(self.pending_questions.len()))
            .collect();
        for question in &taken {
            self.explored_queries.insert(question.text.to_lowercase());
        }
        taken
    }

    pub fn record_source(&mut self, source: SourceRecord) {
        if !self.sources.iter().any(|s| s.id == source.id) {
            self.sources.push(source);
        }
    }

    pub fn core_fact_count(&self) -> usize {
        self.facts
            .iter()
            .filter(|f| f.category == RelevanceCategory::Core)
            .count()
    }
}

/// Serializable snapshot of a session, published after every state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub query: String,
    pub analysis: Option<QueryAnalysis>,
    pub status: SessionStatus,
    pub usage: BudgetUsage,
    pub fact_count: usize,
    pub pending_questions: usize,
    pub source_count: usize,
    pub contradiction_count: usize,
    pub report: Option<Report>,
    /// Populated when status is `Failed`.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(id: Uuid, query: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            query: query.into(),
            analysis: None,
            status: SessionStatus::Initializing,
            usage: BudgetUsage::default(),
            fact_count: 0,
            pending_questions: 0,
            source_count: 0,
            contradiction_count: 0,
            report: None,
            error: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Persist the snapshot as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a previously saved snapshot.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Validated status transition helper used by the orchestrator.
pub fn transition(
    current: SessionStatus,
    next: SessionStatus,
) -> Result<SessionStatus, SessionError> {
    if current.can_transition(next) {
        Ok(next)
    } else {
        Err(SessionError::InvalidStateTransition {
            from: current.to_string(),
            to: next.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_loop_transitions_allowed() {
        use SessionStatus::*;
        assert!(Initializing.can_transition(Searching));
        assert!(Searching.can_transition(Reading));
        assert!(Reading.can_transition(Reasoning));
        assert!(Reasoning.can_transition(Searching));
        assert!(Reasoning.can_transition(Synthesizing));
        assert!(Synthesizing.can_transition(Completed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        use SessionStatus::*;
        for terminal in [Completed, Failed, Stopped] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition(Searching));
            assert!(!terminal.can_transition(Failed));
        }
    }

    #[test]
    fn test_any_active_state_can_stop_or_fail() {
        use SessionStatus::*;
        for active in [Initializing, Searching, Reading, Reasoning, Synthesizing] {
            assert!(active.can_transition(Stopped));
            assert!(active.can_transition(Failed));
        }
    }

    #[test]
    fn test_invalid_transition_rejected() {
        let err = transition(SessionStatus::Completed, SessionStatus::Searching).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid state transition: completed -> searching"
        );
    }

    #[test]
    fn test_fact_merge_by_content() {
        let mut memory = SessionMemory::default();
        let source_a = Uuid::new_v4();
        let source_b = Uuid::new_v4();
        memory.add_fact(Fact::new(
            "caching reduces latency",
            0.6,
            vec![source_a],
            RelevanceCategory::Core,
        ));
        memory.add_fact(Fact::new(
            "caching reduces latency",
            0.8,
            vec![source_b],
            RelevanceCategory::Core,
        ));

        assert_eq!(memory.facts.len(), 1);
        assert!((memory.facts[0].confidence - 0.8).abs() < 1e-9);
        assert_eq!(memory.facts[0].source_ids.len(), 2);
    }

    #[test]
    fn test_fact_retires_answered_question() {
        let mut memory = SessionMemory::default();
        memory.add_question(SubQuestion {
            id: Uuid::new_v4(),
            text: "the cache reduces latency".into(),
            priority: 1,
            expected_gain: 0.5,
        });
        memory.add_fact(Fact::new(
            "Acme benchmarks confirm The Cache Reduces Latency by 40 percent",
            0.8,
            vec![Uuid::new_v4()],
            RelevanceCategory::Core,
        ));

        assert!(memory.pending_questions.is_empty());

        // The retired question counts as explored and is never requeued.
        memory.add_question(SubQuestion {
            id: Uuid::new_v4(),
            text: "The Cache Reduces Latency".into(),
            priority: 1,
            expected_gain: 0.5,
        });
        assert!(memory.pending_questions.is_empty());
    }

    #[test]
    fn test_unanswered_questions_stay_queued() {
        let mut memory = SessionMemory::default();
        memory.add_question(SubQuestion {
            id: Uuid::new_v4(),
            text: "what replication mode does Acme use".into(),
            priority: 2,
            expected_gain: 0.5,
        });
        memory.add_fact(Fact::new(
            "The cache reduces latency by 40 percent",
            0.8,
            vec![Uuid::new_v4()],
            RelevanceCategory::Core,
        ));

        assert_eq!(memory.pending_questions.len(), 1);
    }

    #[test]
    fn test_questions_deduplicated_against_explored() {
        let mut memory = SessionMemory::default();
        memory.add_question(SubQuestion {
            id: Uuid::new_v4(),
            text: "What is X?".into(),
            priority: 1,
            expected_gain: 0.5,
        });
        let taken = memory.take_questions(1);
        assert_eq!(taken.len(), 1);

        // Re-adding the explored question (any casing) is a no-op.
        memory.add_question(SubQuestion {
            id: Uuid::new_v4(),
            text: "what is x?".into(),
            priority: 1,
            expected_gain: 0.5,
        });
        assert!(memory.pending_questions.is_empty());
    }

    #[test]
    fn test_take_questions_by_priority() {
        let mut memory = SessionMemory::default();
        for (text, priority) in [("low", 9), ("high", 1), ("mid", 5)] {
            memory.add_question(SubQuestion {
                id: Uuid::new_v4(),
                text: text.into(),
                priority,
                expected_gain: 0.5,
            });
        }
        let taken = memory.take_questions(2);
        assert_eq!(taken[0].text, "high");
        assert_eq!(taken[1].text, "mid");
        assert_eq!(memory.pending_questions.len(), 1);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut snapshot = SessionSnapshot::new(Uuid::new_v4(), "prompt caching");
        snapshot.status = SessionStatus::Completed;
        snapshot.fact_count = 12;
        snapshot.save(&path).unwrap();

        let loaded = SessionSnapshot::load(&path).unwrap();
        assert_eq!(loaded.id, snapshot.id);
        assert_eq!(loaded.status, SessionStatus::Completed);
        assert_eq!(loaded.fact_count, 12);
    }
}
