//! Session lifecycle events, broadcast to any number of observers.

use crate::knowledge::Contradiction;
use crate::types::Report;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Progress events emitted while a session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        session_id: Uuid,
        query: String,
    },
    IterationStarted {
        session_id: Uuid,
        iteration: u64,
    },
    IterationCompleted {
        session_id: Uuid,
        iteration: u64,
        facts_found: usize,
        new_questions: usize,
    },
    ContradictionDetected {
        session_id: Uuid,
        contradiction: Contradiction,
    },
    Completed {
        session_id: Uuid,
        report: Report,
    },
    Failed {
        session_id: Uuid,
        reason: String,
    },
    Stopped {
        session_id: Uuid,
    },
}

impl SessionEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            Self::Started { session_id, .. }
            | Self::IterationStarted { session_id, .. }
            | Self::IterationCompleted { session_id, .. }
            | Self::ContradictionDetected { session_id, .. }
            | Self::Completed { session_id, .. }
            | Self::Failed { session_id, .. }
            | Self::Stopped { session_id } => *session_id,
        }
    }
}
