//! Goal-completion predicates.
//!
//! Whether a session has "answered" its query is inherently domain specific,
//! so completion is a pluggable predicate; the default is a fact-count
//! heuristic with a minimum iteration floor.

use super::state::SessionMemory;
use crate::config::GoalConfig;

/// Decides whether the research goal is satisfied and the loop may stop early.
pub trait GoalPredicate: Send + Sync {
    fn is_satisfied(&self, memory: &SessionMemory, iterations: u64) -> bool;
}

/// Satisfied once enough core facts exist, the question queue has drained,
/// and a minimum number of iterations has run.
pub struct FactCountGoal {
    config: GoalConfig,
}

impl FactCountGoal {
    pub fn new(config: GoalConfig) -> Self {
        Self { config }
    }
}

impl GoalPredicate for FactCountGoal {
    fn is_satisfied(&self, memory: &SessionMemory, iterations: u64) -> bool {
        iterations >= self.config.min_iterations
            && memory.core_fact_count() >= self.config.min_facts
            && memory.pending_questions.is_empty()
    }
}

/// Never satisfied; the session runs until its budget is spent.
pub struct ExhaustBudgetGoal;

impl GoalPredicate for ExhaustBudgetGoal {
    fn is_satisfied(&self, _: &SessionMemory, _: u64) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::RelevanceCategory;
    use crate::session::state::Fact;

    fn memory_with_core_facts(n: usize) -> SessionMemory {
        let mut memory = SessionMemory::default();
        for i in 0..n {
            memory.add_fact(Fact::new(
                format!("fact {i}"),
                0.9,
                vec![],
                RelevanceCategory::Core,
            ));
        }
        memory
    }

    #[test]
    fn test_fact_count_goal() {
        let goal = FactCountGoal::new(GoalConfig {
            min_facts: 2,
            min_iterations: 1,
        });

        assert!(!goal.is_satisfied(&memory_with_core_facts(1), 1));
        assert!(!goal.is_satisfied(&memory_with_core_facts(2), 0));
        assert!(goal.is_satisfied(&memory_with_core_facts(2), 1));
    }

    #[test]
    fn test_pending_questions_block_completion() {
        let goal = FactCountGoal::new(GoalConfig {
            min_facts: 1,
            min_iterations: 1,
        });
        let mut memory = memory_with_core_facts(5);
        memory.add_question(crate::types::SubQuestion {
            id: uuid::Uuid::new_v4(),
            text: "open question".into(),
            priority: 1,
            expected_gain: 0.5,
        });

        assert!(!goal.is_satisfied(&memory, 3));
    }

    #[test]
    fn test_exhaust_budget_goal_never_satisfied() {
        assert!(!ExhaustBudgetGoal.is_satisfied(&memory_with_core_facts(100), 100));
    }
}
