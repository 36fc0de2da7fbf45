//! Session orchestration: budget, state, events, goals, the research loop,
//! and the service registry.

pub mod budget;
pub mod events;
pub mod goal;
pub mod orchestrator;
pub mod registry;
pub mod state;

pub use budget::{BudgetExhaustion, BudgetUsage, ResourceBudget};
pub use events::SessionEvent;
pub use goal::{ExhaustBudgetGoal, FactCountGoal, GoalPredicate};
pub use orchestrator::SessionContext;
pub use registry::ResearchService;
pub use state::{Fact, SessionMemory, SessionSnapshot, SessionStatus};
