//! Resource budget tracking for one session.
//!
//! Counters only ever increase; ceilings come from config and never change
//! after the session starts. The loop checks affordability *before* acting,
//! so a ceiling is approached but never crossed. Exhaustion is a normal
//! session ending, not an error.

use crate::config::BudgetConfig;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Why the loop stopped consuming budget, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetExhaustion {
    Time,
    ApiCalls,
    Tokens,
    Iterations,
}

impl std::fmt::Display for BudgetExhaustion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
            Self::ApiCalls => write!(f, "api_calls"),
            Self::Tokens => write!(f, "tokens"),
            Self::Iterations => write!(f, "iterations"),
        }
    }
}

/// Point-in-time usage snapshot, exposed on session status.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub elapsed_ms: u64,
    pub api_calls: u64,
    pub tokens_used: u64,
    pub iterations: u64,
}

/// Monotone budget counters for a running session.
#[derive(Debug)]
pub struct ResourceBudget {
    config: BudgetConfig,
    started: Instant,
    api_calls: u64,
    tokens_used: u64,
    iterations: u64,
}

impl ResourceBudget {
    pub fn new(config: BudgetConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            api_calls: 0,
            tokens_used: 0,
            iterations: 0,
        }
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Wall-clock time still available, zero once the time ceiling is reached.
    pub fn remaining_time(&self) -> Duration {
        Duration::from_millis(self.config.max_time_ms).saturating_sub(self.elapsed())
    }

    /// First exhausted dimension, if any. Time and iterations gate the loop;
    /// calls and tokens gate individual actions.
    pub fn exhausted(&self) -> Option<BudgetExhaustion> {
        if self.remaining_time().is_zero() {
            Some(BudgetExhaustion::Time)
        } else if self.iterations >= self.config.max_iterations {
            Some(BudgetExhaustion::Iterations)
        } else if self.api_calls >= self.config.max_api_calls {
            Some(BudgetExhaustion::ApiCalls)
        } else if self.tokens_used >= self.config.max_tokens {
            Some(BudgetExhaustion::Tokens)
        } else {
            None
        }
    }

    /// Whether another full iteration may begin.
    pub fn can_start_iteration(&self) -> bool {
        self.exhausted().is_none()
    }

    /// Whether `calls` more retrieval calls fit under the ceiling.
    pub fn can_afford_calls(&self, calls: u64) -> bool {
        self.api_calls + calls <= self.config.max_api_calls
    }

    /// Whether reading `tokens` more tokens fits under the ceiling.
    pub fn can_afford_tokens(&self, tokens: u64) -> bool {
        self.tokens_used + tokens <= self.config.max_tokens
    }

    /// Record one successful retrieval call.
    pub fn record_call(&mut self) {
        self.api_calls += 1;
    }

    /// Record tokens consumed by reading documents.
    pub fn record_tokens(&mut self, tokens: u64) {
        self.tokens_used += tokens;
    }

    /// Record the start of an iteration.
    pub fn record_iteration(&mut self) {
        self.iterations += 1;
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn usage(&self) -> BudgetUsage {
        BudgetUsage {
            elapsed_ms: self.elapsed().as_millis() as u64,
            api_calls: self.api_calls,
            tokens_used: self.tokens_used,
            iterations: self.iterations,
        }
    }
}
