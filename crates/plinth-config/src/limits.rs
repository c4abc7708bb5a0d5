//! Per-invocation resource ceilings.
//!
//! The engine grants each plugin invocation a wall-clock budget and a memory
//! ceiling. The budget is enforced inside the runtime; exceeding either limit
//! aborts the invocation and surfaces an execution error to the caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_INVOCATION_BUDGET_MS, DEFAULT_MEMORY_LIMIT_BYTES};

/// Resource ceilings applied to every plugin invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationLimits {
    budget_ms: u64,
    memory_limit_bytes: Option<usize>,
}

impl Default for InvocationLimits {
    fn default() -> Self {
        Self {
            budget_ms: DEFAULT_INVOCATION_BUDGET_MS,
            memory_limit_bytes: Some(DEFAULT_MEMORY_LIMIT_BYTES),
        }
    }
}

impl InvocationLimits {
    /// Creates limits with the given budget and memory ceiling.
    #[must_use]
    pub fn new(budget: Duration, memory_limit_bytes: Option<usize>) -> Self {
        Self {
            budget_ms: u64::try_from(budget.as_millis()).unwrap_or(u64::MAX),
            memory_limit_bytes,
        }
    }

    /// Wall-clock budget for one invocation.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        Duration::from_millis(self.budget_ms)
    }

    /// Wall-clock budget in milliseconds.
    #[must_use]
    pub const fn budget_ms(&self) -> u64 {
        self.budget_ms
    }

    /// Memory ceiling in bytes, `None` for unbounded.
    #[must_use]
    pub const fn memory_limit_bytes(&self) -> Option<usize> {
        self.memory_limit_bytes
    }

    /// Overrides the wall-clock budget.
    #[must_use]
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget_ms = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Overrides the memory ceiling.
    #[must_use]
    pub const fn with_memory_limit_bytes(mut self, bytes: Option<usize>) -> Self {
        self.memory_limit_bytes = bytes;
        self
    }
}
