use crate::core::types::TaskStatus;
use crate::core::workflow::action::ActionResult;
use crate::core::workflow::gate::GateTiming;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Per-task record kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub status: TaskStatus,
    pub role: String,
    pub action: String,
}

/// Gate a blocked run is waiting on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingGate {
    pub task_id: String,
    pub task_index: usize,
    pub timing: GateTiming,
    pub message: String,
    pub reason: String,
    /// Action result held back by an `after` block.
    pub result: Option<ActionResult>,
}

/// Mutable state of a single run. Owned by one runner and never persisted.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub execution_id: Uuid,
    pub cursor: usize,
    pub task_states: IndexMap<String, TaskRecord>,
    pub retry_counts: HashMap<String, u32>,
    pub pending_gate: Option<PendingGate>,
    pub steps: u64,
}

impl ExecutionState {
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            cursor: 0,
            task_states: IndexMap::new(),
            retry_counts: HashMap::new(),
            pending_gate: None,
            steps: 0,
        }
    }

    pub fn record(&mut self, task_id: &str, status: TaskStatus, role: &str, action: &str) {
        self.task_states.insert(
            task_id.to_string(),
            TaskRecord {
                status,
                role: role.to_string(),
                action: action.to_string(),
            },
        );
    }

    /// Update the status of an already recorded task.
    pub fn set_status(&mut self, task_id: &str, status: TaskStatus) {
        if let Some(record) = self.task_states.get_mut(task_id) {
            record.status = status;
        }
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.task_states.get(task_id).map(|record| record.status)
    }

    pub fn retry_count(&self, task_id: &str) -> u32 {
        self.retry_counts.get(task_id).copied().unwrap_or(0)
    }

    /// Bump the retry counter and return the new value.
    pub fn increment_retry(&mut self, task_id: &str) -> u32 {
        let count = self.retry_counts.entry(task_id.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

impl Default for ExecutionState {
    fn default() -> Self {
        Self::new()
    }
}
