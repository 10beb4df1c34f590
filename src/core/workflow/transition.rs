//! Resolution of the next cursor position.

use crate::core::workflow::condition;
use crate::core::workflow::schema::{Target, WorkflowTask};
use crate::core::workflow::store::WorkflowStore;
use serde_json::{Map, Value};

/// Which rule produced the completion target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSource {
    Condition(usize),
    OnComplete,
}

/// Pick the target for a completed task: first matching condition, else `on_complete`.
pub fn completion_target<'a>(
    task: &'a WorkflowTask,
    data: &Map<String, Value>,
) -> (&'a Target, TargetSource) {
    task.conditions
        .iter()
        .enumerate()
        .find(|(_, branch)| condition::evaluate(&branch.expression, data))
        .map(|(idx, branch)| (&branch.target, TargetSource::Condition(idx)))
        .unwrap_or((&task.on_complete, TargetSource::OnComplete))
}

/// Resolve a target relative to `current`. Unknown task ids advance by one.
pub fn resolve(store: &WorkflowStore, current: usize, target: &Target) -> usize {
    match target {
        Target::Next => current + 1,
        Target::Task(task_id) => jump_or_advance(store, current, task_id),
    }
}

/// Position of `task_id`, or `current + 1` with a warning when it does not exist.
pub fn jump_or_advance(store: &WorkflowStore, current: usize, task_id: &str) -> usize {
    match store.position(task_id) {
        Some(position) => {
            tracing::debug!(from = current, to = position, task_id, "jumping to task");
            position
        }
        None => {
            tracing::warn!(
                task_id,
                "task '{}' not found; continuing to next task",
                task_id
            );
            current + 1
        }
    }
}
