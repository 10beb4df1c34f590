#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::schema::{WorkflowDefinition, WorkflowDocument, WorkflowTask};
use std::collections::HashMap;

const UNNAMED_WORKFLOW: &str = "unnamed-workflow";

/// Read-only, ordered task list with id lookup.
#[derive(Debug, Clone)]
pub struct WorkflowStore {
    name: String,
    escalation_message: String,
    tasks: Vec<WorkflowTask>,
    positions: HashMap<String, usize>,
}

impl WorkflowStore {
    pub fn new(definition: WorkflowDefinition) -> Result<Self, AppError> {
        if definition.tasks.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "workflow must define at least one task",
            )
            .with_code("HFX-SCHEMA-001"));
        }
        let mut positions = HashMap::with_capacity(definition.tasks.len());
        for (idx, task) in definition.tasks.iter().enumerate() {
            if positions.insert(task.id.clone(), idx).is_some() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("duplicate task id: {}", task.id),
                )
                .with_code("HFX-SCHEMA-002"));
            }
        }
        Ok(Self {
            name: definition
                .name
                .unwrap_or_else(|| UNNAMED_WORKFLOW.to_string()),
            escalation_message: definition.error_handling.escalation_message,
            tasks: definition.tasks,
            positions,
        })
    }

    pub fn from_document(document: WorkflowDocument) -> Result<Self, AppError> {
        Self::new(document.workflow)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn escalation_message(&self) -> &str {
        &self.escalation_message
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WorkflowTask> {
        self.tasks.get(index)
    }

    pub fn tasks(&self) -> &[WorkflowTask] {
        &self.tasks
    }

    /// Position of the task with the given id.
    pub fn position(&self, task_id: &str) -> Option<usize> {
        self.positions.get(task_id).copied()
    }
}
