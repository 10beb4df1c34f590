#![allow(clippy::result_large_err)] // Workflow schema APIs return AppError to preserve structured validation context without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::condition;
use crate::core::workflow::escalation::DEFAULT_ESCALATION_MESSAGE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const NEXT_TARGET: &str = "next";
const RETRY_TARGET: &str = "retry";

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

fn default_escalation_message() -> String {
    DEFAULT_ESCALATION_MESSAGE.to_string()
}

fn default_question_options() -> Vec<String> {
    vec!["yes".to_string(), "no".to_string()]
}

fn default_auto_continue() -> bool {
    true
}

/// Root document for a workflow definition file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowDocument {
    pub workflow: WorkflowDefinition,
}

/// Workflow-level definition: ordered tasks plus escalation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowDefinition {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Role catalogue; carried through untouched.
    #[serde(default)]
    pub roles: Option<Value>,
    #[serde(default)]
    pub error_handling: ErrorHandlingSettings,
    pub tasks: Vec<WorkflowTask>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorHandlingSettings {
    #[serde(default = "default_escalation_message")]
    pub escalation_message: String,
}

impl Default for ErrorHandlingSettings {
    fn default() -> Self {
        Self {
            escalation_message: default_escalation_message(),
        }
    }
}

/// Task definition consumed by the workflow runner.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowTask {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: String,
    pub action: String,
    #[serde(default)]
    pub params: Map<String, Value>,
    #[serde(default)]
    pub hitl: Option<HitlGate>,
    #[serde(default)]
    pub conditions: Vec<BranchCondition>,
    #[serde(default)]
    pub on_complete: Target,
    #[serde(default)]
    pub on_error: ErrorTarget,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl WorkflowTask {
    /// Display label, falling back to the task id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts
    }
}

/// Human-in-the-loop gate attached to a task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HitlGate {
    Approval {
        #[serde(default)]
        message: String,
    },
    Question {
        #[serde(default)]
        message: String,
        #[serde(default = "default_question_options")]
        options: Vec<String>,
        #[serde(default)]
        on_no: Option<String>,
    },
    Info {
        #[serde(default)]
        message: String,
        #[serde(default = "default_auto_continue")]
        auto_continue: bool,
    },
    None {},
}

/// Discriminant of a [`HitlGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateKind {
    Approval,
    Question,
    Info,
    None,
}

impl GateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateKind::Approval => "approval",
            GateKind::Question => "question",
            GateKind::Info => "info",
            GateKind::None => "none",
        }
    }
}

impl HitlGate {
    pub fn kind(&self) -> GateKind {
        match self {
            HitlGate::Approval { .. } => GateKind::Approval,
            HitlGate::Question { .. } => GateKind::Question,
            HitlGate::Info { .. } => GateKind::Info,
            HitlGate::None {} => GateKind::None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            HitlGate::Approval { message }
            | HitlGate::Question { message, .. }
            | HitlGate::Info { message, .. } => message,
            HitlGate::None {} => "",
        }
    }
}

/// Branch rule evaluated against an action's result data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BranchCondition {
    #[serde(rename = "if")]
    pub expression: String,
    #[serde(rename = "then", default)]
    pub target: Target,
}

/// Destination after a completed task: the next task or a task id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Target {
    #[default]
    Next,
    Task(String),
}

impl From<String> for Target {
    fn from(value: String) -> Self {
        if value == NEXT_TARGET {
            Target::Next
        } else {
            Target::Task(value)
        }
    }
}

impl From<Target> for String {
    fn from(target: Target) -> Self {
        match target {
            Target::Next => NEXT_TARGET.to_string(),
            Target::Task(id) => id,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Next => f.write_str(NEXT_TARGET),
            Target::Task(id) => f.write_str(id),
        }
    }
}

/// Destination after a failed task: retry in place or jump to a task id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorTarget {
    #[default]
    Retry,
    Task(String),
}

impl From<String> for ErrorTarget {
    fn from(value: String) -> Self {
        if value == RETRY_TARGET {
            ErrorTarget::Retry
        } else {
            ErrorTarget::Task(value)
        }
    }
}

impl From<ErrorTarget> for String {
    fn from(target: ErrorTarget) -> Self {
        match target {
            ErrorTarget::Retry => RETRY_TARGET.to_string(),
            ErrorTarget::Task(id) => id,
        }
    }
}

impl fmt::Display for ErrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorTarget::Retry => f.write_str(RETRY_TARGET),
            ErrorTarget::Task(id) => f.write_str(id),
        }
    }
}

/// Retry configuration for a task.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RetryPolicy {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Ensure the retry policy is sane.
    pub fn validate(&self, task_id: &str) -> Result<(), AppError> {
        if self.max_attempts == 0 {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("task {}: retry.max_attempts must be >= 1", task_id),
            )
            .with_code("HFX-SCHEMA-005"));
        }
        Ok(())
    }
}

/// Non-fatal finding produced by validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub task_id: String,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {}: {}", self.task_id, self.message)
    }
}

impl WorkflowDocument {
    /// Parse a workflow document from YAML text without validating it.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, AppError> {
        serde_yaml::from_str(text).map_err(|err| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("failed to parse {}: {}", origin, err),
            )
            .with_code("HFX-SCHEMA-000")
        })
    }

    /// Validate the document. Hard failures are returned as errors; references that
    /// the runner tolerates at execution time come back as warnings.
    pub fn validate(&self) -> Result<Vec<ValidationWarning>, AppError> {
        let tasks = &self.workflow.tasks;
        if tasks.is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "workflow must define at least one task",
            )
            .with_code("HFX-SCHEMA-001"));
        }

        let mut ids = HashSet::new();
        for task in tasks {
            if task.id.trim().is_empty() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    "task id must not be empty",
                )
                .with_code("HFX-SCHEMA-003"));
            }
            if !ids.insert(task.id.as_str()) {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("duplicate task id: {}", task.id),
                )
                .with_code("HFX-SCHEMA-002"));
            }
            if task.action.trim().is_empty() {
                return Err(AppError::new(
                    ErrorCategory::ValidationError,
                    format!("task {} has empty action", task.id),
                )
                .with_code("HFX-SCHEMA-004"));
            }
            task.retry.validate(&task.id)?;
            if let Some(HitlGate::Question { options, .. }) = &task.hitl {
                if options.is_empty() {
                    return Err(AppError::new(
                        ErrorCategory::ValidationError,
                        format!("task {}: question gate requires at least one option", task.id),
                    )
                    .with_code("HFX-SCHEMA-006"));
                }
            }
        }

        let mut warnings = Vec::new();
        for task in tasks {
            if let Target::Task(target) = &task.on_complete {
                check_target(&ids, &mut warnings, &task.id, "on_complete", target);
            }
            if let ErrorTarget::Task(target) = &task.on_error {
                check_target(&ids, &mut warnings, &task.id, "on_error", target);
            }
            if let Some(HitlGate::Question {
                on_no: Some(target),
                ..
            }) = &task.hitl
            {
                check_target(&ids, &mut warnings, &task.id, "hitl.on_no", target);
            }
            for (idx, branch) in task.conditions.iter().enumerate() {
                if let Target::Task(target) = &branch.target {
                    let label = format!("conditions[{}].then", idx);
                    check_target(&ids, &mut warnings, &task.id, &label, target);
                }
                if let Err(err) = condition::parse(&branch.expression) {
                    warnings.push(ValidationWarning {
                        task_id: task.id.clone(),
                        message: format!(
                            "conditions[{}] '{}' never matches: {}",
                            idx, branch.expression, err
                        ),
                    });
                }
            }
        }

        Ok(warnings)
    }
}

fn check_target(
    ids: &HashSet<&str>,
    warnings: &mut Vec<ValidationWarning>,
    task_id: &str,
    label: &str,
    target: &str,
) {
    if !ids.contains(target) {
        warnings.push(ValidationWarning {
            task_id: task_id.to_string(),
            message: format!(
                "{} references unknown task '{}'; the runner will advance sequentially",
                label, target
            ),
        });
    }
}

/// A validated workflow document together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedWorkflow {
    pub document: WorkflowDocument,
    pub path: PathBuf,
    pub hash: String,
    pub warnings: Vec<ValidationWarning>,
}

/// Load and validate a workflow document from a YAML file.
pub fn load_workflow(path: &Path) -> Result<LoadedWorkflow, AppError> {
    let bytes = fs::read(path).map_err(|err| {
        AppError::new(
            ErrorCategory::IoError,
            format!("failed to read {}: {}", path.display(), err),
        )
        .with_code("HFX-SCHEMA-010")
    })?;
    let text = String::from_utf8_lossy(&bytes);
    let document = WorkflowDocument::from_yaml_str(&text, &path.display().to_string())?;
    let warnings = document.validate()?;
    for warning in &warnings {
        tracing::warn!(workflow = %path.display(), "{}", warning);
    }
    Ok(LoadedWorkflow {
        document,
        path: path.to_path_buf(),
        hash: compute_sha256_hex(&bytes),
        warnings,
    })
}

/// Compute the SHA-256 hash encoded as lowercase hex.
pub fn compute_sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
