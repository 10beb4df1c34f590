#![allow(clippy::result_large_err)] // Runner returns AppError to preserve full diagnostic context; boxing would discard run-time state.

use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, TaskStatus};
use crate::core::workflow::action::{ActionExecutor, ActionRequest, ActionResult};
use crate::core::workflow::escalation::{EscalationNotice, EscalationReporter};
use crate::core::workflow::gate::{self, GateOutcome, GateTiming};
use crate::core::workflow::human::Interviewer;
use crate::core::workflow::schema::{ErrorTarget, WorkflowTask};
use crate::core::workflow::state::{ExecutionState, PendingGate, TaskRecord};
use crate::core::workflow::store::WorkflowStore;
use crate::core::workflow::transition::{self, TargetSource};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_MAX_STEPS: u64 = 1000;

/// Resolved runner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Upper bound on executed steps; `0` disables the guard.
    pub max_steps: u64,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// How a run (or a resumed run) stopped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Finished,
    Escalated { task_id: String, attempts: u32 },
    AwaitingInput(PendingGate),
}

/// Snapshot returned by [`WorkflowRunner::run`] and [`WorkflowRunner::resume`].
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub execution_id: Uuid,
    pub workflow: String,
    pub outcome: RunOutcome,
    pub steps: u64,
    pub cursor: usize,
    pub task_states: IndexMap<String, TaskRecord>,
    pub retry_counts: BTreeMap<String, u32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Answer supplied to a run that is awaiting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAnswer {
    /// Treat the pending gate as approved.
    Approve,
    /// Keep the run parked on the pending gate.
    Reject,
    /// Prompt the interviewer again for the pending gate.
    Ask,
}

enum TaskExecution {
    Finished {
        result: ActionResult,
        redirect: Option<String>,
    },
    Blocked(PendingGate),
}

/// Linear workflow interpreter driving one run over a [`WorkflowStore`].
pub struct WorkflowRunner {
    store: Arc<WorkflowStore>,
    executor: Arc<dyn ActionExecutor>,
    interviewer: Arc<dyn Interviewer>,
    reporter: Arc<dyn EscalationReporter>,
    settings: RunnerSettings,
    state: ExecutionState,
    started_at: DateTime<Utc>,
}

impl WorkflowRunner {
    pub fn new(
        store: Arc<WorkflowStore>,
        executor: Arc<dyn ActionExecutor>,
        interviewer: Arc<dyn Interviewer>,
        reporter: Arc<dyn EscalationReporter>,
    ) -> Self {
        Self {
            store,
            executor,
            interviewer,
            reporter,
            settings: RunnerSettings::default(),
            state: ExecutionState::new(),
            started_at: Utc::now(),
        }
    }

    pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn store(&self) -> &WorkflowStore {
        &self.store
    }

    /// Drive the workflow until it finishes, escalates, or waits for input.
    pub async fn run(&mut self) -> Result<RunSummary, AppError> {
        if let Some(pending) = &self.state.pending_gate {
            return Err(AppError::new(
                ErrorCategory::WorkflowError,
                format!(
                    "run is awaiting input on task '{}'; resume it instead",
                    pending.task_id
                ),
            )
            .with_code("HFX-RUN-003"));
        }
        tracing::info!(
            execution_id = %self.state.execution_id,
            workflow = %self.store.name(),
            tasks = self.store.len(),
            "starting workflow run"
        );
        let outcome = self.drive().await?;
        Ok(self.summary(outcome))
    }

    /// Continue a run parked on a blocked gate.
    pub async fn resume(&mut self, answer: GateAnswer) -> Result<RunSummary, AppError> {
        let pending = self.state.pending_gate.take().ok_or_else(|| {
            AppError::new(ErrorCategory::WorkflowError, "no pending gate to resume")
                .with_code("HFX-RUN-002")
        })?;
        tracing::info!(
            task_id = %pending.task_id,
            timing = %pending.timing,
            answer = ?answer,
            "resuming blocked gate"
        );

        let redirect = match answer {
            GateAnswer::Approve => None,
            GateAnswer::Reject => return Ok(self.park(pending)),
            GateAnswer::Ask => {
                let store = Arc::clone(&self.store);
                let task = self.task_at(&store, pending.task_index)?;
                match gate::evaluate(task, pending.timing, self.interviewer.as_ref()).await? {
                    GateOutcome::Continue => None,
                    GateOutcome::Redirected { target } => Some(target),
                    GateOutcome::Blocked { reason } => {
                        return Ok(self.park(PendingGate { reason, ..pending }));
                    }
                }
            }
        };

        if let Some(outcome) = self.release(pending, redirect).await? {
            return Ok(self.summary(outcome));
        }
        let outcome = self.drive().await?;
        Ok(self.summary(outcome))
    }

    async fn drive(&mut self) -> Result<RunOutcome, AppError> {
        while self.state.cursor < self.store.len() {
            if let Some(outcome) = self.step().await? {
                return Ok(outcome);
            }
        }
        tracing::info!(
            execution_id = %self.state.execution_id,
            steps = self.state.steps,
            "workflow finished"
        );
        Ok(RunOutcome::Finished)
    }

    /// Execute the task under the cursor. Returns `Some` when the run stops.
    pub async fn step(&mut self) -> Result<Option<RunOutcome>, AppError> {
        if self.state.pending_gate.is_some() {
            return Err(AppError::new(
                ErrorCategory::WorkflowError,
                "run is awaiting input; resume it before stepping",
            )
            .with_code("HFX-RUN-003"));
        }
        let index = self.state.cursor;
        if index >= self.store.len() {
            return Ok(Some(RunOutcome::Finished));
        }
        let store = Arc::clone(&self.store);
        let task = self.task_at(&store, index)?;

        let attempts = self.state.retry_count(&task.id);
        if attempts >= task.max_attempts() {
            return Ok(Some(self.escalate(task, attempts)));
        }

        if self.settings.max_steps > 0 && self.state.steps >= self.settings.max_steps {
            return Err(AppError::new(
                ErrorCategory::WorkflowError,
                format!(
                    "workflow exceeded {} steps; check for jump cycles",
                    self.settings.max_steps
                ),
            )
            .with_code("HFX-RUN-001")
            .with_suggestion("Raise runner.max_steps or set it to 0 to disable the guard"));
        }

        self.state.steps += 1;
        match self.execute_task(index, task).await? {
            TaskExecution::Finished { result, redirect } => {
                self.apply(index, task, &result, redirect);
                Ok(None)
            }
            TaskExecution::Blocked(pending) => Ok(Some(self.block(pending))),
        }
    }

    async fn execute_task(
        &mut self,
        index: usize,
        task: &WorkflowTask,
    ) -> Result<TaskExecution, AppError> {
        tracing::info!(
            task_id = %task.id,
            name = %task.display_name(),
            role = %task.role,
            action = %task.action,
            "executing task"
        );
        self.state
            .record(&task.id, TaskStatus::InProgress, &task.role, &task.action);

        match gate::evaluate(task, GateTiming::Before, self.interviewer.as_ref()).await? {
            GateOutcome::Blocked { reason } => {
                return Ok(TaskExecution::Blocked(pending_gate(
                    index,
                    task,
                    GateTiming::Before,
                    reason,
                    None,
                )));
            }
            GateOutcome::Continue | GateOutcome::Redirected { .. } => {}
        }

        self.act_and_review(index, task).await
    }

    /// Run the action, then the `after` gate.
    async fn act_and_review(
        &mut self,
        index: usize,
        task: &WorkflowTask,
    ) -> Result<TaskExecution, AppError> {
        let request = ActionRequest {
            execution_id: self.state.execution_id.to_string(),
            task_id: task.id.clone(),
            role: task.role.clone(),
            action: task.action.clone(),
            params: task.params.clone(),
        };
        let result = self.executor.execute(&request).await;
        tracing::debug!(task_id = %task.id, status = ?result.status, "action returned");

        match gate::evaluate(task, GateTiming::After, self.interviewer.as_ref()).await? {
            GateOutcome::Continue => Ok(TaskExecution::Finished {
                result,
                redirect: None,
            }),
            GateOutcome::Redirected { target } => Ok(TaskExecution::Finished {
                result,
                redirect: Some(target),
            }),
            GateOutcome::Blocked { reason } => Ok(TaskExecution::Blocked(pending_gate(
                index,
                task,
                GateTiming::After,
                reason,
                Some(result),
            ))),
        }
    }

    /// Proceed past an approved pending gate. Returns `Some` when the run stops again.
    async fn release(
        &mut self,
        pending: PendingGate,
        redirect: Option<String>,
    ) -> Result<Option<RunOutcome>, AppError> {
        let store = Arc::clone(&self.store);
        let task = self.task_at(&store, pending.task_index)?;
        match (pending.timing, pending.result) {
            (GateTiming::After, Some(result)) => {
                self.apply(pending.task_index, task, &result, redirect);
                Ok(None)
            }
            (GateTiming::After, None) => Err(AppError::new(
                ErrorCategory::InternalError,
                format!("pending gate for task '{}' lost its result", task.id),
            )
            .with_code("HFX-RUN-004")),
            (GateTiming::Before, _) => match self.act_and_review(pending.task_index, task).await? {
                TaskExecution::Finished {
                    result,
                    redirect: after_redirect,
                } => {
                    self.apply(pending.task_index, task, &result, after_redirect);
                    Ok(None)
                }
                TaskExecution::Blocked(next) => Ok(Some(self.block(next))),
            },
        }
    }

    fn apply(
        &mut self,
        index: usize,
        task: &WorkflowTask,
        result: &ActionResult,
        redirect: Option<String>,
    ) {
        if result.is_complete() {
            self.handle_complete(index, task, result);
        } else {
            self.handle_error(index, task, result);
        }
        if let Some(target) = redirect {
            tracing::info!(task_id = %task.id, target = %target, "question gate redirect");
            self.state.cursor = transition::jump_or_advance(&self.store, index, &target);
        }
    }

    fn handle_complete(&mut self, index: usize, task: &WorkflowTask, result: &ActionResult) {
        self.state.set_status(&task.id, TaskStatus::Complete);
        let (target, source) = transition::completion_target(task, &result.data);
        if let TargetSource::Condition(idx) = source {
            tracing::debug!(task_id = %task.id, condition = idx, target = %target, "condition matched");
        }
        self.state.cursor = transition::resolve(&self.store, index, target);
    }

    fn handle_error(&mut self, index: usize, task: &WorkflowTask, result: &ActionResult) {
        self.state.set_status(&task.id, TaskStatus::Failed);
        match &task.on_error {
            ErrorTarget::Retry => {
                let count = self.state.increment_retry(&task.id);
                self.state.set_status(&task.id, TaskStatus::Retrying);
                tracing::warn!(
                    task_id = %task.id,
                    attempt = count,
                    max_attempts = task.max_attempts(),
                    error = ?result.data.get("error"),
                    "task failed; retrying"
                );
            }
            ErrorTarget::Task(target) => {
                tracing::warn!(task_id = %task.id, target = %target, "task failed; jumping to error handler");
                self.state.cursor = transition::jump_or_advance(&self.store, index, target);
            }
        }
    }

    fn escalate(&mut self, task: &WorkflowTask, attempts: u32) -> RunOutcome {
        let notice = EscalationNotice {
            message: self.store.escalation_message().to_string(),
            task_id: task.id.clone(),
            task_name: task.display_name().to_string(),
            attempts,
            max_attempts: task.max_attempts(),
        };
        self.reporter.escalate(&notice);
        RunOutcome::Escalated {
            task_id: task.id.clone(),
            attempts,
        }
    }

    fn block(&mut self, pending: PendingGate) -> RunOutcome {
        tracing::info!(
            task_id = %pending.task_id,
            timing = %pending.timing,
            reason = %pending.reason,
            "run awaiting input"
        );
        self.state.pending_gate = Some(pending.clone());
        RunOutcome::AwaitingInput(pending)
    }

    fn park(&mut self, pending: PendingGate) -> RunSummary {
        let outcome = self.block(pending);
        self.summary(outcome)
    }

    fn task_at<'s>(
        &self,
        store: &'s WorkflowStore,
        index: usize,
    ) -> Result<&'s WorkflowTask, AppError> {
        store.get(index).ok_or_else(|| {
            AppError::new(
                ErrorCategory::InternalError,
                format!("cursor {} is out of range", index),
            )
            .with_code("HFX-RUN-004")
        })
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            execution_id: self.state.execution_id,
            workflow: self.store.name().to_string(),
            outcome,
            steps: self.state.steps,
            cursor: self.state.cursor,
            task_states: self.state.task_states.clone(),
            retry_counts: self
                .state
                .retry_counts
                .iter()
                .map(|(id, count)| (id.clone(), *count))
                .collect(),
            started_at: self.started_at,
            completed_at: Utc::now(),
        }
    }
}

fn pending_gate(
    index: usize,
    task: &WorkflowTask,
    timing: GateTiming,
    reason: String,
    result: Option<ActionResult>,
) -> PendingGate {
    let message = task
        .hitl
        .as_ref()
        .map(|gate| gate.message().to_string())
        .unwrap_or_default();
    PendingGate {
        task_id: task.id.clone(),
        task_index: index,
        timing,
        message,
        reason,
        result,
    }
}
