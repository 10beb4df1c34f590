use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::human::{ApprovalResult, DecisionResult, Interviewer};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Interviewer replaying queued answers. Every prompt is recorded.
#[derive(Default)]
pub struct ScriptedInterviewer {
    approvals: Mutex<VecDeque<bool>>,
    choices: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedInterviewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_approvals(self, answers: impl IntoIterator<Item = bool>) -> Self {
        lock(&self.approvals).extend(answers);
        self
    }

    pub fn with_choices<S: Into<String>>(self, answers: impl IntoIterator<Item = S>) -> Self {
        lock(&self.choices).extend(answers.into_iter().map(Into::into));
        self
    }

    /// Messages shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    fn exhausted(kind: &str, message: &str) -> AppError {
        AppError::new(
            ErrorCategory::InteractionError,
            format!("no scripted {} answer left for '{}'", kind, message),
        )
        .with_code("HFX-HUMAN-002")
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Interviewer for ScriptedInterviewer {
    fn interviewer_type(&self) -> &'static str {
        "scripted"
    }

    async fn request_approval(&self, message: &str) -> Result<ApprovalResult, AppError> {
        lock(&self.prompts).push(message.to_string());
        let approved = lock(&self.approvals)
            .pop_front()
            .ok_or_else(|| Self::exhausted("approval", message))?;
        Ok(ApprovalResult::with_defaults(approved, "scripted"))
    }

    async fn request_choice(
        &self,
        message: &str,
        _options: &[String],
    ) -> Result<DecisionResult, AppError> {
        lock(&self.prompts).push(message.to_string());
        let choice = lock(&self.choices)
            .pop_front()
            .ok_or_else(|| Self::exhausted("choice", message))?;
        Ok(DecisionResult::with_defaults(choice))
    }
}

/// Non-interactive interviewer: approves everything and picks the first option.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApproveInterviewer;

#[async_trait]
impl Interviewer for AutoApproveInterviewer {
    fn interviewer_type(&self) -> &'static str {
        "auto"
    }

    async fn request_approval(&self, message: &str) -> Result<ApprovalResult, AppError> {
        tracing::info!(message, "auto-approving");
        Ok(ApprovalResult::with_defaults(true, "auto-approve"))
    }

    async fn request_choice(
        &self,
        message: &str,
        options: &[String],
    ) -> Result<DecisionResult, AppError> {
        let choice = options.first().cloned().unwrap_or_default();
        tracing::info!(message, choice = %choice, "auto-selecting first option");
        Ok(DecisionResult::with_defaults(choice))
    }
}
