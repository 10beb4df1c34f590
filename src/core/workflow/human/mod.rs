//! Human interaction port used by HITL gates.

use crate::core::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Default outcome applied when an approval times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDefault {
    Approve,
    #[default]
    Reject,
}

impl ApprovalDefault {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalDefault::Approve => "approve",
            ApprovalDefault::Reject => "reject",
        }
    }
}

impl FromStr for ApprovalDefault {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "approve" => Ok(ApprovalDefault::Approve),
            "reject" => Ok(ApprovalDefault::Reject),
            _ => Err("must be 'approve' or 'reject'"),
        }
    }
}

impl std::fmt::Display for ApprovalDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Prompt behaviour shared by interactive interviewers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HumanSettings {
    /// Prompt timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub default_on_timeout: ApprovalDefault,
}

/// Result returned from an approval prompt.
#[derive(Debug, Clone)]
pub struct ApprovalResult {
    pub approved: bool,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    pub timeout_applied: bool,
    pub default_used: bool,
}

impl ApprovalResult {
    pub fn with_defaults(approved: bool, reason: impl Into<String>) -> Self {
        Self {
            approved,
            reason: reason.into(),
            timestamp: Utc::now(),
            timeout_applied: false,
            default_used: false,
        }
    }
}

/// Result returned from a multi-choice prompt.
#[derive(Debug, Clone)]
pub struct DecisionResult {
    pub choice: String,
    pub timestamp: DateTime<Utc>,
    pub timeout_applied: bool,
    pub default_used: bool,
    pub response_text: Option<String>,
}

impl DecisionResult {
    pub fn with_defaults(choice: impl Into<String>) -> Self {
        Self {
            choice: choice.into(),
            timestamp: Utc::now(),
            timeout_applied: false,
            default_used: false,
            response_text: None,
        }
    }
}

/// Interface for human input requested by workflow gates.
#[async_trait]
pub trait Interviewer: Send + Sync + 'static {
    /// Short identifier used in log records.
    fn interviewer_type(&self) -> &'static str;

    async fn request_approval(&self, message: &str) -> Result<ApprovalResult, AppError>;

    async fn request_choice(
        &self,
        message: &str,
        options: &[String],
    ) -> Result<DecisionResult, AppError>;

    /// Display a message that needs no answer.
    fn notify(&self, message: &str) {
        tracing::info!(interviewer = self.interviewer_type(), "{}", message);
    }
}

pub mod console;
pub mod scripted;

pub use console::ConsoleInterviewer;
pub use scripted::{AutoApproveInterviewer, ScriptedInterviewer};
