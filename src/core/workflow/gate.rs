//! Human-in-the-loop gate evaluation.
//!
//! Gates run twice per task. Before the action only `approval` gates are
//! consulted; after the action every gate type is, so an approval gate is
//! asked a second time once the action has run.

use crate::core::error::AppError;
use crate::core::workflow::human::Interviewer;
use crate::core::workflow::schema::{HitlGate, WorkflowTask};
use serde::{Deserialize, Serialize};
use std::fmt;

const CONTINUE_PROMPT: &str = "Continue?";
const NO_CHOICE: &str = "no";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateTiming {
    Before,
    After,
}

impl GateTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateTiming::Before => "before",
            GateTiming::After => "after",
        }
    }
}

impl fmt::Display for GateTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Continue,
    Blocked { reason: String },
    /// Proceed, then move the cursor to `target` once the task is handled.
    Redirected { target: String },
}

/// Evaluate the task's gate at `timing`, prompting through `interviewer`.
pub async fn evaluate(
    task: &WorkflowTask,
    timing: GateTiming,
    interviewer: &dyn Interviewer,
) -> Result<GateOutcome, AppError> {
    let Some(gate) = &task.hitl else {
        return Ok(GateOutcome::Continue);
    };
    if timing == GateTiming::Before && !matches!(gate, HitlGate::Approval { .. }) {
        return Ok(GateOutcome::Continue);
    }

    tracing::info!(
        task_id = %task.id,
        gate = gate.kind().as_str(),
        timing = %timing,
        interviewer = interviewer.interviewer_type(),
        "evaluating gate"
    );

    match gate {
        HitlGate::None {} => Ok(GateOutcome::Continue),
        HitlGate::Approval { message } => approval(interviewer, message).await,
        HitlGate::Question {
            message,
            options,
            on_no,
        } => {
            let decision = interviewer.request_choice(message, options).await?;
            tracing::debug!(task_id = %task.id, choice = %decision.choice, "question answered");
            match on_no {
                Some(target) if decision.choice == NO_CHOICE => Ok(GateOutcome::Redirected {
                    target: target.clone(),
                }),
                _ => Ok(GateOutcome::Continue),
            }
        }
        HitlGate::Info {
            message,
            auto_continue,
        } => {
            interviewer.notify(message);
            if *auto_continue {
                Ok(GateOutcome::Continue)
            } else {
                approval(interviewer, CONTINUE_PROMPT).await
            }
        }
    }
}

async fn approval(interviewer: &dyn Interviewer, message: &str) -> Result<GateOutcome, AppError> {
    let result = interviewer.request_approval(message).await?;
    if result.approved {
        Ok(GateOutcome::Continue)
    } else {
        let reason = if result.reason.is_empty() {
            "approval denied".to_string()
        } else {
            result.reason
        };
        tracing::info!(reason = %reason, "gate blocked");
        Ok(GateOutcome::Blocked { reason })
    }
}
