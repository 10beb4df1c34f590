#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::action::{ActionContext, ActionHandler, ActionResult, ActionStatus};
use async_trait::async_trait;
use serde_json::{Map, Value};

const STATUS_PARAM: &str = "status";

/// Echoes its params back as result data. The optional `status` param
/// (`complete` or `error`) selects the reported status and is not echoed.
///
/// Handy for wiring branch conditions without a real backend:
///
/// ```yaml
/// action: echo
/// params:
///   result: fail
/// ```
pub struct EchoAction;

impl EchoAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EchoAction {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_status(params: &Map<String, Value>) -> Result<ActionStatus, AppError> {
    match params.get(STATUS_PARAM) {
        None => Ok(ActionStatus::Complete),
        Some(Value::String(s)) if s == "complete" => Ok(ActionStatus::Complete),
        Some(Value::String(s)) if s == "error" => Ok(ActionStatus::Error),
        Some(other) => Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("echo status must be 'complete' or 'error', got {}", other),
        )
        .with_code("HFX-ACT-002")),
    }
}

#[async_trait]
impl ActionHandler for EchoAction {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn validate_params(&self, params: &Map<String, Value>) -> Result<(), AppError> {
        parse_status(params).map(|_| ())
    }

    async fn execute(
        &self,
        mut params: Map<String, Value>,
        _ctx: ActionContext,
    ) -> Result<ActionResult, AppError> {
        let status = parse_status(&params)?;
        params.remove(STATUS_PARAM);
        Ok(ActionResult {
            status,
            data: params,
        })
    }
}
