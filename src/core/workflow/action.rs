#![allow(clippy::result_large_err)] // Action handlers return AppError directly for structured diagnostics without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Outcome reported by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Complete,
    Error,
}

/// Result object handed back to the runner for completion/error handling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub status: ActionStatus,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl ActionResult {
    pub fn complete(data: Map<String, Value>) -> Self {
        Self {
            status: ActionStatus::Complete,
            data,
        }
    }

    pub fn error(data: Map<String, Value>) -> Self {
        Self {
            status: ActionStatus::Error,
            data,
        }
    }

    /// Error result carrying the failure's code and message.
    pub fn from_app_error(err: &AppError) -> Self {
        let mut data = Map::new();
        data.insert("error".to_string(), Value::String(err.message.clone()));
        data.insert("code".to_string(), Value::String(err.code.clone()));
        Self::error(data)
    }

    pub fn is_complete(&self) -> bool {
        self.status == ActionStatus::Complete
    }
}

/// Everything an executor needs to run one task's action.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub execution_id: String,
    pub task_id: String,
    pub role: String,
    pub action: String,
    pub params: Map<String, Value>,
}

/// Port through which the runner delegates real work. Never fails: problems are
/// reported as an `error` result.
#[async_trait]
pub trait ActionExecutor: Send + Sync + 'static {
    async fn execute(&self, request: &ActionRequest) -> ActionResult;
}

/// Context passed to each handler invocation.
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub workspace_path: PathBuf,
    pub execution_id: String,
    pub task_id: String,
    pub role: String,
}

/// Named unit of work registered in an [`ActionRegistry`].
#[async_trait]
pub trait ActionHandler: Send + Sync + 'static {
    /// Action name used in workflow definitions.
    fn name(&self) -> &'static str;

    /// Validate params ahead of execution.
    fn validate_params(&self, _params: &Map<String, Value>) -> Result<(), AppError> {
        Ok(())
    }

    async fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ActionContext,
    ) -> Result<ActionResult, AppError>;
}

/// Builder used to register handlers before execution.
pub struct ActionRegistryBuilder {
    workspace_path: PathBuf,
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionRegistryBuilder {
    pub fn new(workspace_path: PathBuf) -> Self {
        Self {
            workspace_path,
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: ActionHandler>(&mut self, handler: T) -> &mut Self {
        let name = handler.name();
        if self.handlers.contains_key(name) {
            panic!("duplicate action registered: {}", name);
        }
        self.handlers.insert(name.to_string(), Arc::new(handler));
        self
    }

    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            workspace_path: self.workspace_path,
            inner: Arc::new(self.handlers),
        }
    }
}

/// Immutable handler registry; dispatches requests by action name.
#[derive(Clone)]
pub struct ActionRegistry {
    workspace_path: PathBuf,
    inner: Arc<HashMap<String, Arc<dyn ActionHandler>>>,
}

impl ActionRegistry {
    pub fn builder(workspace_path: PathBuf) -> ActionRegistryBuilder {
        ActionRegistryBuilder::new(workspace_path)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ActionHandler>> {
        self.inner.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.inner.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    async fn dispatch(&self, request: &ActionRequest) -> Result<ActionResult, AppError> {
        let handler = self.get(&request.action).ok_or_else(|| {
            AppError::new(
                ErrorCategory::ActionError,
                format!("action '{}' is not registered", request.action),
            )
            .with_code("HFX-ACT-001")
        })?;
        handler.validate_params(&request.params)?;
        let ctx = ActionContext {
            workspace_path: self.workspace_path.clone(),
            execution_id: request.execution_id.clone(),
            task_id: request.task_id.clone(),
            role: request.role.clone(),
        };
        handler.execute(request.params.clone(), ctx).await
    }
}

#[async_trait]
impl ActionExecutor for ActionRegistry {
    async fn execute(&self, request: &ActionRequest) -> ActionResult {
        match self.dispatch(request).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    task_id = %request.task_id,
                    action = %request.action,
                    code = %err.code,
                    "action failed: {}",
                    err.message
                );
                ActionResult::from_app_error(&err)
            }
        }
    }
}

/// Executor that performs no work and reports every task complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedActionExecutor;

#[async_trait]
impl ActionExecutor for SimulatedActionExecutor {
    async fn execute(&self, request: &ActionRequest) -> ActionResult {
        let params = Value::Object(request.params.clone());
        tracing::info!(
            task_id = %request.task_id,
            role = %request.role,
            action = %request.action,
            params = %params,
            "simulating action"
        );
        let mut data = Map::new();
        data.insert("task_id".to_string(), Value::String(request.task_id.clone()));
        ActionResult::complete(data)
    }
}
