use crate::core::error::AppError;
use crate::core::workflow::action::{ActionContext, ActionHandler, ActionResult};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub struct NoOpAction;

impl NoOpAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NoOpAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for NoOpAction {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn execute(
        &self,
        _params: Map<String, Value>,
        ctx: ActionContext,
    ) -> Result<ActionResult, AppError> {
        let mut data = Map::new();
        data.insert("task_id".to_string(), Value::String(ctx.task_id));
        Ok(ActionResult::complete(data))
    }
}
