#![allow(clippy::result_large_err)] // Command action returns AppError to surface shell execution diagnostics without boxing.

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::action::{ActionContext, ActionHandler, ActionResult};
use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;

const OUTPUT_CAPTURE_LIMIT_BYTES: usize = 1_048_576;

/// Runs `params.cmd` in the workspace and reports `result: pass|fail`.
pub struct CommandAction {
    runner: Arc<dyn CommandRunner>,
}

impl CommandAction {
    pub fn new() -> Self {
        Self {
            runner: Arc::new(TokioCommandRunner),
        }
    }

    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl Default for CommandAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionHandler for CommandAction {
    fn name(&self) -> &'static str {
        "command"
    }

    fn validate_params(&self, params: &Map<String, Value>) -> Result<(), AppError> {
        CommandParams::from_map(params).map(|_| ())
    }

    async fn execute(
        &self,
        params: Map<String, Value>,
        ctx: ActionContext,
    ) -> Result<ActionResult, AppError> {
        let parsed = CommandParams::from_map(&params)?;
        let cwd = parsed
            .cwd
            .as_deref()
            .map(|cwd| ctx.workspace_path.join(cwd))
            .unwrap_or_else(|| ctx.workspace_path.clone());

        tracing::debug!(
            task_id = %ctx.task_id,
            cmd = %parsed.cmd,
            cwd = %cwd.display(),
            shell = parsed.shell,
            "executing command"
        );

        let start = Instant::now();
        let output = self
            .runner
            .run(&CommandExecutionRequest {
                cmd: parsed.cmd.clone(),
                cwd,
                env: parsed.env.clone(),
                shell: parsed.shell,
            })
            .await?;
        let duration_ms = start.elapsed().as_millis() as u64;

        let passed = output.exit_code == 0;
        let data = Map::from_iter([
            (
                "exit_code".to_string(),
                Value::Number(Number::from(output.exit_code)),
            ),
            ("stdout".to_string(), Value::String(limit_bytes(&output.stdout))),
            ("stderr".to_string(), Value::String(limit_bytes(&output.stderr))),
            (
                "duration_ms".to_string(),
                Value::Number(Number::from(duration_ms)),
            ),
            (
                "result".to_string(),
                Value::String(if passed { "pass" } else { "fail" }.to_string()),
            ),
        ]);

        if passed {
            Ok(ActionResult::complete(data))
        } else {
            tracing::warn!(
                task_id = %ctx.task_id,
                exit_code = output.exit_code,
                "command exited with non-zero status"
            );
            Ok(ActionResult::error(data))
        }
    }
}

#[derive(Clone, Debug)]
pub struct CommandExecutionRequest {
    pub cmd: String,
    pub cwd: PathBuf,
    pub env: Option<HashMap<String, String>>,
    pub shell: bool,
}

#[derive(Clone, Debug)]
pub struct CommandExecutionOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

#[async_trait]
pub trait CommandRunner: Send + Sync + 'static {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError>;
}

struct TokioCommandRunner;

#[async_trait]
impl CommandRunner for TokioCommandRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        let mut command = if request.shell {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&request.cmd);
            cmd
        } else {
            let mut parts = request.cmd.split_whitespace();
            let program = parts.next().ok_or_else(|| {
                AppError::new(ErrorCategory::ValidationError, "cmd string is empty")
                    .with_code("HFX-ACT-003")
            })?;
            let mut cmd = Command::new(program);
            cmd.args(parts);
            cmd
        };

        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .current_dir(&request.cwd);
        if let Some(env_map) = &request.env {
            command.envs(env_map);
        }

        let output = command.output().await.map_err(|err| {
            AppError::new(
                ErrorCategory::ActionError,
                format!("failed to execute command: {}", err),
            )
            .with_code("HFX-ACT-004")
        })?;

        Ok(CommandExecutionOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

struct CommandParams {
    cmd: String,
    cwd: Option<String>,
    env: Option<HashMap<String, String>>,
    shell: bool,
}

impl CommandParams {
    fn from_map(map: &Map<String, Value>) -> Result<Self, AppError> {
        let cmd = map
            .get("cmd")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AppError::new(
                    ErrorCategory::ValidationError,
                    "command action requires a non-empty cmd",
                )
                .with_code("HFX-ACT-003")
            })?
            .to_string();

        let cwd = map
            .get("cwd")
            .and_then(Value::as_str)
            .map(str::trim)
            .map(str::to_string);
        if let Some(cwd_str) = &cwd {
            if Path::new(cwd_str).is_absolute() {
                return Err(
                    AppError::new(ErrorCategory::ValidationError, "cwd must be relative")
                        .with_code("HFX-ACT-005"),
                );
            }
        }

        let env = map.get("env").and_then(Value::as_object).map(|env_map| {
            env_map
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
                .collect::<HashMap<_, _>>()
        });

        let shell = map.get("shell").and_then(Value::as_bool).unwrap_or(true);

        Ok(Self {
            cmd,
            cwd,
            env,
            shell,
        })
    }
}

fn limit_bytes(bytes: &[u8]) -> String {
    let limit = OUTPUT_CAPTURE_LIMIT_BYTES.min(bytes.len());
    String::from_utf8_lossy(&bytes[..limit]).into_owned()
}
