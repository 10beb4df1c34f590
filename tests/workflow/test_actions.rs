use anyhow::Result;
use async_trait::async_trait;
use hitlflow::core::error::AppError;
use hitlflow::core::workflow::action::{
    ActionExecutor, ActionRegistry, ActionRequest, ActionStatus, SimulatedActionExecutor,
};
use hitlflow::core::workflow::actions::command::{
    CommandExecutionOutput, CommandExecutionRequest, CommandRunner,
};
use hitlflow::core::workflow::actions::{register_builtins, register_builtins_with_deps, BuiltinActionDeps};
use hitlflow::core::workflow::escalation::ConsoleEscalationReporter;
use hitlflow::core::workflow::human::AutoApproveInterviewer;
use hitlflow::core::workflow::runner::{RunOutcome, WorkflowRunner};
use hitlflow::core::workflow::schema::WorkflowDocument;
use hitlflow::core::workflow::store::WorkflowStore;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn registry(workspace: &Path) -> ActionRegistry {
    let mut builder = ActionRegistry::builder(workspace.to_path_buf());
    register_builtins(&mut builder);
    builder.build()
}

fn request(task_id: &str, action: &str, params: Value) -> ActionRequest {
    ActionRequest {
        execution_id: "exec-1".to_string(),
        task_id: task_id.to_string(),
        role: "tester".to_string(),
        action: action.to_string(),
        params: params.as_object().cloned().unwrap_or_default(),
    }
}

#[test]
fn builtins_are_registered() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(registry(tmp.path()).names(), vec!["command", "echo", "noop"]);
}

#[tokio::test]
async fn unknown_action_becomes_error_result() {
    let tmp = TempDir::new().unwrap();
    let result = registry(tmp.path())
        .execute(&request("t", "teleport", json!({})))
        .await;
    assert_eq!(result.status, ActionStatus::Error);
    assert_eq!(result.data.get("code"), Some(&json!("HFX-ACT-001")));
    assert!(result.data["error"].as_str().unwrap().contains("teleport"));
}

#[tokio::test]
async fn noop_and_simulated_report_task_id() {
    let tmp = TempDir::new().unwrap();
    let noop = registry(tmp.path())
        .execute(&request("t1", "noop", json!({})))
        .await;
    assert!(noop.is_complete());
    assert_eq!(noop.data.get("task_id"), Some(&json!("t1")));

    let simulated = SimulatedActionExecutor
        .execute(&request("t2", "anything", json!({"x": 1})))
        .await;
    assert!(simulated.is_complete());
    assert_eq!(Value::Object(simulated.data), json!({"task_id": "t2"}));
}

#[tokio::test]
async fn command_reports_pass_and_fail() {
    let tmp = TempDir::new().unwrap();
    let registry = registry(tmp.path());

    let pass = registry
        .execute(&request("c", "command", json!({"cmd": "echo hello"})))
        .await;
    assert_eq!(pass.status, ActionStatus::Complete);
    assert_eq!(pass.data["result"], json!("pass"));
    assert_eq!(pass.data["exit_code"], json!(0));
    assert_eq!(pass.data["stdout"], json!("hello\n"));

    let fail = registry
        .execute(&request("c", "command", json!({"cmd": "exit 3"})))
        .await;
    assert_eq!(fail.status, ActionStatus::Error);
    assert_eq!(fail.data["result"], json!("fail"));
    assert_eq!(fail.data["exit_code"], json!(3));
}

#[tokio::test]
async fn command_runs_in_workspace_subdirectory() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("sub")).unwrap();
    std::fs::write(tmp.path().join("sub").join("marker.txt"), "x").unwrap();

    let result = registry(tmp.path())
        .execute(&request(
            "c",
            "command",
            json!({"cmd": "ls", "cwd": "sub", "shell": false}),
        ))
        .await;
    assert!(result.is_complete());
    assert!(result.data["stdout"].as_str().unwrap().contains("marker.txt"));
}

#[tokio::test]
async fn invalid_command_params_become_error_result() {
    let tmp = TempDir::new().unwrap();
    let result = registry(tmp.path())
        .execute(&request("c", "command", json!({"cmd": "ls", "cwd": "/"})))
        .await;
    assert_eq!(result.status, ActionStatus::Error);
    assert_eq!(result.data["code"], json!("HFX-ACT-005"));
}

#[derive(Default)]
struct FakeRunner {
    seen: Mutex<Vec<CommandExecutionRequest>>,
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(
        &self,
        request: &CommandExecutionRequest,
    ) -> Result<CommandExecutionOutput, AppError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(CommandExecutionOutput {
            stdout: b"faked".to_vec(),
            stderr: Vec::new(),
            exit_code: 0,
        })
    }
}

#[tokio::test]
async fn command_runner_can_be_injected() {
    let tmp = TempDir::new().unwrap();
    let runner = Arc::new(FakeRunner::default());
    let mut builder = ActionRegistry::builder(tmp.path().to_path_buf());
    register_builtins_with_deps(
        &mut builder,
        BuiltinActionDeps {
            command_runner: Some(runner.clone()),
        },
    );
    let registry = builder.build();

    let result = registry
        .execute(&request(
            "c",
            "command",
            json!({"cmd": "make test", "env": {"CI": "1"}}),
        ))
        .await;
    assert_eq!(result.data["stdout"], json!("faked"));

    let seen = runner.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].cmd, "make test");
    assert_eq!(seen[0].cwd, tmp.path());
    assert!(seen[0].shell);
    assert_eq!(
        seen[0].env.as_ref().and_then(|env| env.get("CI")).map(String::as_str),
        Some("1")
    );
}

#[tokio::test]
async fn echo_results_drive_branching_end_to_end() -> Result<()> {
    let tmp = TempDir::new()?;
    let yaml = r#"
workflow:
  name: echo-branching
  tasks:
    - id: check
      action: echo
      params: { result: fail }
      conditions:
        - if: "result == 'fail'"
          then: fix
      on_complete: done
    - id: skipped
      action: echo
      params: { status: error }
      retry: { max_attempts: 1 }
    - id: fix
      action: noop
    - id: done
      action: noop
"#;
    let document = WorkflowDocument::from_yaml_str(yaml, "inline")?;
    let store = Arc::new(WorkflowStore::from_document(document)?);
    let mut runner = WorkflowRunner::new(
        store,
        Arc::new(registry(tmp.path())),
        Arc::new(AutoApproveInterviewer),
        Arc::new(ConsoleEscalationReporter),
    );

    let summary = runner.run().await?;
    assert_eq!(summary.outcome, RunOutcome::Finished);
    let visited: Vec<&str> = summary.task_states.keys().map(String::as_str).collect();
    assert_eq!(visited, vec!["check", "fix", "done"]);
    Ok(())
}

#[tokio::test]
async fn echo_error_status_feeds_retry_policy() -> Result<()> {
    let tmp = TempDir::new()?;
    let yaml = r#"
workflow:
  tasks:
    - id: flaky
      action: echo
      params: { status: error, reason: "still broken" }
      retry: { max_attempts: 2 }
"#;
    let store = Arc::new(WorkflowStore::from_document(
        WorkflowDocument::from_yaml_str(yaml, "inline")?,
    )?);
    let mut runner = WorkflowRunner::new(
        store,
        Arc::new(registry(tmp.path())),
        Arc::new(AutoApproveInterviewer),
        Arc::new(ConsoleEscalationReporter),
    );

    let summary = runner.run().await?;
    assert_eq!(
        summary.outcome,
        RunOutcome::Escalated {
            task_id: "flaky".to_string(),
            attempts: 2
        }
    );
    Ok(())
}
