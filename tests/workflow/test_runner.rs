mod support;

use anyhow::Result;
use hitlflow::core::types::TaskStatus;
use hitlflow::core::workflow::action::ActionResult;
use hitlflow::core::workflow::human::ScriptedInterviewer;
use hitlflow::core::workflow::runner::{RunOutcome, RunnerSettings, WorkflowRunner};
use hitlflow::core::workflow::store::WorkflowStore;
use std::sync::Arc;
use support::{data, store, RecordingReporter, ScriptedExecutor};

fn runner(
    store: Arc<WorkflowStore>,
    executor: Arc<ScriptedExecutor>,
    reporter: Arc<RecordingReporter>,
) -> WorkflowRunner {
    WorkflowRunner::new(store, executor, Arc::new(ScriptedInterviewer::new()), reporter)
}

const LINEAR: &str = r#"
workflow:
  name: linear
  tasks:
    - id: a
      action: noop
    - id: b
      action: noop
    - id: c
      action: noop
"#;

#[tokio::test]
async fn complete_advances_by_exactly_one() -> Result<()> {
    let executor = Arc::new(ScriptedExecutor::new());
    let mut runner = runner(store(LINEAR), executor.clone(), Arc::default());

    assert_eq!(runner.step().await?, None);
    assert_eq!(runner.state().cursor, 1);
    assert_eq!(runner.state().status("a"), Some(TaskStatus::Complete));

    let summary = runner.run().await?;
    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(summary.cursor, 3);
    assert_eq!(summary.steps, 3);
    assert_eq!(executor.calls(), vec!["a", "b", "c"]);
    let order: Vec<&str> = summary.task_states.keys().map(String::as_str).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn error_keeps_cursor_and_counts_retry() -> Result<()> {
    let executor = Arc::new(ScriptedExecutor::new().failing("a", 1));
    let mut runner = runner(store(LINEAR), executor, Arc::default());

    runner.step().await?;
    assert_eq!(runner.state().cursor, 0);
    assert_eq!(runner.state().retry_count("a"), 1);
    assert_eq!(runner.state().status("a"), Some(TaskStatus::Retrying));

    runner.step().await?;
    assert_eq!(runner.state().cursor, 1);
    assert_eq!(runner.state().retry_count("a"), 1);
    assert_eq!(runner.state().status("a"), Some(TaskStatus::Complete));
    Ok(())
}

#[tokio::test]
async fn exhausted_retries_escalate_and_halt() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: build
      name: Build
      action: command
      retry: { max_attempts: 2 }
    - id: ship
      action: noop
"#;
    let executor = Arc::new(ScriptedExecutor::new().failing("build", 5));
    let reporter = Arc::new(RecordingReporter::default());
    let mut runner = runner(store(yaml), executor.clone(), reporter.clone());

    let summary = runner.run().await?;
    assert_eq!(
        summary.outcome,
        RunOutcome::Escalated {
            task_id: "build".to_string(),
            attempts: 2
        }
    );
    assert_eq!(summary.cursor, 0);
    assert_eq!(summary.retry_counts.get("build"), Some(&2));
    assert_eq!(executor.call_count("build"), 2);
    assert_eq!(executor.call_count("ship"), 0);

    let notices = reporter.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices[0].message,
        "Workflow error: Human intervention required."
    );
    assert_eq!(notices[0].task_name, "Build");
    assert_eq!(notices[0].max_attempts, 2);
    Ok(())
}

#[tokio::test]
async fn custom_escalation_message_is_reported() -> Result<()> {
    let yaml = r#"
workflow:
  error_handling:
    escalation_message: "Page the on-call reviewer"
  tasks:
    - id: a
      action: noop
      retry: { max_attempts: 1 }
"#;
    let reporter = Arc::new(RecordingReporter::default());
    let executor = Arc::new(ScriptedExecutor::new().failing("a", 1));
    let mut runner = runner(store(yaml), executor, reporter.clone());

    let summary = runner.run().await?;
    assert!(matches!(summary.outcome, RunOutcome::Escalated { .. }));
    assert_eq!(reporter.notices()[0].message, "Page the on-call reviewer");
    Ok(())
}

#[tokio::test]
async fn failing_check_jumps_back_then_finishes() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: a
      action: implement
    - id: b
      action: check
      conditions:
        - if: "result == 'fail'"
          then: a
    - id: c
      action: noop
"#;
    let executor = Arc::new(
        ScriptedExecutor::new()
            .push("b", ActionResult::complete(data(&[("result", "fail")])))
            .push("b", ActionResult::complete(data(&[("result", "pass")]))),
    );
    let mut runner = runner(store(yaml), executor.clone(), Arc::default());

    let summary = runner.run().await?;
    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(executor.calls(), vec!["a", "b", "a", "b", "c"]);
    Ok(())
}

#[tokio::test]
async fn first_matching_condition_wins() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: check
      action: check
      conditions:
        - if: "status == 'ok'"
          then: second
        - if: "status == 'ok'"
          then: third
      on_complete: first
    - id: first
      action: noop
      on_complete: end
    - id: second
      action: noop
      on_complete: end
    - id: third
      action: noop
    - id: end
      action: noop
"#;
    let executor = Arc::new(
        ScriptedExecutor::new().push("check", ActionResult::complete(data(&[("status", "ok")]))),
    );
    let mut runner = runner(store(yaml), executor.clone(), Arc::default());

    runner.run().await?;
    assert_eq!(executor.calls(), vec!["check", "second", "end"]);
    Ok(())
}

#[tokio::test]
async fn unknown_targets_advance_sequentially() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: a
      action: noop
      on_complete: ghost
    - id: b
      action: noop
      on_error: missing-handler
    - id: c
      action: noop
"#;
    let document = hitlflow::core::workflow::schema::WorkflowDocument::from_yaml_str(yaml, "t")?;
    assert_eq!(document.validate()?.len(), 2);

    let executor = Arc::new(ScriptedExecutor::new().failing("b", 1));
    let mut runner = runner(store(yaml), executor.clone(), Arc::default());

    let summary = runner.run().await?;
    assert_eq!(summary.outcome, RunOutcome::Finished);
    assert_eq!(executor.calls(), vec!["a", "b", "c"]);
    assert_eq!(summary.task_states["b"].status, TaskStatus::Failed);
    assert!(summary.retry_counts.is_empty());
    Ok(())
}

#[tokio::test]
async fn on_error_target_jumps_to_handler() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: deploy
      action: command
      on_error: rollback
      on_complete: done
    - id: rollback
      action: noop
    - id: done
      action: noop
"#;
    let executor = Arc::new(ScriptedExecutor::new().failing("deploy", 1));
    let mut runner = runner(store(yaml), executor.clone(), Arc::default());

    runner.run().await?;
    assert_eq!(executor.calls(), vec!["deploy", "rollback", "done"]);
    Ok(())
}

#[tokio::test]
async fn max_steps_guard_stops_jump_cycles() {
    let yaml = r#"
workflow:
  tasks:
    - id: spin
      action: noop
      on_complete: spin
"#;
    let executor = Arc::new(ScriptedExecutor::new());
    let mut runner = runner(store(yaml), executor.clone(), Arc::default())
        .with_settings(RunnerSettings { max_steps: 5 });

    let err = runner.run().await.unwrap_err();
    assert_eq!(err.code, "HFX-RUN-001");
    assert_eq!(executor.call_count("spin"), 5);
}

#[tokio::test]
async fn exhausted_retries_escalate_before_step_limit() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: build
      action: command
      retry: { max_attempts: 2 }
"#;
    let executor = Arc::new(ScriptedExecutor::new().failing("build", 5));
    let reporter = Arc::new(RecordingReporter::default());
    let mut runner = runner(store(yaml), executor.clone(), reporter.clone())
        .with_settings(RunnerSettings { max_steps: 2 });

    let summary = runner.run().await?;
    assert_eq!(
        summary.outcome,
        RunOutcome::Escalated {
            task_id: "build".to_string(),
            attempts: 2
        }
    );
    assert_eq!(summary.steps, 2);
    assert_eq!(executor.call_count("build"), 2);
    assert_eq!(reporter.notices().len(), 1);
    Ok(())
}

#[tokio::test]
async fn step_after_finish_reports_finished() -> Result<()> {
    let yaml = "workflow:\n  tasks:\n    - {id: only, action: noop}\n";
    let mut runner = runner(store(yaml), Arc::new(ScriptedExecutor::new()), Arc::default());
    assert_eq!(runner.step().await?, None);
    assert_eq!(runner.step().await?, Some(RunOutcome::Finished));
    Ok(())
}
