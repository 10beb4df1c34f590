use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const LINEAR: &str = r#"
workflow:
  name: linear
  tasks:
    - id: prepare
      action: noop
    - id: confirm
      action: noop
      hitl: { type: approval, message: "Proceed?" }
    - id: finish
      action: noop
"#;

const FAILING: &str = r#"
workflow:
  name: failing
  error_handling:
    escalation_message: "Broken build"
  tasks:
    - id: check
      action: echo
      params: { status: error }
      retry: { max_attempts: 2 }
"#;

fn hitlflow(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hitlflow").expect("binary built");
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("HITLFLOW_BATCH", "1")
        .env_remove("HITLFLOW_MAX_STEPS")
        .env_remove("RUST_LOG");
    cmd
}

fn workspace(files: &[(&str, &str)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("workflows");
    fs::create_dir_all(&dir).unwrap();
    for (name, body) in files {
        fs::write(dir.join(format!("{}.yaml", name)), body).unwrap();
    }
    tmp
}

#[test]
fn help_lists_commands() {
    let tmp = TempDir::new().unwrap();
    hitlflow(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("WORKFLOW COMMANDS"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn run_help_documents_environment() {
    let tmp = TempDir::new().unwrap();
    hitlflow(tmp.path())
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Environment:"))
        .stdout(predicate::str::contains("HITLFLOW_MAX_STEPS"))
        .stdout(predicate::str::contains("HITLFLOW_LIBRARY_ROOT"));
}

#[test]
fn list_prints_library_names() {
    let tmp = workspace(&[("linear", LINEAR), ("failing", FAILING)]);
    hitlflow(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout("failing\nlinear\n");
}

#[test]
fn list_reports_empty_library() {
    let tmp = TempDir::new().unwrap();
    hitlflow(tmp.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workflows found"));
}

#[test]
fn validate_accepts_library_workflow() {
    let tmp = workspace(&[("linear", LINEAR)]);
    hitlflow(tmp.path())
        .args(["validate", "linear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow OK: linear (3 tasks, 0 warnings)"))
        .stdout(predicate::str::contains("sha256:"));
}

#[test]
fn validate_rejects_duplicate_ids() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("dup.yaml");
    fs::write(
        &path,
        "workflow:\n  tasks:\n    - {id: a, action: noop}\n    - {id: a, action: noop}\n",
    )
    .unwrap();
    hitlflow(tmp.path())
        .args(["validate", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate task id"));
}

#[test]
fn show_renders_json() {
    let tmp = workspace(&[("linear", LINEAR)]);
    let output = hitlflow(tmp.path())
        .args(["show", "linear", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rendered: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rendered["workflow"]["name"], "linear");
    assert_eq!(rendered["workflow"]["tasks"][1]["hitl"]["type"], "approval");
    assert_eq!(rendered["workflow"]["tasks"][0]["on_complete"], "next");
}

#[test]
fn simulated_run_with_auto_approve_finishes() {
    let tmp = workspace(&[("linear", LINEAR)]);
    hitlflow(tmp.path())
        .args(["run", "linear", "--simulate", "--auto-approve"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow 'linear' finished"))
        .stdout(predicate::str::contains("confirm"));
}

#[test]
fn exhausted_retries_fail_the_run() {
    let tmp = workspace(&[("failing", FAILING)]);
    hitlflow(tmp.path())
        .args(["run", "failing", "--auto-approve"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Broken build"))
        .stderr(predicate::str::contains("escalated at task 'check' after 2 attempts"));
}

#[test]
fn rejected_gate_stops_awaiting_input() {
    let tmp = workspace(&[("linear", LINEAR)]);
    hitlflow(tmp.path())
        .args(["run", "linear", "--simulate"])
        .write_stdin("no\nno\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("awaiting input at task 'confirm'"));
}

#[test]
fn run_uses_active_workflow_when_none_given() {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join(".hitlflow")).unwrap();
    fs::write(
        tmp.path().join(".hitlflow").join("active-workflow.yaml"),
        "workflow:\n  name: active\n  tasks:\n    - {id: only, action: noop}\n",
    )
    .unwrap();
    hitlflow(tmp.path())
        .args(["run", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow 'active' finished"));
}

#[test]
fn max_steps_override_aborts_loop() {
    let looping = "workflow:\n  name: loop\n  tasks:\n    - {id: a, action: noop, on_complete: a}\n";
    let tmp = workspace(&[("loop", looping)]);
    hitlflow(tmp.path())
        .args(["run", "loop", "--simulate", "--max-steps", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("workflow run failed"));
}
