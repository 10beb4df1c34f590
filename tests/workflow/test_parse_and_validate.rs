use anyhow::Result;
use hitlflow::core::workflow::schema::{
    load_workflow, ErrorTarget, GateKind, HitlGate, Target, WorkflowDocument,
};
use std::fs;
use tempfile::TempDir;

const FULL: &str = r#"
workflow:
  name: release
  version: "1.2"
  description: Ship a release with a human sign-off
  roles:
    engineer: { model: any }
    reviewer: {}
  error_handling:
    escalation_message: "Release blocked"
  tasks:
    - id: build
      name: Build artifacts
      role: engineer
      action: command
      params: { cmd: "make dist" }
      retry: { max_attempts: 5 }
    - id: review
      role: reviewer
      action: review
      hitl:
        type: question
        message: "Ship it?"
        options: [yes, no, later]
        on_no: build
      conditions:
        - if: "verdict == 'reject'"
          then: build
        - if: "verdict == \"skip\""
          then: next
      on_complete: publish
      on_error: build
    - id: publish
      action: command
      hitl: { type: approval, message: "Publish?" }
"#;

#[test]
fn parses_full_document() -> Result<()> {
    let document = WorkflowDocument::from_yaml_str(FULL, "inline")?;
    assert!(document.validate()?.is_empty());

    let workflow = &document.workflow;
    assert_eq!(workflow.name.as_deref(), Some("release"));
    assert_eq!(workflow.error_handling.escalation_message, "Release blocked");
    assert!(workflow.roles.is_some());

    let build = &workflow.tasks[0];
    assert_eq!(build.display_name(), "Build artifacts");
    assert_eq!(build.max_attempts(), 5);
    assert_eq!(build.params["cmd"], serde_json::json!("make dist"));

    let review = &workflow.tasks[1];
    assert_eq!(review.on_complete, Target::Task("publish".to_string()));
    assert_eq!(review.on_error, ErrorTarget::Task("build".to_string()));
    assert_eq!(review.conditions[1].target, Target::Next);
    match review.hitl.as_ref() {
        Some(HitlGate::Question { options, on_no, .. }) => {
            assert_eq!(options, &vec!["yes", "no", "later"]);
            assert_eq!(on_no.as_deref(), Some("build"));
        }
        other => panic!("unexpected gate {:?}", other),
    }

    assert_eq!(
        workflow.tasks[2].hitl.as_ref().map(HitlGate::kind),
        Some(GateKind::Approval)
    );
    Ok(())
}

#[test]
fn hard_validation_errors_carry_codes() {
    let cases = [
        ("workflow:\n  tasks: []\n", "HFX-SCHEMA-001"),
        (
            "workflow:\n  tasks:\n    - {id: a, action: noop}\n    - {id: a, action: noop}\n",
            "HFX-SCHEMA-002",
        ),
        ("workflow:\n  tasks:\n    - {id: ' ', action: noop}\n", "HFX-SCHEMA-003"),
        ("workflow:\n  tasks:\n    - {id: a, action: ''}\n", "HFX-SCHEMA-004"),
        (
            "workflow:\n  tasks:\n    - {id: a, action: noop, retry: {max_attempts: 0}}\n",
            "HFX-SCHEMA-005",
        ),
        (
            "workflow:\n  tasks:\n    - {id: a, action: noop, hitl: {type: question, options: []}}\n",
            "HFX-SCHEMA-006",
        ),
    ];
    for (yaml, code) in cases {
        let document = WorkflowDocument::from_yaml_str(yaml, "inline").unwrap();
        let err = document.validate().unwrap_err();
        assert_eq!(err.code, code, "yaml: {}", yaml);
    }
}

#[test]
fn malformed_yaml_and_unknown_gate_fail_to_parse() {
    for yaml in [
        "workflow: [unclosed",
        "workflow:\n  tasks:\n    - {id: a, action: noop, hitl: {type: vote}}\n",
        "tasks: []\n",
    ] {
        let err = WorkflowDocument::from_yaml_str(yaml, "inline").unwrap_err();
        assert_eq!(err.code, "HFX-SCHEMA-000");
    }
}

#[test]
fn dangling_references_and_bad_conditions_are_warnings() -> Result<()> {
    let yaml = r#"
workflow:
  tasks:
    - id: a
      action: noop
      on_complete: nowhere
      conditions:
        - if: "result = 'x'"
          then: a
        - if: "result == 'y'"
          then: elsewhere
      hitl: { type: question, on_no: gone }
"#;
    let warnings = WorkflowDocument::from_yaml_str(yaml, "inline")?.validate()?;
    let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
    assert_eq!(messages.len(), 4, "{:?}", messages);
    assert!(messages.iter().any(|m| m.contains("on_complete") && m.contains("nowhere")));
    assert!(messages.iter().any(|m| m.contains("hitl.on_no") && m.contains("gone")));
    assert!(messages.iter().any(|m| m.contains("conditions[1].then")));
    assert!(messages.iter().any(|m| m.contains("never matches")));
    Ok(())
}

#[test]
fn load_workflow_hashes_file_contents() -> Result<()> {
    let tmp = TempDir::new()?;
    let path = tmp.path().join("flow.yaml");
    fs::write(&path, FULL)?;

    let first = load_workflow(&path)?;
    assert_eq!(first.hash.len(), 64);
    assert_eq!(first.path, path);
    assert_eq!(load_workflow(&path)?.hash, first.hash);

    fs::write(&path, FULL.replace("1.2", "1.3"))?;
    assert_ne!(load_workflow(&path)?.hash, first.hash);
    Ok(())
}

#[test]
fn load_workflow_reports_missing_file() {
    let tmp = TempDir::new().unwrap();
    let err = load_workflow(&tmp.path().join("absent.yaml")).unwrap_err();
    assert_eq!(err.code, "HFX-SCHEMA-010");
}
