use crate::cli::args::{ListArgs, RunArgs, ShowArgs, ShowFormat, ValidateArgs};
use crate::core::config::{ConfigLoader, HitlflowConfig};
use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use crate::core::types::ErrorCategory;
use crate::core::workflow::action::{ActionExecutor, ActionRegistry, SimulatedActionExecutor};
use crate::core::workflow::actions;
use crate::core::workflow::escalation::ConsoleEscalationReporter;
use crate::core::workflow::human::{AutoApproveInterviewer, ConsoleInterviewer, Interviewer};
use crate::core::workflow::library::WorkflowLibrary;
use crate::core::workflow::runner::{GateAnswer, RunOutcome, RunSummary, WorkflowRunner};
use crate::core::workflow::schema::{HitlGate, LoadedWorkflow, WorkflowTask};
use crate::core::workflow::store::WorkflowStore;
use crate::Result;
use anyhow::{anyhow, bail, Context};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub async fn run(args: RunArgs) -> Result<()> {
    let workspace = match &args.workspace {
        Some(path) => path.clone(),
        None => env::current_dir().context("failed to resolve current directory")?,
    };
    let config = ConfigLoader::load(&workspace, args.config.as_deref())?;
    let loaded = match &args.workflow {
        Some(reference) => library_for(&workspace, &config).resolve(reference)?,
        None => WorkflowLibrary::active(&workspace)?.ok_or_else(|| {
            anyhow!(
                "no workflow given and {} has no .hitlflow/active-workflow.yaml",
                workspace.display()
            )
        })?,
    };
    report_warnings(&loaded);
    tracing::info!(
        workflow = %loaded.path.display(),
        sha256 = %loaded.hash,
        simulate = args.simulate,
        auto_approve = args.auto_approve,
        "loaded workflow"
    );

    let store = Arc::new(WorkflowStore::from_document(loaded.document)?);
    let executor: Arc<dyn ActionExecutor> = if args.simulate {
        Arc::new(SimulatedActionExecutor)
    } else {
        let mut builder = ActionRegistry::builder(workspace.clone());
        actions::register_builtins(&mut builder);
        Arc::new(builder.build())
    };
    let interviewer: Arc<dyn Interviewer> = if args.auto_approve {
        Arc::new(AutoApproveInterviewer)
    } else {
        Arc::new(ConsoleInterviewer::with_settings(config.human_settings()))
    };

    let mut settings = config.runner_settings();
    if let Some(max_steps) = args.max_steps {
        settings.max_steps = max_steps;
    }

    let mut runner = WorkflowRunner::new(
        store,
        executor,
        Arc::clone(&interviewer),
        Arc::new(ConsoleEscalationReporter),
    )
    .with_settings(settings);

    println!("Running workflow '{}'", runner.store().name());
    let mut summary = runner.run().await.map_err(report_app_error)?;

    // A blocked gate can be asked again until it is approved or the operator gives up.
    while let RunOutcome::AwaitingInput(pending) = &summary.outcome {
        if args.auto_approve {
            break;
        }
        println!(
            "Task '{}' is blocked at its {} gate: {}",
            pending.task_id, pending.timing, pending.reason
        );
        let retry = interviewer
            .request_approval("Ask again?")
            .await
            .map_err(report_app_error)?;
        if !retry.approved {
            break;
        }
        summary = runner
            .resume(GateAnswer::Ask)
            .await
            .map_err(report_app_error)?;
    }

    print_summary(&summary);
    match &summary.outcome {
        RunOutcome::Finished => Ok(()),
        RunOutcome::Escalated { task_id, attempts } => bail!(
            "workflow escalated at task '{}' after {} attempts",
            task_id,
            attempts
        ),
        RunOutcome::AwaitingInput(pending) => bail!(
            "workflow stopped awaiting input at task '{}'",
            pending.task_id
        ),
    }
}

pub fn validate(args: ValidateArgs) -> Result<()> {
    let loaded = resolve_from_cwd(&args.workflow)?;
    report_warnings(&loaded);
    let workflow = &loaded.document.workflow;
    println!(
        "Workflow OK: {} ({} tasks, {} warnings)",
        workflow.name.as_deref().unwrap_or("unnamed-workflow"),
        workflow.tasks.len(),
        loaded.warnings.len()
    );
    println!("sha256: {}", loaded.hash);
    Ok(())
}

pub fn show(args: ShowArgs) -> Result<()> {
    let loaded = resolve_from_cwd(&args.workflow)?;
    match args.format {
        ShowFormat::Json => {
            let rendered = serde_json::to_string_pretty(&loaded.document)
                .context("failed to render workflow as JSON")?;
            println!("{}", rendered);
        }
        ShowFormat::Text => print_workflow(&loaded),
    }
    Ok(())
}

pub fn list(args: ListArgs) -> Result<()> {
    let root = match args.root {
        Some(root) => root,
        None => {
            let cwd = env::current_dir().context("failed to resolve current directory")?;
            let config = ConfigLoader::load_from_workspace(&cwd)?;
            cwd.join(&config.library.root)
        }
    };
    let library = WorkflowLibrary::new(root);
    let names = library.list()?;
    if names.is_empty() {
        println!("No workflows found in {}", library.workflows_dir().display());
        return Ok(());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

fn library_for(workspace: &Path, config: &HitlflowConfig) -> WorkflowLibrary {
    WorkflowLibrary::new(workspace.join(&config.library.root))
}

fn resolve_from_cwd(reference: &str) -> Result<LoadedWorkflow> {
    let cwd: PathBuf = env::current_dir().context("failed to resolve current directory")?;
    let config = ConfigLoader::load_from_workspace(&cwd)?;
    Ok(library_for(&cwd, &config).resolve(reference)?)
}

fn report_warnings(loaded: &LoadedWorkflow) {
    let reporter = DefaultErrorReporter::new();
    for warning in &loaded.warnings {
        reporter.report_warning(
            &warning.to_string(),
            Some(loaded.path.display().to_string()),
        );
    }
}

fn report_app_error(err: AppError) -> anyhow::Error {
    DefaultErrorReporter::new().report_error(&err);
    match err.category {
        ErrorCategory::InteractionError => anyhow!("human interaction failed: {}", err.message),
        _ => anyhow!("workflow run failed: {}", err.message),
    }
}

fn print_summary(summary: &RunSummary) {
    let elapsed = (summary.completed_at - summary.started_at)
        .to_std()
        .unwrap_or_default();
    let outcome = match &summary.outcome {
        RunOutcome::Finished => "finished".to_string(),
        RunOutcome::Escalated { task_id, .. } => format!("escalated at '{}'", task_id),
        RunOutcome::AwaitingInput(pending) => format!("awaiting input at '{}'", pending.task_id),
    };
    println!();
    println!("Workflow '{}' {}", summary.workflow, outcome);
    println!("  execution: {}", summary.execution_id);
    println!(
        "  steps: {}  elapsed: {}",
        summary.steps,
        humantime::format_duration(std::time::Duration::from_millis(
            elapsed.as_millis() as u64
        ))
    );
    for (task_id, record) in &summary.task_states {
        let retries = summary.retry_counts.get(task_id).copied().unwrap_or(0);
        if retries > 0 {
            println!("  {:<24} {} (retries: {})", task_id, record.status, retries);
        } else {
            println!("  {:<24} {}", task_id, record.status);
        }
    }
}

fn print_workflow(loaded: &LoadedWorkflow) {
    let workflow = &loaded.document.workflow;
    println!(
        "{} {}",
        workflow.name.as_deref().unwrap_or("unnamed-workflow"),
        workflow.version.as_deref().unwrap_or("")
    );
    if let Some(description) = &workflow.description {
        println!("{}", description);
    }
    println!("source: {}", loaded.path.display());
    for (idx, task) in workflow.tasks.iter().enumerate() {
        print_task(idx, task);
    }
}

fn print_task(idx: usize, task: &WorkflowTask) {
    println!();
    println!("{:>3}. {} [{}]", idx + 1, task.display_name(), task.id);
    if task.role.is_empty() {
        println!("     action: {}", task.action);
    } else {
        println!("     action: {} (role: {})", task.action, task.role);
    }
    if let Some(gate) = &task.hitl {
        match gate {
            HitlGate::Question {
                message,
                options,
                on_no,
            } => println!(
                "     gate: question \"{}\" [{}]{}",
                message,
                options.join("/"),
                on_no
                    .as_ref()
                    .map(|target| format!(" on_no -> {}", target))
                    .unwrap_or_default()
            ),
            other => println!("     gate: {} \"{}\"", other.kind().as_str(), other.message()),
        }
    }
    for branch in &task.conditions {
        println!("     if {} -> {}", branch.expression, branch.target);
    }
    println!(
        "     on_complete -> {}  on_error -> {}  max_attempts: {}",
        task.on_complete,
        task.on_error,
        task.max_attempts()
    );
}
