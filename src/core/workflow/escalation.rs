use serde::Serialize;
use std::fmt;

pub const DEFAULT_ESCALATION_MESSAGE: &str = "Workflow error: Human intervention required.";

/// Details handed to an [`EscalationReporter`] when a task exhausts its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EscalationNotice {
    pub message: String,
    pub task_id: String,
    pub task_name: String,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl fmt::Display for EscalationNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (task: {} [{}], attempts: {}/{})",
            self.message, self.task_name, self.task_id, self.attempts, self.max_attempts
        )
    }
}

/// Receives escalations. Must not expect the run to continue afterwards.
pub trait EscalationReporter: Send + Sync + 'static {
    fn escalate(&self, notice: &EscalationNotice);
}

/// Prints a banner to stdout and logs the escalation at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleEscalationReporter;

impl EscalationReporter for ConsoleEscalationReporter {
    fn escalate(&self, notice: &EscalationNotice) {
        let rule = "=".repeat(60);
        println!("\n{}", rule);
        println!("ESCALATION: {}", notice.message);
        println!("Task: {} ({})", notice.task_name, notice.task_id);
        println!("Attempts: {}/{}", notice.attempts, notice.max_attempts);
        println!("{}", rule);
        tracing::error!(
            task_id = %notice.task_id,
            attempts = notice.attempts,
            max_attempts = notice.max_attempts,
            "{}",
            notice.message
        );
    }
}
