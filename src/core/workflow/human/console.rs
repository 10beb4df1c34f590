use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::human::{
    ApprovalDefault, ApprovalResult, DecisionResult, HumanSettings, Interviewer,
};
use async_trait::async_trait;
use chrono::Utc;
use std::io::{self, BufRead, Write};
use std::thread;
use tokio::sync::{mpsc, Mutex};
use tokio::time::timeout;

const INPUT_BUFFER: usize = 16;

/// Lines read from the operator, in arrival order.
pub type LineReceiver = mpsc::Receiver<io::Result<String>>;

/// Interviewer that prompts on stdout and reads answers from stdin.
///
/// A single reader thread feeds every prompt, so a prompt that times out
/// leaves the next typed line for the following prompt.
pub struct ConsoleInterviewer {
    settings: HumanSettings,
    input: Mutex<Option<LineReceiver>>,
}

impl ConsoleInterviewer {
    pub fn new() -> Self {
        Self::with_settings(HumanSettings::default())
    }

    pub fn with_settings(settings: HumanSettings) -> Self {
        Self {
            settings,
            input: Mutex::new(None),
        }
    }

    /// Read answers from `lines` instead of stdin.
    pub fn with_lines(settings: HumanSettings, lines: LineReceiver) -> Self {
        Self {
            settings,
            input: Mutex::new(Some(lines)),
        }
    }

    /// Next line of input. `Ok(None)` means the timeout elapsed.
    async fn next_line(&self) -> Result<Option<String>, AppError> {
        let mut input = self.input.lock().await;
        let lines = input.get_or_insert_with(spawn_stdin_reader);
        let next = match self.settings.timeout {
            Some(duration) => match timeout(duration, lines.recv()).await {
                Ok(next) => next,
                Err(_) => return Ok(None),
            },
            None => lines.recv().await,
        };
        match next {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(err)) => Err(AppError::new(
                ErrorCategory::IoError,
                format!("failed to read stdin: {}", err),
            )
            .with_code("HFX-HUMAN-001")),
            None => Err(AppError::new(
                ErrorCategory::InteractionError,
                "stdin closed while waiting for a response",
            )
            .with_code("HFX-HUMAN-001")
            .with_suggestion("Run interactively or pass --auto-approve")),
        }
    }
}

impl Default for ConsoleInterviewer {
    fn default() -> Self {
        Self::new()
    }
}

fn spawn_stdin_reader() -> LineReceiver {
    let (tx, rx) = mpsc::channel(INPUT_BUFFER);
    // Detached: a pending read must not hold up runtime shutdown.
    thread::spawn(move || {
        let stdin = io::stdin();
        loop {
            let mut buffer = String::new();
            match stdin.lock().read_line(&mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.blocking_send(Ok(buffer)).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    let _ = tx.blocking_send(Err(err));
                    break;
                }
            }
        }
    });
    rx
}

fn parse_approval(input: &str) -> Option<(bool, String)> {
    let mut parts = input.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").to_lowercase();
    let reason = parts.next().unwrap_or("").trim().to_string();
    match first.as_str() {
        "approve" | "yes" | "y" => Some((true, reason)),
        "reject" | "no" | "n" => Some((false, reason)),
        _ => None,
    }
}

/// Accepts a 1-based index or the option text (case-insensitive).
fn parse_choice<'a>(input: &str, options: &'a [String]) -> Option<&'a String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(idx) = trimmed.parse::<usize>() {
        return idx.checked_sub(1).and_then(|i| options.get(i));
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(trimmed))
}

#[async_trait]
impl Interviewer for ConsoleInterviewer {
    fn interviewer_type(&self) -> &'static str {
        "console"
    }

    async fn request_approval(&self, message: &str) -> Result<ApprovalResult, AppError> {
        loop {
            print!("{} (yes/no): ", message);
            io::stdout().flush().ok();
            let Some(line) = self.next_line().await? else {
                let default = self.settings.default_on_timeout;
                tracing::warn!(default = %default, "approval prompt timed out");
                return Ok(ApprovalResult {
                    approved: matches!(default, ApprovalDefault::Approve),
                    reason: format!("default_on_timeout={}", default),
                    timestamp: Utc::now(),
                    timeout_applied: true,
                    default_used: true,
                });
            };

            match parse_approval(&line) {
                Some((approved, reason)) => {
                    return Ok(ApprovalResult::with_defaults(approved, reason));
                }
                None => println!("Please respond with 'yes' or 'no'."),
            }
        }
    }

    async fn request_choice(
        &self,
        message: &str,
        options: &[String],
    ) -> Result<DecisionResult, AppError> {
        println!("{}", message);
        for (idx, option) in options.iter().enumerate() {
            println!("{:>2}: {}", idx + 1, option);
        }
        loop {
            print!("Enter choice: ");
            io::stdout().flush().ok();
            let Some(line) = self.next_line().await? else {
                let choice = options.first().cloned().unwrap_or_default();
                tracing::warn!(choice = %choice, "choice prompt timed out; using first option");
                return Ok(DecisionResult {
                    choice,
                    timestamp: Utc::now(),
                    timeout_applied: true,
                    default_used: true,
                    response_text: None,
                });
            };

            match parse_choice(&line, options) {
                Some(choice) => {
                    return Ok(DecisionResult {
                        choice: choice.clone(),
                        timestamp: Utc::now(),
                        timeout_applied: false,
                        default_used: false,
                        response_text: Some(line.trim().to_string()),
                    });
                }
                None => println!("Please enter a number between 1 and {}.", options.len()),
            }
        }
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
        tracing::info!(interviewer = self.interviewer_type(), "{}", message);
    }
}
