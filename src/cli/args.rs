use clap::Args;
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Workflow file path or library name (default: the workspace's active workflow)
    #[arg(value_name = "WORKFLOW")]
    pub workflow: Option<String>,

    /// Workspace used for actions, config and logs (defaults to current directory)
    #[arg(long, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// Skip real actions; every task completes immediately
    #[arg(long, help_heading = "Execution Modes")]
    pub simulate: bool,

    /// Approve every gate and pick the first option of every question
    #[arg(long, help_heading = "Execution Modes")]
    pub auto_approve: bool,

    /// Abort the run after this many steps (0 disables; default from config: 1000)
    #[arg(long, value_name = "N", help_heading = "Limits")]
    pub max_steps: Option<u64>,

    /// Path to custom config file (default: {workspace}/hitlflow.toml)
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Workflow file path or library name
    #[arg(value_name = "WORKFLOW")]
    pub workflow: String,
}

#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// Workflow file path or library name
    #[arg(value_name = "WORKFLOW")]
    pub workflow: String,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: ShowFormat,
}

#[derive(Clone, Copy, clap::ValueEnum, Debug, PartialEq, Eq)]
pub enum ShowFormat {
    Text,
    Json,
}

#[derive(Args, Clone, Debug)]
pub struct ListArgs {
    /// Library root containing a `workflows/` directory (default from config: .)
    #[arg(long, value_name = "PATH")]
    pub root: Option<PathBuf>,
}
