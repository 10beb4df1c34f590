pub mod args;
pub mod commands;

pub use args::{ListArgs, RunArgs, ShowArgs, ShowFormat, ValidateArgs};
use crate::core::config::ConfigLoader;
use clap::{Parser, Subcommand};

const RUN_EXAMPLES: &str = "Examples:\n    hitlflow run deploy --workspace ./project\n    hitlflow run ./flows/review.yaml --simulate --auto-approve";

fn run_long_help() -> String {
    let mut help = format!("{}\n\nEnvironment:\n", RUN_EXAMPLES);
    for line in ConfigLoader::env_var_documentation() {
        help.push_str("    ");
        help.push_str(line);
        help.push('\n');
    }
    help
}

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "hitlflow")]
#[command(version = crate::VERSION)]
#[command(about = "Linear workflow runner with human-in-the-loop gates")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: list library workflows, validate one, inspect it with show, then run it."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    #[command(
        about = "Execute a workflow",
        long_about = "Run walks the workflow's tasks in order, asking for approval or answers at HITL gates, following branch conditions, retrying failed tasks and escalating once retries are exhausted.",
        after_help = RUN_EXAMPLES,
        after_long_help = run_long_help()
    )]
    Run(RunArgs),
    #[command(
        about = "Check a workflow document",
        long_about = "Validate parses the workflow, reports hard errors, and prints warnings for references the runner would skip over.",
        after_help = "Example:\n    hitlflow validate ./flows/review.yaml"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Print the tasks of a workflow",
        long_about = "Show renders each task with its action, gate, branches and retry policy as text or JSON.",
        after_help = "Example:\n    hitlflow show deploy --format json"
    )]
    Show(ShowArgs),
    #[command(
        about = "List workflows in the library",
        long_about = "List prints the names of the *.yaml and *.yml files under <root>/workflows.",
        after_help = "Example:\n    hitlflow list --root ./project"
    )]
    List(ListArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Run(run_args) => commands::run(run_args).await,
        Command::Validate(validate_args) => commands::validate(validate_args),
        Command::Show(show_args) => commands::show(show_args),
        Command::List(list_args) => commands::list(list_args),
    }
}
