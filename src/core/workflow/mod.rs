//! Linear human-in-the-loop workflow engine.

pub mod action;
pub mod actions;
pub mod condition;
pub mod escalation;
pub mod gate;
pub mod human;
pub mod library;
pub mod runner;
pub mod schema;
pub mod state;
pub mod store;
pub mod transition;

pub use action::{
    ActionExecutor, ActionRegistry, ActionRequest, ActionResult, ActionStatus,
    SimulatedActionExecutor,
};
pub use escalation::{ConsoleEscalationReporter, EscalationNotice, EscalationReporter};
pub use library::WorkflowLibrary;
pub use runner::{GateAnswer, RunOutcome, RunSummary, RunnerSettings, WorkflowRunner};
pub use schema::{load_workflow, LoadedWorkflow, WorkflowDocument};
pub use store::WorkflowStore;
