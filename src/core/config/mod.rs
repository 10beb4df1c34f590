use crate::core::workflow::human::{ApprovalDefault, HumanSettings};
use crate::core::workflow::runner::{RunnerSettings, DEFAULT_MAX_STEPS};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration loaded from `hitlflow.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HitlflowConfig {
    /// Runner limits
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Human prompt behaviour
    #[serde(default)]
    pub human: HumanConfig,

    /// Workflow library location
    #[serde(default)]
    pub library: LibraryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Maximum executed steps per run (0 disables the guard)
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HumanConfig {
    /// Prompt timeout in seconds; unset waits forever
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,

    /// Answer applied when an approval prompt times out
    #[serde(default)]
    pub default_on_timeout: ApprovalDefault,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Directory containing `workflows/`, relative to the workspace
    #[serde(default = "default_library_root")]
    pub root: PathBuf,
}

fn default_max_steps() -> u64 {
    DEFAULT_MAX_STEPS
}

fn default_library_root() -> PathBuf {
    PathBuf::from(".")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            max_steps: default_max_steps(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            root: default_library_root(),
        }
    }
}

impl HitlflowConfig {
    pub fn runner_settings(&self) -> RunnerSettings {
        RunnerSettings {
            max_steps: self.runner.max_steps,
        }
    }

    pub fn human_settings(&self) -> HumanSettings {
        HumanSettings {
            timeout: self.human.timeout_seconds.map(Duration::from_secs),
            default_on_timeout: self.human.default_on_timeout,
        }
    }
}


pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;
