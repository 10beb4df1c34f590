#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use crate::core::workflow::schema::{load_workflow, LoadedWorkflow};
use std::fs;
use std::path::{Path, PathBuf};

const WORKFLOWS_DIR: &str = "workflows";
const ACTIVE_WORKFLOW_FILE: &str = ".hitlflow/active-workflow.yaml";
const EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Directory of named workflow documents under `<root>/workflows`.
#[derive(Debug, Clone)]
pub struct WorkflowLibrary {
    root: PathBuf,
}

impl WorkflowLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join(WORKFLOWS_DIR)
    }

    /// Sorted workflow names. A missing directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>, AppError> {
        let dir = self.workflows_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&dir).map_err(|err| {
            AppError::new(
                ErrorCategory::IoError,
                format!("failed to read {}: {}", dir.display(), err),
            )
            .with_code("HFX-LIB-002")
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let has_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext));
            if let (true, Some(stem)) = (has_extension, path.file_stem().and_then(|s| s.to_str())) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Path of the named workflow, preferring `.yaml` over `.yml`. Names that
    /// could leave the workflows directory have no path.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        if !is_plain_name(name) {
            return None;
        }
        let dir = self.workflows_dir();
        EXTENSIONS
            .iter()
            .map(|ext| dir.join(format!("{}.{}", name, ext)))
            .find(|path| path.is_file())
    }

    pub fn load(&self, name: &str) -> Result<LoadedWorkflow, AppError> {
        if !is_plain_name(name) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "invalid workflow name '{}': names may not contain path separators or '..'",
                    name
                ),
            )
            .with_code("HFX-LIB-003")
            .with_suggestion("Pass a file path to an existing workflow document instead"));
        }
        let path = self.path_for(name).ok_or_else(|| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!(
                    "workflow '{}' not found in {}",
                    name,
                    self.workflows_dir().display()
                ),
            )
            .with_code("HFX-LIB-001")
            .with_suggestion("Run `hitlflow list` to see available workflows")
        })?;
        load_workflow(&path)
    }

    /// Load the project's active workflow, if one is configured.
    pub fn active(project_root: &Path) -> Result<Option<LoadedWorkflow>, AppError> {
        let path = project_root.join(ACTIVE_WORKFLOW_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        load_workflow(&path).map(Some)
    }

    /// Resolve a CLI argument: an existing file path first, then a library name.
    pub fn resolve(&self, reference: &str) -> Result<LoadedWorkflow, AppError> {
        let path = Path::new(reference);
        if path.is_file() {
            return load_workflow(path);
        }
        self.load(reference)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains(['/', '\\']) && !name.contains("..")
}
