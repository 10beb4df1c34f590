#![allow(clippy::result_large_err)]

use super::{ConfigValidator, HitlflowConfig};
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "hitlflow.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/hitlflow.toml)
    /// Environment variables override config file values
    pub fn load_from_workspace(workspace_path: &Path) -> Result<HitlflowConfig, AppError> {
        Self::load(workspace_path, None)
    }

    /// Load config from an explicit file, or the workspace default when `None`.
    /// An explicit file must exist; the workspace default is optional.
    pub fn load(
        workspace_path: &Path,
        explicit: Option<&Path>,
    ) -> Result<HitlflowConfig, AppError> {
        let config_file = match explicit {
            Some(path) => Some(Self::load_from_file(path)?.ok_or_else(|| {
                AppError::new(
                    ErrorCategory::IoError,
                    format!("Config file {} does not exist", path.display()),
                )
                .with_code("HFX-CFG-001")
            })?),
            None => Self::load_from_file(&workspace_path.join(CONFIG_FILE_NAME))?,
        };

        let mut config = config_file.unwrap_or_default();
        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;
        Ok(config)
    }

    /// Load config from specific file path
    /// Returns Ok(None) if file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<HitlflowConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
            .with_code("HFX-CFG-001")
        })?;

        let config: HitlflowConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ValidationError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
            .with_code("HFX-CFG-001")
        })?;

        Ok(Some(config))
    }

    /// Apply environment variable overrides to the configuration
    /// Unparsable values are ignored with a warning
    fn apply_env_overrides(config: &mut HitlflowConfig) {
        if let Ok(value) = env::var("HITLFLOW_MAX_STEPS") {
            match value.parse::<u64>() {
                Ok(max_steps) => config.runner.max_steps = max_steps,
                Err(_) => tracing::warn!(value = %value, "ignoring invalid HITLFLOW_MAX_STEPS"),
            }
        }

        if let Ok(value) = env::var("HITLFLOW_HUMAN_TIMEOUT_SECONDS") {
            match value.parse::<u64>() {
                Ok(seconds) => config.human.timeout_seconds = Some(seconds),
                Err(_) => {
                    tracing::warn!(value = %value, "ignoring invalid HITLFLOW_HUMAN_TIMEOUT_SECONDS")
                }
            }
        }

        if let Ok(value) = env::var("HITLFLOW_HUMAN_DEFAULT_ON_TIMEOUT") {
            match value.parse() {
                Ok(default) => config.human.default_on_timeout = default,
                Err(err) => tracing::warn!(
                    value = %value,
                    "ignoring invalid HITLFLOW_HUMAN_DEFAULT_ON_TIMEOUT: {}",
                    err
                ),
            }
        }

        if let Ok(root) = env::var("HITLFLOW_LIBRARY_ROOT") {
            config.library.root = PathBuf::from(root);
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "HITLFLOW_MAX_STEPS - Override runner.max_steps (default: 1000, 0 disables)",
            "HITLFLOW_HUMAN_TIMEOUT_SECONDS - Override human.timeout_seconds",
            "HITLFLOW_HUMAN_DEFAULT_ON_TIMEOUT - Override human.default_on_timeout (approve/reject)",
            "HITLFLOW_LIBRARY_ROOT - Override library.root (default: .)",
        ]
    }
}
