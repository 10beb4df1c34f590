#![allow(clippy::result_large_err)]

use super::HitlflowConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration rules
    pub fn validate(config: &HitlflowConfig) -> Result<(), AppError> {
        if config.human.timeout_seconds == Some(0) {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "human.timeout_seconds must be greater than 0 when set",
            )
            .with_code("HFX-CFG-002"));
        }

        if config.library.root.as_os_str().is_empty() {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                "library.root cannot be empty",
            )
            .with_code("HFX-CFG-002"));
        }

        Ok(())
    }
}
