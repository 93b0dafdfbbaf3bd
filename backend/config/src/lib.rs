//! `chatmark-config`: renderer configuration management.
//!
//! Provides:
//! - Typed config schema (LaTeX, citations, execution, links, logging)
//! - YAML loading with a defaults-on-missing-file fallback
//! - `CHATMARK_*` environment overrides
//! - Default value application
//! - Validation with per-field reports

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

// Re-export most-used types at crate root.
pub use schema::{ChatmarkConfig, CitationsConfig, ExecutionConfig, LinksConfig, LoggingConfig};
pub use io::{config_dir, config_file_path, load_config};
pub use env::{apply_env_overrides, apply_env_overrides_with};
pub use defaults::apply_all_defaults;
pub use validation::{validate, ValidationReport, ConfigValidationError};

use anyhow::Result;
use chatmark_core::ChatmarkError;
use std::path::Path;

/// Load, apply env overrides, apply defaults and validate a config file.
///
/// This is the main entry point for loading a config at runtime. Validation
/// errors fail the load; warnings are only logged.
pub async fn load_and_prepare(path: &Path) -> Result<ChatmarkConfig> {
    let config = load_config(path).await?;
    let config = apply_env_overrides(config);
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if !report.is_valid() {
        let summary: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        return Err(ChatmarkError::Config(summary.join("; ")).into());
    }

    Ok(config)
}
