//! Config validation: field checks with user-friendly error messages.

use crate::schema::ChatmarkConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ChatmarkConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_citations(config, &mut report);
    validate_links(config, &mut report);
    validate_logging(config, &mut report);
    report
}

/// Sentinel tokens must be non-empty and distinct; the grid needs a column.
fn validate_citations(config: &ChatmarkConfig, report: &mut ValidationReport) {
    let Some(citations) = &config.citations else { return };

    let start = citations.start_token.as_deref();
    let end = citations.end_token.as_deref();
    if start.is_some_and(|t| t.trim().is_empty()) {
        report.error("citations.startToken", "Start token cannot be empty");
    }
    if end.is_some_and(|t| t.trim().is_empty()) {
        report.error("citations.endToken", "End token cannot be empty");
    }
    if let (Some(start), Some(end)) = (start, end) {
        if !start.trim().is_empty() && start == end {
            report.error("citations", "startToken and endToken must differ");
        }
    }
    if citations.grid_columns == Some(0) {
        report.error("citations.gridColumns", "gridColumns must be >= 1");
    }
}

fn validate_links(config: &ChatmarkConfig, report: &mut ValidationReport) {
    let Some(links) = &config.links else { return };
    for (path, value) in [("links.plainTarget", &links.plain_target), ("links.fileTarget", &links.file_target)] {
        if value.as_deref().is_some_and(|t| t.trim().is_empty()) {
            report.warn(path, "Empty link target; browsers will open links in place");
        }
    }
}

fn validate_logging(config: &ChatmarkConfig, report: &mut ValidationReport) {
    let Some(level) = config.log_level() else { return };
    if level.trim().is_empty() {
        report.warn("logging.level", "Empty log level; falling back to 'info'");
    }
}
