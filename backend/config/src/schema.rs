//! chatmark configuration schema.
//!
//! Every field is optional so a partial YAML file deserializes cleanly;
//! [`crate::apply_all_defaults`] fills the gaps.

use chatmark_markdown::{CitationSettings, CitationToggle, LinkSettings, RenderSettings};
use chatmark_security::ExecutionPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration, read from `config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatmarkConfig {
    /// Normalize `\(..\)` / `\[..\]` delimiters and escape currency dollars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latex_parsing: Option<bool>,

    /// Embedded citation payload handling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<CitationsConfig>,

    /// Code execution affordance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionConfig>,

    /// Link target attributes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<LinksConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_columns: Option<usize>,
    /// `clear_when_open` or `switch`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle: Option<CitationToggle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionConfig {
    /// `permitted` or `never`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ExecutionPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinksConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plain_target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// An `EnvFilter` directive such as `info` or `chatmark_markdown=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rotating JSON log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

impl ChatmarkConfig {
    /// Build renderer settings, using built-in defaults for unset fields.
    pub fn render_settings(&self) -> RenderSettings {
        let base = RenderSettings::default();
        let citations = self.citations.clone().unwrap_or_default();
        let links = self.links.clone().unwrap_or_default();
        RenderSettings {
            latex_parsing: self.latex_parsing.unwrap_or(base.latex_parsing),
            citations: CitationSettings {
                start_token: citations.start_token.unwrap_or(base.citations.start_token),
                end_token: citations.end_token.unwrap_or(base.citations.end_token),
                grid_columns: citations.grid_columns.unwrap_or(base.citations.grid_columns),
                toggle: citations.toggle.unwrap_or(base.citations.toggle),
            },
            execution: self
                .execution
                .as_ref()
                .and_then(|execution| execution.policy)
                .unwrap_or(base.execution),
            links: LinkSettings {
                plain_target: links.plain_target.unwrap_or(base.links.plain_target),
                file_target: links.file_target.unwrap_or(base.links.file_target),
            },
        }
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref()?.level.as_deref()
    }
}
