//! Environment variable overrides.
//!
//! `CHATMARK_LATEX`, `CHATMARK_LOG_LEVEL` and `CHATMARK_CITATION_TOGGLE` take
//! precedence over the file. Unparseable values are ignored with a warning.

use std::collections::HashMap;

use chatmark_markdown::CitationToggle;
use tracing::warn;

use crate::schema::{ChatmarkConfig, CitationsConfig, LoggingConfig};

pub const ENV_LATEX: &str = "CHATMARK_LATEX";
pub const ENV_LOG_LEVEL: &str = "CHATMARK_LOG_LEVEL";
pub const ENV_CITATION_TOGGLE: &str = "CHATMARK_CITATION_TOGGLE";

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: ChatmarkConfig) -> ChatmarkConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map (useful for testing).
pub fn apply_env_overrides_with(mut config: ChatmarkConfig, env: &HashMap<String, String>) -> ChatmarkConfig {
    if let Some(raw) = env.get(ENV_LATEX) {
        match parse_bool(raw) {
            Some(enabled) => config.latex_parsing = Some(enabled),
            None => warn!("[Config] Ignoring {ENV_LATEX}={raw:?}; expected true/false"),
        }
    }

    if let Some(level) = env.get(ENV_LOG_LEVEL).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level.to_string());
    }

    if let Some(raw) = env.get(ENV_CITATION_TOGGLE) {
        match parse_toggle(raw) {
            Some(toggle) => {
                config.citations.get_or_insert_with(CitationsConfig::default).toggle = Some(toggle);
            }
            None => warn!("[Config] Ignoring {ENV_CITATION_TOGGLE}={raw:?}; expected clear_when_open or switch"),
        }
    }

    config
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_toggle(raw: &str) -> Option<CitationToggle> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "clear_when_open" => Some(CitationToggle::ClearWhenOpen),
        "switch" => Some(CitationToggle::Switch),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_latex_override() {
        let config = apply_env_overrides_with(ChatmarkConfig::default(), &env(&[(ENV_LATEX, "off")]));
        assert_eq!(config.latex_parsing, Some(false));
    }

    #[test]
    fn test_invalid_latex_value_is_ignored() {
        let base = ChatmarkConfig { latex_parsing: Some(true), ..Default::default() };
        let config = apply_env_overrides_with(base, &env(&[(ENV_LATEX, "maybe")]));
        assert_eq!(config.latex_parsing, Some(true));
    }

    #[test]
    fn test_log_level_and_toggle() {
        let config = apply_env_overrides_with(
            ChatmarkConfig::default(),
            &env(&[(ENV_LOG_LEVEL, "trace"), (ENV_CITATION_TOGGLE, "Switch")]),
        );
        assert_eq!(config.log_level(), Some("trace"));
        assert_eq!(config.citations.and_then(|c| c.toggle), Some(CitationToggle::Switch));
    }

    #[test]
    fn test_no_env_leaves_config_alone() {
        let base = ChatmarkConfig { latex_parsing: Some(false), ..Default::default() };
        assert_eq!(apply_env_overrides_with(base.clone(), &HashMap::new()), base);
    }
}
