//! Config defaults: fills every unset option with its built-in value.

use chatmark_markdown::RenderSettings;

use crate::schema::{ChatmarkConfig, CitationsConfig, ExecutionConfig, LinksConfig, LoggingConfig};

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory, relative to the config directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ChatmarkConfig) -> ChatmarkConfig {
    let config = apply_render_defaults(config);
    apply_logging_defaults(config)
}

fn apply_render_defaults(mut config: ChatmarkConfig) -> ChatmarkConfig {
    let base = RenderSettings::default();

    config.latex_parsing.get_or_insert(base.latex_parsing);

    let citations = config.citations.get_or_insert_with(CitationsConfig::default);
    citations.start_token.get_or_insert(base.citations.start_token);
    citations.end_token.get_or_insert(base.citations.end_token);
    citations.grid_columns.get_or_insert(base.citations.grid_columns);
    citations.toggle.get_or_insert(base.citations.toggle);

    config
        .execution
        .get_or_insert_with(ExecutionConfig::default)
        .policy
        .get_or_insert(base.execution);

    let links = config.links.get_or_insert_with(LinksConfig::default);
    links.plain_target.get_or_insert(base.links.plain_target);
    links.file_target.get_or_insert(base.links.file_target);

    config
}

fn apply_logging_defaults(mut config: ChatmarkConfig) -> ChatmarkConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.dir.is_none() {
        logging.dir = Some(crate::io::config_dir().join(DEFAULT_LOG_DIR));
    }
    config
}
