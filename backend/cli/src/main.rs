mod input;
mod normalize_cmd;
mod render_cmd;
mod resolve_cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use chatmark_config::defaults::{DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL};
use chatmark_config::{config_dir, config_file_path, load_and_prepare};
use chatmark_logging::init_logger;

use render_cmd::{OutputFormat, RenderArgs};

#[derive(Parser)]
#[command(name = "chatmark")]
#[command(about = "Render streamed chat markdown into a typed tree")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ~/.chatmark/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a message and print the result
    Render {
        /// Input file, or `-` for stdin
        input: String,
        /// Id of the user viewing the message
        #[arg(long)]
        user: Option<String>,
        /// Grant the run-code permission
        #[arg(long)]
        allow_run_code: bool,
        /// Skip LaTeX delimiter normalization
        #[arg(long)]
        no_latex: bool,
        /// Treat the message as the one currently streaming
        #[arg(long)]
        latest: bool,
        /// Open the citation with this page number
        #[arg(long)]
        select: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Resolve a link href against a user's private file paths
    ResolveLink {
        href: String,
        #[arg(long)]
        user: String,
    },
    /// Print LaTeX-normalized text
    Normalize {
        /// Input file, or `-` for stdin
        input: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| config_file_path(&config_dir()));
    let config = load_and_prepare(&config_path).await?;

    // Initialize structured logging
    let logging = config.logging.clone().unwrap_or_default();
    init_logger(
        logging.dir.unwrap_or_else(|| config_dir().join(DEFAULT_LOG_DIR)),
        logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL),
    );
    debug!(path = %config_path.display(), "Config ready");

    match cli.command {
        Commands::Render {
            input,
            user,
            allow_run_code,
            no_latex,
            latest,
            select,
            format,
        } => {
            let args = RenderArgs {
                input,
                user,
                allow_run_code,
                no_latex,
                latest,
                select,
                format,
            };
            render_cmd::run(args, &config).await?;
        }
        Commands::ResolveLink { href, user } => {
            resolve_cmd::run(&href, &user, &config)?;
        }
        Commands::Normalize { input } => {
            normalize_cmd::run(&input).await?;
        }
    }

    Ok(())
}
