//! `chatmark render`: run one render pass and print the result.

use std::fmt::Write as _;

use anyhow::Result;
use clap::ValueEnum;
use tracing::warn;

use chatmark_config::ChatmarkConfig;
use chatmark_core::{ContentPayload, UserIdentity};
use chatmark_markdown::{RenderContext, Rendered, Renderer};
use chatmark_security::GrantedPermissions;

use crate::input::read_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The render result as pretty JSON
    Json,
    /// Plain text with formatting stripped
    Text,
}

pub struct RenderArgs {
    pub input: String,
    pub user: Option<String>,
    pub allow_run_code: bool,
    pub no_latex: bool,
    pub latest: bool,
    pub select: Option<String>,
    pub format: OutputFormat,
}

pub async fn run(args: RenderArgs, config: &ChatmarkConfig) -> Result<()> {
    let raw = read_input(&args.input).await?;

    let mut settings = config.render_settings();
    if args.no_latex {
        settings.latex_parsing = false;
    }
    let renderer = Renderer::new(settings);

    let permissions = GrantedPermissions::run_code(args.allow_run_code);
    let user = args.user.map(UserIdentity::new).unwrap_or_else(UserIdentity::anonymous);
    let ctx = RenderContext::new(&permissions, &user);
    let payload = ContentPayload::new(raw, args.latest);

    let rendered = render(&renderer, &payload, &ctx, args.select.as_deref())?;
    println!("{}", format_rendered(&rendered, args.format)?);
    Ok(())
}

/// Render, optionally opening the citation whose page number is `select`.
fn render(
    renderer: &Renderer,
    payload: &ContentPayload,
    ctx: &RenderContext<'_>,
    select: Option<&str>,
) -> Result<Rendered> {
    let Some(page) = select else {
        return Ok(renderer.render(payload, ctx)?);
    };

    let mut selection = renderer.new_selection();
    selection.observe(payload);
    if let Rendered::Cited { citations, .. } = renderer.render(payload, ctx)? {
        match citations.records.iter().find(|r| r.page_number.to_string() == page) {
            Some(record) => selection.click(record),
            None => warn!("[Render] No citation with page {page}"),
        }
    } else {
        warn!("[Render] --select given but the message has no citations");
    }
    Ok(renderer.render_with_selection(payload, ctx, &mut selection)?)
}

pub fn format_rendered(rendered: &Rendered, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(rendered)?);
    }

    let mut out = String::new();
    match rendered {
        Rendered::Pending { thinking: true } => out.push_str("(thinking)"),
        Rendered::Pending { thinking: false } => {}
        Rendered::Markdown { tree } => out.push_str(&Renderer::to_plain_text(&tree.nodes)),
        Rendered::Cited { prefix, citations } => {
            out.push_str(&Renderer::to_plain_text(&prefix.nodes));
            for marker in &citations.markers {
                writeln!(out, "{} {}", marker.chunk, marker.label)?;
            }
            if let Some(detail) = &citations.detail {
                writeln!(out, "\n{}\n{}", detail.document_path, detail.document_chunk)?;
            }
        }
    }
    Ok(out.trim_end().to_string())
}
