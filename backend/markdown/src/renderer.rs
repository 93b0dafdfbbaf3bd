//! Render orchestrator
//!
//! Drives one render pass: pending check, LaTeX normalization, citation
//! extraction, directive splitting and markdown parsing. Each pass gets its own
//! [`PassContext`], so block indices restart at zero and the execution gate is
//! evaluated exactly once.

use std::sync::Arc;

use chatmark_core::{ChatmarkError, ContentPayload, PermissionService, UserIdentity};
use chatmark_security::{CodeExecutionGate, ExecutionPolicy, LinkResolver, FILE_LINK_TARGET, PLAIN_LINK_TARGET};
use serde::Serialize;
use tracing::debug;

use crate::citation::{
    parse_records, CitationExtractor, CitationLayout, CitationSelection, CitationToggle,
    DEFAULT_END_TOKEN, DEFAULT_GRID_COLUMNS, DEFAULT_START_TOKEN,
};
use crate::directive::{split_directives, Segment};
use crate::ir::{IrParser, RenderNode, RenderTree};
use crate::latex;
use crate::registry::{HandlerRegistry, PassContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationSettings {
    pub start_token: String,
    pub end_token: String,
    pub grid_columns: usize,
    pub toggle: CitationToggle,
}

impl Default for CitationSettings {
    fn default() -> Self {
        Self {
            start_token: DEFAULT_START_TOKEN.to_string(),
            end_token: DEFAULT_END_TOKEN.to_string(),
            grid_columns: DEFAULT_GRID_COLUMNS,
            toggle: CitationToggle::default(),
        }
    }
}

/// Target attributes for rendered links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub plain_target: String,
    pub file_target: String,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            plain_target: PLAIN_LINK_TARGET.to_string(),
            file_target: FILE_LINK_TARGET.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub latex_parsing: bool,
    pub citations: CitationSettings,
    pub execution: ExecutionPolicy,
    pub links: LinkSettings,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            latex_parsing: true,
            citations: CitationSettings::default(),
            execution: ExecutionPolicy::default(),
            links: LinkSettings::default(),
        }
    }
}

/// Who is looking at the content.
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub permissions: &'a dyn PermissionService,
    pub user: &'a UserIdentity,
}

impl<'a> RenderContext<'a> {
    pub fn new(permissions: &'a dyn PermissionService, user: &'a UserIdentity) -> Self {
        Self { permissions, user }
    }
}

/// The output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Rendered {
    /// Nothing to show yet; `thinking` asks the host for a busy indicator.
    Pending { thinking: bool },
    Markdown { tree: RenderTree },
    /// Text before the start sentinel plus the citation UI. Anything after the
    /// end sentinel is dropped.
    Cited {
        prefix: RenderTree,
        citations: CitationLayout,
    },
}

impl Rendered {
    /// The markdown part of the output, if any.
    pub fn tree(&self) -> Option<&RenderTree> {
        match self {
            Self::Pending { .. } => None,
            Self::Markdown { tree } => Some(tree),
            Self::Cited { prefix, .. } => Some(prefix),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    settings: RenderSettings,
    registry: Arc<HandlerRegistry>,
    extractor: CitationExtractor,
}

impl Renderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self::with_registry(settings, Arc::new(HandlerRegistry::with_defaults()))
    }

    pub fn with_registry(settings: RenderSettings, registry: Arc<HandlerRegistry>) -> Self {
        let extractor = CitationExtractor::new(
            settings.citations.start_token.clone(),
            settings.citations.end_token.clone(),
        );
        Self {
            settings,
            registry,
            extractor,
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// A selection that follows this renderer's toggle setting.
    pub fn new_selection(&self) -> CitationSelection {
        CitationSelection::new(self.settings.citations.toggle)
    }

    /// Render one payload snapshot.
    ///
    /// Fails only when a citation segment is present and its payload is not a
    /// JSON array of citation records.
    pub fn render(&self, payload: &ContentPayload, ctx: &RenderContext<'_>) -> Result<Rendered, ChatmarkError> {
        if payload.is_pending() {
            return Ok(Rendered::Pending {
                thinking: payload.is_latest_stream,
            });
        }

        let text = latex::normalize(&payload.raw_text, self.settings.latex_parsing);
        let segment = self.extractor.extract(&text);

        let execution = CodeExecutionGate::decide(self.settings.execution, ctx.permissions);
        let links = LinkResolver::for_user(ctx.user)
            .with_targets(&self.settings.links.plain_target, &self.settings.links.file_target);
        let mut pass = PassContext::new(execution, links);

        let Some(raw_records) = segment.payload.as_deref() else {
            return Ok(Rendered::Markdown {
                tree: self.render_markdown(&text, &mut pass),
            });
        };

        let records = parse_records(raw_records)?;
        debug!("[Renderer] Citation segment with {} records", records.len());
        Ok(Rendered::Cited {
            prefix: self.render_markdown(&segment.prefix, &mut pass),
            citations: CitationLayout::new(records, self.settings.citations.grid_columns),
        })
    }

    /// Render a payload and fill the citation detail region from `selection`.
    /// The selection is cleared first when the payload differs from the last one.
    pub fn render_with_selection(
        &self,
        payload: &ContentPayload,
        ctx: &RenderContext<'_>,
        selection: &mut CitationSelection,
    ) -> Result<Rendered, ChatmarkError> {
        selection.observe(payload);
        Ok(match self.render(payload, ctx)? {
            Rendered::Cited { prefix, citations } => Rendered::Cited {
                prefix,
                citations: citations.with_selection(selection),
            },
            other => other,
        })
    }

    /// Parse already-normalized markdown, handing directive blocks to their
    /// handlers.
    pub fn render_markdown(&self, text: &str, pass: &mut PassContext) -> RenderTree {
        let mut nodes = Vec::new();
        for segment in split_directives(text) {
            match segment {
                Segment::Markdown(markdown) => {
                    nodes.extend(IrParser::parse(&markdown, &self.registry, pass));
                }
                Segment::Directive(block) => {
                    nodes.push(self.registry.dispatch_directive(&block, pass));
                }
            }
        }
        RenderTree::new(nodes)
    }

    /// Render nodes to plain text, stripping all formatting.
    pub fn to_plain_text(nodes: &[RenderNode]) -> String {
        let mut output = String::new();
        for node in nodes {
            match node {
                RenderNode::Paragraph { children } | RenderNode::Heading { children, .. } => {
                    output.push_str(&Self::to_plain_text(children));
                    output.push('\n');
                }
                RenderNode::ListItem { children, .. } => {
                    output.push_str("- ");
                    output.push_str(Self::to_plain_text(children).trim_end());
                    output.push('\n');
                }
                RenderNode::TableRow { children, .. } => {
                    let cells: Vec<String> = children.iter().map(RenderNode::plain_text).collect();
                    output.push_str(&cells.join(" | "));
                    output.push('\n');
                }
                RenderNode::CodeBlock { code, .. } => output.push_str(code),
                RenderNode::Math { tex, display: true } => {
                    output.push_str(tex);
                    output.push('\n');
                }
                RenderNode::Artifact { title, content, .. } => {
                    if let Some(title) = title {
                        output.push_str(title);
                        output.push('\n');
                    }
                    output.push_str(content);
                }
                RenderNode::Rule => output.push_str("---\n"),
                RenderNode::Blockquote { children }
                | RenderNode::List { children, .. }
                | RenderNode::Table { children }
                | RenderNode::FootnoteDefinition { children, .. } => {
                    output.push_str(&Self::to_plain_text(children));
                }
                other => output.push_str(&other.plain_text()),
            }
        }
        output
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RenderSettings::default())
    }
}
