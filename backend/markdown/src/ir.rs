//! Markdown Intermediate Representation
//!
//! Parses markdown into a strongly-typed render tree by walking the
//! `pulldown-cmark` event stream. Code, link and paragraph nodes are produced
//! by the registered block handlers; everything else maps directly.

use std::collections::BTreeMap;

use chatmark_security::LinkTarget;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag};
use serde::Serialize;

use crate::code_block::{language_from_info, MATH_LANGUAGE};
use crate::registry::{HandlerInput, HandlerRegistry, PassContext, SLOT_CODE, SLOT_LINK, SLOT_PARAGRAPH};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderNode {
    Paragraph { children: Vec<RenderNode> },
    Heading { level: u8, children: Vec<RenderNode> },
    Blockquote { children: Vec<RenderNode> },
    List { start: Option<u64>, children: Vec<RenderNode> },
    ListItem { checked: Option<bool>, children: Vec<RenderNode> },
    Table { children: Vec<RenderNode> },
    TableRow { header: bool, children: Vec<RenderNode> },
    TableCell { children: Vec<RenderNode> },
    Emphasis { children: Vec<RenderNode> },
    Strong { children: Vec<RenderNode> },
    Strikethrough { children: Vec<RenderNode> },
    Link {
        /// What the resolver decided about the href as written.
        resolution: LinkTarget,
        /// Href for non-scripted contexts.
        href: String,
        target: String,
        title: String,
        children: Vec<RenderNode>,
    },
    Image { url: String, title: String, alt: String },
    Text { text: String },
    InlineCode { code: String },
    CodeBlock {
        lang: String,
        code: String,
        block_index: Option<usize>,
        allow_execution: bool,
    },
    Math { tex: String, display: bool },
    Artifact {
        identifier: Option<String>,
        artifact_type: Option<String>,
        title: Option<String>,
        attributes: BTreeMap<String, String>,
        content: String,
        complete: bool,
    },
    FootnoteReference { label: String },
    FootnoteDefinition { label: String, children: Vec<RenderNode> },
    SoftBreak,
    HardBreak,
    Rule,
}

impl RenderNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// The host-facing slot this node is styled under.
    pub fn slot(&self) -> &'static str {
        match self {
            Self::Paragraph { .. } => "paragraph",
            Self::Heading { .. } => "heading",
            Self::Blockquote { .. } => "blockquote",
            Self::List { .. } => "list",
            Self::ListItem { .. } => "list_item",
            Self::Table { .. } => "table",
            Self::TableRow { .. } => "table_row",
            Self::TableCell { .. } => "table_cell",
            Self::Emphasis { .. } => "emphasis",
            Self::Strong { .. } => "strong",
            Self::Strikethrough { .. } => "strikethrough",
            Self::Link { .. } => "link",
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
            Self::InlineCode { .. } => "inline_code",
            Self::CodeBlock { .. } => "code",
            Self::Math { .. } => "math",
            Self::Artifact { .. } => "artifact",
            Self::FootnoteReference { .. } => "footnote_reference",
            Self::FootnoteDefinition { .. } => "footnote_definition",
            Self::SoftBreak => "soft_break",
            Self::HardBreak => "hard_break",
            Self::Rule => "rule",
        }
    }

    pub fn children(&self) -> &[RenderNode] {
        match self {
            Self::Paragraph { children }
            | Self::Heading { children, .. }
            | Self::Blockquote { children }
            | Self::List { children, .. }
            | Self::ListItem { children, .. }
            | Self::Table { children }
            | Self::TableRow { children, .. }
            | Self::TableCell { children }
            | Self::Emphasis { children }
            | Self::Strong { children }
            | Self::Strikethrough { children }
            | Self::Link { children, .. }
            | Self::FootnoteDefinition { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text content, ignoring formatting.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Self::Text { text } => out.push_str(text),
            Self::InlineCode { code } | Self::CodeBlock { code, .. } => out.push_str(code),
            Self::Math { tex, .. } => out.push_str(tex),
            Self::Image { alt, .. } => out.push_str(alt),
            Self::SoftBreak | Self::HardBreak => out.push('\n'),
            _ => {
                for child in self.children() {
                    child.collect_text(out);
                }
            }
        }
    }
}

/// The rendered block sequence for one markdown run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderTree {
    pub nodes: Vec<RenderNode>,
}

impl RenderTree {
    pub fn new(nodes: Vec<RenderNode>) -> Self {
        Self { nodes }
    }

    /// All nodes, depth-first in document order.
    pub fn descendants(&self) -> Vec<&RenderNode> {
        fn walk<'a>(nodes: &'a [RenderNode], out: &mut Vec<&'a RenderNode>) {
            for node in nodes {
                out.push(node);
                walk(node.children(), out);
            }
        }
        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_MATH
        | Options::ENABLE_GFM
}

/// Parser state for an open tag.
enum Frame {
    Paragraph,
    Heading(u8),
    Blockquote,
    List(Option<u64>),
    Item { checked: Option<bool> },
    Table,
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: String },
    Image { url: String, title: String },
    CodeBlock { language: Option<String>, content: String },
    Footnote(String),
    /// Tags without a node of their own; children move to the parent.
    Passthrough,
}

pub struct IrParser;

impl IrParser {
    /// Parse one markdown run into render nodes, dispatching code, link and
    /// paragraph nodes through `registry`.
    pub fn parse(markdown: &str, registry: &HandlerRegistry, pass: &mut PassContext) -> Vec<RenderNode> {
        let mut builder = TreeBuilder {
            registry,
            pass,
            stack: Vec::new(),
            root: Vec::new(),
        };
        for event in Parser::new_ext(markdown, parser_options()) {
            builder.event(event);
        }
        builder.finish()
    }
}

struct TreeBuilder<'r, 'p> {
    registry: &'r HandlerRegistry,
    pass: &'p mut PassContext,
    stack: Vec<(Frame, Vec<RenderNode>)>,
    root: Vec<RenderNode>,
}

impl TreeBuilder<'_, '_> {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.code(None, &code, false),
            Event::InlineMath(tex) => self.code(Some(MATH_LANGUAGE), &tex, false),
            Event::DisplayMath(tex) => self.code(Some(MATH_LANGUAGE), &tex, true),
            // Raw HTML is shown as text, never interpreted.
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::FootnoteReference(label) => self.push(RenderNode::FootnoteReference {
                label: label.into_string(),
            }),
            Event::SoftBreak => self.push(RenderNode::SoftBreak),
            Event::HardBreak => self.push(RenderNode::HardBreak),
            Event::Rule => self.push(RenderNode::Rule),
            Event::TaskListMarker(done) => {
                let item = self.stack.iter_mut().rev().find_map(|(frame, _)| match frame {
                    Frame::Item { checked } => Some(checked),
                    _ => None,
                });
                if let Some(checked) = item {
                    *checked = Some(done);
                }
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::Paragraph,
            Tag::Heading { level, .. } => Frame::Heading(level as u8),
            Tag::BlockQuote(_) => Frame::Blockquote,
            Tag::CodeBlock(kind) => Frame::CodeBlock {
                language: match kind {
                    CodeBlockKind::Fenced(info) => language_from_info(&info),
                    CodeBlockKind::Indented => None,
                },
                content: String::new(),
            },
            Tag::List(start) => Frame::List(start),
            Tag::Item => Frame::Item { checked: None },
            Tag::Table(_) => Frame::Table,
            Tag::TableHead => Frame::TableHead,
            Tag::TableRow => Frame::TableRow,
            Tag::TableCell => Frame::TableCell,
            Tag::Emphasis => Frame::Emphasis,
            Tag::Strong => Frame::Strong,
            Tag::Strikethrough => Frame::Strikethrough,
            Tag::Link { dest_url, title, .. } => Frame::Link {
                href: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::Image { dest_url, title, .. } => Frame::Image {
                url: dest_url.into_string(),
                title: title.into_string(),
            },
            Tag::FootnoteDefinition(label) => Frame::Footnote(label.into_string()),
            _ => Frame::Passthrough,
        };
        self.stack.push((frame, Vec::new()));
    }

    fn end(&mut self) {
        let Some((frame, children)) = self.stack.pop() else { return };
        let node = match frame {
            Frame::Paragraph => self.registry.dispatch(
                SLOT_PARAGRAPH,
                HandlerInput::Paragraph { children },
                self.pass,
            ),
            Frame::Heading(level) => RenderNode::Heading { level, children },
            Frame::Blockquote => RenderNode::Blockquote { children },
            Frame::List(start) => RenderNode::List { start, children },
            Frame::Item { checked } => RenderNode::ListItem { checked, children },
            Frame::Table => RenderNode::Table { children },
            Frame::TableHead => RenderNode::TableRow { header: true, children },
            Frame::TableRow => RenderNode::TableRow { header: false, children },
            Frame::TableCell => RenderNode::TableCell { children },
            Frame::Emphasis => RenderNode::Emphasis { children },
            Frame::Strong => RenderNode::Strong { children },
            Frame::Strikethrough => RenderNode::Strikethrough { children },
            Frame::Link { href, title } => self.registry.dispatch(
                SLOT_LINK,
                HandlerInput::Link { href: &href, title: &title, children },
                self.pass,
            ),
            Frame::Image { url, title } => {
                let alt = children.iter().map(RenderNode::plain_text).collect();
                RenderNode::Image { url, title, alt }
            }
            Frame::CodeBlock { language, mut content } => {
                // Block content always ends in a line break, like a fenced block the
                // parser has fully seen.
                if !content.is_empty() && !content.ends_with('\n') {
                    content.push('\n');
                }
                self.registry.dispatch(
                    SLOT_CODE,
                    HandlerInput::Code {
                        language: language.as_deref(),
                        content: &content,
                        block: true,
                    },
                    self.pass,
                )
            }
            Frame::Footnote(label) => RenderNode::FootnoteDefinition { label, children },
            Frame::Passthrough => {
                for child in children {
                    self.push(child);
                }
                return;
            }
        };
        self.push(node);
    }

    fn text(&mut self, text: &str) {
        if let Some((Frame::CodeBlock { content, .. }, _)) = self.stack.last_mut() {
            content.push_str(text);
            return;
        }
        let siblings = self.siblings();
        if let Some(RenderNode::Text { text: last }) = siblings.last_mut() {
            last.push_str(text);
        } else {
            siblings.push(RenderNode::text(text));
        }
    }

    fn code(&mut self, language: Option<&str>, content: &str, block: bool) {
        let node = self.registry.dispatch(
            SLOT_CODE,
            HandlerInput::Code { language, content, block },
            self.pass,
        );
        self.push(node);
    }

    fn siblings(&mut self) -> &mut Vec<RenderNode> {
        match self.stack.last_mut() {
            Some((_, children)) => children,
            None => &mut self.root,
        }
    }

    fn push(&mut self, node: RenderNode) {
        self.siblings().push(node);
    }

    fn finish(mut self) -> Vec<RenderNode> {
        // The parser balances every tag, but a truncated stream must not lose nodes.
        while !self.stack.is_empty() {
            self.end();
        }
        self.root
    }
}
