//! Block handler registry
//!
//! Maps node kinds and directive names to the handler that renders them. The
//! registry is built once and shared read-only across render passes; all
//! per-pass state lives in [`PassContext`].

use std::sync::Arc;

use chatmark_security::{ExecutionDecision, LinkResolver};
use tracing::debug;

use crate::directive::DirectiveBlock;
use crate::handlers::{ArtifactHandler, CodeHandler, LinkHandler, ParagraphHandler};
use crate::ir::RenderNode;

pub const SLOT_CODE: &str = "code";
pub const SLOT_LINK: &str = "link";
pub const SLOT_PARAGRAPH: &str = "paragraph";
pub const SLOT_ARTIFACT: &str = "artifact";

/// What the parser hands a block handler.
#[derive(Debug)]
pub enum HandlerInput<'a> {
    Code {
        language: Option<&'a str>,
        content: &'a str,
        /// True for fenced/indented blocks and display math.
        block: bool,
    },
    Link {
        href: &'a str,
        title: &'a str,
        children: Vec<RenderNode>,
    },
    Paragraph {
        children: Vec<RenderNode>,
    },
    Directive(&'a DirectiveBlock),
}

pub trait BlockHandler: Send + Sync {
    fn render(&self, input: HandlerInput<'_>, pass: &mut PassContext) -> RenderNode;
}

/// State for a single render pass. Created fresh each pass so block indices
/// restart at zero and the execution decision is made once.
#[derive(Debug, Clone)]
pub struct PassContext {
    execution: ExecutionDecision,
    links: LinkResolver,
    next_block_index: usize,
}

impl PassContext {
    pub fn new(execution: ExecutionDecision, links: LinkResolver) -> Self {
        Self {
            execution,
            links,
            next_block_index: 0,
        }
    }

    pub fn execution(&self) -> ExecutionDecision {
        self.execution
    }

    pub fn links(&self) -> &LinkResolver {
        &self.links
    }

    /// Hand out the next block index, starting at 0.
    pub fn allocate_block_index(&mut self) -> usize {
        let index = self.next_block_index;
        self.next_block_index += 1;
        index
    }

    pub fn blocks_allocated(&self) -> usize {
        self.next_block_index
    }
}

#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<(String, Arc<dyn BlockHandler>)>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry").field("names", &self.names()).finish()
    }
}

impl HandlerRegistry {
    /// An empty registry. Core slots still fall back to the built-in handlers;
    /// directives without a handler render as literal text.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SLOT_CODE, Arc::new(CodeHandler));
        registry.register(SLOT_LINK, Arc::new(LinkHandler));
        registry.register(SLOT_PARAGRAPH, Arc::new(ParagraphHandler));
        registry.register(SLOT_ARTIFACT, Arc::new(ArtifactHandler));
        registry
    }

    /// Register `handler` under `name`, replacing an existing entry in place.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn BlockHandler>) -> &mut Self {
        let name = name.into();
        match self.handlers.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = handler,
            None => self.handlers.push((name, handler)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn BlockHandler>> {
        self.handlers
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, handler)| handler)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn dispatch(&self, slot: &str, input: HandlerInput<'_>, pass: &mut PassContext) -> RenderNode {
        if let Some(handler) = self.get(slot) {
            return handler.render(input, pass);
        }
        match input {
            HandlerInput::Code { .. } => CodeHandler.render(input, pass),
            HandlerInput::Link { .. } => LinkHandler.render(input, pass),
            HandlerInput::Paragraph { .. } => ParagraphHandler.render(input, pass),
            HandlerInput::Directive(block) => {
                debug!("[Registry] No handler for directive '{}', rendering literally", block.name);
                RenderNode::text(block.raw.clone())
            }
        }
    }

    pub fn dispatch_directive(&self, block: &DirectiveBlock, pass: &mut PassContext) -> RenderNode {
        self.dispatch(&block.name, HandlerInput::Directive(block), pass)
    }
}
