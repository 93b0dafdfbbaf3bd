//! Built-in block handlers for code, links, paragraphs and artifacts.

use crate::code_block::{classify, CodeBlockDescriptor};
use crate::ir::RenderNode;
use crate::registry::{BlockHandler, HandlerInput, PassContext};

/// Renders code nodes: math, inline code, or an indexed code block.
pub struct CodeHandler;

impl CodeHandler {
    pub fn describe(language: Option<&str>, content: &str, pass: &mut PassContext) -> CodeBlockDescriptor {
        let class = classify(language, content);
        let execution = pass.execution();
        let block_index = (!class.is_math && !class.is_single_line && execution.assign_indices)
            .then(|| pass.allocate_block_index());
        CodeBlockDescriptor {
            language: language.map(str::to_string),
            code: content.to_string(),
            is_math: class.is_math,
            is_single_line: class.is_single_line,
            block_index,
            allow_execution: execution.allow_execution,
        }
    }
}

impl BlockHandler for CodeHandler {
    fn render(&self, input: HandlerInput<'_>, pass: &mut PassContext) -> RenderNode {
        let HandlerInput::Code { language, content, block } = input else {
            return RenderNode::text("");
        };
        let descriptor = Self::describe(language, content, pass);
        if descriptor.is_math {
            return RenderNode::Math {
                tex: descriptor.code,
                display: block,
            };
        }
        // Single-line code renders inline even when it came from a fence.
        if descriptor.is_single_line {
            return RenderNode::InlineCode { code: descriptor.code };
        }
        RenderNode::CodeBlock {
            lang: descriptor.lang().to_string(),
            code: descriptor.code,
            block_index: descriptor.block_index,
            allow_execution: descriptor.allow_execution,
        }
    }
}

/// Resolves hrefs against the current user's file paths.
pub struct LinkHandler;

impl BlockHandler for LinkHandler {
    fn render(&self, input: HandlerInput<'_>, pass: &mut PassContext) -> RenderNode {
        let HandlerInput::Link { href, title, children } = input else {
            return RenderNode::text("");
        };
        let links = pass.links();
        let resolution = links.resolve(href);
        RenderNode::Link {
            href: resolution.display_href(),
            target: links.target_for(&resolution).to_string(),
            title: title.to_string(),
            resolution,
            children,
        }
    }
}

pub struct ParagraphHandler;

impl BlockHandler for ParagraphHandler {
    fn render(&self, input: HandlerInput<'_>, _pass: &mut PassContext) -> RenderNode {
        match input {
            HandlerInput::Paragraph { children } => RenderNode::Paragraph { children },
            _ => RenderNode::Paragraph { children: Vec::new() },
        }
    }
}

/// `:::artifact{identifier=".." type=".." title=".."}` blocks. The body is kept
/// verbatim; an artifact still streaming is reported as incomplete.
pub struct ArtifactHandler;

impl BlockHandler for ArtifactHandler {
    fn render(&self, input: HandlerInput<'_>, _pass: &mut PassContext) -> RenderNode {
        let HandlerInput::Directive(block) = input else {
            return RenderNode::text("");
        };
        let attr = |key: &str| block.attribute(key).map(str::to_string);
        RenderNode::Artifact {
            identifier: attr("identifier"),
            artifact_type: attr("type"),
            title: attr("title").or_else(|| block.label.clone()),
            attributes: block.attributes.clone(),
            content: block.body.clone(),
            complete: block.complete,
        }
    }
}
