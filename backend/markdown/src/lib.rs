//! Streaming Markdown to Render Tree
//!
//! Turns model output (possibly still streaming) into a typed render tree:
//! LaTeX delimiters are normalized, embedded citation payloads are split out,
//! container directives go to their handlers and everything else is parsed as
//! CommonMark with GFM extensions and math.

pub mod citation;
pub mod code_block;
pub mod directive;
pub mod handlers;
pub mod ir;
pub mod latex;
pub mod registry;
pub mod renderer;

pub use citation::{
    extract_citations, CitationExtractor, CitationLayout, CitationRecord, CitationSelection, CitationToggle,
    PageNumber, SentinelSegment,
};
pub use code_block::{classify, CodeBlockDescriptor};
pub use directive::{split_directives, DirectiveBlock, Segment};
pub use ir::{IrParser, RenderNode, RenderTree};
pub use latex::normalize;
pub use registry::{BlockHandler, HandlerInput, HandlerRegistry, PassContext};
pub use renderer::{CitationSettings, LinkSettings, RenderContext, RenderSettings, Rendered, Renderer};
