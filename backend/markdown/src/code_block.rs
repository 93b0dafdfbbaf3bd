//! Code Block Classification
//!
//! Decides how a code node is presented: math, inline code, or a boxed block
//! that may carry an execution affordance and a per-pass block index.

use serde::{Deserialize, Serialize};

/// Reserved language tag for math blocks.
pub const MATH_LANGUAGE: &str = "math";

/// Language passed to the code renderer when a block has no usable tag.
pub const DEFAULT_LANGUAGE: &str = "text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_math: bool,
    pub is_single_line: bool,
}

/// Classify a code node by its language tag and content.
pub fn classify(language: Option<&str>, content: &str) -> Classification {
    Classification {
        is_math: language == Some(MATH_LANGUAGE),
        is_single_line: !content.contains('\n'),
    }
}

/// Extract the language tag from a fence info string.
///
/// Only the leading word characters count, so `python title=x` gives `python`
/// and `c++` gives `c`.
pub fn language_from_info(info: &str) -> Option<String> {
    let lang: String = info
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if lang.is_empty() { None } else { Some(lang) }
}

/// Everything the code renderer needs to know about one code node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlockDescriptor {
    pub language: Option<String>,
    pub code: String,
    pub is_math: bool,
    pub is_single_line: bool,
    /// Assigned only to multi-line, non-math blocks.
    pub block_index: Option<usize>,
    pub allow_execution: bool,
}

impl CodeBlockDescriptor {
    /// The language handed to the highlighter, never empty.
    pub fn lang(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }

    /// True when the block renders as a boxed, multi-line code block.
    pub fn is_block(&self) -> bool {
        !self.is_math && !self.is_single_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_math_tag() {
        let class = classify(Some("math"), "x^2\n");
        assert!(class.is_math);
        assert!(!class.is_single_line);
    }

    #[test]
    fn test_single_line_is_about_line_breaks_only() {
        assert!(classify(None, "let x = 1;").is_single_line);
        assert!(!classify(None, "a\nb").is_single_line);
        assert!(classify(Some("rust"), "").is_single_line);
    }

    #[test]
    fn test_language_from_info() {
        assert_eq!(language_from_info("python title=x").as_deref(), Some("python"));
        assert_eq!(language_from_info("c++").as_deref(), Some("c"));
        assert_eq!(language_from_info(""), None);
        assert_eq!(language_from_info("{r}"), None);
    }

    #[test]
    fn test_missing_language_defaults_to_text() {
        let descriptor = CodeBlockDescriptor {
            language: None,
            code: "a\nb\n".into(),
            is_math: false,
            is_single_line: false,
            block_index: Some(0),
            allow_execution: false,
        };
        assert_eq!(descriptor.lang(), "text");
        assert!(descriptor.is_block());
    }
}
