//! Container directives
//!
//! Splits text into markdown runs and `:::name[label]{attrs}` … `:::` blocks so
//! directive handlers (e.g. `artifact`) get their body verbatim instead of
//! having it parsed as markdown. Directive fences inside code fences are ignored.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static OPEN_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}:{3,}([A-Za-z][\w-]*)(?:\[([^\]\n]*)\])?(?:\{([^}\n]*)\})?[ \t]*$").unwrap()
});

static CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ {0,3}:{3,}[ \t]*$").unwrap());

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"#([\w-]+)|\.([\w-]+)|([A-Za-z_:][\w:.-]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveBlock {
    pub name: String,
    pub label: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub body: String,
    /// The directive exactly as written, used when no handler claims it.
    pub raw: String,
    /// False while the closing fence has not arrived yet.
    pub complete: bool,
}

impl DirectiveBlock {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Markdown(String),
    Directive(DirectiveBlock),
}

/// Parse a directive attribute list (`key="v" #id .class flag`).
pub fn parse_attributes(source: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for caps in ATTRIBUTE.captures_iter(source) {
        if let Some(id) = caps.get(1) {
            attributes.insert("id".to_string(), id.as_str().to_string());
        } else if let Some(class) = caps.get(2) {
            attributes
                .entry("class".to_string())
                .and_modify(|existing: &mut String| {
                    existing.push(' ');
                    existing.push_str(class.as_str());
                })
                .or_insert_with(|| class.as_str().to_string());
        } else if let Some(key) = caps.get(3) {
            let value = caps
                .get(4)
                .or_else(|| caps.get(5))
                .or_else(|| caps.get(6))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            attributes.insert(key.as_str().to_string(), value);
        }
    }
    attributes
}

struct OpenDirective {
    name: String,
    label: Option<String>,
    attributes: BTreeMap<String, String>,
    body: String,
    raw: String,
    depth: usize,
}

impl OpenDirective {
    fn finish(self, complete: bool) -> DirectiveBlock {
        DirectiveBlock {
            name: self.name,
            label: self.label,
            attributes: self.attributes,
            body: self.body,
            raw: self.raw,
            complete,
        }
    }
}

/// Tracks ``` / ~~~ code fences so directive syntax inside code is left alone.
#[derive(Default)]
struct FenceState {
    open: Option<(u8, usize)>,
}

impl FenceState {
    fn in_code(&self) -> bool {
        self.open.is_some()
    }

    fn observe(&mut self, line: &str) {
        let trimmed = line.trim_start_matches(' ');
        let Some(&marker) = trimmed.as_bytes().first() else { return };
        if marker != b'`' && marker != b'~' {
            return;
        }
        let run = trimmed.bytes().take_while(|b| *b == marker).count();
        if run < 3 {
            return;
        }
        match self.open {
            None => self.open = Some((marker, run)),
            Some((open_marker, open_run)) => {
                let closes = open_marker == marker
                    && run >= open_run
                    && trimmed[run..].trim().is_empty();
                if closes {
                    self.open = None;
                }
            }
        }
    }
}

/// Split `text` into markdown runs and directive blocks, in document order.
pub fn split_directives(text: &str) -> Vec<Segment> {
    if !text.contains(":::") {
        return vec![Segment::Markdown(text.to_string())];
    }

    let mut segments = Vec::new();
    let mut markdown = String::new();
    let mut fences = FenceState::default();
    let mut current: Option<OpenDirective> = None;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);

        if let Some(open) = current.as_mut() {
            open.raw.push_str(line);
            if !fences.in_code() {
                if CLOSE_FENCE.is_match(content) {
                    open.depth -= 1;
                    if open.depth == 0 {
                        if let Some(done) = current.take() {
                            segments.push(Segment::Directive(done.finish(true)));
                        }
                        continue;
                    }
                } else if OPEN_FENCE.is_match(content) {
                    open.depth += 1;
                }
            }
            fences.observe(content);
            open.body.push_str(line);
            continue;
        }

        if !fences.in_code() {
            if let Some(caps) = OPEN_FENCE.captures(content) {
                if !markdown.is_empty() {
                    segments.push(Segment::Markdown(std::mem::take(&mut markdown)));
                }
                current = Some(OpenDirective {
                    name: caps[1].to_string(),
                    label: caps.get(2).map(|m| m.as_str().to_string()),
                    attributes: caps.get(3).map(|m| parse_attributes(m.as_str())).unwrap_or_default(),
                    body: String::new(),
                    raw: line.to_string(),
                    depth: 1,
                });
                continue;
            }
        }
        fences.observe(content);
        markdown.push_str(line);
    }

    if let Some(open) = current.take() {
        segments.push(Segment::Directive(open.finish(false)));
    }
    if !markdown.is_empty() {
        segments.push(Segment::Markdown(markdown));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = concat!(
        "Intro paragraph.\n\n",
        ":::artifact{identifier=\"counter\" type=\"application/vnd.react\" title=\"Counter\"}\n",
        "```tsx\n",
        "export default () => <p>:::</p>;\n",
        "```\n",
        ":::\n",
        "Outro.\n",
    );

    #[test]
    fn test_plain_text_is_one_segment() {
        assert_eq!(split_directives("hello"), vec![Segment::Markdown("hello".into())]);
    }

    #[test]
    fn test_artifact_block_is_split_out() {
        let segments = split_directives(ARTIFACT);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Segment::Markdown("Intro paragraph.\n\n".into()));
        let Segment::Directive(block) = &segments[1] else { panic!("expected directive") };
        assert_eq!(block.name, "artifact");
        assert!(block.complete);
        assert_eq!(block.attribute("identifier"), Some("counter"));
        assert_eq!(block.attribute("type"), Some("application/vnd.react"));
        assert_eq!(block.attribute("title"), Some("Counter"));
        assert!(block.body.starts_with("```tsx\n"));
        assert!(block.body.ends_with("```\n"));
        assert_eq!(segments[2], Segment::Markdown("Outro.\n".into()));
    }

    #[test]
    fn test_unterminated_directive_is_incomplete() {
        let segments = split_directives(":::artifact{title=\"x\"}\npartial body");
        let Segment::Directive(block) = &segments[0] else { panic!("expected directive") };
        assert!(!block.complete);
        assert_eq!(block.body, "partial body");
        assert_eq!(block.raw, ":::artifact{title=\"x\"}\npartial body");
    }

    #[test]
    fn test_directive_inside_code_fence_is_ignored() {
        let text = "```\n:::note\nnot a directive\n:::\n```\n";
        assert_eq!(split_directives(text), vec![Segment::Markdown(text.into())]);
    }

    #[test]
    fn test_nested_directives_stay_in_body() {
        let text = ":::outer\n:::inner\nx\n:::\n:::\nafter\n";
        let segments = split_directives(text);
        let Segment::Directive(block) = &segments[0] else { panic!("expected directive") };
        assert_eq!(block.name, "outer");
        assert_eq!(block.body, ":::inner\nx\n:::\n");
        assert_eq!(segments[1], Segment::Markdown("after\n".into()));
    }

    #[test]
    fn test_label_and_attribute_shorthands() {
        let segments = split_directives(":::note[Heads up]{#tip .warn .big open level=2 q='a b'}\nbody\n:::\n");
        let Segment::Directive(block) = &segments[0] else { panic!("expected directive") };
        assert_eq!(block.label.as_deref(), Some("Heads up"));
        assert_eq!(block.attribute("id"), Some("tip"));
        assert_eq!(block.attribute("class"), Some("warn big"));
        assert_eq!(block.attribute("open"), Some(""));
        assert_eq!(block.attribute("level"), Some("2"));
        assert_eq!(block.attribute("q"), Some("a b"));
    }
}
