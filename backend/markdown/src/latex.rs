//! LaTeX delimiter normalization
//!
//! Rewrites model output so the math parser sees one canonical set of
//! delimiters: `\[…\]` becomes `$$…$$`, `\(…\)` becomes `$…$`, and dollar signs
//! that read as currency are escaped. Code is never touched.
//!
//! The rewrite is idempotent, so it can run again on every streamed update.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Spans that are copied through (code, `$$` display math) or converted (brackets).
static PROTECTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)(?P<fence>```.*?(?:```|\z))",
        r"|(?P<code>`[^`\n]+`)",
        r"|(?P<display>\$\$.*?\$\$)",
        r"|\\\[(?P<square>.*?)\\\]",
        r"|\\\((?P<round>[^\n]*?)\\\)",
    ))
    .unwrap()
});

/// Spans the escaping stage leaves alone. Display math still gets mhchem escapes.
static SHIELDED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)(?P<fence>```.*?(?:```|\z))",
        r"|(?P<code>`[^`\n]+`)",
        r"|(?P<display>\$\$.*?\$\$)",
    ))
    .unwrap()
});

/// Normalize math delimiters in `text`. Returns the input unchanged when disabled.
pub fn normalize(text: &str, enabled: bool) -> Cow<'_, str> {
    if !enabled || !needs_scan(text) {
        return Cow::Borrowed(text);
    }
    Cow::Owned(escape_dollars(&rewrite_brackets(text)))
}

fn needs_scan(text: &str) -> bool {
    text.contains('$') || text.contains("\\[") || text.contains("\\(")
}

/// Convert `\[…\]` and `\(…\)` to dollar delimiters, copying code and display math.
fn rewrite_brackets(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for caps in PROTECTED.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        let rest = &text[whole.end()..];
        let rewritten = match (caps.name("square"), caps.name("round")) {
            (Some(square), _) if can_rewrite(&out, square.as_str(), rest) => {
                Some(format!("$${}$$", square.as_str()))
            }
            (_, Some(round)) => {
                // `$x$5` would not close as inline math.
                let body = round.as_str().trim();
                let followed_by_digit = rest.chars().next().is_some_and(|c| c.is_ascii_digit());
                (can_rewrite(&out, body, rest) && !followed_by_digit).then(|| format!("${body}$"))
            }
            _ => None,
        };
        out.push_str(rewritten.as_deref().unwrap_or(whole.as_str()));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

/// A bracket span is rewritten only when the dollar form reads back as the
/// same math span. Anything else stays as written.
fn can_rewrite(before: &str, body: &str, rest: &str) -> bool {
    let body_ok = !body.is_empty()
        && !body.ends_with('\\')
        && !body.contains(['$', '`'])
        && !body.contains("\\[")
        && !body.contains("\\(");
    body_ok && !before.ends_with(['$', '\\']) && !rest.starts_with('$') && !rest.starts_with("\\$")
}

/// Escape currency and mhchem openers outside code.
fn escape_dollars(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    // Text between code spans; mhchem openers are escaped per run so an opener
    // split across a display span boundary is still seen.
    let mut run = String::new();
    let mut last = 0;
    for caps in SHIELDED.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        run.push_str(&escape_currency(&text[last..whole.start()]));
        if caps.name("display").is_some() {
            run.push_str(whole.as_str());
        } else {
            out.push_str(&escape_mhchem(&run));
            run.clear();
            out.push_str(whole.as_str());
        }
        last = whole.end();
    }
    run.push_str(&escape_currency(&text[last..]));
    out.push_str(&escape_mhchem(&run));
    out
}

/// Escape `$` signs that precede a digit and do not open inline math.
///
/// Inline math follows the usual rule: the opener has non-space to its right,
/// the closer (next unescaped `$` on the line) has non-space to its left and no
/// digit to its right.
fn escape_currency(segment: &str) -> Cow<'_, str> {
    if !segment.contains('$') {
        return Cow::Borrowed(segment);
    }

    let bytes = segment.as_bytes();
    let mut out = String::with_capacity(segment.len() + 4);
    let mut last = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'$' || is_escaped(bytes, i) {
            i += 1;
            continue;
        }
        if bytes.get(i + 1) == Some(&b'$') {
            i += 2;
            continue;
        }
        if let Some(close) = inline_math_close(bytes, i) {
            i = close + 1;
            continue;
        }
        if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            out.push_str(&segment[last..i]);
            out.push('\\');
            last = i;
        }
        i += 1;
    }
    out.push_str(&segment[last..]);
    Cow::Owned(out)
}

fn inline_math_close(bytes: &[u8], open: usize) -> Option<usize> {
    let first = *bytes.get(open + 1)?;
    if first.is_ascii_whitespace() {
        return None;
    }
    let mut j = open + 1;
    while j < bytes.len() {
        match bytes[j] {
            b'\n' => return None,
            b'$' if !is_escaped(bytes, j) => {
                let before = bytes[j - 1];
                let after_digit = bytes.get(j + 1).is_some_and(u8::is_ascii_digit);
                return (!before.is_ascii_whitespace() && !after_digit).then_some(j);
            }
            _ => j += 1,
        }
    }
    None
}

fn is_escaped(bytes: &[u8], index: usize) -> bool {
    let backslashes = bytes[..index].iter().rev().take_while(|b| **b == b'\\').count();
    backslashes % 2 == 1
}

/// mhchem commands need a doubled backslash to survive the math parser.
fn escape_mhchem(text: &str) -> String {
    text.replace("$\\ce{", "$\\\\ce{").replace("$\\pu{", "$\\\\pu{")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(text: &str) -> String {
        normalize(text, true).into_owned()
    }

    #[test]
    fn test_disabled_is_identity() {
        let text = r"price $5 and \(x\)";
        assert_eq!(normalize(text, false), text);
    }

    #[test]
    fn test_brackets_become_dollars() {
        assert_eq!(norm(r"see \[x^2\] now"), "see $$x^2$$ now");
        assert_eq!(norm(r"inline \( a+b \) here"), "inline $a+b$ here");
    }

    #[test]
    fn test_currency_is_escaped() {
        assert_eq!(norm("costs $5 and $10"), r"costs \$5 and \$10");
        assert_eq!(norm("range $5-$10"), r"range \$5-\$10");
    }

    #[test]
    fn test_inline_math_starting_with_digit_is_kept() {
        assert_eq!(norm("value $2x$ here"), "value $2x$ here");
    }

    #[test]
    fn test_code_is_untouched() {
        let text = "`$5` and\n```\nlet cost = \"$5\";\n\\[x\\]\n```\n";
        assert_eq!(norm(text), text);
    }

    #[test]
    fn test_unterminated_fence_is_untouched() {
        let text = "```py\nprint('$5')";
        assert_eq!(norm(text), text);
    }

    #[test]
    fn test_display_math_is_untouched() {
        assert_eq!(norm("$$\\frac{1}{2} + $3$$"), "$$\\frac{1}{2} + $3$$");
    }

    #[test]
    fn test_mhchem_is_escaped() {
        assert_eq!(norm(r"water $\ce{H2O}$"), r"water $\\ce{H2O}$");
        assert_eq!(norm(r"\(\pu{1 mol}\)"), r"$\\pu{1 mol}$");
    }

    #[test]
    fn test_no_math_is_borrowed() {
        assert!(matches!(normalize("plain text", true), Cow::Borrowed(_)));
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain text, no math",
            "costs $5 and $10",
            r"\(5\) then \[5\]",
            r"\(x\)5 and \(y\)",
            "$$a \\[b\\]",
            r"already \$5 escaped",
            r"\\$5 double backslash",
            "$x$5 $a$ $ 3$",
            r"$\ce{H2O}$ and \(\ce{CO2}\)",
            "`$5` and ```\n$6\n``` then $7",
            "line one $5\nline two 3$",
            r"\(a$5\) mixed",
            "unicode é $5 ü \\(β\\)",
            r"\(x\)\ce{H2O}",
            "cost \\(10`x`\\)",
            r"\(5\\)}",
            r"\(\]a5\[\ce{ \]\[\)",
            r"$$\(5\\)",
        ];
        for sample in samples {
            let once = norm(sample);
            assert_eq!(norm(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_idempotent_for_generated_input() {
        const TOKENS: [&str; 13] = [
            "$", "5", "x", " ", "\\", "\\(", "\\)", "\\[", "\\]", "`", "```", "\n", "\\ce{",
        ];
        for len in 1..=4u32 {
            for mut n in 0..TOKENS.len().pow(len) {
                let mut sample = String::new();
                for _ in 0..len {
                    sample.push_str(TOKENS[n % TOKENS.len()]);
                    n /= TOKENS.len();
                }
                let once = norm(&sample);
                assert_eq!(norm(&once), once, "not idempotent for {sample:?}");
            }
        }
    }

    #[test]
    fn test_unsafe_brackets_stay_as_written() {
        assert_eq!(norm("cost \\(10`x`\\)"), "cost \\(10`x`\\)");
        assert_eq!(norm(r"\(5\\)}"), r"\(5\\)}");
        assert_eq!(norm(r"\(x\)$5"), r"\(x\)\$5");
    }

    #[test]
    fn test_mhchem_after_rewritten_span() {
        assert_eq!(norm(r"\(x\)\ce{H2O}"), r"$x$\\ce{H2O}");
    }
}
