//! Log Redaction
//!
//! Masks the user segment of `files/<user>/…` and `outputs/<user>/…` paths so
//! log lines never carry a user id.

use once_cell::sync::Lazy;
use regex::Regex;

static USER_PATH_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(files|outputs)/[^/\s]+/").unwrap());

/// Replaces the user id in private file paths with `[USER]`.
pub fn redact_user_paths(input: &str) -> String {
    USER_PATH_RE.replace_all(input, "$1/[USER]/").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "fetch https://host/files/u123/abc/report.pdf and /outputs/u123/f9/plot.png";
        let clean = redact_user_paths(raw);
        assert!(!clean.contains("u123"));
        assert_eq!(clean, "fetch https://host/files/[USER]/abc/report.pdf and /outputs/[USER]/f9/plot.png");
    }

    #[test]
    fn test_unrelated_text_untouched() {
        assert_eq!(redact_user_paths("profiles/u1/x"), "profiles/u1/x");
    }
}
