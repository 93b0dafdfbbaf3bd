/// Link resolver: recognizes links to a user's private files and rewrites them
/// into access-controlled download links.
///
/// A link matches when its href contains `files/<user id>/…` or
/// `outputs/<user id>/…`. Anything else passes through untouched.
use chatmark_core::UserIdentity;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

/// Target attribute for links that do not point at a private file.
pub const PLAIN_LINK_TARGET: &str = "_new";

/// Target attribute for resolved file links.
pub const FILE_LINK_TARGET: &str = "_blank";

/// The result of resolving one href.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTarget {
    pub href: String,
    pub resolved_file_id: Option<String>,
    pub resolved_filename: Option<String>,
    pub resolved_path: Option<String>,
}

impl LinkTarget {
    fn unresolved(href: &str) -> Self {
        Self {
            href: href.to_string(),
            ..Default::default()
        }
    }

    /// True when the href was recognized as one of the user's files.
    pub fn is_file(&self) -> bool {
        self.resolved_file_id.is_some() && self.resolved_filename.is_some()
    }

    /// The href shown to non-scripted contexts.
    ///
    /// Resolved files point at the file API; everything else keeps its href.
    pub fn display_href(&self) -> String {
        match &self.resolved_path {
            Some(path) if self.is_file() => {
                if path.starts_with("files/") {
                    format!("/api/{path}")
                } else {
                    format!("/api/files/{path}")
                }
            }
            _ => self.href.clone(),
        }
    }

    pub fn target(&self) -> &'static str {
        if self.is_file() { FILE_LINK_TARGET } else { PLAIN_LINK_TARGET }
    }
}

/// A resolver bound to one user, built once per render pass.
#[derive(Debug, Clone)]
pub struct LinkResolver {
    pattern: Option<Regex>,
    plain_target: String,
    file_target: String,
}

impl LinkResolver {
    pub fn for_user(user: &UserIdentity) -> Self {
        let pattern = user.id().and_then(|id| {
            let source = format!(r"(?:files|outputs)/{}/\S+", regex::escape(id));
            match Regex::new(&source) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("[LinkResolver] Could not build file pattern: {}", e);
                    None
                }
            }
        });
        Self {
            pattern,
            plain_target: PLAIN_LINK_TARGET.to_string(),
            file_target: FILE_LINK_TARGET.to_string(),
        }
    }

    /// Override the target attributes used for plain and file links.
    pub fn with_targets(mut self, plain_target: impl Into<String>, file_target: impl Into<String>) -> Self {
        self.plain_target = plain_target.into();
        self.file_target = file_target.into();
        self
    }

    /// The target attribute for a resolved link under this resolver's settings.
    pub fn target_for(&self, link: &LinkTarget) -> &str {
        if link.is_file() { &self.file_target } else { &self.plain_target }
    }

    pub fn resolve(&self, href: &str) -> LinkTarget {
        let Some(pattern) = &self.pattern else {
            return LinkTarget::unresolved(href);
        };
        let Some(found) = pattern.find(href) else {
            return LinkTarget::unresolved(href);
        };

        let path = found.as_str();
        let mut parts = path.rsplit('/');
        let filename = parts.next().unwrap_or_default();
        let file_id = parts.next().unwrap_or_default();
        if filename.is_empty() || file_id.is_empty() {
            return LinkTarget::unresolved(href);
        }

        LinkTarget {
            href: href.to_string(),
            resolved_file_id: Some(file_id.to_string()),
            resolved_filename: Some(filename.to_string()),
            resolved_path: Some(path.to_string()),
        }
    }
}

/// Resolve a single href for a user.
pub fn resolve_link(href: &str, user: &UserIdentity) -> LinkTarget {
    LinkResolver::for_user(user).resolve(href)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_user_file() {
        let target = resolve_link("https://host/files/u123/abc/report.pdf", &UserIdentity::new("u123"));
        assert!(target.is_file());
        assert_eq!(target.resolved_file_id.as_deref(), Some("abc"));
        assert_eq!(target.resolved_filename.as_deref(), Some("report.pdf"));
        assert_eq!(target.resolved_path.as_deref(), Some("files/u123/abc/report.pdf"));
        assert_eq!(target.display_href(), "/api/files/u123/abc/report.pdf");
        assert_eq!(target.target(), FILE_LINK_TARGET);
    }

    #[test]
    fn test_outputs_path_gets_files_prefix() {
        let target = resolve_link("/outputs/u123/f9/plot.png", &UserIdentity::new("u123"));
        assert_eq!(target.resolved_path.as_deref(), Some("outputs/u123/f9/plot.png"));
        assert_eq!(target.display_href(), "/api/files/outputs/u123/f9/plot.png");
    }

    #[test]
    fn test_unrelated_href_passes_through() {
        let href = "https://example.com/docs/intro";
        let target = resolve_link(href, &UserIdentity::new("u123"));
        assert!(!target.is_file());
        assert_eq!(target, LinkTarget::unresolved(href));
        assert_eq!(target.display_href(), href);
        assert_eq!(target.target(), PLAIN_LINK_TARGET);
    }

    #[test]
    fn test_other_users_files_are_not_resolved() {
        let target = resolve_link("https://host/files/u999/abc/report.pdf", &UserIdentity::new("u123"));
        assert!(!target.is_file());
    }

    #[test]
    fn test_user_id_is_matched_literally() {
        let target = resolve_link("files/uXb/abc/a.txt", &UserIdentity::new("u.b"));
        assert!(!target.is_file());
    }

    #[test]
    fn test_anonymous_user_resolves_nothing() {
        let target = resolve_link("files//abc/a.txt", &UserIdentity::anonymous());
        assert!(!target.is_file());
    }

    #[test]
    fn test_match_stops_at_whitespace() {
        let target = resolve_link("files/u1/id7/notes.txt trailing", &UserIdentity::new("u1"));
        assert_eq!(target.resolved_filename.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_trailing_slash_is_not_a_file() {
        let target = resolve_link("files/u1/id7/", &UserIdentity::new("u1"));
        assert!(!target.is_file());
    }

    #[test]
    fn test_custom_targets() {
        let resolver = LinkResolver::for_user(&UserIdentity::new("u1")).with_targets("_self", "_download");
        assert_eq!(resolver.target_for(&resolver.resolve("files/u1/id7/a.txt")), "_download");
        assert_eq!(resolver.target_for(&resolver.resolve("https://example.com")), "_self");
    }
}
