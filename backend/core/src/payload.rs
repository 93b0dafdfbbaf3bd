use serde::{Deserialize, Serialize};

/// One message body handed to the renderer by the message list.
///
/// An empty `raw_text` means the stream has started but nothing has arrived yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPayload {
    pub raw_text: String,
    #[serde(default)]
    pub is_latest_stream: bool,
}

impl ContentPayload {
    pub fn new(raw_text: impl Into<String>, is_latest_stream: bool) -> Self {
        Self {
            raw_text: raw_text.into(),
            is_latest_stream,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.raw_text.is_empty()
    }
}

/// The signed-in user, as far as link resolution and downloads are concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: Option<String>,
}

impl UserIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: Some(id.into()) }
    }

    pub fn anonymous() -> Self {
        Self { id: None }
    }

    /// The user id, or `None` when unset or blank.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Capability groups checked by the permission service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum PermissionType {
    RunCode,
}

/// Access level within a capability group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum Permission {
    Use,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_payload_is_pending() {
        assert!(ContentPayload::new("", true).is_pending());
        assert!(ContentPayload::new("", false).is_pending());
        assert!(!ContentPayload::new("hi", false).is_pending());
    }

    #[test]
    fn test_payload_camel_case_wire_names() {
        let payload: ContentPayload =
            serde_json::from_str(r#"{"rawText":"x","isLatestStream":true}"#).unwrap();
        assert_eq!(payload, ContentPayload::new("x", true));
    }

    #[test]
    fn test_blank_user_id_is_none() {
        assert_eq!(UserIdentity::new("  ").id(), None);
        assert_eq!(UserIdentity::anonymous().id(), None);
        assert_eq!(UserIdentity::new("u1").id(), Some("u1"));
    }

    #[test]
    fn test_permission_wire_names() {
        assert_eq!(
            serde_json::to_string(&PermissionType::RunCode).unwrap(),
            "\"RUN_CODE\""
        );
        assert_eq!(serde_json::to_string(&Permission::Use).unwrap(), "\"USE\"");
    }
}
