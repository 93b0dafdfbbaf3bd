//! Services the render pipeline consumes but does not own.
//!
//! Hosts implement these for their UI toolkit; the pipeline only ever sees the traits.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::payload::{Permission, PermissionType};

/// Answers capability checks for the current user.
pub trait PermissionService: Send + Sync {
    fn has_access(&self, permission_type: PermissionType, permission: Permission) -> bool;
}

/// A retrievable handle to downloaded file data (e.g. an object URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRef(pub String);

impl DownloadRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Fetches a short-lived, access-controlled reference to a user's file.
#[async_trait]
pub trait FileDownloadService: Send + Sync {
    /// Returns `Ok(None)` (or an empty reference) when the file has no retrievable data.
    async fn fetch(&self, user_id: &str, file_id: &str) -> Result<Option<DownloadRef>>;
}

/// Performs the one-shot programmatic download on the host side.
pub trait DownloadSink: Send + Sync {
    /// Start a download of `reference` saved under `filename`.
    fn trigger(&self, reference: &DownloadRef, filename: &str);

    /// Free any temporary resource behind `reference`.
    fn release(&self, reference: &DownloadRef);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastStatus {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible notification sink.
pub trait ToastSink: Send + Sync {
    fn show_toast(&self, status: ToastStatus, message: &str);
}

/// Localization lookup for user-facing strings.
pub trait Localizer: Send + Sync {
    fn localize(&self, key: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyFiles;

    #[async_trait]
    impl FileDownloadService for EmptyFiles {
        async fn fetch(&self, _user_id: &str, _file_id: &str) -> Result<Option<DownloadRef>> {
            Ok(Some(DownloadRef::new("")))
        }
    }

    #[tokio::test]
    async fn test_empty_reference_is_detectable() {
        let reference = EmptyFiles.fetch("u1", "f1").await.unwrap().unwrap();
        assert!(reference.is_empty());
    }

    #[test]
    fn test_toast_status_wire_name() {
        assert_eq!(serde_json::to_string(&ToastStatus::Error).unwrap(), "\"error\"");
    }
}
