//! Security decisions for rendered content.
//!
//! Everything here is a pure "decide" step (may this block run code? does this
//! link point at a private file?) plus the async download flow a resolved file
//! link triggers when clicked.

pub mod code_gate;
pub mod download;
pub mod link_resolver;

pub use code_gate::{CodeExecutionGate, ExecutionDecision, ExecutionPolicy, GrantedPermissions};
pub use download::{DownloadOutcome, DownloadServices, FileDownloader, ViewHandle, DOWNLOAD_ERROR_KEY};
pub use link_resolver::{resolve_link, LinkResolver, LinkTarget, FILE_LINK_TARGET, PLAIN_LINK_TARGET};
