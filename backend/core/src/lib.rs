pub mod error;
pub mod payload;
pub mod traits;

pub use error::ChatmarkError;
pub use payload::{ContentPayload, Permission, PermissionType, UserIdentity};
pub use traits::{
    DownloadRef, DownloadSink, FileDownloadService, Localizer, PermissionService, ToastSink,
    ToastStatus,
};
