/// Click handler for resolved file links.
///
/// A click never navigates. It fetches a short-lived download reference for
/// `(user id, file id)`, hands it to the host's download sink, then releases it.
/// Each click runs independently; nothing is queued or deduplicated.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chatmark_core::{
    ChatmarkError, DownloadSink, FileDownloadService, Localizer, ToastSink, ToastStatus, UserIdentity,
};
use chatmark_logging::redact_user_paths;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::link_resolver::LinkTarget;

/// Localization key for the "download failed" toast.
pub const DOWNLOAD_ERROR_KEY: &str = "com_ui_download_error";

/// Liveness flag for the view hosting a rendered message.
///
/// Clones share the flag. Once torn down, pending download completions do nothing.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    alive: Arc<AtomicBool>,
}

impl Default for ViewHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewHandle {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The sink was asked to download and the reference was released.
    Triggered,
    /// The service returned nothing; a toast was shown.
    NoData,
    /// The fetch errored; logged only.
    Failed,
    /// The view was torn down before the fetch completed.
    Detached,
    /// The link was not a resolved file link.
    NotAFile,
}

/// Host collaborators the download flow needs.
#[derive(Clone)]
pub struct DownloadServices {
    pub files: Arc<dyn FileDownloadService>,
    pub sink: Arc<dyn DownloadSink>,
    pub toasts: Arc<dyn ToastSink>,
    pub localizer: Arc<dyn Localizer>,
}

#[derive(Clone)]
pub struct FileDownloader {
    services: DownloadServices,
}

impl FileDownloader {
    pub fn new(services: DownloadServices) -> Self {
        Self { services }
    }

    /// Run the download flow for a clicked link to completion.
    pub async fn handle_click(
        &self,
        target: &LinkTarget,
        user: &UserIdentity,
        view: &ViewHandle,
    ) -> DownloadOutcome {
        let (Some(file_id), Some(filename)) =
            (target.resolved_file_id.as_deref(), target.resolved_filename.as_deref())
        else {
            return DownloadOutcome::NotAFile;
        };
        let user_id = user.id().unwrap_or_default();
        let path = redact_user_paths(target.resolved_path.as_deref().unwrap_or_default());

        let fetched = self.services.files.fetch(user_id, file_id).await;
        if !view.is_alive() {
            debug!(file_id, "[Download] View torn down before fetch completed");
            return DownloadOutcome::Detached;
        }

        match fetched {
            Err(e) => {
                let err = ChatmarkError::Download {
                    file_id: file_id.to_string(),
                    message: format!("{e:#}"),
                };
                error!(path = %path, "Error downloading file: {}", err);
                DownloadOutcome::Failed
            }
            Ok(reference) => match reference.filter(|r| !r.is_empty()) {
                None => {
                    error!(file_id, path = %path, "Error downloading file: No data found");
                    let message = self.services.localizer.localize(DOWNLOAD_ERROR_KEY);
                    self.services.toasts.show_toast(ToastStatus::Error, &message);
                    DownloadOutcome::NoData
                }
                Some(reference) => {
                    self.services.sink.trigger(&reference, filename);
                    self.services.sink.release(&reference);
                    debug!(file_id, filename, "[Download] Triggered");
                    DownloadOutcome::Triggered
                }
            },
        }
    }

    /// Spawn the download flow for a click on the current runtime.
    pub fn spawn_click(
        &self,
        target: LinkTarget,
        user: UserIdentity,
        view: ViewHandle,
    ) -> JoinHandle<DownloadOutcome> {
        let downloader = self.clone();
        tokio::spawn(async move { downloader.handle_click(&target, &user, &view).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_resolver::resolve_link;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use chatmark_core::DownloadRef;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    enum Reply {
        Data(&'static str),
        Empty,
        Missing,
        Fail,
    }

    struct StubFiles {
        reply: Reply,
        gate: Option<Arc<Notify>>,
    }

    #[async_trait]
    impl FileDownloadService for StubFiles {
        async fn fetch(&self, _user_id: &str, _file_id: &str) -> Result<Option<DownloadRef>> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.reply {
                Reply::Data(r) => Ok(Some(DownloadRef::new(r))),
                Reply::Empty => Ok(Some(DownloadRef::new(""))),
                Reply::Missing => Ok(None),
                Reply::Fail => bail!("connection reset"),
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl DownloadSink for Recorder {
        fn trigger(&self, reference: &DownloadRef, filename: &str) {
            self.events.lock().unwrap().push(format!("trigger {} {}", reference.as_str(), filename));
        }

        fn release(&self, reference: &DownloadRef) {
            self.events.lock().unwrap().push(format!("release {}", reference.as_str()));
        }
    }

    impl ToastSink for Recorder {
        fn show_toast(&self, status: ToastStatus, message: &str) {
            self.events.lock().unwrap().push(format!("toast {:?} {}", status, message));
        }
    }

    struct Keys;

    impl Localizer for Keys {
        fn localize(&self, key: &str) -> String {
            format!("<{key}>")
        }
    }

    fn downloader(files: StubFiles, recorder: Arc<Recorder>) -> FileDownloader {
        FileDownloader::new(DownloadServices {
            files: Arc::new(files),
            sink: recorder.clone(),
            toasts: recorder,
            localizer: Arc::new(Keys),
        })
    }

    fn file_link() -> (LinkTarget, UserIdentity) {
        let user = UserIdentity::new("u1");
        (resolve_link("https://h/files/u1/f1/a.csv", &user), user)
    }

    #[tokio::test]
    async fn test_success_triggers_then_releases() {
        let recorder = Arc::new(Recorder::default());
        let dl = downloader(StubFiles { reply: Reply::Data("blob:1"), gate: None }, recorder.clone());
        let (target, user) = file_link();
        let outcome = dl.handle_click(&target, &user, &ViewHandle::new()).await;
        assert_eq!(outcome, DownloadOutcome::Triggered);
        assert_eq!(recorder.events(), vec!["trigger blob:1 a.csv", "release blob:1"]);
    }

    #[tokio::test]
    async fn test_no_data_shows_toast() {
        for reply in [Reply::Empty, Reply::Missing] {
            let recorder = Arc::new(Recorder::default());
            let dl = downloader(StubFiles { reply, gate: None }, recorder.clone());
            let (target, user) = file_link();
            let outcome = dl.handle_click(&target, &user, &ViewHandle::new()).await;
            assert_eq!(outcome, DownloadOutcome::NoData);
            assert_eq!(recorder.events(), vec!["toast Error <com_ui_download_error>"]);
        }
    }

    #[tokio::test]
    async fn test_fetch_error_is_logged_without_toast() {
        let recorder = Arc::new(Recorder::default());
        let dl = downloader(StubFiles { reply: Reply::Fail, gate: None }, recorder.clone());
        let (target, user) = file_link();
        let outcome = dl.handle_click(&target, &user, &ViewHandle::new()).await;
        assert_eq!(outcome, DownloadOutcome::Failed);
        assert!(recorder.events().is_empty());
    }

    #[tokio::test]
    async fn test_plain_link_is_ignored() {
        let recorder = Arc::new(Recorder::default());
        let dl = downloader(StubFiles { reply: Reply::Data("x"), gate: None }, recorder.clone());
        let user = UserIdentity::new("u1");
        let target = resolve_link("https://example.com", &user);
        let outcome = dl.handle_click(&target, &user, &ViewHandle::new()).await;
        assert_eq!(outcome, DownloadOutcome::NotAFile);
    }

    #[tokio::test]
    async fn test_teardown_before_completion_is_noop() {
        let recorder = Arc::new(Recorder::default());
        let gate = Arc::new(Notify::new());
        let dl = downloader(
            StubFiles { reply: Reply::Data("blob:2"), gate: Some(gate.clone()) },
            recorder.clone(),
        );
        let (target, user) = file_link();
        let view = ViewHandle::new();
        let handle = dl.spawn_click(target, user, view.clone());
        view.teardown();
        gate.notify_one();
        assert_eq!(handle.await.unwrap(), DownloadOutcome::Detached);
        assert!(recorder.events().is_empty());
    }
}
