//! Download flow: share link in, decrypted file out.
//!
//! ```text
//! Idle ─start─> Downloading ─> Decrypting ─> Ready(file) ─take_file─> Delivered
//!                  │               │
//!                  └───────────────┴──> Failed(error) ─retry─> Downloading
//! ```
//!
//! `Delivered` is terminal: a flow fetches its link at most once per
//! successful run.
//!
//! The link is parsed before anything touches the network, so a truncated
//! or garbled link fails without a request. Progress: 0–70 while the
//! ciphertext arrives, 75 when decryption starts, 95 once it verifies,
//! 100 when the file is ready.

use sealdrop_core::{DecryptedFile, SealdropError, SealdropResult};
use sealdrop_crypto::{decode_link, AeadEngine, Aes256GcmEngine, LinkParts};
use sealdrop_transfer::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::{Band, ProgressObserver, ProgressTracker};
use crate::{check_cancelled, until_cancelled};

const DOWNLOAD_BAND: Band = Band::new(0.0, 70.0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadState {
    Idle,
    Downloading,
    Decrypting,
    Ready { file: DecryptedFile },
    /// The decrypted file was handed out with `take_file`
    Delivered,
    Failed { error: SealdropError },
}

impl DownloadState {
    pub fn name(&self) -> &'static str {
        match self {
            DownloadState::Idle => "idle",
            DownloadState::Downloading => "downloading",
            DownloadState::Decrypting => "decrypting",
            DownloadState::Ready { .. } => "ready",
            DownloadState::Delivered => "delivered",
            DownloadState::Failed { .. } => "failed",
        }
    }
}

/// Drives one share link from URL to decrypted file.
pub struct DownloadFlow<T: Transport> {
    transport: T,
    current_url: String,
    parts: Option<LinkParts>,
    engine: Box<dyn AeadEngine>,
    tracker: ProgressTracker,
    cancel: Option<CancellationToken>,
    state: DownloadState,
}

impl<T: Transport> DownloadFlow<T> {
    /// A flow for the share link at `current_url`, fetched through `transport`.
    pub fn new(transport: T, current_url: impl Into<String>) -> Self {
        Self {
            transport,
            current_url: current_url.into(),
            parts: None,
            engine: Box::new(Aes256GcmEngine),
            tracker: ProgressTracker::default(),
            cancel: None,
            state: DownloadState::Idle,
        }
    }

    pub fn with_engine(mut self, engine: impl AeadEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_observer(mut self, observer: ProgressObserver) -> Self {
        self.tracker = ProgressTracker::new(Some(observer));
        self
    }

    /// Abort the transfer when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn state(&self) -> &DownloadState {
        &self.state
    }

    /// Overall progress, 0–100.
    pub fn progress(&self) -> f64 {
        self.tracker.percent()
    }

    /// The decrypted file, while the flow is `Ready`.
    pub fn file(&self) -> Option<&DecryptedFile> {
        match &self.state {
            DownloadState::Ready { file } => Some(file),
            _ => None,
        }
    }

    /// Move the decrypted file out, leaving the flow `Delivered`.
    pub fn take_file(&mut self) -> Option<DecryptedFile> {
        match std::mem::replace(&mut self.state, DownloadState::Delivered) {
            DownloadState::Ready { file } => Some(file),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Parse the link, then download and decrypt the file. Only valid from
    /// `Idle`; a failed flow is re-entered with [`DownloadFlow::retry`].
    pub async fn start(&mut self) -> SealdropResult<()> {
        if self.state != DownloadState::Idle {
            return Err(SealdropError::InvalidState(format!(
                "start requires idle, flow is {}",
                self.state.name()
            )));
        }
        self.drive().await
    }

    /// Re-attempt a failed download from scratch, progress back at 0.
    pub async fn retry(&mut self) -> SealdropResult<()> {
        if !matches!(self.state, DownloadState::Failed { .. }) {
            return Err(SealdropError::InvalidState(format!(
                "retry requires failed, flow is {}",
                self.state.name()
            )));
        }
        info!("download: retrying");
        self.tracker.reset();
        self.drive().await
    }

    async fn drive(&mut self) -> SealdropResult<()> {
        match self.run().await {
            Ok(file) => {
                info!(
                    filename = %file.filename,
                    bytes = file.data.len(),
                    "download: ready"
                );
                self.state = DownloadState::Ready { file };
                self.tracker.set_stage("ready");
                self.tracker.advance(100.0);
                Ok(())
            }
            Err(error) => {
                warn!(
                    error = %error,
                    stage = self.state.name(),
                    progress = self.tracker.percent(),
                    "download: failed"
                );
                self.state = DownloadState::Failed {
                    error: error.clone(),
                };
                self.tracker.set_stage("failed");
                Err(error)
            }
        }
    }

    async fn run(&mut self) -> SealdropResult<DecryptedFile> {
        let parts = match &self.parts {
            Some(parts) => parts.clone(),
            None => {
                let parts = decode_link(&self.current_url)?;
                self.parts = Some(parts.clone());
                parts
            }
        };
        check_cancelled(self.cancel.as_ref())?;

        self.enter(DownloadState::Downloading);
        debug!(file_id = %parts.file_id, "download: fetching ciphertext");
        let on_progress = self.tracker.band_callback(DOWNLOAD_BAND);
        let blob = until_cancelled(
            self.cancel.as_ref(),
            self.transport.download(&parts.file_id, on_progress),
        )
        .await?;
        self.tracker.advance(DOWNLOAD_BAND.end);

        self.enter(DownloadState::Decrypting);
        self.tracker.advance(75.0);
        let data = self.engine.decrypt(&blob.data, &parts.key, &parts.iv)?;
        self.tracker.advance(95.0);

        // Key material is no longer needed once the file verified
        drop(parts);
        self.parts = None;

        Ok(DecryptedFile {
            data,
            filename: blob.filename,
            mime_type: blob.mime_type,
        })
    }

    fn enter(&mut self, state: DownloadState) {
        debug!(from = self.state.name(), to = state.name(), "download: transition");
        self.tracker.set_stage(state.name());
        self.state = state;
    }
}

impl<T: Transport> std::fmt::Debug for DownloadFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadFlow")
            .field("state", &self.state)
            .field("progress", &self.tracker.percent())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealdrop_core::DownloadedBlob;
    use sealdrop_transfer::ProgressFn;

    /// A backend that has never heard of any file.
    struct EmptyBackend;

    impl Transport for EmptyBackend {
        async fn upload(
            &self,
            _payload: Vec<u8>,
            _original_name: &str,
            _mime_type: &str,
            _on_progress: ProgressFn,
        ) -> SealdropResult<String> {
            Err(SealdropError::Upload("read-only backend".into()))
        }

        async fn download(
            &self,
            file_id: &str,
            _on_progress: ProgressFn,
        ) -> SealdropResult<DownloadedBlob> {
            Err(SealdropError::NotFound(file_id.to_string()))
        }
    }

    const LINK: &str = "https://drop.example.com/download/abc\
        #key=000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f\
        &iv=0a0a0a0a0a0a0a0a0a0a0a0a";

    #[test]
    fn test_take_file_outside_ready() {
        let mut flow = DownloadFlow::new(EmptyBackend, LINK);
        assert!(flow.take_file().is_none());
        assert_eq!(flow.state(), &DownloadState::Idle);
    }

    #[test]
    fn test_take_file_leaves_delivered() {
        let mut flow = DownloadFlow::new(EmptyBackend, LINK);
        flow.state = DownloadState::Ready {
            file: DecryptedFile {
                data: b"x".to_vec(),
                filename: "x.txt".into(),
                mime_type: "text/plain".into(),
            },
        };

        assert!(flow.take_file().is_some());
        assert_eq!(flow.state(), &DownloadState::Delivered);
        assert!(flow.take_file().is_none());
        assert_eq!(flow.state().name(), "delivered");
    }

    #[test]
    fn test_failed_download_caches_link_parts() {
        let mut flow = DownloadFlow::new(EmptyBackend, LINK);

        let err = tokio_test::block_on(flow.start()).unwrap_err();
        assert_eq!(err, SealdropError::NotFound("abc".into()));
        assert!(flow.parts.is_some(), "parsed link kept for retry");
        assert_eq!(flow.state().name(), "failed");
    }

    #[test]
    fn test_debug_hides_link() {
        let flow = DownloadFlow::new(EmptyBackend, LINK);
        let rendered = format!("{flow:?}");
        assert!(!rendered.contains("key="));
    }
}
