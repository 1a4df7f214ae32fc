//! Upload flow: plaintext file in, share link out.
//!
//! ```text
//! Idle ─submit─> Encrypting ─> Uploading ─> Finalizing ─> Completed(link)
//!   ^                │             │             │
//!   │                └─────────────┴─────────────┴──> Failed(error)
//!   └──────────────────────── reset ─────────────────────┘
//! ```
//!
//! Progress: 10 on entering encryption, 30 once sealed, 30–90 while the
//! ciphertext is on the wire, 95 while the link is built, 100 when done.

use rand::rngs::OsRng;
use rand::RngCore;
use sealdrop_core::{SealdropError, SealdropResult, SourceFile, MAX_FILE_SIZE};
use sealdrop_crypto::keys::{generate_iv_from, generate_key_from};
use sealdrop_crypto::{encode_link, AeadEngine, Aes256GcmEngine, ShareLink};
use sealdrop_transfer::Transport;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::progress::{Band, ProgressObserver, ProgressTracker};
use crate::{check_cancelled, until_cancelled};

const UPLOAD_BAND: Band = Band::new(30.0, 90.0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Encrypting,
    Uploading,
    Finalizing,
    Completed { link: ShareLink },
    Failed { error: SealdropError },
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            UploadState::Idle => "idle",
            UploadState::Encrypting => "encrypting",
            UploadState::Uploading => "uploading",
            UploadState::Finalizing => "finalizing",
            UploadState::Completed { .. } => "completed",
            UploadState::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadState::Completed { .. } | UploadState::Failed { .. }
        )
    }
}

/// Drives a single file from plaintext to share link.
///
/// A flow handles one file at a time. After it reaches `Completed` or
/// `Failed`, call [`UploadFlow::reset`] before submitting another.
pub struct UploadFlow<T: Transport> {
    transport: T,
    origin: String,
    max_file_size: u64,
    engine: Box<dyn AeadEngine>,
    rng: Box<dyn RngCore + Send + Sync>,
    tracker: ProgressTracker,
    cancel: Option<CancellationToken>,
    state: UploadState,
}

impl<T: Transport> UploadFlow<T> {
    /// A flow that uploads through `transport` and builds links on `origin`.
    pub fn new(transport: T, origin: impl Into<String>) -> Self {
        Self {
            transport,
            origin: origin.into(),
            max_file_size: MAX_FILE_SIZE,
            engine: Box::new(Aes256GcmEngine),
            rng: Box::new(OsRng),
            tracker: ProgressTracker::default(),
            cancel: None,
            state: UploadState::Idle,
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_engine(mut self, engine: impl AeadEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    /// Replace the OS random source used for key and IV generation.
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.rng = Box::new(rng);
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

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Overall progress, 0–100.
    pub fn progress(&self) -> f64 {
        self.tracker.percent()
    }

    /// The share link, once the flow has completed.
    pub fn link(&self) -> Option<&ShareLink> {
        match &self.state {
            UploadState::Completed { link } => Some(link),
            _ => None,
        }
    }

    /// Encrypt and upload `file`, returning its share link.
    ///
    /// Rejected with [`SealdropError::Busy`] unless the flow is `Idle`; the
    /// state is left untouched in that case. Every other error leaves the
    /// flow in `Failed`.
    pub async fn submit(&mut self, file: SourceFile) -> SealdropResult<ShareLink> {
        if self.state != UploadState::Idle {
            warn!(state = self.state.name(), "upload: submit while not idle");
            return Err(SealdropError::Busy);
        }

        match self.run(file).await {
            Ok(link) => {
                info!(url = %link.request_url(), "upload: completed");
                self.state = UploadState::Completed { link: link.clone() };
                Ok(link)
            }
            Err(error) => {
                warn!(
                    error = %error,
                    stage = self.state.name(),
                    progress = self.tracker.percent(),
                    "upload: failed"
                );
                self.state = UploadState::Failed {
                    error: error.clone(),
                };
                self.tracker.set_stage("failed");
                Err(error)
            }
        }
    }

    /// Return a finished flow to `Idle` with progress at 0.
    ///
    /// There is no retry for uploads: the caller restarts from the file.
    /// A cancellation token that has fired stays fired.
    pub fn reset(&mut self) {
        debug!(from = self.state.name(), "upload: reset");
        self.state = UploadState::Idle;
        self.tracker.reset();
    }

    async fn run(&mut self, file: SourceFile) -> SealdropResult<ShareLink> {
        let size = file.size();
        if size > self.max_file_size {
            return Err(SealdropError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        let SourceFile {
            name,
            mime_type,
            data,
        } = file;

        self.enter(UploadState::Encrypting);
        self.tracker.advance(10.0);
        check_cancelled(self.cancel.as_ref())?;

        let key = generate_key_from(&mut *self.rng)?;
        let iv = generate_iv_from(&mut *self.rng)?;
        let ciphertext = self.engine.encrypt(&data, &key, &iv)?;
        drop(data);
        debug!(plaintext = size, ciphertext = ciphertext.len(), "upload: sealed");
        self.tracker.advance(30.0);

        self.enter(UploadState::Uploading);
        let on_progress = self.tracker.band_callback(UPLOAD_BAND);
        let file_id = until_cancelled(
            self.cancel.as_ref(),
            self.transport
                .upload(ciphertext, &name, &mime_type, on_progress),
        )
        .await?;
        self.tracker.advance(UPLOAD_BAND.end);

        self.enter(UploadState::Finalizing);
        self.tracker.advance(95.0);
        let link = encode_link(&self.origin, &file_id, &key, &iv);
        drop(key);
        drop(iv);
        self.tracker.advance(100.0);

        Ok(link)
    }

    fn enter(&mut self, state: UploadState) {
        debug!(from = self.state.name(), to = state.name(), "upload: transition");
        self.tracker.set_stage(state.name());
        self.state = state;
    }
}

impl<T: Transport> std::fmt::Debug for UploadFlow<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadFlow")
            .field("origin", &self.origin)
            .field("max_file_size", &self.max_file_size)
            .field("state", &self.state)
            .field("progress", &self.tracker.percent())
            .finish()
    }
}
