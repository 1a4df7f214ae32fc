//! sealdrop-flow: the upload and download state machines
//!
//! Each flow drives one transfer end to end:
//!   - upload: validate size → generate key/IV → encrypt → upload → share link
//!   - download: parse link → download → decrypt → file ready to save
//!
//! Progress from every phase is folded into a single monotonic percentage
//! by [`progress::ProgressTracker`].

use std::future::Future;

use sealdrop_core::{SealdropError, SealdropResult};
use tokio_util::sync::CancellationToken;

pub mod download;
pub mod progress;
pub mod upload;

pub use download::{DownloadFlow, DownloadState};
pub use progress::{Band, ProgressObserver, ProgressTracker};
pub use upload::{UploadFlow, UploadState};

/// Run `fut` to completion unless `cancel` fires first.
///
/// On cancellation `fut` is dropped, which aborts any in-flight request and
/// frees its buffers.
pub(crate) async fn until_cancelled<F, R>(
    cancel: Option<&CancellationToken>,
    fut: F,
) -> SealdropResult<R>
where
    F: Future<Output = SealdropResult<R>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(SealdropError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}

/// Fail fast if `cancel` has already fired.
pub(crate) fn check_cancelled(cancel: Option<&CancellationToken>) -> SealdropResult<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SealdropError::Cancelled),
        _ => Ok(()),
    }
}
