//! The seam between the orchestrators and the network.

use std::future::Future;
use std::sync::Arc;

use sealdrop_core::{DownloadedBlob, SealdropResult};

/// Transfer progress callback, called with a percentage in `[0, 100]`.
///
/// Invoked from inside the transfer loop, so it must return quickly.
/// Successive values passed to it never decrease.
pub type ProgressFn = Arc<dyn Fn(f64) + Send + Sync>;

/// Upload and download of opaque ciphertext.
///
/// Implementations surface failures as typed errors: `Upload` for any failed
/// upload, `NotFound` when the backend reports the object absent or expired,
/// and `Download` for every other failed download. No retrying happens at
/// this layer.
pub trait Transport: Send + Sync {
    /// Send `payload` to the backend and return the file id it assigned.
    fn upload(
        &self,
        payload: Vec<u8>,
        original_name: &str,
        mime_type: &str,
        on_progress: ProgressFn,
    ) -> impl Future<Output = SealdropResult<String>> + Send;

    /// Fetch the ciphertext and original-file metadata stored under `file_id`.
    fn download(
        &self,
        file_id: &str,
        on_progress: ProgressFn,
    ) -> impl Future<Output = SealdropResult<DownloadedBlob>> + Send;
}
