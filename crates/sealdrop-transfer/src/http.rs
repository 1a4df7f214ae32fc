//! HTTP transport against the sealdrop backend API
//!
//! Endpoints:
//!   POST /api/upload             multipart (file, originalName, mimeType) → {"fileId": ".."}
//!   GET  /api/download/{fileId}  raw ciphertext + X-Original-Filename, X-Original-Mimetype

use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{multipart, Body, Client, StatusCode, Url};
use sealdrop_core::config::{SealdropConfig, TransferConfig};
use sealdrop_core::types::{DEFAULT_FILENAME, DEFAULT_MIME_TYPE};
use sealdrop_core::{DownloadedBlob, SealdropError, SealdropResult, TAG_SIZE};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::transport::{ProgressFn, Transport};

const FILENAME_HEADER: &str = "x-original-filename";
const MIMETYPE_HEADER: &str = "x-original-mimetype";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "fileId")]
    file_id: Option<String>,
}

/// Transfer client speaking the backend's HTTP API.
///
/// Timeouts come from [`TransferConfig`]; requests are never retried here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
    chunk_size: usize,
    /// Largest download body accepted: the plaintext limit plus the tag
    max_download_size: u64,
}

impl HttpTransport {
    /// Build a transport for the backend at `base_url`.
    pub fn new(base_url: &str, cfg: &TransferConfig) -> SealdropResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SealdropError::Config(format!("invalid backend URL {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SealdropError::Config(format!(
                "backend URL {base_url} cannot carry a path"
            )));
        }

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
            .read_timeout(Duration::from_secs(cfg.read_timeout_secs))
            .user_agent(concat!("sealdrop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SealdropError::Config(format!("creating HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            chunk_size: cfg.chunk_size.max(1),
            max_download_size: cfg.max_file_size.saturating_add(TAG_SIZE as u64),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn oversized_download(&self, size: u64) -> SealdropError {
        warn!(size, limit = self.max_download_size, "download: response too large");
        SealdropError::Download(format!(
            "response exceeds {} bytes ({size} received or announced)",
            self.max_download_size
        ))
    }

    /// `{base}/api/{segments..}`, each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        url.set_query(None);
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().push("api").extend(segments);
        }
        url
    }
}

/// Build a transport from the client config.
///
/// If `enforce_tls` is true and the backend uses HTTP, this returns an error.
/// Otherwise, a warning is logged for non-HTTPS backends.
pub fn build_from_core_config(config: &SealdropConfig) -> SealdropResult<HttpTransport> {
    let backend = &config.backend;
    if backend.base_url.starts_with("http://") {
        if backend.enforce_tls {
            return Err(SealdropError::Config(format!(
                "backend uses plaintext HTTP ({}), but enforce_tls is enabled. \
                 Use an HTTPS backend or set backend.enforce_tls = false for local development.",
                backend.base_url
            )));
        }
        warn!(
            backend = %backend.base_url,
            "backend uses plaintext HTTP: file ids and metadata are visible on the network. \
             Set backend.enforce_tls = true and use HTTPS in production."
        );
    }

    HttpTransport::new(&backend.base_url, &config.transfer)
}

impl Transport for HttpTransport {
    async fn upload(
        &self,
        payload: Vec<u8>,
        original_name: &str,
        mime_type: &str,
        on_progress: ProgressFn,
    ) -> SealdropResult<String> {
        let total = payload.len() as u64;
        let body = progress_body(Bytes::from(payload), self.chunk_size, on_progress);

        let file_part = multipart::Part::stream_with_length(body, total)
            .file_name(format!("encrypted_{original_name}"))
            .mime_str(DEFAULT_MIME_TYPE)
            .map_err(|e| SealdropError::Upload(format!("building request: {e}")))?;
        let form = multipart::Form::new()
            .part("file", file_part)
            .text("originalName", original_name.to_string())
            .text("mimeType", mime_type.to_string());

        let url = self.endpoint(&["upload"]);
        debug!(url = %url, bytes = total, "upload: sending");

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| SealdropError::Upload(format!("network error during upload: {e}")))?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "upload rejected by backend");
            return Err(SealdropError::Upload(status_message(status, &message)));
        }

        let resp: UploadResponse = response
            .json()
            .await
            .map_err(|e| SealdropError::Upload(format!("invalid upload response: {e}")))?;
        let file_id = resp
            .file_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SealdropError::Upload("upload response carried no fileId".into()))?;

        info!(file_id = %file_id, bytes = total, "upload: complete");
        Ok(file_id)
    }

    async fn download(
        &self,
        file_id: &str,
        on_progress: ProgressFn,
    ) -> SealdropResult<DownloadedBlob> {
        let url = self.endpoint(&["download", file_id]);
        debug!(url = %url, "download: requesting");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SealdropError::Download(format!("network error during download: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            info!(file_id = %file_id, "download: not found or expired");
            return Err(SealdropError::NotFound(file_id.to_string()));
        }
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "download rejected by backend");
            return Err(SealdropError::Download(status_message(status, &message)));
        }

        let filename = header_or(&response, FILENAME_HEADER, DEFAULT_FILENAME);
        let mime_type = header_or(&response, MIMETYPE_HEADER, DEFAULT_MIME_TYPE);
        let total = response.content_length();
        if let Some(total) = total.filter(|t| *t > self.max_download_size) {
            return Err(self.oversized_download(total));
        }

        // Cap the preallocation: Content-Length is untrusted
        let mut data = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                SealdropError::Download(format!("network error during download: {e}"))
            })?;
            data.extend_from_slice(&chunk);
            if data.len() as u64 > self.max_download_size {
                return Err(self.oversized_download(data.len() as u64));
            }
            if let Some(total) = total.filter(|t| *t > 0) {
                on_progress(percent(data.len() as u64, total));
            }
        }
        on_progress(100.0);

        info!(file_id = %file_id, bytes = data.len(), "download: complete");
        Ok(DownloadedBlob {
            data,
            filename,
            mime_type,
        })
    }
}

/// Stream `payload` in `chunk_size` slices, reporting progress as each slice
/// is handed to the connection.
fn progress_body(payload: Bytes, chunk_size: usize, on_progress: ProgressFn) -> Body {
    let total = payload.len() as u64;
    let mut sent = 0u64;
    let chunks: Vec<Bytes> = (0..payload.len())
        .step_by(chunk_size)
        .map(|start| payload.slice(start..(start + chunk_size).min(payload.len())))
        .collect();

    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(percent(sent, total));
        Ok::<Bytes, std::io::Error>(chunk)
    });
    Body::wrap_stream(stream)
}

fn percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (done as f64 / total as f64 * 100.0).min(100.0)
}

fn header_or(response: &reqwest::Response, name: &str, default: &str) -> String {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

fn status_message(status: StatusCode, body: &str) -> String {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {} {reason}", status.as_u16())
    } else {
        format!("HTTP {} {reason}: {body}", status.as_u16())
    }
}
