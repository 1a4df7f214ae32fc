//! Share link encoding: the file id goes in the path, key material goes in
//! the fragment.
//!
//! ```text
//! {origin}/download/{fileId}#key={64 hex chars}&iv={24 hex chars}
//! ```
//!
//! HTTP clients never send the fragment, so the backend that issued
//! `fileId` never sees the key. Only [`ShareLink::request_url`] may be handed
//! to a network layer.

use std::fmt;

use sealdrop_core::{SealdropError, SealdropResult};

use crate::keys::{Nonce, SymmetricKey};

const DOWNLOAD_SEGMENT: &str = "/download/";

/// A complete share link, including its secret fragment.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareLink {
    url: String,
}

impl ShareLink {
    /// The full link, fragment included. This is what the sender shares.
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// The link with its fragment removed: safe to put on the wire.
    pub fn request_url(&self) -> &str {
        match self.url.split_once('#') {
            Some((before, _)) => before,
            None => &self.url,
        }
    }

    /// The secret part after `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.url.split_once('#').map(|(_, frag)| frag)
    }

    pub fn into_string(self) -> String {
        self.url
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

impl fmt::Debug for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareLink")
            .field("url", &self.request_url())
            .field("fragment", &"[REDACTED]")
            .finish()
    }
}

/// Everything a downloader needs, extracted from a share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkParts {
    pub file_id: String,
    pub key: SymmetricKey,
    pub iv: Nonce,
}

/// Build the share link for an uploaded file.
///
/// `file_id` is used verbatim; backend ids never contain `#`.
pub fn encode_link(
    base_origin: &str,
    file_id: &str,
    key: &SymmetricKey,
    iv: &Nonce,
) -> ShareLink {
    let origin = base_origin.trim_end_matches('/');
    ShareLink {
        url: format!(
            "{origin}{DOWNLOAD_SEGMENT}{file_id}#key={}&iv={}",
            hex::encode(key.as_bytes()),
            hex::encode(iv.as_bytes()),
        ),
    }
}

/// Extract file id, key and IV from a share link.
///
/// Also accepts hash-router links of the form
/// `{origin}/#/download/{fileId}?key=..&iv=..`.
///
/// Fails with [`SealdropError::MissingKey`] when the fragment, `key` or `iv`
/// is absent (e.g. a chat client truncated the link at `#`), and with
/// [`SealdropError::MalformedLink`] when a value is not valid hex of the
/// right length or the file id is missing.
pub fn decode_link(current_url: &str) -> SealdropResult<LinkParts> {
    let url = current_url.trim();
    let (path, fragment) = match url.split_once('#') {
        Some((path, fragment)) => (path, fragment),
        None => (url, ""),
    };

    // Hash-router form: the fragment carries its own path and query
    let (fragment_path, params) = match fragment.strip_prefix('/') {
        Some(routed) => match routed.split_once('?') {
            Some((route, query)) => (Some(route), query),
            None => (Some(routed), ""),
        },
        None => (None, fragment),
    };

    let key_hex = fragment_param(params, "key");
    let iv_hex = fragment_param(params, "iv");
    let (Some(key_hex), Some(iv_hex)) = (key_hex, iv_hex) else {
        return Err(SealdropError::MissingKey);
    };

    let file_id = file_id_after_download(path)
        .or_else(|| {
            fragment_path.and_then(|route| file_id_after_download(&format!("/{route}")))
        })
        .ok_or_else(|| SealdropError::MalformedLink("no file id in link path".into()))?;

    let key = SymmetricKey::from_slice(&decode_hex("key", key_hex)?)?;
    let iv = Nonce::from_slice(&decode_hex("iv", iv_hex)?)?;

    Ok(LinkParts { file_id, key, iv })
}

/// Value of `name` in an `a=1&b=2` parameter list. Empty values count as absent.
fn fragment_param<'a>(params: &'a str, name: &str) -> Option<&'a str> {
    params
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
        .filter(|v| !v.is_empty())
}

fn file_id_after_download(path: &str) -> Option<String> {
    path.split_once(DOWNLOAD_SEGMENT)
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn decode_hex(name: &str, value: &str) -> SealdropResult<Vec<u8>> {
    hex::decode(value).map_err(|e| SealdropError::MalformedLink(format!("{name}: {e}")))
}
