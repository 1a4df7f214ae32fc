use std::fmt;

/// MIME type used when the original type is unknown
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Filename used when the backend does not report one
pub const DEFAULT_FILENAME: &str = "download";

/// A plaintext file queued for upload
#[derive(Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Ciphertext and original-file metadata as returned by the backend
#[derive(Clone, PartialEq, Eq)]
pub struct DownloadedBlob {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl fmt::Debug for DownloadedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadedBlob")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A decrypted file ready to be saved locally under its original name
#[derive(Clone, PartialEq, Eq)]
pub struct DecryptedFile {
    pub data: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl DecryptedFile {
    /// The original filename reduced to a single safe path component.
    ///
    /// The name comes from the backend and is untrusted: directory parts are
    /// dropped, and names that end up empty or are `.`/`..` fall back to
    /// `download`.
    pub fn safe_filename(&self) -> String {
        let base = self
            .filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
        match cleaned.as_str() {
            "" | "." | ".." => DEFAULT_FILENAME.to_string(),
            _ => cleaned,
        }
    }
}

impl fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("filename", &self.filename)
            .field("mime_type", &self.mime_type)
            .field("size", &self.data.len())
            .finish()
    }
}
