pub mod config;
pub mod error;
pub mod types;

pub use error::{ErrorKind, SealdropError, SealdropResult};
pub use types::{DecryptedFile, DownloadedBlob, SourceFile};

/// Largest plaintext accepted for upload (2 GiB)
pub const MAX_FILE_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Size of the GCM authentication tag appended to every ciphertext
pub const TAG_SIZE: usize = 16;
