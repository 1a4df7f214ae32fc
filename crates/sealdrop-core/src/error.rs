use thiserror::Error;

pub type SealdropResult<T> = Result<T, SealdropError>;

/// Every failure a transfer can end in.
///
/// Errors are `Clone` so a failed state machine can keep the error it ended
/// with while also handing it back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealdropError {
    #[error("file too large: {size} bytes (maximum {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("file not found or has expired: {0}")]
    NotFound(String),

    #[error("encryption key not found in link")]
    MissingKey,

    #[error("malformed link: {0}")]
    MalformedLink(String),

    #[error("decryption failed: wrong key or corrupted data")]
    Authentication,

    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),

    #[error("transfer cancelled")]
    Cancelled,

    #[error("a transfer is already in progress")]
    Busy,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for SealdropError {
    fn from(e: std::io::Error) -> Self {
        SealdropError::Io(e.to_string())
    }
}

/// Payload-free classification of [`SealdropError`], for callers that render
/// kind-specific guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TooLarge,
    Upload,
    Download,
    NotFound,
    MissingKey,
    MalformedLink,
    Authentication,
    RandomSourceUnavailable,
    Cancelled,
    State,
    Config,
    Io,
}

impl SealdropError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SealdropError::TooLarge { .. } => ErrorKind::TooLarge,
            SealdropError::Upload(_) => ErrorKind::Upload,
            SealdropError::Download(_) => ErrorKind::Download,
            SealdropError::NotFound(_) => ErrorKind::NotFound,
            SealdropError::MissingKey => ErrorKind::MissingKey,
            SealdropError::MalformedLink(_) => ErrorKind::MalformedLink,
            SealdropError::Authentication => ErrorKind::Authentication,
            SealdropError::RandomSourceUnavailable(_) => ErrorKind::RandomSourceUnavailable,
            SealdropError::Cancelled => ErrorKind::Cancelled,
            SealdropError::Busy | SealdropError::InvalidState(_) => ErrorKind::State,
            SealdropError::Config(_) => ErrorKind::Config,
            SealdropError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether re-running the same flow with the same input can succeed.
    ///
    /// Only transport failures and user cancellation qualify; a dead link,
    /// a bad key, or an oversized file fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Upload | ErrorKind::Download | ErrorKind::Cancelled
        )
    }

    /// One-line advice for the person looking at the failure.
    pub fn guidance(&self) -> &'static str {
        match self.kind() {
            ErrorKind::TooLarge => "Please select a file smaller than 2GB.",
            ErrorKind::Upload => "Network issue while uploading. Please try again.",
            ErrorKind::Download => "Network issue while downloading. Please try again.",
            ErrorKind::NotFound => {
                "The file has expired or was removed. Ask the sender to upload it again."
            }
            ErrorKind::MissingKey => {
                "Invalid download link: the encryption key is missing. \
                 Make sure you copied the whole link, including everything after '#'."
            }
            ErrorKind::MalformedLink => {
                "Invalid download link: the encryption key is garbled. \
                 Ask the sender for the link again."
            }
            ErrorKind::Authentication => {
                "The link may be corrupted: the file could not be decrypted with its key."
            }
            ErrorKind::RandomSourceUnavailable => {
                "No secure random source is available on this system; nothing was uploaded."
            }
            ErrorKind::Cancelled => "Transfer cancelled.",
            ErrorKind::State => "Another transfer is in progress or the flow must be reset.",
            ErrorKind::Config => "Check the sealdrop configuration file.",
            ErrorKind::Io => "Could not read or write the local file.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(SealdropError::Upload("timeout".into()).is_retryable());
        assert!(SealdropError::Download("reset".into()).is_retryable());
        assert!(SealdropError::Cancelled.is_retryable());

        assert!(!SealdropError::NotFound("abc".into()).is_retryable());
        assert!(!SealdropError::MissingKey.is_retryable());
        assert!(!SealdropError::MalformedLink("odd length".into()).is_retryable());
        assert!(!SealdropError::Authentication.is_retryable());
        assert!(!SealdropError::TooLarge { size: 3, max: 2 }.is_retryable());
    }

    #[test]
    fn test_link_failures_have_distinct_guidance() {
        let missing = SealdropError::MissingKey.guidance();
        let garbled = SealdropError::Authentication.guidance();
        let expired = SealdropError::NotFound("x".into()).guidance();
        let network = SealdropError::Download("x".into()).guidance();

        assert_ne!(missing, garbled);
        assert_ne!(garbled, expired);
        assert_ne!(expired, network);
        assert!(garbled.contains("corrupted"));
        assert!(expired.contains("expired"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SealdropError = io.into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("denied"));
    }
}
