//! sealdrop-transfer: moves opaque ciphertext to and from the storage backend
//!
//! The backend only ever sees ciphertext, an opaque file id, and the original
//! filename/MIME type. Key material never reaches this crate.

pub mod http;
pub mod transport;

pub use http::{build_from_core_config, HttpTransport};
pub use transport::{ProgressFn, Transport};
