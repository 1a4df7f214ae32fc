//! sealdrop-crypto: client-side E2E encryption for shared files
//!
//! Pipeline: plaintext → AES-256-GCM (fresh key + nonce) → upload ciphertext
//!
//! Key transport:
//! ```text
//! Per-file key (256-bit random) ──┐
//! Per-file nonce (96-bit random) ─┴─> share link fragment (#key=..&iv=..)
//! ```
//!
//! Neither value is ever sent to the backend. The fragment of a URL is not
//! part of any HTTP request, so whoever holds the link holds the key.

pub mod cipher;
pub mod keys;
pub mod link;

pub use cipher::{decrypt, encrypt, AeadEngine, Aes256GcmEngine};
pub use keys::{generate_iv, generate_key, Nonce, SymmetricKey};
pub use link::{decode_link, encode_link, LinkParts, ShareLink};

/// Size of an AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

pub use sealdrop_core::TAG_SIZE;
