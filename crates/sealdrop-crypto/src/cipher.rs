//! Whole-file AES-256-GCM encryption/decryption
//!
//! Encrypted payload format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The nonce is not stored in the payload; it travels in the share link
//! next to the key. The whole file is sealed as one message, so any chunking
//! happens strictly below this layer and must be reassembled first.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use sealdrop_core::{SealdropError, SealdropResult};

use crate::keys::{Nonce, SymmetricKey};
use crate::TAG_SIZE;

/// Largest message AES-GCM can seal under one nonce (2^36 - 32 bytes)
const GCM_MAX_PLAINTEXT: u64 = (1 << 36) - 32;

/// An authenticated cipher over whole byte buffers.
///
/// Implementations must reject any ciphertext whose tag does not verify
/// with [`SealdropError::Authentication`] and never return partial plaintext.
pub trait AeadEngine: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], key: &SymmetricKey, iv: &Nonce)
        -> SealdropResult<Vec<u8>>;

    fn decrypt(&self, ciphertext: &[u8], key: &SymmetricKey, iv: &Nonce)
        -> SealdropResult<Vec<u8>>;
}

/// The default engine: AES-256-GCM, no associated data.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aes256GcmEngine;

impl AeadEngine for Aes256GcmEngine {
    fn encrypt(
        &self,
        plaintext: &[u8],
        key: &SymmetricKey,
        iv: &Nonce,
    ) -> SealdropResult<Vec<u8>> {
        let cipher = Aes256Gcm::new(key.as_bytes().into());
        cipher
            .encrypt(iv.as_bytes().into(), plaintext)
            .map_err(|_| SealdropError::TooLarge {
                size: plaintext.len() as u64,
                max: GCM_MAX_PLAINTEXT,
            })
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        key: &SymmetricKey,
        iv: &Nonce,
    ) -> SealdropResult<Vec<u8>> {
        if ciphertext.len() < TAG_SIZE {
            tracing::debug!(len = ciphertext.len(), "ciphertext shorter than GCM tag");
            return Err(SealdropError::Authentication);
        }

        let cipher = Aes256Gcm::new(key.as_bytes().into());
        cipher
            .decrypt(iv.as_bytes().into(), ciphertext)
            .map_err(|_| SealdropError::Authentication)
    }
}

/// Encrypt a whole file with AES-256-GCM.
///
/// Returns `[ciphertext][16-byte tag]`.
pub fn encrypt(plaintext: &[u8], key: &SymmetricKey, iv: &Nonce) -> SealdropResult<Vec<u8>> {
    Aes256GcmEngine.encrypt(plaintext, key, iv)
}

/// Decrypt a whole file sealed by [`encrypt`].
///
/// Fails with [`SealdropError::Authentication`] on a wrong key, wrong IV,
/// or any modification of the payload.
pub fn decrypt(ciphertext: &[u8], key: &SymmetricKey, iv: &Nonce) -> SealdropResult<Vec<u8>> {
    Aes256GcmEngine.decrypt(ciphertext, key, iv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_iv, generate_key};

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key().unwrap();
        let iv = generate_iv().unwrap();
        let plaintext = b"hello, encrypted world!";

        let encrypted = encrypt(plaintext, &key, &iv).unwrap();
        let decrypted = decrypt(&encrypted, &key, &iv).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = generate_key().unwrap();
        let iv = generate_iv().unwrap();

        let encrypted = encrypt(b"", &key, &iv).unwrap();
        assert_eq!(encrypted.len(), TAG_SIZE);
        let decrypted = decrypt(&encrypted, &key, &iv).unwrap();

        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = generate_key().unwrap();
        let key2 = generate_key().unwrap();
        let iv = generate_iv().unwrap();

        let encrypted = encrypt(b"secret data", &key1, &iv).unwrap();
        let result = decrypt(&encrypted, &key2, &iv);

        assert_eq!(result, Err(SealdropError::Authentication));
    }

    #[test]
    fn test_decrypt_wrong_iv() {
        let key = generate_key().unwrap();
        let iv1 = generate_iv().unwrap();
        let iv2 = generate_iv().unwrap();

        let encrypted = encrypt(b"secret data", &key, &iv1).unwrap();
        let result = decrypt(&encrypted, &key, &iv2);

        assert_eq!(result, Err(SealdropError::Authentication));
    }

    #[test]
    fn test_encrypted_size() {
        let key = generate_key().unwrap();
        let iv = generate_iv().unwrap();
        let plaintext = vec![0u8; 1000];

        let encrypted = encrypt(&plaintext, &key, &iv).unwrap();

        // plaintext (1000) + tag (16) = 1016
        assert_eq!(encrypted.len(), 1000 + TAG_SIZE);
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = generate_key().unwrap();
        let iv = generate_iv().unwrap();

        let encrypted = encrypt(b"secret data", &key, &iv).unwrap();

        assert_eq!(
            decrypt(&encrypted[..encrypted.len() - 1], &key, &iv),
            Err(SealdropError::Authentication)
        );
        assert_eq!(
            decrypt(&encrypted[..4], &key, &iv),
            Err(SealdropError::Authentication)
        );
    }

    #[test]
    fn test_known_vector() {
        // NIST GCM test case 13: 256-bit zero key, zero IV, empty plaintext
        let key = SymmetricKey::from_bytes([0u8; 32]);
        let iv = Nonce::from_bytes([0u8; 12]);

        let encrypted = encrypt(b"", &key, &iv).unwrap();

        assert_eq!(hex::encode(encrypted), "530f8afbc74536b9a963b4f1c4cb738b");
    }
}
