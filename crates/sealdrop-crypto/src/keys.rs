//! Per-file key and nonce material, drawn fresh from the OS CSPRNG.

use rand::rngs::OsRng;
use rand::RngCore;
use sealdrop_core::{SealdropError, SealdropResult};
use zeroize::Zeroize;

use crate::{KEY_SIZE, NONCE_SIZE};

/// A per-file 256-bit AES key. Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> SealdropResult<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            SealdropError::MalformedLink(format!(
                "key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// A 96-bit AES-GCM nonce. Must never be reused with the same key.
#[derive(Clone, PartialEq, Eq)]
pub struct Nonce {
    bytes: [u8; NONCE_SIZE],
}

impl Nonce {
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a nonce from a slice, failing unless it is exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> SealdropResult<Self> {
        let bytes: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| {
            SealdropError::MalformedLink(format!(
                "iv must be {NONCE_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.bytes
    }
}

impl Drop for Nonce {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nonce").field("bytes", &"[REDACTED]").finish()
    }
}

/// Generate a random 256-bit file key from the OS CSPRNG.
pub fn generate_key() -> SealdropResult<SymmetricKey> {
    generate_key_from(&mut OsRng)
}

/// Generate a random 96-bit nonce from the OS CSPRNG, independent of the key.
pub fn generate_iv() -> SealdropResult<Nonce> {
    generate_iv_from(&mut OsRng)
}

/// Generate a key from an explicit random source.
pub fn generate_key_from(rng: &mut dyn RngCore) -> SealdropResult<SymmetricKey> {
    let mut bytes = [0u8; KEY_SIZE];
    fill_random(rng, &mut bytes)?;
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Generate a nonce from an explicit random source.
pub fn generate_iv_from(rng: &mut dyn RngCore) -> SealdropResult<Nonce> {
    let mut bytes = [0u8; NONCE_SIZE];
    fill_random(rng, &mut bytes)?;
    Ok(Nonce::from_bytes(bytes))
}

fn fill_random(rng: &mut dyn RngCore, dest: &mut [u8]) -> SealdropResult<()> {
    rng.try_fill_bytes(dest).map_err(|e| {
        dest.zeroize();
        SealdropError::RandomSourceUnavailable(e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    /// A random source that is always unavailable.
    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only try_fill_bytes is used")
        }
        fn next_u64(&mut self) -> u64 {
            unreachable!("only try_fill_bytes is used")
        }
        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only try_fill_bytes is used")
        }
        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy pool offline")))
        }
    }

    #[test]
    fn test_key_and_iv_sizes() {
        assert_eq!(generate_key().unwrap().as_bytes().len(), 32);
        assert_eq!(generate_iv().unwrap().as_bytes().len(), 12);
    }

    #[test]
    fn test_keys_and_ivs_never_repeat() {
        let mut keys = HashSet::new();
        let mut ivs = HashSet::new();
        for _ in 0..10_000 {
            assert!(keys.insert(*generate_key().unwrap().as_bytes()));
            assert!(ivs.insert(*generate_iv().unwrap().as_bytes()));
        }
    }

    #[test]
    fn test_broken_random_source() {
        let err = generate_key_from(&mut BrokenRng).unwrap_err();
        assert!(matches!(err, SealdropError::RandomSourceUnavailable(_)));
        assert!(err.to_string().contains("entropy pool offline"));

        let err = generate_iv_from(&mut BrokenRng).unwrap_err();
        assert!(matches!(err, SealdropError::RandomSourceUnavailable(_)));
    }

    #[test]
    fn test_from_slice_length_checked() {
        assert!(SymmetricKey::from_slice(&[0u8; 32]).is_ok());
        assert!(matches!(
            SymmetricKey::from_slice(&[0u8; 31]),
            Err(SealdropError::MalformedLink(_))
        ));
        assert!(Nonce::from_slice(&[0u8; 12]).is_ok());
        assert!(matches!(
            Nonce::from_slice(&[0u8; 16]),
            Err(SealdropError::MalformedLink(_))
        ));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = SymmetricKey::from_bytes([0xAB; KEY_SIZE]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.to_lowercase().contains("ab, ab"));
    }
}
