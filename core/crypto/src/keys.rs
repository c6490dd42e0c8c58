//! Key types with secure memory handling.
//!
//! Session keys zeroize their memory on drop so key material does not
//! outlive the cipher session that used it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::random::fill_random;
use prisma_common::{Error, Result};

/// Length of a key thumbprint in bytes (SHA-512).
pub const THUMBPRINT_LENGTH: usize = 64;

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AesSize {
    #[serde(rename = "aes128")]
    Aes128,
    #[serde(rename = "aes192")]
    Aes192,
    #[default]
    #[serde(rename = "aes256")]
    Aes256,
}

impl AesSize {
    /// Key length in bytes.
    pub fn key_length(&self) -> usize {
        match self {
            AesSize::Aes128 => 16,
            AesSize::Aes192 => 24,
            AesSize::Aes256 => 32,
        }
    }

    /// Key length in bits.
    pub fn bits(&self) -> usize {
        self.key_length() * 8
    }

    /// Look up the size for a key length in bytes.
    ///
    /// # Errors
    /// - `KeyLength` if no AES variant uses `len`-byte keys
    pub fn from_key_length(len: usize) -> Result<Self> {
        match len {
            16 => Ok(AesSize::Aes128),
            24 => Ok(AesSize::Aes192),
            32 => Ok(AesSize::Aes256),
            other => Err(Error::KeyLength {
                expected: 32,
                actual: other,
            }),
        }
    }

    /// Look up the size for a key length in bits (128, 192 or 256).
    pub fn from_bits(bits: usize) -> Result<Self> {
        if bits % 8 != 0 {
            return Err(Error::InvalidInput(format!("{} is not a whole number of bytes", bits)));
        }
        Self::from_key_length(bits / 8)
    }
}

impl fmt::Display for AesSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AES-{}", self.bits())
    }
}

/// Symmetric key held by a cipher session.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    key: Vec<u8>,
}

impl SessionKey {
    /// Create a session key from raw bytes.
    ///
    /// # Errors
    /// - `KeyLength` if `key` is not 16, 24 or 32 bytes
    pub fn from_bytes(key: &[u8]) -> Result<Self> {
        AesSize::from_key_length(key.len())?;
        Ok(Self { key: key.to_vec() })
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }

    /// Overwrite the key in place with random bytes.
    ///
    /// The key is zeroized first, so it is gone even if the random source
    /// fails.
    pub fn scramble(&mut self) -> Result<()> {
        self.key.as_mut_slice().zeroize();
        fill_random(&mut self.key)
    }

    /// SHA-512 digest of the key bytes.
    pub fn thumbprint(&self) -> [u8; THUMBPRINT_LENGTH] {
        let mut out = [0u8; THUMBPRINT_LENGTH];
        out.copy_from_slice(&Sha512::digest(&self.key));
        out
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionKey([REDACTED; {} bytes])", self.key.len())
    }
}
