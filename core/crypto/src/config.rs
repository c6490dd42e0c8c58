//! Cipher session configuration.

use serde::{Deserialize, Serialize};

use crate::kdf::HashFunction;
use crate::keys::AesSize;

/// Default PBKDF2 iteration count for session keys.
pub const DEFAULT_KDF_ITERATIONS: u32 = 4096;

/// Parameters used to build a cipher session from a passphrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CipherConfig {
    /// AES variant; also fixes the derived key length.
    pub aes_size: AesSize,
    /// PBKDF2 iteration count.
    pub kdf_iterations: u32,
    /// Hash function PBKDF2 runs over.
    pub kdf_hash: HashFunction,
}

impl CipherConfig {
    /// Create a configuration for the given AES variant.
    pub fn new(aes_size: AesSize) -> Self {
        Self {
            aes_size,
            ..Self::default()
        }
    }

    /// Set the AES variant.
    pub fn with_aes_size(mut self, aes_size: AesSize) -> Self {
        self.aes_size = aes_size;
        self
    }

    /// Set the PBKDF2 iteration count.
    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    /// Set the PBKDF2 hash function.
    pub fn with_kdf_hash(mut self, hash: HashFunction) -> Self {
        self.kdf_hash = hash;
        self
    }
}

impl Default for CipherConfig {
    fn default() -> Self {
        Self {
            aes_size: AesSize::Aes256,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            kdf_hash: HashFunction::Sha256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CipherConfig::default();
        assert_eq!(config.aes_size, AesSize::Aes256);
        assert_eq!(config.kdf_iterations, 4096);
        assert_eq!(config.kdf_hash, HashFunction::Sha256);
    }

    #[test]
    fn test_builder() {
        let config = CipherConfig::new(AesSize::Aes128)
            .with_kdf_iterations(10)
            .with_kdf_hash(HashFunction::Sha512);

        assert_eq!(config.aes_size, AesSize::Aes128);
        assert_eq!(config.kdf_iterations, 10);
        assert_eq!(config.kdf_hash, HashFunction::Sha512);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = CipherConfig::default().with_aes_size(AesSize::Aes192);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"aes192\""));

        let parsed: CipherConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let parsed: CipherConfig = serde_json::from_str(r#"{"kdf_hash": "sha512"}"#).unwrap();
        assert_eq!(parsed.kdf_hash, HashFunction::Sha512);
        assert_eq!(parsed.aes_size, AesSize::Aes256);
        assert_eq!(parsed.kdf_iterations, DEFAULT_KDF_ITERATIONS);
    }
}
