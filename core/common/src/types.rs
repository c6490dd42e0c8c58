//! Common types used throughout prisma.

use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Sensitive data wrapper that zeroizes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SensitiveBytes(Vec<u8>);

impl SensitiveBytes {
    /// Create new sensitive bytes.
    pub fn new(data: Vec<u8>) -> Self {
        Self(data)
    }

    /// Get a reference to the inner bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get a mutable reference to the inner bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    /// Get the length.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for SensitiveBytes {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl fmt::Debug for SensitiveBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveBytes([REDACTED; {} bytes])", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_bytes_debug_is_redacted() {
        let secret = SensitiveBytes::new(b"hunter2".to_vec());
        let rendered = format!("{:?}", secret);
        assert_eq!(rendered, "SensitiveBytes([REDACTED; 7 bytes])");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_sensitive_bytes_zeroize() {
        let mut secret = SensitiveBytes::from(vec![0xAA; 4]);
        secret.zeroize();
        assert!(secret.is_empty());
    }

    #[test]
    fn test_sensitive_bytes_mutation() {
        let mut secret = SensitiveBytes::new(vec![0u8; 3]);
        secret.as_mut_bytes()[1] = 7;
        assert_eq!(secret.as_bytes(), &[0, 7, 0]);
        assert_eq!(secret.len(), 3);
    }
}
