//! Constant-time byte comparison.

use subtle::ConstantTimeEq;

/// Compare two byte strings without an early exit on the first mismatch.
///
/// Slices of different length compare unequal immediately; only the
/// content comparison runs in constant time. Lengths of tags and keys are
/// public, so this leaks nothing the caller did not already know.
pub fn secure_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_compare_equal() {
        assert!(secure_compare(b"same tag", b"same tag"));
        assert!(secure_compare(b"", b""));
    }

    #[test]
    fn test_secure_compare_mismatch_anywhere() {
        let reference = [0x5Au8; 32];
        for i in 0..reference.len() {
            let mut other = reference;
            other[i] ^= 0x01;
            assert!(!secure_compare(&reference, &other), "mismatch at {}", i);
        }
    }

    #[test]
    fn test_secure_compare_length_mismatch() {
        assert!(!secure_compare(b"short", b"shorter"));
        assert!(!secure_compare(b"", b"x"));
    }
}
