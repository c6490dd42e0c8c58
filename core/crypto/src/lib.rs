//! Cryptographic primitives for Prisma.
//!
//! This module provides:
//! - Key derivation using PBKDF2 with a self-describing encoded form
//! - AES-CBC sessions with a SHA-256 integrity tag
//! - Streaming encryption into any `std::io::Write` sink
//! - The padding codec, blocker and constant-time comparison they build on
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Constant-time operations for tag, key and thumbprint comparisons

pub mod blocker;
pub mod cipher;
pub mod compare;
pub mod config;
pub mod kdf;
pub mod keys;
pub mod padding;
pub mod random;
pub mod stream;

pub use blocker::Blocker;
pub use cipher::{SecureAes, SecureCipher, BLOCK_SIZE, IV_SIZE, TAG_SIZE};
pub use compare::secure_compare;
pub use config::{CipherConfig, DEFAULT_KDF_ITERATIONS};
pub use kdf::{DerivedKey, HashFunction};
pub use keys::{AesSize, SessionKey};
pub use padding::{pad, unpad};
pub use random::{fill_random, random_bytes, seeded_random_data};
pub use stream::{EncryptingWriter, StreamState};
