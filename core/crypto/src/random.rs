//! Random byte sources.
//!
//! Fresh secrets come from the operating system. A failure to read OS
//! randomness is reported as [`Error::RandomnessUnavailable`] and left for
//! the caller to handle.

use rand::rngs::OsRng;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};

use prisma_common::{Error, Result};

/// Fill `buf` with bytes from the operating system's CSPRNG.
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| Error::RandomnessUnavailable(e.to_string()))
}

/// Generate `len` bytes from the operating system's CSPRNG.
///
/// # Errors
/// - `RandomnessUnavailable` if the OS source cannot be read
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; len];
    fill_random(&mut out)?;
    Ok(out)
}

/// Generate `len` pseudo-random bytes determined entirely by `seed`.
///
/// The seed is hashed with SHA-256 and the digest keys a ChaCha8 stream.
/// The output is fixed across builds and crate upgrades, which is what
/// lets two cipher sessions opened with the same passphrase arrive at the
/// same KDF salt.
///
/// # Security
/// The output is only as unpredictable as the seed. Never use it where
/// fresh randomness is required.
pub fn seeded_random_data(seed: &[u8], len: usize) -> Vec<u8> {
    let mut rng_seed = [0u8; 32];
    rng_seed.copy_from_slice(&Sha256::digest(seed));
    let mut rng = ChaCha8Rng::from_seed(rng_seed);
    let mut out = vec![0u8; len];
    rng.fill_bytes(&mut out);
    out
}
