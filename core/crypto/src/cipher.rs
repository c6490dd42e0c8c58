//! AES-CBC encryption with an integrity tag.
//!
//! A [`SecureAes`] session derives its AES key from a passphrase with
//! PBKDF2, chains blocks in CBC mode and feeds every plaintext block into a
//! SHA-256 digest seeded with `key || IV`. The digest value is the
//! message's tag.
//!
//! Packed messages produced by [`SecureCipher::encrypt_to_bytes`] have the
//! layout:
//!
//! ```text
//! [ciphertext][16 bytes: IV][32 bytes: tag]
//! ```
//!
//! # Security
//! The tag is a plain hash over plaintext, not a keyed MAC over
//! ciphertext. It detects corruption and tampering by parties who do not
//! hold the key, but it is not a substitute for an AEAD construction.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::blocker::Blocker;
use crate::compare::secure_compare;
use crate::config::CipherConfig;
use crate::kdf::DerivedKey;
use crate::keys::{AesSize, SessionKey};
use crate::padding::{pad, unpad};
use crate::random::{fill_random, seeded_random_data};
use prisma_common::{Error, PaddingError, Result};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// IV size in bytes (one block).
pub const IV_SIZE: usize = BLOCK_SIZE;

/// Tag size in bytes (SHA-256 output).
pub const TAG_SIZE: usize = 32;

/// Length of the passphrase-seeded salt used for session key derivation.
const SESSION_SALT_LENGTH: usize = 32;

/// A symmetric cipher that chunks, pads and tags messages.
///
/// Implementations are stateful: [`SecureCipher::encrypt`] and
/// [`SecureCipher::decrypt`] advance the chaining state and the running tag,
/// and [`SecureCipher::finish`] closes the current message.
pub trait SecureCipher {
    /// Cipher block size in bytes.
    fn block_size(&self) -> usize;

    /// Encrypt `plaintext`, padding the final partial block.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` and strip padding from the result.
    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Extract the tag of the current message and start a new one.
    fn finish(&mut self) -> Result<Vec<u8>>;

    fn tag_size(&self) -> usize;

    fn iv(&self) -> &[u8];

    /// Replace the IV and rebind both chaining directions to it.
    fn set_iv(&mut self, iv: &[u8]) -> Result<()>;

    fn iv_size(&self) -> usize;

    fn tag_plus_iv_size(&self) -> usize {
        self.iv_size() + self.tag_size()
    }

    /// SHA-512 thumbprint of the loaded key.
    fn key_thumbprint(&self) -> Vec<u8>;

    /// Compare `thumbprint` with the loaded key's thumbprint in constant time.
    fn check_key_thumbprint(&self, thumbprint: &[u8]) -> bool {
        secure_compare(thumbprint, &self.key_thumbprint())
    }

    /// Restart the running tag and chaining state at the current IV.
    fn reset(&mut self);

    /// Pick a fresh random IV, then [`SecureCipher::reset`].
    fn full_reset(&mut self) -> Result<()>;

    /// Destroy the key material. Every later operation fails.
    fn dispose(&mut self) -> Result<()>;

    /// Encrypt a whole message and append its IV and tag.
    ///
    /// # Postconditions
    /// - Returns `ciphertext || IV || tag`
    /// - The session is ready for the next message
    fn encrypt_to_bytes(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut packed = self.encrypt(plaintext)?;
        packed.extend_from_slice(self.iv());
        let tag = self.finish()?;
        packed.extend_from_slice(&tag);
        Ok(packed)
    }

    /// Decrypt a message produced by [`SecureCipher::encrypt_to_bytes`].
    ///
    /// Adopts the IV embedded in the message. Plaintext is only returned if
    /// the recomputed tag matches the embedded one.
    ///
    /// # Errors
    /// - `InvalidInput` if `packed` is shorter than IV plus tag
    /// - `TagMismatch` if the message was altered or the key is wrong
    /// - Padding errors if the tag matches but the padding is invalid
    fn decrypt_from_bytes(&mut self, packed: &[u8]) -> Result<Vec<u8>> {
        let trailer_len = self.tag_plus_iv_size();
        if packed.len() < trailer_len {
            return Err(Error::InvalidInput(format!(
                "packed message of {} bytes is shorter than IV and tag ({} bytes)",
                packed.len(),
                trailer_len
            )));
        }

        let (body, trailer) = packed.split_at(packed.len() - trailer_len);
        let (iv, tag) = trailer.split_at(self.iv_size());
        self.set_iv(iv)?;
        self.reset();

        let decrypted = self.decrypt(body);
        let computed = self.finish()?;
        if !secure_compare(tag, &computed) {
            warn!("Integrity tag mismatch, discarding plaintext");
            return Err(Error::TagMismatch);
        }

        decrypted
    }
}

/// AES keyed with one of the supported key sizes.
enum BlockCipher {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl BlockCipher {
    fn new(size: AesSize, key: &[u8]) -> Result<Self> {
        let invalid = |_| Error::KeyLength {
            expected: size.key_length(),
            actual: key.len(),
        };
        Ok(match size {
            AesSize::Aes128 => BlockCipher::Aes128(Aes128::new_from_slice(key).map_err(invalid)?),
            AesSize::Aes192 => BlockCipher::Aes192(Aes192::new_from_slice(key).map_err(invalid)?),
            AesSize::Aes256 => BlockCipher::Aes256(Aes256::new_from_slice(key).map_err(invalid)?),
        })
    }

    fn encrypt_block(&self, block: &mut Block) {
        match self {
            BlockCipher::Aes128(c) => c.encrypt_block(block),
            BlockCipher::Aes192(c) => c.encrypt_block(block),
            BlockCipher::Aes256(c) => c.encrypt_block(block),
        }
    }

    fn decrypt_block(&self, block: &mut Block) {
        match self {
            BlockCipher::Aes128(c) => c.decrypt_block(block),
            BlockCipher::Aes192(c) => c.decrypt_block(block),
            BlockCipher::Aes256(c) => c.decrypt_block(block),
        }
    }
}

/// CBC state for one direction: the previous ciphertext block.
struct ChainingContext {
    previous: [u8; BLOCK_SIZE],
}

impl ChainingContext {
    fn new(iv: &[u8; IV_SIZE]) -> Self {
        Self { previous: *iv }
    }

    fn encrypt(&mut self, cipher: &BlockCipher, plaintext: &[u8], out: &mut Vec<u8>) {
        let mut block = Block::default();
        for ((b, p), prev) in block.iter_mut().zip(plaintext).zip(&self.previous) {
            *b = p ^ prev;
        }
        cipher.encrypt_block(&mut block);
        self.previous.copy_from_slice(&block);
        out.extend_from_slice(&block);
    }

    fn decrypt(&mut self, cipher: &BlockCipher, ciphertext: &[u8], out: &mut Vec<u8>) {
        let mut block = Block::clone_from_slice(ciphertext);
        cipher.decrypt_block(&mut block);
        for (b, prev) in block.iter_mut().zip(&self.previous) {
            *b ^= prev;
        }
        self.previous.copy_from_slice(ciphertext);
        out.extend_from_slice(&block);
    }
}

impl Drop for ChainingContext {
    fn drop(&mut self) {
        self.previous.zeroize();
    }
}

/// Keyed cipher plus both chaining directions. Absent once disposed.
struct Engine {
    cipher: BlockCipher,
    encryptor: ChainingContext,
    decryptor: ChainingContext,
}

impl Engine {
    fn rebind(&mut self, iv: &[u8; IV_SIZE]) {
        self.encryptor = ChainingContext::new(iv);
        self.decryptor = ChainingContext::new(iv);
    }
}

/// AES-CBC cipher session with a running SHA-256 integrity tag.
///
/// Sessions are not thread-safe; use one per concurrent stream.
pub struct SecureAes {
    aes_size: AesSize,
    key: SessionKey,
    iv: [u8; IV_SIZE],
    engine: Option<Engine>,
    digest: Sha256,
}

impl SecureAes {
    /// Create a session for `passphrase` with default KDF settings.
    ///
    /// The PBKDF2 salt is derived from the passphrase itself, so sessions
    /// opened with the same passphrase share a key and can decrypt each
    /// other's messages. The IV is fresh for every session.
    ///
    /// # Errors
    /// - `RandomnessUnavailable` if no IV can be generated
    pub fn new(passphrase: &[u8], aes_size: AesSize) -> Result<Self> {
        Self::with_config(passphrase, &CipherConfig::new(aes_size))
    }

    /// Create a session for `passphrase` using `config`.
    ///
    /// # Errors
    /// - `InvalidInput` if the KDF parameters are unusable
    /// - `RandomnessUnavailable` if no IV can be generated
    pub fn with_config(passphrase: &[u8], config: &CipherConfig) -> Result<Self> {
        let salt = seeded_random_data(passphrase, SESSION_SALT_LENGTH);
        let derived = DerivedKey::derive_with_salt(
            passphrase,
            salt,
            config.kdf_iterations,
            config.aes_size.key_length(),
            config.kdf_hash,
        )?;
        let key = SessionKey::from_bytes(derived.key())?;

        let mut iv = [0u8; IV_SIZE];
        fill_random(&mut iv)?;

        debug!(
            aes = %config.aes_size,
            kdf_iterations = config.kdf_iterations,
            kdf_hash = %config.kdf_hash,
            "Cipher session initialized"
        );
        Self::from_parts(config.aes_size, key, iv)
    }

    /// Create a session from a raw AES key and IV, skipping key derivation.
    ///
    /// # Errors
    /// - `KeyLength` if `key` is not 16, 24 or 32 bytes
    pub fn from_raw_key(key: &[u8], iv: [u8; IV_SIZE]) -> Result<Self> {
        let key = SessionKey::from_bytes(key)?;
        let aes_size = AesSize::from_key_length(key.len())?;
        Self::from_parts(aes_size, key, iv)
    }

    fn from_parts(aes_size: AesSize, key: SessionKey, iv: [u8; IV_SIZE]) -> Result<Self> {
        let cipher = BlockCipher::new(aes_size, key.as_bytes())?;
        let mut session = Self {
            aes_size,
            key,
            iv,
            engine: Some(Engine {
                cipher,
                encryptor: ChainingContext::new(&iv),
                decryptor: ChainingContext::new(&iv),
            }),
            digest: Sha256::new(),
        };
        session.reseed();
        Ok(session)
    }

    pub fn aes_size(&self) -> AesSize {
        self.aes_size
    }

    /// Whether [`SecureCipher::dispose`] has been called.
    pub fn is_disposed(&self) -> bool {
        self.engine.is_none()
    }

    /// Restart the running tag from `key || IV`.
    fn reseed(&mut self) {
        self.digest = Sha256::new();
        self.digest.update(self.key.as_bytes());
        self.digest.update(self.iv);
    }

    fn engine(&mut self) -> Result<&mut Engine> {
        self.engine.as_mut().ok_or(Error::Disposed)
    }
}

impl SecureCipher for SecureAes {
    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// The output is the plaintext length rounded up to the next multiple
    /// of the block size. Block-aligned plaintext is not padded.
    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let engine = self.engine.as_mut().ok_or(Error::Disposed)?;
        let mut out = Vec::with_capacity(plaintext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE);
        let mut blocker = Blocker::new(BLOCK_SIZE, plaintext);

        loop {
            let (n, block) = blocker.next_block();
            if n == 0 {
                break;
            }
            let padded;
            let block = if n < BLOCK_SIZE {
                padded = pad(block, BLOCK_SIZE)?;
                &padded[..]
            } else {
                block
            };
            engine.encryptor.encrypt(&engine.cipher, block, &mut out);
            self.digest.update(block);
        }

        Ok(out)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let engine = self.engine.as_mut().ok_or(Error::Disposed)?;
        if ciphertext.is_empty() {
            return Ok(Vec::new());
        }
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(PaddingError::Misaligned {
                len: ciphertext.len(),
                block_size: BLOCK_SIZE,
            }
            .into());
        }

        let mut out = Vec::with_capacity(ciphertext.len());
        for block in Blocker::new(BLOCK_SIZE, ciphertext) {
            let start = out.len();
            engine.decryptor.decrypt(&engine.cipher, block, &mut out);
            self.digest.update(&out[start..]);
        }

        let plaintext_len = unpad(&out, BLOCK_SIZE)?.len();
        out.truncate(plaintext_len);
        Ok(out)
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        if self.is_disposed() {
            return Err(Error::Disposed);
        }
        let tag = std::mem::replace(&mut self.digest, Sha256::new()).finalize();
        self.reset();
        Ok(tag.to_vec())
    }

    fn tag_size(&self) -> usize {
        TAG_SIZE
    }

    fn iv(&self) -> &[u8] {
        &self.iv
    }

    fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        let iv: [u8; IV_SIZE] = iv.try_into().map_err(|_| Error::KeyLength {
            expected: IV_SIZE,
            actual: iv.len(),
        })?;
        self.engine()?.rebind(&iv);
        self.iv = iv;
        debug!("Cipher session IV replaced");
        Ok(())
    }

    fn iv_size(&self) -> usize {
        IV_SIZE
    }

    fn key_thumbprint(&self) -> Vec<u8> {
        self.key.thumbprint().to_vec()
    }

    fn reset(&mut self) {
        let iv = self.iv;
        if let Some(engine) = self.engine.as_mut() {
            engine.rebind(&iv);
        }
        self.reseed();
    }

    fn full_reset(&mut self) -> Result<()> {
        let mut iv = [0u8; IV_SIZE];
        fill_random(&mut iv)?;
        self.engine()?.rebind(&iv);
        self.iv = iv;
        self.reseed();
        debug!("Cipher session reset with a fresh IV");
        Ok(())
    }

    fn dispose(&mut self) -> Result<()> {
        self.engine = None;
        let scrambled = self.key.scramble();
        self.iv.zeroize();
        let refilled = fill_random(&mut self.iv);
        self.reseed();
        debug!("Cipher session disposed");
        scrambled.and(refilled)
    }
}

impl fmt::Debug for SecureAes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureAes")
            .field("aes_size", &self.aes_size)
            .field("key", &self.key)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kdf::HashFunction;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    const TEST_STRING: &[u8] = b"This is a test string, it is not very long but it is long enough to test the encryption and decryption functions";

    fn fast_config(aes_size: AesSize) -> CipherConfig {
        CipherConfig::new(aes_size).with_kdf_iterations(16)
    }

    #[test]
    fn test_packed_roundtrip_fresh_session() {
        let mut session = SecureAes::new(b"superSecretKey", AesSize::Aes256).unwrap();
        let encrypted = session.encrypt_to_bytes(TEST_STRING).unwrap();

        let mut session = SecureAes::new(b"superSecretKey", AesSize::Aes256).unwrap();
        let decrypted = session.decrypt_from_bytes(&encrypted).unwrap();
        assert_eq!(decrypted, TEST_STRING);

        // The packed form survives a base64 trip.
        let encoded = STANDARD.encode(&encrypted);
        let mut session = SecureAes::new(b"superSecretKey", AesSize::Aes256).unwrap();
        let decrypted = session
            .decrypt_from_bytes(&STANDARD.decode(encoded).unwrap())
            .unwrap();
        assert_eq!(decrypted, TEST_STRING);
    }

    #[test]
    fn test_tampered_message_detected() {
        let mut session = SecureAes::new(b"superSecretKey", AesSize::Aes256).unwrap();
        let mut encrypted = session.encrypt_to_bytes(TEST_STRING).unwrap();
        encrypted[0] ^= 0x01;

        let mut session = SecureAes::new(b"superSecretKey", AesSize::Aes256).unwrap();
        assert!(matches!(
            session.decrypt_from_bytes(&encrypted),
            Err(Error::TagMismatch)
        ));
    }

    #[test]
    fn test_tampered_tag_detected() {
        let mut session = SecureAes::with_config(b"key", &fast_config(AesSize::Aes128)).unwrap();
        let mut encrypted = session.encrypt_to_bytes(b"short message").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x80;

        assert!(matches!(
            session.decrypt_from_bytes(&encrypted),
            Err(Error::TagMismatch)
        ));
    }

    #[test]
    fn test_wrong_passphrase_detected() {
        let mut sender = SecureAes::with_config(b"right", &fast_config(AesSize::Aes256)).unwrap();
        let encrypted = sender.encrypt_to_bytes(b"for the right eyes only").unwrap();

        let mut receiver = SecureAes::with_config(b"wrong", &fast_config(AesSize::Aes256)).unwrap();
        assert!(matches!(
            receiver.decrypt_from_bytes(&encrypted),
            Err(Error::TagMismatch)
        ));
    }

    #[test]
    fn test_all_key_sizes_roundtrip() {
        for size in [AesSize::Aes128, AesSize::Aes192, AesSize::Aes256] {
            let config = fast_config(size).with_kdf_hash(HashFunction::Sha512);
            let mut sender = SecureAes::with_config(b"pw", &config).unwrap();
            let packed = sender.encrypt_to_bytes(b"seventeen bytes!!").unwrap();
            // 17 bytes of plaintext pad out to two blocks.
            assert_eq!(packed.len(), 2 * BLOCK_SIZE + IV_SIZE + TAG_SIZE);

            let mut receiver = SecureAes::with_config(b"pw", &config).unwrap();
            assert_eq!(receiver.decrypt_from_bytes(&packed).unwrap(), b"seventeen bytes!!");
        }
    }

    #[test]
    fn test_session_reuse_for_several_messages() {
        let config = fast_config(AesSize::Aes256);
        let mut sender = SecureAes::with_config(b"pw", &config).unwrap();
        let first = sender.encrypt_to_bytes(b"first message").unwrap();
        let second = sender.encrypt_to_bytes(b"second, somewhat longer message").unwrap();

        let mut receiver = SecureAes::with_config(b"pw", &config).unwrap();
        assert_eq!(receiver.decrypt_from_bytes(&second).unwrap(), b"second, somewhat longer message");
        assert_eq!(receiver.decrypt_from_bytes(&first).unwrap(), b"first message");
    }

    #[test]
    fn test_aes128_cbc_known_answer() {
        // NIST SP 800-38A, F.2.1 CBC-AES128.Encrypt, first block.
        let key = hex::decode("2b7e151628aed2a6abf7158809cf4f3c").unwrap();
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&hex::decode("000102030405060708090a0b0c0d0e0f").unwrap());
        let plaintext =
            hex::decode("6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51").unwrap();

        let mut session = SecureAes::from_raw_key(&key, iv).unwrap();
        let ciphertext = session.encrypt(&plaintext).unwrap();
        assert_eq!(
            ciphertext,
            hex::decode("7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2").unwrap()
        );

        session.reset();
        assert_eq!(session.decrypt(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_tag_is_hash_of_key_iv_and_blocks() {
        let key = [3u8; 16];
        let iv = [9u8; IV_SIZE];
        let mut session = SecureAes::from_raw_key(&key, iv).unwrap();
        session.encrypt(b"abc").unwrap();
        let tag = session.finish().unwrap();

        let mut expected = Sha256::new();
        expected.update(key);
        expected.update(iv);
        expected.update(pad(b"abc", BLOCK_SIZE).unwrap());
        assert_eq!(tag, expected.finalize().to_vec());
        assert_eq!(tag.len(), TAG_SIZE);
    }

    #[test]
    fn test_finish_resets_digest() {
        let mut session = SecureAes::from_raw_key(&[1u8; 32], [2u8; IV_SIZE]).unwrap();
        let empty_tag = session.finish().unwrap();
        session.encrypt(b"payload").unwrap();
        let payload_tag = session.finish().unwrap();
        let again = session.finish().unwrap();

        assert_ne!(empty_tag, payload_tag);
        assert_eq!(empty_tag, again);
    }

    #[test]
    fn test_encrypt_and_decrypt_tags_agree() {
        let mut session = SecureAes::from_raw_key(&[5u8; 24], [6u8; IV_SIZE]).unwrap();
        let ciphertext = session.encrypt(b"tag me twice").unwrap();
        let encrypt_tag = session.finish().unwrap();

        let plaintext = session.decrypt(&ciphertext).unwrap();
        let decrypt_tag = session.finish().unwrap();

        assert_eq!(plaintext, b"tag me twice");
        assert_eq!(encrypt_tag, decrypt_tag);
    }

    #[test]
    fn test_ciphertext_length() {
        let mut session = SecureAes::from_raw_key(&[0u8; 16], [0u8; IV_SIZE]).unwrap();
        assert_eq!(session.encrypt(&[0x41; 1]).unwrap().len(), 16);
        assert_eq!(session.encrypt(&[0x41; 16]).unwrap().len(), 16);
        assert_eq!(session.encrypt(&[0x41; 33]).unwrap().len(), 48);
        assert!(session.encrypt(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_empty_message_roundtrip() {
        let mut session = SecureAes::from_raw_key(&[0u8; 16], [0u8; IV_SIZE]).unwrap();
        let packed = session.encrypt_to_bytes(b"").unwrap();
        assert_eq!(packed.len(), IV_SIZE + TAG_SIZE);
        assert!(session.decrypt_from_bytes(&packed).unwrap().is_empty());
    }

    #[test]
    fn test_decrypt_misaligned_fails() {
        let mut session = SecureAes::from_raw_key(&[0u8; 16], [0u8; IV_SIZE]).unwrap();
        assert!(matches!(
            session.decrypt(&[0u8; 20]),
            Err(Error::InputValidation(PaddingError::Misaligned { len: 20, .. }))
        ));
    }

    #[test]
    fn test_decrypt_from_bytes_too_short() {
        let mut session = SecureAes::from_raw_key(&[0u8; 16], [0u8; IV_SIZE]).unwrap();
        assert!(matches!(
            session.decrypt_from_bytes(&[0u8; IV_SIZE + TAG_SIZE - 1]),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_set_iv_wrong_length() {
        let mut session = SecureAes::from_raw_key(&[0u8; 16], [0u8; IV_SIZE]).unwrap();
        assert!(matches!(
            session.set_iv(&[0u8; 15]),
            Err(Error::KeyLength {
                expected: 16,
                actual: 15
            })
        ));
        assert_eq!(session.iv(), &[0u8; IV_SIZE]);

        session.set_iv(&[7u8; IV_SIZE]).unwrap();
        assert_eq!(session.iv(), &[7u8; IV_SIZE]);
    }

    #[test]
    fn test_full_reset_changes_iv() {
        let mut session = SecureAes::from_raw_key(&[0u8; 32], [0u8; IV_SIZE]).unwrap();
        session.full_reset().unwrap();
        assert_ne!(session.iv(), &[0u8; IV_SIZE]);

        let packed = session.encrypt_to_bytes(b"after reset").unwrap();
        assert_eq!(session.decrypt_from_bytes(&packed).unwrap(), b"after reset");
    }

    #[test]
    fn test_fresh_sessions_use_fresh_ivs() {
        let config = fast_config(AesSize::Aes256);
        let a = SecureAes::with_config(b"pw", &config).unwrap();
        let b = SecureAes::with_config(b"pw", &config).unwrap();

        assert_ne!(a.iv(), b.iv());
        assert_eq!(a.key_thumbprint(), b.key_thumbprint());
    }

    #[test]
    fn test_key_thumbprint() {
        let session = SecureAes::from_raw_key(&[4u8; 32], [0u8; IV_SIZE]).unwrap();
        let thumbprint = session.key_thumbprint();

        assert_eq!(thumbprint.len(), 64);
        assert!(session.check_key_thumbprint(&thumbprint));
        assert!(!session.check_key_thumbprint(&thumbprint[..32]));

        let other = SecureAes::from_raw_key(&[5u8; 32], [0u8; IV_SIZE]).unwrap();
        assert!(!other.check_key_thumbprint(&thumbprint));
    }

    #[test]
    fn test_dispose_is_terminal() {
        let mut session = SecureAes::from_raw_key(&[4u8; 32], [0u8; IV_SIZE]).unwrap();
        let thumbprint = session.key_thumbprint();
        session.dispose().unwrap();

        assert!(session.is_disposed());
        assert!(!session.check_key_thumbprint(&thumbprint));
        assert!(matches!(session.encrypt(b"data"), Err(Error::Disposed)));
        assert!(matches!(session.decrypt(&[0u8; 16]), Err(Error::Disposed)));
        assert!(matches!(session.finish(), Err(Error::Disposed)));
        assert!(matches!(session.set_iv(&[0u8; IV_SIZE]), Err(Error::Disposed)));
        assert!(matches!(session.full_reset(), Err(Error::Disposed)));
        assert!(matches!(session.encrypt_to_bytes(b"data"), Err(Error::Disposed)));
    }

    #[test]
    fn test_from_raw_key_rejects_bad_length() {
        assert!(matches!(
            SecureAes::from_raw_key(&[0u8; 17], [0u8; IV_SIZE]),
            Err(Error::KeyLength { actual: 17, .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let session = SecureAes::from_raw_key(&[0x42u8; 16], [0u8; IV_SIZE]).unwrap();
        let rendered = format!("{:?}", session);
        assert!(rendered.contains("REDACTED"));
        assert!(rendered.contains("Aes128"));
    }
}
