//! Password-based key derivation using PBKDF2.
//!
//! A [`DerivedKey`] carries everything needed to re-run the derivation:
//! salt, iteration count, output length and hash function. It has two
//! self-describing encodings:
//!
//! - a string form, `$pbkdf2;<hash>;<iterations>;<length>;<salt>;<key>`,
//!   where the numbers are big-endian `u64`s and every binary field is
//!   standard base64;
//! - a protobuf form produced with `prost`.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use prost::Message;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha512};

use crate::compare::secure_compare;
use crate::random::random_bytes;
use prisma_common::{Error, ParseError, Result, SensitiveBytes};

/// Name of the only supported algorithm, as written in encodings.
pub const ALGORITHM: &str = "pbkdf2";

/// Length of the salt generated by [`DerivedKey::derive`].
pub const SALT_LENGTH: usize = 8;

/// Number of `;`-separated fields in the string encoding.
const FIELD_COUNT: usize = 6;

/// Hash functions PBKDF2 can be instantiated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    #[default]
    Sha256,
    Sha512,
}

impl HashFunction {
    /// Canonical name used in both key encodings.
    pub fn name(&self) -> &'static str {
        match self {
            HashFunction::Sha256 => "sha256",
            HashFunction::Sha512 => "sha512",
        }
    }

    /// Fill `out` with PBKDF2-HMAC output using this hash.
    fn pbkdf2(&self, password: &[u8], salt: &[u8], rounds: u32, out: &mut [u8]) {
        match self {
            HashFunction::Sha256 => pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, rounds, out),
            HashFunction::Sha512 => pbkdf2::pbkdf2_hmac::<Sha512>(password, salt, rounds, out),
        }
    }
}

impl fmt::Display for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(HashFunction::Sha256),
            "sha512" => Ok(HashFunction::Sha512),
            other => Err(ParseError::UnknownHashFunction(other.to_string())),
        }
    }
}

/// Wire form of a [`DerivedKey`].
#[derive(Clone, PartialEq, Message)]
struct DerivedKeyRecord {
    #[prost(string, tag = "1")]
    algorithm: String,
    #[prost(string, tag = "2")]
    hash_function: String,
    #[prost(uint64, tag = "3")]
    iterations: u64,
    #[prost(uint64, tag = "4")]
    output_length: u64,
    #[prost(bytes = "vec", tag = "5")]
    salt: Vec<u8>,
    #[prost(bytes = "vec", tag = "6")]
    key: Vec<u8>,
}

/// A key derived from a passphrase, together with its derivation parameters.
#[derive(Clone)]
pub struct DerivedKey {
    key: SensitiveBytes,
    salt: Vec<u8>,
    iterations: u64,
    output_length: u64,
    hash_function: HashFunction,
}

impl DerivedKey {
    /// Derive a key from `passphrase` with a fresh random salt.
    ///
    /// # Preconditions
    /// - `iterations` and `output_length` are non-zero
    ///
    /// # Postconditions
    /// - `key().len() == output_length`
    /// - `salt()` is [`SALT_LENGTH`] fresh random bytes
    ///
    /// # Errors
    /// - `InvalidInput` if a parameter is zero
    /// - `RandomnessUnavailable` if no salt can be generated
    pub fn derive(
        passphrase: &[u8],
        iterations: u32,
        output_length: usize,
        hash_function: HashFunction,
    ) -> Result<Self> {
        let salt = random_bytes(SALT_LENGTH)?;
        Self::derive_with_salt(passphrase, salt, iterations, output_length, hash_function)
    }

    /// Derive a key from `passphrase` using a caller-supplied salt.
    ///
    /// The result is deterministic in all of its inputs.
    pub fn derive_with_salt(
        passphrase: &[u8],
        salt: Vec<u8>,
        iterations: u32,
        output_length: usize,
        hash_function: HashFunction,
    ) -> Result<Self> {
        if iterations == 0 {
            return Err(Error::InvalidInput(
                "KDF iteration count must be greater than zero".to_string(),
            ));
        }
        if output_length == 0 {
            return Err(Error::InvalidInput(
                "KDF output length must be greater than zero".to_string(),
            ));
        }

        let mut key = SensitiveBytes::new(vec![0u8; output_length]);
        hash_function.pbkdf2(passphrase, &salt, iterations, key.as_mut_bytes());

        Ok(Self {
            key,
            salt,
            iterations: u64::from(iterations),
            output_length: output_length as u64,
            hash_function,
        })
    }

    /// Check whether `candidate` derives to the same key.
    ///
    /// Runs the full derivation with the stored parameters and compares in
    /// constant time. Only a single yes/no answer is ever returned.
    pub fn verify(&self, candidate: impl AsRef<[u8]>) -> bool {
        let Ok(rounds) = u32::try_from(self.iterations) else {
            return false;
        };
        let mut other = SensitiveBytes::new(vec![0u8; self.key.len()]);
        self.hash_function
            .pbkdf2(candidate.as_ref(), &self.salt, rounds, other.as_mut_bytes());
        secure_compare(self.key.as_bytes(), other.as_bytes())
    }

    /// Encode as `$pbkdf2;<hash>;<iterations>;<length>;<salt>;<key>`.
    pub fn serialize_to_string(&self) -> String {
        format!(
            "${};{};{};{};{};{}",
            ALGORITHM,
            self.hash_function,
            encode_number(self.iterations),
            encode_number(self.output_length),
            STANDARD.encode(&self.salt),
            STANDARD.encode(self.key.as_bytes()),
        )
    }

    /// Parse the string form written by [`DerivedKey::serialize_to_string`].
    ///
    /// # Errors
    /// - `MalformedInput` if the leading `$` is missing
    /// - `FieldCountMismatch` unless there are exactly six fields
    /// - `AlgorithmMismatch` unless the algorithm is `pbkdf2`
    /// - `DecodeError` if a base64 field does not decode
    /// - `InvalidNumber`, `UnknownHashFunction` or `InvalidParameters` if
    ///   the decoded fields do not describe a usable key
    pub fn parse_from_string(s: &str) -> Result<Self> {
        let Some(body) = s.strip_prefix('$') else {
            return Err(ParseError::MalformedInput.into());
        };

        let parts: Vec<&str> = body.split(';').collect();
        if parts.len() != FIELD_COUNT {
            return Err(ParseError::FieldCountMismatch(parts.len()).into());
        }
        if parts[0] != ALGORITHM {
            return Err(ParseError::AlgorithmMismatch(parts[0].to_string()).into());
        }

        let key = SensitiveBytes::new(decode_field("key", parts[5])?);
        let salt = decode_field("salt", parts[4])?;
        let iterations = decode_number("iterations", parts[2])?;
        let output_length = decode_number("output length", parts[3])?;

        Self::from_parts(parts[1], iterations, output_length, salt, key)
    }

    /// Encode as a protobuf message.
    pub fn serialize_to_bytes(&self) -> Vec<u8> {
        DerivedKeyRecord {
            algorithm: ALGORITHM.to_string(),
            hash_function: self.hash_function.name().to_string(),
            iterations: self.iterations,
            output_length: self.output_length,
            salt: self.salt.clone(),
            key: self.key.as_bytes().to_vec(),
        }
        .encode_to_vec()
    }

    /// Parse the binary form written by [`DerivedKey::serialize_to_bytes`].
    ///
    /// Applies the same checks as [`DerivedKey::parse_from_string`].
    pub fn parse_from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut record = DerivedKeyRecord::decode(bytes).map_err(|e| ParseError::DecodeError {
            field: "record",
            reason: e.to_string(),
        })?;
        if record.algorithm != ALGORITHM {
            return Err(ParseError::AlgorithmMismatch(record.algorithm).into());
        }

        let key = SensitiveBytes::new(std::mem::take(&mut record.key));
        Self::from_parts(
            &record.hash_function,
            record.iterations,
            record.output_length,
            std::mem::take(&mut record.salt),
            key,
        )
    }

    fn from_parts(
        hash_name: &str,
        iterations: u64,
        output_length: u64,
        salt: Vec<u8>,
        key: SensitiveBytes,
    ) -> Result<Self> {
        let hash_function = hash_name.parse::<HashFunction>()?;
        if iterations == 0 || iterations > u64::from(u32::MAX) {
            return Err(ParseError::InvalidParameters(format!(
                "iteration count {} out of range",
                iterations
            ))
            .into());
        }
        if output_length == 0 {
            return Err(
                ParseError::InvalidParameters("output length must be non-zero".to_string()).into(),
            );
        }
        if key.len() as u64 != output_length {
            return Err(ParseError::InvalidParameters(format!(
                "key is {} bytes but output length is {}",
                key.len(),
                output_length
            ))
            .into());
        }

        Ok(Self {
            key,
            salt,
            iterations,
            output_length,
            hash_function,
        })
    }

    /// The derived key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn key(&self) -> &[u8] {
        self.key.as_bytes()
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn output_length(&self) -> u64 {
        self.output_length
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    pub fn algorithm(&self) -> &'static str {
        ALGORITHM
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.iterations == other.iterations
            && self.output_length == other.output_length
            && self.hash_function == other.hash_function
            && self.salt == other.salt
            && secure_compare(self.key.as_bytes(), other.key.as_bytes())
    }
}

impl Eq for DerivedKey {}

impl fmt::Display for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize_to_string())
    }
}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &ALGORITHM)
            .field("hash_function", &self.hash_function)
            .field("iterations", &self.iterations)
            .field("output_length", &self.output_length)
            .field("salt", &STANDARD.encode(&self.salt))
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl FromStr for DerivedKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_from_string(s)
    }
}

fn encode_number(n: u64) -> String {
    STANDARD.encode(n.to_be_bytes())
}

fn decode_number(field: &'static str, s: &str) -> Result<u64> {
    let bytes = decode_field(field, s)?;
    let array: [u8; 8] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| ParseError::InvalidNumber(field))?;
    Ok(u64::from_be_bytes(array))
}

fn decode_field(field: &'static str, s: &str) -> Result<Vec<u8>> {
    STANDARD.decode(s).map_err(|e| {
        Error::from(ParseError::DecodeError {
            field,
            reason: e.to_string(),
        })
    })
}
