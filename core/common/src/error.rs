//! Common error types for prisma.

use thiserror::Error;

/// Why a buffer could not be padded or unpadded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaddingError {
    /// Empty input can neither be padded nor unpadded.
    #[error("empty data cannot be padded or unpadded")]
    EmptyInput,

    /// Only a single block can be padded at a time.
    #[error("data of {len} bytes does not fit in a {block_size}-byte block")]
    BlockTooSmall { len: usize, block_size: usize },

    /// The trailing length byte can express at most 255.
    #[error("cannot pad {0} bytes, at most 255 are supported")]
    PaddingTooLarge(usize),

    /// Padded data is always at least one block long.
    #[error("data of {len} bytes is shorter than the {block_size}-byte block size")]
    TooShort { len: usize, block_size: usize },

    /// Padded data is always a whole number of blocks.
    #[error("data of {len} bytes is not a multiple of {block_size}")]
    Misaligned { len: usize, block_size: usize },

    /// The trailing length byte was zero.
    #[error("padding length is zero")]
    ZeroPadding,

    /// The trailing length byte claims more bytes than exist.
    #[error("padding length {pad} is greater than data length {len}")]
    PaddingExceedsData { pad: usize, len: usize },

    /// A block size of zero was requested.
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
}

/// Why an encoded derived key could not be read back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string form must start with `$`.
    #[error("encoded key is malformed: missing leading '$'")]
    MalformedInput,

    /// The string form has exactly six `;`-separated fields.
    #[error("expected 6 fields in encoded key, found {0}")]
    FieldCountMismatch(usize),

    /// Only `pbkdf2` keys are understood.
    #[error("algorithm does not match: expected pbkdf2, found {0:?}")]
    AlgorithmMismatch(String),

    /// A base64 or protobuf field failed to decode.
    #[error("failed to decode {field}: {reason}")]
    DecodeError { field: &'static str, reason: String },

    /// A numeric field did not decode to a big-endian u64.
    #[error("invalid {0} field: expected 8 bytes")]
    InvalidNumber(&'static str),

    /// The hash function name is not one we can run.
    #[error("unknown hash function: {0:?}")]
    UnknownHashFunction(String),

    /// The decoded parameters contradict each other.
    #[error("invalid key parameters: {0}")]
    InvalidParameters(String),
}

/// Top-level error type for prisma operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Data handed to the padding codec was rejected.
    #[error("Invalid input data: {0}")]
    InputValidation(#[from] PaddingError),

    /// An encoded key could not be parsed.
    #[error("Malformed key encoding: {0}")]
    Malformed(#[from] ParseError),

    /// A key or IV had the wrong size.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    KeyLength { expected: usize, actual: usize },

    /// The integrity tag did not match the decrypted data.
    #[error("Integrity tag mismatch")]
    TagMismatch,

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A finished stream was written to.
    #[error("Stream already finished")]
    Exhausted,

    /// The operating system could not supply random bytes.
    #[error("Randomness unavailable: {0}")]
    RandomnessUnavailable(String),

    /// The cipher session was disposed and holds no usable key.
    #[error("Cipher session has been disposed")]
    Disposed,

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
