//! Trailing-length-byte padding to a block boundary.
//!
//! Every padding byte holds the number of padding bytes, as in PKCS#7. Data
//! that is already block-aligned is left untouched by [`pad`], and
//! [`unpad`] treats a trailing byte larger than the block size as "no
//! padding present".

use prisma_common::{PaddingError, Result};

/// The largest pad the trailing length byte can describe.
pub const MAX_PADDING: usize = u8::MAX as usize;

/// Pad a single (possibly partial) block up to `block_size`.
///
/// # Preconditions
/// - `data` is non-empty and no longer than `block_size`
///
/// # Postconditions
/// - The result length is a multiple of `block_size`
/// - Aligned input is returned unchanged
///
/// # Errors
/// - `EmptyInput` if `data` is empty
/// - `BlockTooSmall` if `data` is longer than `block_size`
/// - `PaddingTooLarge` if more than 255 bytes of padding would be needed
pub fn pad(data: &[u8], block_size: usize) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(PaddingError::EmptyInput.into());
    }
    if data.len() > block_size {
        return Err(PaddingError::BlockTooSmall {
            len: data.len(),
            block_size,
        }
        .into());
    }
    if data.len() % block_size == 0 {
        return Ok(data.to_vec());
    }

    let needed = block_size - data.len() % block_size;
    if needed > MAX_PADDING {
        return Err(PaddingError::PaddingTooLarge(needed).into());
    }

    let mut padded = Vec::with_capacity(data.len() + needed);
    padded.extend_from_slice(data);
    padded.resize(data.len() + needed, needed as u8);
    Ok(padded)
}

/// Strip padding added by [`pad`].
///
/// # Errors
/// - `EmptyInput`, `TooShort` or `Misaligned` if `data` cannot be padded output
/// - `ZeroPadding` if the trailing byte is zero
/// - `PaddingExceedsData` if the trailing byte claims more bytes than exist
pub fn unpad(data: &[u8], block_size: usize) -> Result<&[u8]> {
    if block_size == 0 {
        return Err(PaddingError::ZeroBlockSize.into());
    }
    if data.is_empty() {
        return Err(PaddingError::EmptyInput.into());
    }
    if data.len() < block_size {
        return Err(PaddingError::TooShort {
            len: data.len(),
            block_size,
        }
        .into());
    }
    if data.len() % block_size != 0 {
        return Err(PaddingError::Misaligned {
            len: data.len(),
            block_size,
        }
        .into());
    }

    let pad_len = data[data.len() - 1] as usize;
    // A final block that was already aligned was never padded.
    if pad_len > block_size {
        return Ok(data);
    }
    if pad_len == 0 {
        return Err(PaddingError::ZeroPadding.into());
    }
    if pad_len > data.len() {
        return Err(PaddingError::PaddingExceedsData {
            pad: pad_len,
            len: data.len(),
        }
        .into());
    }

    Ok(&data[..data.len() - pad_len])
}
