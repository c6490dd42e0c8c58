//! Common utilities and types shared across prisma modules.
//!
//! This module provides the error taxonomy used by every crate in the
//! workspace and the zeroizing byte container for secret material.

pub mod error;
pub mod types;

pub use error::{Error, PaddingError, ParseError, Result};
pub use types::SensitiveBytes;
