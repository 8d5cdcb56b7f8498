use std::io;

use thiserror::Error;

use crate::container::MIN_FILE_LEN;

/// Status [`OpenError::status`] pairs with: the file is an encrypted container.
pub const OPEN_ENCRYPTED: i32 = 1;

/// Why a file could not be opened as an encrypted container.
#[derive(Debug, Error)]
pub enum OpenError {
    /// Readable, but the header does not carry the `ENCRYPTED` magic.
    #[error("not an encrypted SPSS file")]
    NotEncrypted,

    /// Encrypted, but too short to hold a header and two cipher blocks.
    #[error("encrypted file truncated: {len} bytes, need at least {}", MIN_FILE_LEN)]
    ShortFile { len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl OpenError {
    /// errno-shaped status: 0 for "not encrypted", negated errno otherwise.
    pub fn status(&self) -> i32 {
        match self {
            OpenError::NotEncrypted => 0,
            OpenError::ShortFile { .. } => -libc::EIO,
            OpenError::Io(err) => -err.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

/// Ways the ciphertext itself can be damaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Corruption {
    #[error("ends in incomplete {overhang}-byte ciphertext block")]
    TruncatedBlock { overhang: usize },

    #[error("ends with bad padding")]
    BadPadding,
}

/// Error latched while streaming, reported by `close`.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("read error: {0}")]
    Io(#[source] io::Error),

    #[error("encrypted file corrupted ({0})")]
    Corrupt(#[from] Corruption),
}

impl StreamError {
    /// Positive errno for the error; corruption maps to `EIO`.
    pub fn errno(&self) -> i32 {
        match self {
            StreamError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
            StreamError::Corrupt(_) => libc::EIO,
        }
    }
}
