//! Streaming reader for SPSS encrypted files
//!
//! SPSS can save data (`.sav`), viewer (`.spv`), and syntax (`.sps`) files in
//! an encrypted container: a 36-byte header followed by AES-256-ECB
//! ciphertext. Opening a container yields a locked [`EncryptedFile`];
//! unlocking it with the right password yields an [`EncryptedReader`] that
//! implements [`std::io::Read`] and [`std::io::BufRead`].
//!
//! ```no_run
//! use std::io::Read;
//! use spsscrypt_reader::EncryptedFile;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = EncryptedFile::open("survey.sav")?;
//! let mut reader = file.unlock(b"pspp").map_err(|_| "wrong password")?;
//! let mut plaintext = Vec::new();
//! reader.read_to_end(&mut plaintext)?;
//! reader.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Read errors and corruption are latched: the reader hands out every byte
//! decrypted before the failure, then reports end of file. [`EncryptedReader::close`]
//! returns the latched error.

pub mod container;
pub mod diag;
pub mod error;
pub mod reader;
pub mod stream;

pub use container::{ContainerHeader, HEADER_SIZE, MIN_FILE_LEN};
pub use diag::{Diagnostic, DiagnosticSink, TracingSink};
pub use error::{Corruption, OpenError, StreamError, OPEN_ENCRYPTED};
pub use reader::{EncryptedFile, EncryptedReader};
pub use stream::{StreamState, RING_SIZE};

pub use spsscrypt_core::FileType;
pub use spsscrypt_crypto::{Magic, PasswordProbe};
