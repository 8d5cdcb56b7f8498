use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, Read};
use std::path::Path;

use spsscrypt_core::FileType;
use spsscrypt_crypto::{EcbDecryptor, Magic, PasswordProbe};

use crate::container::{read_header, ContainerHeader};
use crate::diag::{DiagnosticSink, TracingSink};
use crate::error::{OpenError, StreamError};
use crate::stream::{Ring, StreamState};

/// An encrypted container that has not been unlocked yet.
///
/// Holds the input, the header, and up to 256 bytes of leading ciphertext.
/// Nothing has been decrypted. A wrong password hands the file back from
/// [`EncryptedFile::unlock`] so another password can be tried.
pub struct EncryptedFile<R> {
    input: R,
    name: String,
    header: ContainerHeader,
    ring: Box<Ring>,
    sink: Box<dyn DiagnosticSink>,
}

impl EncryptedFile<File> {
    /// Open `path` and check that it is an encrypted container.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref();
        let input = File::open(path)?;
        Self::new(input, path.display().to_string())
    }
}

impl<R: Read> EncryptedFile<R> {
    /// Probe `input`, which must be positioned at the start of the container.
    ///
    /// `name` is used only in diagnostics.
    pub fn new(mut input: R, name: impl Into<String>) -> Result<Self, OpenError> {
        let name = name.into();
        let mut ring = Ring::new();

        let (header, fill) = match read_header(&mut input, &mut ring.ciphertext) {
            Ok(found) => found,
            Err(err) => {
                tracing::debug!(file = %name, error = %err, "not opened as encrypted file");
                return Err(err);
            }
        };
        ring.set_initial_fill(fill);

        tracing::debug!(
            file = %name,
            file_type = ?header.file_type(),
            prefix = fill,
            "recognized encrypted container"
        );

        Ok(Self {
            input,
            name,
            header,
            ring,
            sink: Box::new(TracingSink),
        })
    }

    /// Send corruption diagnostics to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &ContainerHeader {
        &self.header
    }

    pub fn file_type(&self) -> Option<FileType> {
        self.header.file_type()
    }

    /// A detached password checker over the first ciphertext block.
    pub fn probe(&self) -> PasswordProbe {
        let mut first_block = [0u8; spsscrypt_crypto::BLOCK_SIZE];
        first_block.copy_from_slice(&self.ring.ciphertext[..spsscrypt_crypto::BLOCK_SIZE]);
        PasswordProbe::new(first_block)
    }

    /// Unlock with `password`, tried as given and then, if it is a valid SPSS
    /// encoded password, in decoded form.
    pub fn unlock(self, password: &[u8]) -> Result<EncryptedReader<R>, Self> {
        let unlocked = self.probe().unlock(password);
        self.finish_unlock(unlocked)
    }

    /// Unlock with `password` exactly as given.
    pub fn unlock_literal(self, password: &[u8]) -> Result<EncryptedReader<R>, Self> {
        let unlocked = self.probe().unlock_literal(password);
        self.finish_unlock(unlocked)
    }

    fn finish_unlock(
        self,
        unlocked: Option<(EcbDecryptor, Magic)>,
    ) -> Result<EncryptedReader<R>, Self> {
        let Some((decryptor, magic)) = unlocked else {
            tracing::debug!(file = %self.name, "password rejected");
            return Err(self);
        };
        tracing::debug!(file = %self.name, ?magic, "unlocked");

        let mut reader = EncryptedReader {
            input: self.input,
            name: self.name,
            file_type: self.header.file_type(),
            magic,
            decryptor,
            ring: self.ring,
            sink: self.sink,
            error_reported: false,
        };
        reader.refill();
        Ok(reader)
    }
}

impl<R> fmt::Debug for EncryptedFile<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedFile")
            .field("name", &self.name)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Plaintext stream over an unlocked container.
///
/// Errors do not surface from [`EncryptedReader::read_plaintext`]: it returns
/// whatever plaintext was decrypted before the failure and then 0. Call
/// [`EncryptedReader::close`] to learn whether the stream ended cleanly.
pub struct EncryptedReader<R> {
    input: R,
    name: String,
    file_type: Option<FileType>,
    magic: Magic,
    decryptor: EcbDecryptor,
    ring: Box<Ring>,
    sink: Box<dyn DiagnosticSink>,
    error_reported: bool,
}

impl<R: Read> EncryptedReader<R> {
    fn refill(&mut self) {
        self.ring.refill(
            &mut self.input,
            &self.decryptor,
            &self.name,
            self.sink.as_mut(),
        );
    }

    /// Copy up to `buf.len()` plaintext bytes into `buf`.
    ///
    /// A short count means EOF, an error, or both.
    pub fn read_plaintext(&mut self, buf: &mut [u8]) -> usize {
        let mut ofs = 0;
        while ofs < buf.len() {
            let chunk = self.ring.buffered();
            if chunk.is_empty() {
                self.refill();
                if self.ring.buffered().is_empty() {
                    break;
                }
                continue;
            }
            let n = chunk.len().min(buf.len() - ofs);
            buf[ofs..ofs + n].copy_from_slice(&chunk[..n]);
            self.ring.consume(n);
            ofs += n;
        }
        ofs
    }

    pub fn state(&self) -> StreamState {
        self.ring.state()
    }

    /// Finish reading and report how the stream ended.
    ///
    /// Returns `Ok(())` after a clean EOF and also when closed early, before
    /// anything went wrong. The input is dropped and the key schedule zeroed.
    pub fn close(mut self) -> Result<(), StreamError> {
        let result = match self.ring.take_error() {
            Some(err) => Err(err),
            None => Ok(()),
        };
        tracing::debug!(file = %self.name, ok = result.is_ok(), "closed");
        result
    }
}

impl<R> EncryptedReader<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_type(&self) -> Option<FileType> {
        self.file_type
    }

    /// Which magic prefix the first plaintext block matched.
    pub fn magic(&self) -> Magic {
        self.magic
    }
}

impl<R: Read> Read for EncryptedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_plaintext(buf);
        if n == 0 && !buf.is_empty() && self.ring.has_error() && !self.error_reported {
            self.error_reported = true;
            if let Some(err) = self.ring.io_error() {
                return Err(err);
            }
        }
        Ok(n)
    }
}

impl<R: Read> BufRead for EncryptedReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.ring.buffered().is_empty() {
            self.refill();
            if self.ring.buffered().is_empty() && self.ring.has_error() && !self.error_reported {
                self.error_reported = true;
                if let Some(err) = self.ring.io_error() {
                    return Err(err);
                }
            }
        }
        Ok(self.ring.buffered())
    }

    fn consume(&mut self, amt: usize) {
        self.ring.consume(amt);
    }
}

impl<R> fmt::Debug for EncryptedReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedReader")
            .field("name", &self.name)
            .field("file_type", &self.file_type)
            .field("magic", &self.magic)
            .finish_non_exhaustive()
    }
}
