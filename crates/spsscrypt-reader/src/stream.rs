//! Ring-buffered decryption core
//!
//! Ciphertext and plaintext live in two fixed 256-byte rings that share
//! indices:
//!
//! - `fill`: ciphertext bytes present
//! - `readable`: bytes decrypted and handed to the plaintext ring
//! - `consumed`: plaintext bytes already returned to the caller
//!
//! `consumed <= readable <= fill <= RING_SIZE` always holds. Until the input
//! reaches EOF the last cipher block is withheld, because only at EOF do we
//! know whether it carries the padding that must be stripped.

use std::io::{self, ErrorKind, Read};

use spsscrypt_crypto::{pkcs7_padding_len, EcbDecryptor, BLOCK_SIZE};
use zeroize::Zeroize;

use crate::diag::{Diagnostic, DiagnosticSink};
use crate::error::{Corruption, StreamError};

pub const RING_SIZE: usize = 256;

/// Externally visible state of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// More plaintext is buffered or may still be read.
    Streaming,
    /// Clean EOF reached and every plaintext byte returned.
    Drained,
    /// An I/O error or corruption was latched. Plaintext decrypted before the
    /// failure may still be buffered.
    Failed,
}

#[derive(Debug)]
enum Latch {
    Ok,
    CleanEof,
    Io(io::Error),
    Corrupt(Corruption),
}

pub(crate) struct Ring {
    pub(crate) ciphertext: [u8; RING_SIZE],
    plaintext: [u8; RING_SIZE],
    fill: usize,
    readable: usize,
    consumed: usize,
    latch: Latch,
}

impl Ring {
    pub(crate) fn new() -> Box<Self> {
        Box::new(Self {
            ciphertext: [0; RING_SIZE],
            plaintext: [0; RING_SIZE],
            fill: 0,
            readable: 0,
            consumed: 0,
            latch: Latch::Ok,
        })
    }

    /// Record `fill` bytes placed into `ciphertext` by the header reader.
    pub(crate) fn set_initial_fill(&mut self, fill: usize) {
        debug_assert!(fill <= RING_SIZE);
        self.fill = fill;
    }

    /// Decrypted bytes not yet returned.
    pub(crate) fn buffered(&self) -> &[u8] {
        &self.plaintext[self.consumed..self.readable]
    }

    pub(crate) fn consume(&mut self, amt: usize) {
        self.consumed = (self.consumed + amt).min(self.readable);
    }

    pub(crate) fn state(&self) -> StreamState {
        match self.latch {
            Latch::Io(_) | Latch::Corrupt(_) => StreamState::Failed,
            Latch::CleanEof if self.consumed == self.readable => StreamState::Drained,
            _ => StreamState::Streaming,
        }
    }

    /// True once something other than clean EOF stopped the stream.
    pub(crate) fn has_error(&self) -> bool {
        matches!(self.latch, Latch::Io(_) | Latch::Corrupt(_))
    }

    /// A fresh `io::Error` describing the latched error, for `Read` callers.
    pub(crate) fn io_error(&self) -> Option<io::Error> {
        match &self.latch {
            Latch::Io(err) => Some(match err.raw_os_error() {
                Some(code) => io::Error::from_raw_os_error(code),
                None => io::Error::new(err.kind(), err.to_string()),
            }),
            Latch::Corrupt(corruption) => Some(io::Error::new(
                ErrorKind::InvalidData,
                StreamError::Corrupt(*corruption),
            )),
            _ => None,
        }
    }

    /// Give up the latched error, leaving the ring at EOF.
    pub(crate) fn take_error(&mut self) -> Option<StreamError> {
        match std::mem::replace(&mut self.latch, Latch::CleanEof) {
            Latch::Io(err) => Some(StreamError::Io(err)),
            Latch::Corrupt(corruption) => Some(StreamError::Corrupt(corruption)),
            Latch::Ok | Latch::CleanEof => None,
        }
    }

    /// Compact, read more ciphertext, and decrypt whatever can be released.
    ///
    /// Once anything other than `Ok` is latched this only compacts, leaving
    /// nothing readable, so callers see EOF.
    pub(crate) fn refill<R: Read>(
        &mut self,
        input: &mut R,
        decryptor: &EcbDecryptor,
        source: &str,
        sink: &mut dyn DiagnosticSink,
    ) {
        self.ciphertext.copy_within(self.readable..self.fill, 0);
        self.fill -= self.readable;
        self.readable = 0;
        self.consumed = 0;

        if !matches!(self.latch, Latch::Ok) {
            return;
        }

        while self.fill < RING_SIZE {
            match input.read(&mut self.ciphertext[self.fill..]) {
                Ok(0) => {
                    self.latch = Latch::CleanEof;
                    break;
                }
                Ok(n) => self.fill += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    tracing::debug!(file = source, error = %err, "read error");
                    self.latch = Latch::Io(err);
                    break;
                }
            }
        }

        self.readable = if matches!(self.latch, Latch::Ok) {
            self.fill - BLOCK_SIZE
        } else {
            self.fill
        };

        let overhang = self.readable % BLOCK_SIZE;
        if overhang != 0 {
            self.corrupt(Corruption::TruncatedBlock { overhang }, source, sink);
            self.readable -= overhang;
        }

        decryptor.decrypt_blocks(
            &self.ciphertext[..self.readable],
            &mut self.plaintext[..self.readable],
        );

        if matches!(self.latch, Latch::CleanEof) {
            let padding = self.plaintext[..self.readable]
                .last_chunk::<BLOCK_SIZE>()
                .and_then(pkcs7_padding_len);
            match padding {
                Some(n) => self.readable -= n,
                None => {
                    self.corrupt(Corruption::BadPadding, source, sink);
                    self.readable = self.readable.saturating_sub(BLOCK_SIZE);
                }
            }
        }

        tracing::trace!(
            file = source,
            fill = self.fill,
            readable = self.readable,
            "refilled"
        );
    }

    fn corrupt(&mut self, corruption: Corruption, source: &str, sink: &mut dyn DiagnosticSink) {
        sink.report(&Diagnostic { source, corruption });
        self.latch = Latch::Corrupt(corruption);
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        self.plaintext.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::TracingSink;
    use spsscrypt_crypto::derive_key;
    use std::io::Cursor;

    fn decryptor() -> EcbDecryptor {
        EcbDecryptor::new(&derive_key(b"pspp"))
    }

    fn drain(ring: &mut Ring, input: &mut Cursor<Vec<u8>>, dec: &EcbDecryptor) -> usize {
        let mut total = 0;
        loop {
            ring.refill(input, dec, "test", &mut TracingSink);
            let n = ring.buffered().len();
            if n == 0 {
                return total;
            }
            total += n;
            ring.consume(n);
        }
    }

    #[test]
    fn test_withholds_last_block_until_eof() {
        let dec = decryptor();
        let mut ring = Ring::new();
        let mut input = Cursor::new(vec![0u8; 1024]);

        ring.refill(&mut input, &dec, "test", &mut TracingSink);
        assert_eq!(ring.fill, RING_SIZE);
        assert_eq!(ring.readable, RING_SIZE - BLOCK_SIZE);
        assert_eq!(ring.state(), StreamState::Streaming);

        ring.consume(ring.readable);
        ring.refill(&mut input, &dec, "test", &mut TracingSink);
        assert_eq!(ring.consumed, 0);
        assert_eq!(ring.readable, RING_SIZE - BLOCK_SIZE);
    }

    #[test]
    fn test_truncated_tail_latches() {
        let dec = decryptor();
        let mut ring = Ring::new();
        let mut input = Cursor::new(vec![0u8; 37]);

        let mut seen = Vec::new();
        let mut sink = |d: &Diagnostic<'_>| seen.push(d.corruption);
        ring.refill(&mut input, &dec, "test", &mut sink);

        assert_eq!(ring.readable, 32);
        assert_eq!(ring.state(), StreamState::Failed);
        assert_eq!(seen, vec![Corruption::TruncatedBlock { overhang: 5 }]);
    }

    #[test]
    fn test_latched_ring_stays_empty() {
        let dec = decryptor();
        let mut ring = Ring::new();
        let mut input = Cursor::new(vec![0u8; 40]);

        assert_eq!(drain(&mut ring, &mut input, &dec), 32);
        assert!(ring.has_error());

        // More input appearing later does not revive the stream.
        let mut more = Cursor::new(vec![0u8; 512]);
        ring.refill(&mut more, &dec, "test", &mut TracingSink);
        assert!(ring.buffered().is_empty());
        assert_eq!(more.position(), 0);
    }

    #[test]
    fn test_take_error_clears_latch() {
        let dec = decryptor();
        let mut ring = Ring::new();
        ring.refill(&mut Cursor::new(vec![0u8; 17]), &dec, "test", &mut TracingSink);

        assert!(ring.io_error().is_some());
        assert!(matches!(
            ring.take_error(),
            Some(StreamError::Corrupt(Corruption::TruncatedBlock { overhang: 1 }))
        ));
        assert!(ring.take_error().is_none());
    }
}
