//! Fixtures for spsscrypt tests.
//!
//! The encryptor here is the inverse of the reader: same KDF, AES-256-ECB,
//! PKCS#7. It exists only to build test inputs.

use std::io::{self, Read};

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256Enc;
use spsscrypt_core::FileType;
use spsscrypt_crypto::{derive_key, Magic, BLOCK_SIZE};

pub const HEADER_SIZE: usize = 36;

/// Deterministic filler bytes.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// `len` bytes that start with `magic`'s prefix, so the reader accepts them.
pub fn sample_payload(magic: Magic, len: usize) -> Vec<u8> {
    let prefix = magic.prefix();
    let mut payload = sample_bytes(len.max(prefix.len()));
    payload[..prefix.len()].copy_from_slice(prefix);
    payload
}

/// Container header: fixed preamble, `ENCRYPTED`, the type tag, zero filler.
pub fn container_header(file_type: FileType) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..8].copy_from_slice(b"\x00\x00\x00\x00\x00\x00\x00\x00");
    header[8..17].copy_from_slice(b"ENCRYPTED");
    header[17..20].copy_from_slice(file_type.tag());
    header
}

/// Encrypt whole blocks with the key for `password`, without padding.
///
/// # Panics
///
/// If `blocks` is not a multiple of 16 bytes long.
pub fn encrypt_blocks(password: &[u8], blocks: &[u8]) -> Vec<u8> {
    assert_eq!(blocks.len() % BLOCK_SIZE, 0, "input must be whole blocks");

    let key = derive_key(password);
    let cipher = Aes256Enc::new(GenericArray::from_slice(key.as_bytes()));
    let mut out = blocks.to_vec();
    for block in out.chunks_exact_mut(BLOCK_SIZE) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    out
}

/// PKCS#7 pad `plaintext` to a whole number of blocks (1..=16 bytes added).
pub fn pkcs7_pad(plaintext: &[u8]) -> Vec<u8> {
    let pad = BLOCK_SIZE - plaintext.len() % BLOCK_SIZE;
    let mut padded = plaintext.to_vec();
    padded.resize(plaintext.len() + pad, pad as u8);
    padded
}

/// A complete, valid encrypted container for `plaintext`.
pub fn encrypt_container(password: &[u8], plaintext: &[u8], file_type: FileType) -> Vec<u8> {
    with_header(file_type, &encrypt_blocks(password, &pkcs7_pad(plaintext)))
}

/// A container whose ciphertext is `blocks` encrypted as-is, so the caller
/// controls what the final block decrypts to.
pub fn encrypt_container_unpadded(password: &[u8], blocks: &[u8], file_type: FileType) -> Vec<u8> {
    with_header(file_type, &encrypt_blocks(password, blocks))
}

fn with_header(file_type: FileType, ciphertext: &[u8]) -> Vec<u8> {
    let mut file = container_header(file_type).to_vec();
    file.extend_from_slice(ciphertext);
    file
}

/// Cut a container so that exactly `ciphertext_len` ciphertext bytes remain.
pub fn truncate_ciphertext(mut container: Vec<u8>, ciphertext_len: usize) -> Vec<u8> {
    container.truncate(HEADER_SIZE + ciphertext_len);
    container
}

/// XOR one byte with 0xFF, wrapping `index` into range.
pub fn flip_byte(buf: &mut [u8], index: usize) {
    if buf.is_empty() {
        return;
    }
    let idx = index % buf.len();
    buf[idx] ^= 0xFF;
}

/// Reader that yields `limit` bytes of `inner` and then fails every read.
pub struct FailingReader<R> {
    inner: R,
    remaining: usize,
    errno: i32,
}

impl<R> FailingReader<R> {
    /// Fail with OS error `errno` once `limit` bytes have been read.
    pub fn new(inner: R, limit: usize, errno: i32) -> Self {
        Self {
            inner,
            remaining: limit,
            errno,
        }
    }
}

impl<R: Read> Read for FailingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::from_raw_os_error(self.errno));
        }
        let max = buf.len().min(self.remaining);
        let n = self.inner.read(&mut buf[..max])?;
        self.remaining -= n;
        Ok(n)
    }
}

/// Reader that returns at most `max` bytes per call, and reports
/// `Interrupted` before every other successful read.
pub struct TrickleReader<R> {
    inner: R,
    max: usize,
    interrupt_next: bool,
}

impl<R> TrickleReader<R> {
    pub fn new(inner: R, max: usize) -> Self {
        Self {
            inner,
            max: max.max(1),
            interrupt_next: true,
        }
    }
}

impl<R: Read> Read for TrickleReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let interrupt = self.interrupt_next;
        self.interrupt_next = !interrupt;
        if interrupt {
            return Err(io::ErrorKind::Interrupted.into());
        }
        let max = buf.len().min(self.max);
        self.inner.read(&mut buf[..max])
    }
}
