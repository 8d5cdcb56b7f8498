//! Key derivation: password → AES-256 key via NIST SP 800-108 over CMAC-AES-256

use aes::cipher::{generic_array::GenericArray, KeyInit};
use aes::Aes256;
use cmac::{Cmac, Mac};
use zeroize::{Zeroize, Zeroizing};

use crate::{BLOCK_SIZE, KEY_SIZE, MAX_PASSWORD_LEN};

/// SP 800-108 counter-mode fixed input: `i || label || 0x00 || context || L`.
///
/// The counter (`i = 1`) and output length (`L = 256` bits) are already part
/// of these bytes, so a single CMAC call yields the whole PRF output.
#[rustfmt::skip]
pub static FIXED: [u8; 73] = [
    // i
    0x00, 0x00, 0x00, 0x01,

    // label
    0x35, 0x27, 0x13, 0xcc, 0x53, 0xa7, 0x78, 0x89,
    0x87, 0x53, 0x22, 0x11, 0xd6, 0x5b, 0x31, 0x58,
    0xdc, 0xfe, 0x2e, 0x7e, 0x94, 0xda, 0x2f, 0x00,
    0xcc, 0x15, 0x71, 0x80, 0x0a, 0x6c, 0x63, 0x53,

    // separator
    0x00,

    // context
    0x38, 0xc3, 0x38, 0xac, 0x22, 0xf3, 0x63, 0x62,
    0x0e, 0xce, 0x85, 0x3f, 0xb8, 0x07, 0x4c, 0x4e,
    0x2b, 0x77, 0xc7, 0x21, 0xf5, 0x1a, 0x80, 0x1d,
    0x67, 0xfb, 0xe1, 0xe1, 0x83, 0x07, 0xd8, 0x0d,

    // L
    0x00, 0x00, 0x01, 0x00,
];

/// A derived 256-bit AES key.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct AesKey {
    bytes: [u8; KEY_SIZE],
}

impl AesKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for AesKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for AesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// CMAC-AES-256 of `message` under a 32-byte `key`.
pub fn cmac_aes256(key: &[u8; KEY_SIZE], message: &[u8]) -> [u8; BLOCK_SIZE] {
    let mut mac = <Cmac<Aes256> as KeyInit>::new(GenericArray::from_slice(key));
    mac.update(message);

    let mut tag = [0u8; BLOCK_SIZE];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Derive the AES-256 key for a literal (not encoded) password.
///
/// Bytes past the tenth are ignored, matching SPSS.
pub fn derive_key(password: &[u8]) -> AesKey {
    let password = password.get(..MAX_PASSWORD_LEN).unwrap_or(password);

    let mut padded = Zeroizing::new([0u8; KEY_SIZE]);
    padded[..password.len()].copy_from_slice(password);

    let tag = Zeroizing::new(cmac_aes256(&padded, &FIXED));

    let mut key = [0u8; KEY_SIZE];
    key[..BLOCK_SIZE].copy_from_slice(&tag[..]);
    key[BLOCK_SIZE..].copy_from_slice(&tag[..]);
    AesKey::from_bytes(key)
}
