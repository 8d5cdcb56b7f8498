//! spsscrypt-crypto: primitives for reading SPSS encrypted files
//!
//! SPSS wraps data, viewer, and syntax files in a thin container whose payload
//! is AES-256 in ECB mode with PKCS#7 padding. The key is derived from at most
//! 10 bytes of password:
//! ```text
//! padded = password[..10] || zeros            (32 bytes)
//! tag    = CMAC-AES-256(padded, i || label || 0x00 || context || L)
//! key    = tag || tag                         (AES-256 key, Nr = 14)
//! ```
//! There is no MAC over the payload. A password is accepted when the first
//! decrypted block starts with a known SPSS magic prefix.
//!
//! SPSS also has "encrypted passwords", which are an encoding and not
//! encryption; see [`password`].

pub mod block;
pub mod kdf;
pub mod magic;
pub mod padding;
pub mod password;
pub mod probe;

pub use block::{Block, EcbDecryptor};
pub use kdf::{cmac_aes256, derive_key, AesKey};
pub use magic::Magic;
pub use padding::pkcs7_padding_len;
pub use password::{decode_password, EncodedPassword};
pub use probe::PasswordProbe;

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Size of the derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Only this many leading password bytes take part in key derivation
pub const MAX_PASSWORD_LEN: usize = 10;

/// Longest encoded password (two characters per plaintext byte)
pub const MAX_ENCODED_LEN: usize = 2 * MAX_PASSWORD_LEN;
