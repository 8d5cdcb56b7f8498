//! Password checking against the first ciphertext block

use zeroize::Zeroize;

use crate::block::{Block, EcbDecryptor};
use crate::kdf::derive_key;
use crate::magic::Magic;
use crate::password::decode_password;

/// Tests candidate passwords without touching any reader state.
///
/// Holds only a copy of the first ciphertext block, so it is cheap to clone
/// and can be shared across threads for a parallel password search.
#[derive(Clone)]
pub struct PasswordProbe {
    first_block: Block,
}

impl PasswordProbe {
    pub fn new(first_block: Block) -> Self {
        Self { first_block }
    }

    /// Derive the key for a literal password and keep it if the first block
    /// decrypts to a known magic prefix.
    pub fn unlock_literal(&self, password: &[u8]) -> Option<(EcbDecryptor, Magic)> {
        let decryptor = EcbDecryptor::new(&derive_key(password));
        let mut plaintext = decryptor.decrypt_block(&self.first_block);
        let magic = Magic::detect(&plaintext);
        plaintext.zeroize();
        magic.map(|magic| (decryptor, magic))
    }

    /// Try `password` literally, then decoded if it is a valid encoded password.
    pub fn unlock(&self, password: &[u8]) -> Option<(EcbDecryptor, Magic)> {
        self.unlock_literal(password).or_else(|| {
            let decoded = decode_password(password)?;
            tracing::trace!("retrying with decoded password");
            self.unlock_literal(&decoded)
        })
    }

    /// True if `password` (literal only) is correct.
    pub fn try_password(&self, password: &[u8]) -> bool {
        self.unlock_literal(password).is_some()
    }
}

impl std::fmt::Debug for PasswordProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordProbe").finish_non_exhaustive()
    }
}
