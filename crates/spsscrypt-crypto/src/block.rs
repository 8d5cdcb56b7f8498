//! AES-256 in ECB mode
//!
//! Every 16-byte ciphertext block of the container payload is decrypted on its
//! own. That is how the format is defined, so no chaining mode may be used.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, KeyInit};
use aes::Aes256Dec;

use crate::kdf::AesKey;
use crate::BLOCK_SIZE;

pub type Block = [u8; BLOCK_SIZE];

/// AES-256 decryption key schedule (14 rounds).
///
/// The `aes` crate zeroizes the round keys when this is dropped.
#[derive(Clone)]
pub struct EcbDecryptor {
    cipher: Aes256Dec,
}

impl EcbDecryptor {
    pub fn new(key: &AesKey) -> Self {
        Self {
            cipher: Aes256Dec::new(GenericArray::from_slice(key.as_bytes())),
        }
    }

    /// Decrypt a single block into a fresh buffer.
    pub fn decrypt_block(&self, input: &Block) -> Block {
        let mut out = [0u8; BLOCK_SIZE];
        self.cipher.decrypt_block_b2b(
            GenericArray::from_slice(input),
            GenericArray::from_mut_slice(&mut out),
        );
        out
    }

    /// Decrypt `ciphertext` into `plaintext` block by block.
    ///
    /// Both slices must have the same length, a multiple of [`BLOCK_SIZE`].
    pub fn decrypt_blocks(&self, ciphertext: &[u8], plaintext: &mut [u8]) {
        debug_assert_eq!(ciphertext.len(), plaintext.len());
        debug_assert_eq!(ciphertext.len() % BLOCK_SIZE, 0);

        for (src, dst) in ciphertext
            .chunks_exact(BLOCK_SIZE)
            .zip(plaintext.chunks_exact_mut(BLOCK_SIZE))
        {
            self.cipher.decrypt_block_b2b(
                GenericArray::from_slice(src),
                GenericArray::from_mut_slice(dst),
            );
        }
    }
}

impl std::fmt::Debug for EcbDecryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcbDecryptor")
            .field("rounds", &14)
            .field("round_keys", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes::cipher::BlockEncrypt;
    use aes::Aes256Enc;

    fn fips197_key() -> AesKey {
        let mut bytes = [0u8; 32];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = i as u8;
        }
        AesKey::from_bytes(bytes)
    }

    // FIPS-197 appendix C.3 (AES-256).
    #[test]
    fn test_fips197_vector() {
        let dec = EcbDecryptor::new(&fips197_key());
        let ciphertext: Block = hex::decode("8ea2b7ca516745bfeafc49904b496089")
            .unwrap()
            .try_into()
            .unwrap();

        assert_eq!(
            hex::encode(dec.decrypt_block(&ciphertext)),
            "00112233445566778899aabbccddeeff"
        );
    }

    #[test]
    fn test_blocks_are_independent() {
        let key = fips197_key();
        let enc = Aes256Enc::new(GenericArray::from_slice(key.as_bytes()));

        let plaintext: Vec<u8> = (0..64u8).collect();
        let mut ciphertext = plaintext.clone();
        for block in ciphertext.chunks_exact_mut(BLOCK_SIZE) {
            enc.encrypt_block(GenericArray::from_mut_slice(block));
        }

        // Swapping two ciphertext blocks swaps the plaintext blocks (ECB).
        ciphertext[..32].rotate_left(16);

        let mut out = vec![0u8; 64];
        EcbDecryptor::new(&key).decrypt_blocks(&ciphertext, &mut out);
        assert_eq!(&out[..16], &plaintext[16..32]);
        assert_eq!(&out[16..32], &plaintext[..16]);
        assert_eq!(&out[32..], &plaintext[32..]);
    }

    #[test]
    fn test_empty_input() {
        let mut out = [0u8; 0];
        EcbDecryptor::new(&fips197_key()).decrypt_blocks(&[], &mut out);
    }
}
