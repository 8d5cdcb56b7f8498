//! Plaintext prefixes that identify a correctly decrypted SPSS payload

use crate::block::Block;

/// Payload kind recognized from the first decrypted block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Magic {
    /// `$FL2@(#)`: system file, format 2
    SystemV2,
    /// `$FL3@(#)`: system file, format 3 (compressed)
    SystemV3,
    /// `* Encoding`: syntax file
    Syntax,
    /// ZIP local header: viewer file
    Zip,
}

static MAGIC: [(Magic, &[u8]); 4] = [
    (Magic::SystemV2, b"$FL2@(#)"),
    (Magic::SystemV3, b"$FL3@(#)"),
    (Magic::Syntax, b"* Encoding"),
    (Magic::Zip, b"PK\x03\x04\x14\x00\x08"),
];

impl Magic {
    /// Classify a decrypted first block, or `None` if no prefix matches.
    pub fn detect(block: &Block) -> Option<Magic> {
        MAGIC
            .iter()
            .find(|(_, prefix)| block.starts_with(prefix))
            .map(|(magic, _)| *magic)
    }

    pub fn prefix(self) -> &'static [u8] {
        MAGIC
            .iter()
            .find(|(magic, _)| *magic == self)
            .map(|(_, prefix)| *prefix)
            .unwrap_or_default()
    }
}
