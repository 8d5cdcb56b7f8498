use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of SPSS payload wrapped by an encrypted container.
///
/// Taken from the three-letter tag that follows `ENCRYPTED` in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// A `.sav` system (data) file
    Data,
    /// A `.spv` viewer (output) file
    Viewer,
    /// A `.sps` syntax file
    Syntax,
}

impl FileType {
    /// Parse the header tag (`SAV`, `SPV`, `SPS`). Unknown tags yield `None`.
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"SAV" => Some(FileType::Data),
            b"SPV" => Some(FileType::Viewer),
            b"SPS" => Some(FileType::Syntax),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static [u8; 3] {
        match self {
            FileType::Data => b"SAV",
            FileType::Viewer => b"SPV",
            FileType::Syntax => b"SPS",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileType::Data => "data",
            FileType::Viewer => "viewer",
            FileType::Syntax => "syntax",
        };
        f.write_str(name)
    }
}
