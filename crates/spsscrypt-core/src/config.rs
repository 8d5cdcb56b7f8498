use serde::{Deserialize, Serialize};
use spsscrypt_crypto::MAX_PASSWORD_LEN;
use std::path::Path;

use crate::error::{SpssCryptError, SpssCryptResult};

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpssCryptConfig {
    pub logging: LoggingConfig,
    pub search: SearchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Password search settings used by `decrypt -a/-l` and `--password-list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Characters tried by the brute-force search
    pub alphabet: String,
    /// Longest candidate the brute-force search generates (at most 10)
    pub max_length: usize,
    /// Report progress every N candidates
    pub progress_interval: u64,
    /// Test candidates on all cores
    pub parallel: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Replace an existing output file instead of refusing
    pub overwrite: bool,
    /// Bytes requested per read when copying plaintext out
    pub chunk_size: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            alphabet: "abcdefghijklmnopqrstuvwxyz0123456789".into(),
            max_length: 6,
            progress_interval: 100_000,
            parallel: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            overwrite: false,
            chunk_size: 1024,
        }
    }
}

impl SpssCryptConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> SpssCryptResult<Self> {
        let config: SpssCryptConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> SpssCryptResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Reject values the decryptor cannot act on.
    pub fn validate(&self) -> SpssCryptResult<()> {
        match self.logging.format.as_str() {
            "text" | "json" => {}
            other => {
                return Err(SpssCryptError::Config(format!(
                    "logging.format must be \"text\" or \"json\", got {other:?}"
                )))
            }
        }
        if self.search.alphabet.is_empty() {
            return Err(SpssCryptError::Config("search.alphabet is empty".into()));
        }
        if !self.search.alphabet.is_ascii() {
            return Err(SpssCryptError::Config(
                "search.alphabet must be ASCII".into(),
            ));
        }
        if self.search.max_length > MAX_PASSWORD_LEN {
            return Err(SpssCryptError::Config(format!(
                "search.max_length {} exceeds the {MAX_PASSWORD_LEN}-byte password limit",
                self.search.max_length
            )));
        }
        if self.search.progress_interval == 0 {
            return Err(SpssCryptError::Config(
                "search.progress_interval must be positive".into(),
            ));
        }
        if self.output.chunk_size == 0 {
            return Err(SpssCryptError::Config(
                "output.chunk_size must be positive".into(),
            ));
        }
        Ok(())
    }
}
