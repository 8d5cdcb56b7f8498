use thiserror::Error;

pub type SpssCryptResult<T> = Result<T, SpssCryptError>;

#[derive(Debug, Error)]
pub enum SpssCryptError {
    #[error("config error: {0}")]
    Config(String),

    #[error("parsing config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
