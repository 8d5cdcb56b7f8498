pub mod config;
pub mod error;
pub mod types;

pub use error::{SpssCryptError, SpssCryptResult};
pub use types::FileType;
