use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while normalizing component output or writing it to disk
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Value of type {type_name} cannot be serialized")]
    Unserializable { type_name: String },

    #[error("Plain output for {} requires a string value, got {found}", path.display())]
    NotText { path: PathBuf, found: String },

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },
}
