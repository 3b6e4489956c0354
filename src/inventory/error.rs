use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("Invalid YAML format in {path}: {reason}")]
    InvalidYaml { path: String, reason: String },

    #[error("Invalid JSON format in {path}: {reason}")]
    InvalidJson { path: String, reason: String },

    #[error("Inventory path not found: {path}")]
    PathNotFound { path: String },

    #[error("Target not found in inventory: {target}")]
    TargetNotFound { target: String },

    #[error("Inventory for target {target} is not a mapping")]
    NotAMapping { target: String },

    #[error("I/O error on {path}: {error}")]
    Io { path: String, error: String },
}
