use rhai::{Dynamic, EvalAltResult, Position};
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::modules::ModuleError;
use crate::output::OutputError;

/// Errors surfaced by a compile invocation.
///
/// The type is `Clone` so that it can ride inside a Rhai runtime error while a
/// component script is executing and come back out unchanged on the Rust side.
#[derive(Debug, Clone, Error)]
pub enum KadetError {
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("{0}")]
    Compile(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Key not found: {0}")]
    Lookup(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("I/O error on {path}: {error}")]
    Io { path: String, error: String },
}

pub type Result<T> = std::result::Result<T, KadetError>;

impl KadetError {
    /// Wraps the error so it can be returned from a function registered with Rhai.
    pub fn into_script_error(self) -> Box<EvalAltResult> {
        EvalAltResult::ErrorRuntime(Dynamic::from(self), Position::NONE).into()
    }

    /// Recovers a `KadetError` from a Rhai evaluation failure, unwrapping the
    /// function-call and module layers Rhai adds around the original error.
    pub fn from_script_error(err: Box<EvalAltResult>) -> Self {
        match *err {
            EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => Self::from_script_error(inner),
            EvalAltResult::ErrorInModule(_, inner, _) => Self::from_script_error(inner),
            EvalAltResult::ErrorModuleNotFound(name, _) => KadetError::ModuleNotFound(name),
            EvalAltResult::ErrorRuntime(value, pos) => {
                if value.is::<KadetError>() {
                    value.cast::<KadetError>()
                } else {
                    KadetError::Script(EvalAltResult::ErrorRuntime(value, pos).to_string())
                }
            }
            other => KadetError::Script(other.to_string()),
        }
    }

    pub(crate) fn io(path: impl std::fmt::Display, error: impl std::fmt::Display) -> Self {
        KadetError::Io {
            path: path.to_string(),
            error: error.to_string(),
        }
    }
}

impl From<ModuleError> for KadetError {
    fn from(err: ModuleError) -> Self {
        match err {
            ModuleError::Parse { .. } => KadetError::Script(err.to_string()),
            _ => KadetError::ModuleNotFound(err.to_string()),
        }
    }
}

impl From<InventoryError> for KadetError {
    fn from(err: InventoryError) -> Self {
        KadetError::Inventory(err.to_string())
    }
}

impl From<OutputError> for KadetError {
    fn from(err: OutputError) -> Self {
        match err {
            OutputError::Unserializable { .. } | OutputError::NotText { .. } => {
                KadetError::Compile(err.to_string())
            }
            OutputError::Io { ref path, .. } | OutputError::Persist { ref path, .. } => {
                KadetError::io(path.display(), &err)
            }
            OutputError::Encode { ref path, .. } => KadetError::io(path.display(), &err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_round_trip() {
        let original = KadetError::Compile("Deployment: \"name\": key and value needed".into());
        let wrapped = original.clone().into_script_error();

        match KadetError::from_script_error(wrapped) {
            KadetError::Compile(message) => assert!(message.contains("Deployment")),
            other => panic!("Expected Compile error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_function_call_is_unwrapped() {
        let inner = KadetError::Lookup("parameters".into()).into_script_error();
        let outer: Box<EvalAltResult> = EvalAltResult::ErrorInFunctionCall(
            "main".into(),
            String::new(),
            inner,
            Position::NONE,
        )
        .into();

        assert!(matches!(
            KadetError::from_script_error(outer),
            KadetError::Lookup(key) if key == "parameters"
        ));
    }

    #[test]
    fn test_plain_runtime_error_becomes_script_error() {
        let err: Box<EvalAltResult> =
            EvalAltResult::ErrorRuntime("boom".into(), Position::NONE).into();
        assert!(matches!(
            KadetError::from_script_error(err),
            KadetError::Script(message) if message.contains("boom")
        ));
    }
}
