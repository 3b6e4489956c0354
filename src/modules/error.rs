use thiserror::Error;

/// Errors that can occur while locating or compiling a component module
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("Could not load module in path {path}")]
    NotFound { path: String },

    #[error("Module name {module_name} does not match check_name {check_name}")]
    NameMismatch {
        module_name: String,
        check_name: String,
    },

    #[error("Could not load module name {name} (searched: {searched:?})")]
    NotInSearchPaths { name: String, searched: Vec<String> },

    #[error("Failed to compile module {name}: {error}")]
    Parse { name: String, error: String },
}

impl ModuleError {
    pub fn is_not_found(&self) -> bool {
        !matches!(self, ModuleError::Parse { .. })
    }
}
