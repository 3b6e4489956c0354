//! Component module resolution, registration and the scoped import hook

pub mod error;
pub mod finder;
pub mod registry;
pub mod resolver;

// Re-export commonly used types
pub use error::*;
pub use finder::{
    load_from_search_paths, load_module, ComponentResolver, HookGuard, ImportHooks,
    SearchPathFinder,
};
pub use registry::{ModuleRegistry, SharedRegistry};
pub use resolver::{resolve, LoadedModule, ModuleSpec};
