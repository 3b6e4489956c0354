//! Normalization of component results and the files they are written to

pub mod error;
pub mod normalize;
pub mod prune;
pub mod writer;

pub use error::*;
pub use normalize::{normalize, to_dynamic, to_script_map};
pub use prune::prune_empty;
pub use writer::{CompiledFile, FileWriter, WriteOptions};
