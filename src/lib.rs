//! Kadet - component compiler
//!
//! Loads Rhai component scripts from a list of search roots, runs them against
//! target inventory and writes the structured output they return as YAML, JSON
//! or plain text files.

pub mod cli;
pub mod compiler;
pub mod error;
pub mod inventory;
pub mod modules;
pub mod output;
pub mod runtime;
pub mod types;

pub use compiler::{CompileOutcome, Kadet};
pub use error::{KadetError, Result};
pub use inventory::{FileInventory, InventoryProvider, StaticInventory};
pub use runtime::{BaseObj, KadetTask, ObjectHooks, Task};
pub use types::*;
