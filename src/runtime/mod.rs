//! Component runtime: builder objects, tasks and the script engine bindings

pub mod context;
pub mod engine;
pub mod object;
pub mod script;
pub mod task;

pub use context::RuntimeContext;
pub use engine::{build_engine, ScriptHooks};
pub use object::{BaseObj, NoHooks, ObjectHooks, DEFAULT_KIND};
pub use script::{ComponentScript, EntryPoint, ScriptTask, MAIN_ENTRY, TASK_ENTRY};
pub use task::{KadetTask, Task, TaskHandle};
