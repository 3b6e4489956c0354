//! Execution of a single component script and dispatch to its entry point

use crate::error::{KadetError, Result};
use crate::modules::{LoadedModule, ModuleSpec, SharedRegistry};
use crate::runtime::task::{Task, TaskHandle};
use rhai::{CallFnOptions, Dynamic, Engine, FuncArgs, Map, Module, Scope};
use std::cell::{Cell, RefCell};
use tracing::debug;

pub const MAIN_ENTRY: &str = "main";
pub const TASK_ENTRY: &str = "run";

/// How a component produces its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// `fn run(input_params)`, called with `this` bound to the task.
    Task,
    /// `fn main()` or `fn main(input_params)`.
    Main { takes_params: bool },
}

/// A compiled component bound to the engine of the current compile.
///
/// The top-level statements run together with the entry-point call, in one
/// evaluation, so modules imported at the top level stay visible to `main`
/// and `run`.
pub struct ComponentScript<'e> {
    engine: &'e Engine,
    registry: SharedRegistry,
    module: LoadedModule,
    functions: Module,
    scope: RefCell<Scope<'static>>,
    evaluated: Cell<bool>,
}

impl<'e> ComponentScript<'e> {
    /// Compiles the component and registers its functions under its registry
    /// name, so that it can import itself while it runs.
    pub fn load(engine: &'e Engine, registry: SharedRegistry, spec: ModuleSpec) -> Result<Self> {
        let module = LoadedModule::load(engine, spec)?;
        let functions = Module::eval_ast_as_new(
            Scope::new(),
            &module.ast.clone_functions_only(),
            engine,
        )
        .map_err(KadetError::from_script_error)?;

        registry
            .borrow_mut()
            .register(module.spec.name.clone(), functions.clone());

        Ok(Self {
            engine,
            registry,
            module,
            functions,
            scope: RefCell::new(Scope::new()),
            evaluated: Cell::new(false),
        })
    }

    pub fn spec(&self) -> &ModuleSpec {
        &self.module.spec
    }

    /// Picks the entry point from the functions the script defines.
    ///
    /// A `run` function makes the component a task and must take exactly
    /// one parameter. Otherwise `main` is used, preferring the one-parameter
    /// form over the zero-parameter one.
    pub fn entry_point(&self) -> Result<EntryPoint> {
        let origin = self.module.spec.origin.display();

        let run = self.module.arities(TASK_ENTRY);
        if !run.is_empty() {
            if run.contains(&1) {
                return Ok(EntryPoint::Task);
            }
            return Err(KadetError::Configuration(format!(
                "{origin}: {TASK_ENTRY}() must take exactly one parameter (input_params), found {run:?}"
            )));
        }

        let main = self.module.arities(MAIN_ENTRY);
        if main.contains(&1) {
            Ok(EntryPoint::Main { takes_params: true })
        } else if main.contains(&0) {
            Ok(EntryPoint::Main {
                takes_params: false,
            })
        } else if main.is_empty() {
            Err(KadetError::Configuration(format!(
                "{origin}: neither {MAIN_ENTRY}() nor {TASK_ENTRY}() is defined"
            )))
        } else {
            Err(KadetError::Configuration(format!(
                "{origin}: {MAIN_ENTRY}() must take zero or one parameter, found {main:?}"
            )))
        }
    }

    pub fn call_main(&self, takes_params: bool, input_params: Map) -> Result<Dynamic> {
        debug!(
            "Calling {}({}) in {}",
            MAIN_ENTRY,
            if takes_params { "input_params" } else { "" },
            self.module.spec.name
        );

        if takes_params {
            self.call_entry(MAIN_ENTRY, None, (Dynamic::from_map(input_params),))
        } else {
            self.call_entry(MAIN_ENTRY, None, ())
        }
    }

    pub fn call_run(&self, task: &TaskHandle, input_params: Map) -> Result<Dynamic> {
        debug!("Calling {}(input_params) in {}", TASK_ENTRY, self.module.spec.name);

        let mut this = Dynamic::from(task.clone());
        self.call_entry(TASK_ENTRY, Some(&mut this), (Dynamic::from_map(input_params),))
    }

    /// Runs the top-level statements (first call only) and then `entry`.
    /// The component stays registered on success and is unregistered on
    /// failure.
    fn call_entry(
        &self,
        entry: &str,
        this: Option<&mut Dynamic>,
        args: impl FuncArgs,
    ) -> Result<Dynamic> {
        let first = !self.evaluated.replace(true);
        if first {
            debug!(
                "Executing component {} from {}",
                self.module.spec.name,
                self.module.spec.origin.display()
            );
        }

        let options = CallFnOptions::new().eval_ast(first).rewind_scope(false);
        let options = match this {
            Some(this) => options.bind_this_ptr(this),
            None => options,
        };

        let result = self.engine.call_fn_with_options::<Dynamic>(
            options,
            &mut self.scope.borrow_mut(),
            &self.module.ast,
            entry,
            args,
        );

        let name = self.module.spec.name.clone();
        match result {
            Ok(value) => {
                self.registry
                    .borrow_mut()
                    .complete(name, self.functions.clone());
                Ok(value)
            }
            Err(e) => {
                self.registry.borrow_mut().remove(&name);
                Err(KadetError::from_script_error(e))
            }
        }
    }
}

/// A scripted task: `run` dispatches to the script with `this` bound.
pub struct ScriptTask<'s, 'e> {
    script: &'s ComponentScript<'e>,
    handle: TaskHandle,
}

impl<'s, 'e> ScriptTask<'s, 'e> {
    pub fn new(script: &'s ComponentScript<'e>, handle: TaskHandle) -> Self {
        Self { script, handle }
    }
}

impl Task for ScriptTask<'_, '_> {
    fn run(&self, input_params: Map) -> Result<Dynamic> {
        self.script.call_run(&self.handle, input_params)
    }
}
