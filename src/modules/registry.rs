//! Compile-scoped registry of component modules

use rhai::Module;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Entry {
    /// Registered before execution; exposes script functions only.
    Loading(Rc<Module>),
    Ready(Rc<Module>),
}

impl Entry {
    fn module(&self) -> Rc<Module> {
        match self {
            Entry::Loading(module) | Entry::Ready(module) => module.clone(),
        }
    }
}

/// Modules loaded during one compile, keyed by their registry name
/// (`kadet_component_<name>`).
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Entry>,
}

pub type SharedRegistry = Rc<RefCell<ModuleRegistry>>;

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Registers a module ahead of execution so that imports of it made while
    /// it runs see its functions.
    pub fn register(&mut self, name: impl Into<String>, partial: Module) {
        self.modules
            .insert(name.into(), Entry::Loading(Rc::new(partial)));
    }

    /// Replaces a loading entry with the fully evaluated module.
    pub fn complete(&mut self, name: impl Into<String>, module: Module) -> Rc<Module> {
        let module = Rc::new(module);
        self.modules
            .insert(name.into(), Entry::Ready(module.clone()));
        module
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.modules.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Rc<Module>> {
        self.modules.get(name).map(Entry::module)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        matches!(self.modules.get(name), Some(Entry::Loading(_)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modules.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}
