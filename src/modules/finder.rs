//! Import hook that routes `import` statements to the search roots of the
//! component currently executing.

use crate::error::{KadetError, Result};
use crate::modules::registry::SharedRegistry;
use crate::modules::resolver::{self, LoadedModule, ModuleSpec};
use rhai::{Engine, EvalAltResult, Module, ModuleResolver, Position, Scope};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, trace};

/// Resolves bare module names against one set of search roots.
#[derive(Debug)]
pub struct SearchPathFinder {
    search_paths: Vec<PathBuf>,
}

impl SearchPathFinder {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Looks `name` up in the search roots only; `./x` and `x.rhai` name the
    /// module `x` under each root, never a path under the working directory.
    pub fn find_spec(&self, name: &str) -> Option<ModuleSpec> {
        let suffix = format!(".{}", resolver::MODULE_EXTENSION);
        let name = name.strip_suffix(suffix.as_str()).unwrap_or(name);
        resolver::find_in_search_paths(name, &self.search_paths).ok()
    }
}

/// Slot holding the finders installed for the components currently running.
#[derive(Debug, Clone, Default)]
pub struct ImportHooks {
    finders: Rc<RefCell<Vec<Rc<SearchPathFinder>>>>,
}

impl ImportHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a finder for `search_paths`. It stays active until the
    /// returned guard is dropped.
    #[must_use = "the hook is removed as soon as the guard is dropped"]
    pub fn install(&self, search_paths: Vec<PathBuf>) -> HookGuard {
        let finder = Rc::new(SearchPathFinder::new(search_paths));
        self.finders.borrow_mut().push(finder.clone());
        trace!("Installed import hook over {:?}", finder.search_paths());
        HookGuard {
            hooks: self.clone(),
            finder,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.finders.borrow().is_empty()
    }

    fn find_spec(&self, name: &str) -> Option<ModuleSpec> {
        // Cloned out so no borrow is held while the module evaluates.
        let finders: Vec<Rc<SearchPathFinder>> = self.finders.borrow().clone();
        finders.iter().rev().find_map(|f| f.find_spec(name))
    }
}

/// Removes its finder from the hook slot when dropped.
#[derive(Debug)]
pub struct HookGuard {
    hooks: ImportHooks,
    finder: Rc<SearchPathFinder>,
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        self.hooks
            .finders
            .borrow_mut()
            .retain(|f| !Rc::ptr_eq(f, &self.finder));
        trace!("Removed import hook over {:?}", self.finder.search_paths());
    }
}

/// Engine-level module resolver: already registered modules first, then the
/// active import hooks.
#[derive(Debug, Clone)]
pub struct ComponentResolver {
    registry: SharedRegistry,
    hooks: ImportHooks,
}

impl ComponentResolver {
    pub fn new(registry: SharedRegistry, hooks: ImportHooks) -> Self {
        Self { registry, hooks }
    }
}

impl ModuleResolver for ComponentResolver {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> std::result::Result<Rc<Module>, Box<EvalAltResult>> {
        let module_name = Path::new(path)
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        let registry_name = ModuleSpec::registry_name(module_name);

        let registered = self.registry.borrow().get(&registry_name);
        if let Some(module) = registered {
            trace!("Import {} served from registry as {}", path, registry_name);
            return Ok(module);
        }

        match self.hooks.find_spec(path) {
            Some(spec) => load_module(engine, &self.registry, spec).map_err(|e| e.into_script_error()),
            None => Err(EvalAltResult::ErrorModuleNotFound(path.to_string(), pos).into()),
        }
    }
}

/// Compiles and evaluates the module at `spec`, registering it under its
/// registry name for the duration of the evaluation and keeping it there on
/// success.
pub fn load_module(engine: &Engine, registry: &SharedRegistry, spec: ModuleSpec) -> Result<Rc<Module>> {
    let loaded = LoadedModule::load(engine, spec)?;
    let name = loaded.spec.name.clone();

    let partial = Module::eval_ast_as_new(Scope::new(), &loaded.ast.clone_functions_only(), engine)
        .map_err(KadetError::from_script_error)?;
    registry.borrow_mut().register(name.clone(), partial);

    match Module::eval_ast_as_new(Scope::new(), &loaded.ast, engine) {
        Ok(module) => {
            debug!("Loaded module {} from {}", name, loaded.spec.origin.display());
            Ok(registry.borrow_mut().complete(name, module))
        }
        Err(e) => {
            registry.borrow_mut().remove(&name);
            Err(KadetError::from_script_error(e))
        }
    }
}

/// Loads `module_name` from the first search root containing it.
pub fn load_from_search_paths(
    engine: &Engine,
    registry: &SharedRegistry,
    module_name: &str,
    search_paths: &[PathBuf],
) -> Result<Rc<Module>> {
    let spec = resolver::find_in_search_paths(module_name, search_paths)?;
    load_module(engine, registry, spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::registry::ModuleRegistry;
    use std::fs;
    use tempfile::TempDir;

    fn engine_with(registry: &SharedRegistry, hooks: &ImportHooks) -> Engine {
        let mut engine = Engine::new();
        engine.set_module_resolver(ComponentResolver::new(registry.clone(), hooks.clone()));
        engine
    }

    fn write_utils(dir: &Path) {
        fs::write(dir.join("utils.rhai"), "fn double(x) { x * 2 }").unwrap();
    }

    #[test]
    fn test_guard_removes_hook() {
        let hooks = ImportHooks::new();
        assert!(!hooks.is_active());
        {
            let _guard = hooks.install(vec![PathBuf::from("/tmp")]);
            assert!(hooks.is_active());
        }
        assert!(!hooks.is_active());
    }

    #[test]
    fn test_nested_guards_are_independent() {
        let hooks = ImportHooks::new();
        let outer = hooks.install(vec![PathBuf::from("/a")]);
        let inner = hooks.install(vec![PathBuf::from("/b")]);
        drop(outer);
        assert!(hooks.is_active());
        drop(inner);
        assert!(!hooks.is_active());
    }

    #[test]
    fn test_import_requires_active_hook() {
        let temp = TempDir::new().unwrap();
        write_utils(temp.path());

        let registry = ModuleRegistry::shared();
        let hooks = ImportHooks::new();
        let engine = engine_with(&registry, &hooks);

        let result = engine.eval::<i64>(r#"import "utils" as u; u::double(21)"#);
        assert!(result.is_err());

        let _guard = hooks.install(vec![temp.path().to_path_buf()]);
        let value = engine
            .eval::<i64>(r#"import "utils" as u; u::double(21)"#)
            .unwrap();
        assert_eq!(value, 42);
        assert!(registry.borrow().contains("kadet_component_utils"));
    }

    #[test]
    fn test_import_paths_are_searched_in_roots() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("lib");
        fs::create_dir_all(&root).unwrap();
        write_utils(&root);

        let finder = SearchPathFinder::new(vec![root.clone()]);
        for name in ["utils", "utils.rhai", "./utils"] {
            let spec = finder.find_spec(name).unwrap();
            assert_eq!(spec.module_name, "utils", "{name}");
            assert!(spec.origin.starts_with(&root), "{name}");
        }

        let registry = ModuleRegistry::shared();
        let hooks = ImportHooks::new();
        let engine = engine_with(&registry, &hooks);
        let _guard = hooks.install(vec![root]);
        let value = engine
            .eval::<i64>(r#"import "./utils" as u; u::double(5)"#)
            .unwrap();
        assert_eq!(value, 10);
    }

    #[test]
    fn test_registered_module_resolves_without_hook() {
        let temp = TempDir::new().unwrap();
        write_utils(temp.path());

        let registry = ModuleRegistry::shared();
        let hooks = ImportHooks::new();
        let engine = engine_with(&registry, &hooks);

        load_from_search_paths(&engine, &registry, "utils", &[temp.path().to_path_buf()]).unwrap();

        let value = engine
            .eval::<i64>(r#"import "utils" as u; u::double(4)"#)
            .unwrap();
        assert_eq!(value, 8);
    }

    #[test]
    fn test_failed_module_is_unregistered() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("bad.rhai"), r#"throw "boom";"#).unwrap();

        let registry = ModuleRegistry::shared();
        let hooks = ImportHooks::new();
        let engine = engine_with(&registry, &hooks);

        let result = load_from_search_paths(&engine, &registry, "bad", &[temp.path().to_path_buf()]);
        assert!(result.is_err());
        assert!(!registry.borrow().contains("kadet_component_bad"));
    }

    #[test]
    fn test_missing_module() {
        let registry = ModuleRegistry::shared();
        let engine = engine_with(&registry, &ImportHooks::new());

        let result = load_from_search_paths(&engine, &registry, "absent", &[]);
        assert!(matches!(result, Err(KadetError::ModuleNotFound(_))));
    }
}
