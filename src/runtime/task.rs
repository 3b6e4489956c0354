//! Task components: identity of one compile plus memoised inventory views

use crate::error::{KadetError, Result};
use crate::inventory::InventoryProvider;
use globset::GlobBuilder;
use once_cell::unsync::OnceCell;
use rhai::{Dynamic, Map};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::debug;
use walkdir::WalkDir;

/// Entry point of a task component.
pub trait Task {
    /// Produces the output tree for `input_params`.
    fn run(&self, _input_params: Map) -> Result<Dynamic> {
        Err(KadetError::NotImplemented(
            "task did not override run".to_string(),
        ))
    }
}

/// Base task: target identity and lazily loaded inventory.
///
/// Each inventory view is fetched from the provider at most once per
/// instance.
pub struct KadetTask {
    target_name: Option<String>,
    search_paths: Vec<PathBuf>,
    inventory_path: Option<PathBuf>,
    provider: Arc<dyn InventoryProvider>,
    inventory: OnceCell<Value>,
    inventory_global: OnceCell<Value>,
}

impl KadetTask {
    pub fn new(
        target_name: Option<String>,
        search_paths: Vec<PathBuf>,
        inventory_path: Option<PathBuf>,
        provider: Arc<dyn InventoryProvider>,
    ) -> Self {
        Self {
            target_name,
            search_paths,
            inventory_path,
            provider,
            inventory: OnceCell::new(),
            inventory_global: OnceCell::new(),
        }
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn inventory_path(&self) -> Option<&Path> {
        self.inventory_path.as_deref()
    }

    /// Target-scoped inventory.
    pub fn inventory(&self) -> Result<&Value> {
        self.inventory.get_or_try_init(|| {
            debug!("Loading inventory for target {:?}", self.target_name);
            self.load(self.target_name.as_deref())
        })
    }

    /// Inventory of every target, keyed by target name.
    pub fn inventory_global(&self) -> Result<&Value> {
        self.inventory_global.get_or_try_init(|| {
            debug!("Loading global inventory");
            self.load(None)
        })
    }

    fn load(&self, target_name: Option<&str>) -> Result<Value> {
        Ok(self.provider.inventory(
            &self.search_paths,
            target_name,
            self.inventory_path.as_deref(),
        )?)
    }

    /// `inventory["parameters"]`
    pub fn params(&self) -> Result<&Value> {
        lookup(self.inventory()?, &["parameters"])
    }

    /// `inventory["parameters"]["kapitan"]["vars"]["target"]`
    pub fn target(&self) -> Result<&Value> {
        lookup(
            self.inventory()?,
            &["parameters", "kapitan", "vars", "target"],
        )
    }

    /// Absolute paths matching `pattern` under any search root.
    pub fn find_in_search_path(&self, pattern: &str) -> Result<HashSet<PathBuf>> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| KadetError::Configuration(format!("invalid glob {pattern}: {e}")))?
            .compile_matcher();

        let max_depth = if pattern.contains("**") {
            usize::MAX
        } else {
            Path::new(pattern)
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        };

        let mut found = HashSet::new();
        for root in &self.search_paths {
            for entry in WalkDir::new(root)
                .min_depth(1)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let Ok(relative) = entry.path().strip_prefix(root) else {
                    continue;
                };
                if matcher.is_match(relative) {
                    let absolute = std::path::absolute(entry.path())
                        .map_err(|e| KadetError::io(entry.path().display(), e))?;
                    found.insert(absolute);
                }
            }
        }

        debug!("{} matched {} paths", pattern, found.len());
        Ok(found)
    }
}

impl Task for KadetTask {}

impl fmt::Debug for KadetTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KadetTask")
            .field("target_name", &self.target_name)
            .field("search_paths", &self.search_paths)
            .field("inventory_path", &self.inventory_path)
            .field("inventory_loaded", &self.inventory.get().is_some())
            .field("inventory_global_loaded", &self.inventory_global.get().is_some())
            .finish()
    }
}

fn lookup<'a>(value: &'a Value, keys: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for (depth, key) in keys.iter().enumerate() {
        current = current
            .get(key)
            .ok_or_else(|| KadetError::Lookup(keys[..=depth].join(".")))?;
    }
    Ok(current)
}

/// Script-side handle bound to `this` inside a task's `run`.
#[derive(Debug, Clone)]
pub struct TaskHandle(Rc<KadetTask>);

impl TaskHandle {
    pub fn new(task: Rc<KadetTask>) -> Self {
        Self(task)
    }

    pub fn task(&self) -> &KadetTask {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::{InventoryError, StaticInventory};
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct CountingInventory {
        calls: AtomicUsize,
        inner: StaticInventory,
    }

    impl InventoryProvider for CountingInventory {
        fn inventory(
            &self,
            search_paths: &[PathBuf],
            target_name: Option<&str>,
            inventory_path: Option<&Path>,
        ) -> std::result::Result<Value, InventoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.inventory(search_paths, target_name, inventory_path)
        }
    }

    fn minikube() -> StaticInventory {
        StaticInventory::default().with_target(
            "minikube",
            json!({"parameters": {"kapitan": {"vars": {"target": "minikube"}}, "replicas": 2}}),
        )
    }

    fn task_with(provider: Arc<dyn InventoryProvider>, target: Option<&str>) -> KadetTask {
        KadetTask::new(target.map(String::from), Vec::new(), None, provider)
    }

    #[test]
    fn test_inventory_is_loaded_once() {
        let provider = Arc::new(CountingInventory {
            calls: AtomicUsize::new(0),
            inner: minikube(),
        });
        let task = task_with(provider.clone(), Some("minikube"));

        task.inventory().unwrap();
        task.params().unwrap();
        task.target().unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        task.inventory_global().unwrap();
        task.inventory_global().unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_params_and_target() {
        let task = task_with(Arc::new(minikube()), Some("minikube"));
        assert_eq!(task.params().unwrap()["replicas"], 2);
        assert_eq!(task.target().unwrap(), &json!("minikube"));
    }

    #[test]
    fn test_missing_keys_are_lookup_errors() {
        let provider = StaticInventory::default().with_target("bare", json!({"parameters": {}}));
        let task = task_with(Arc::new(provider), Some("bare"));

        assert!(task.params().is_ok());
        assert!(matches!(
            task.target(),
            Err(KadetError::Lookup(path)) if path == "parameters.kapitan"
        ));
    }

    #[test]
    fn test_base_run_is_not_implemented() {
        let task = task_with(Arc::new(minikube()), None);
        assert!(matches!(
            task.run(Map::new()),
            Err(KadetError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_find_in_search_path_unions_roots() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for root in [first.path(), second.path()] {
            fs::create_dir_all(root.join("templates")).unwrap();
            fs::write(root.join("templates/app.yml"), "").unwrap();
        }
        fs::write(second.path().join("templates/extra.yml"), "").unwrap();
        fs::write(second.path().join("templates/notes.txt"), "").unwrap();

        let task = KadetTask::new(
            None,
            vec![first.path().to_path_buf(), second.path().to_path_buf(), first.path().to_path_buf()],
            None,
            Arc::new(StaticInventory::default()),
        );

        let found = task.find_in_search_path("templates/*.yml").unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|p| p.is_absolute()));
        assert!(found.contains(&second.path().join("templates/extra.yml")));
    }

    #[test]
    fn test_find_in_search_path_recursive() {
        let root = TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("a/b/c")).unwrap();
        fs::write(root.path().join("a/b/c/deep.json"), "{}").unwrap();

        let task = KadetTask::new(
            None,
            vec![root.path().to_path_buf()],
            None,
            Arc::new(StaticInventory::default()),
        );

        assert!(task.find_in_search_path("*.json").unwrap().is_empty());
        assert_eq!(task.find_in_search_path("**/*.json").unwrap().len(), 1);
    }
}
