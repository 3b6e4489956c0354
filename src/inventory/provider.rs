//! Inventory sources consumed by component compiles.

use crate::inventory::InventoryError;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_INVENTORY_PATH: &str = "inventory";

const TARGETS_DIR: &str = "targets";
const TARGET_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// Supplies hierarchical configuration data.
///
/// `target_name = None` requests the global view: every target keyed by name.
pub trait InventoryProvider: Send + Sync {
    fn inventory(
        &self,
        search_paths: &[PathBuf],
        target_name: Option<&str>,
        inventory_path: Option<&Path>,
    ) -> Result<Value, InventoryError>;
}

/// Reads `<inventory>/targets/<target>.{yml,yaml,json}` files.
#[derive(Debug, Clone, Default)]
pub struct FileInventory;

impl FileInventory {
    pub fn new() -> Self {
        Self
    }

    /// Finds the inventory directory: the path itself when it exists, otherwise
    /// the first search root that contains it.
    pub fn locate(
        &self,
        search_paths: &[PathBuf],
        inventory_path: Option<&Path>,
    ) -> Result<PathBuf, InventoryError> {
        let path = inventory_path.unwrap_or_else(|| Path::new(DEFAULT_INVENTORY_PATH));

        if path.is_dir() {
            return Ok(path.to_path_buf());
        }

        if !path.is_absolute() {
            for root in search_paths {
                let candidate = root.join(path);
                if candidate.is_dir() {
                    return Ok(candidate);
                }
            }
        }

        Err(InventoryError::PathNotFound {
            path: path.display().to_string(),
        })
    }

    fn target_files(&self, targets_dir: &Path) -> Result<Vec<(String, PathBuf)>, InventoryError> {
        let entries = fs::read_dir(targets_dir).map_err(|e| InventoryError::Io {
            path: targets_dir.display().to_string(),
            error: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_target = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| TARGET_EXTENSIONS.contains(&ext));
            if !is_target || !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        files.sort();
        Ok(files)
    }

    fn load_target(&self, path: &Path, target: &str) -> Result<Value, InventoryError> {
        let content = fs::read_to_string(path).map_err(|e| InventoryError::Io {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let value: Value = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content).map_err(|e| InventoryError::InvalidJson {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| InventoryError::InvalidYaml {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };

        match value {
            Value::Object(_) => Ok(value),
            Value::Null => Ok(Value::Object(Map::new())),
            _ => Err(InventoryError::NotAMapping {
                target: target.to_string(),
            }),
        }
    }
}

impl InventoryProvider for FileInventory {
    fn inventory(
        &self,
        search_paths: &[PathBuf],
        target_name: Option<&str>,
        inventory_path: Option<&Path>,
    ) -> Result<Value, InventoryError> {
        let targets_dir = self.locate(search_paths, inventory_path)?.join(TARGETS_DIR);

        match target_name {
            Some(target) => {
                for ext in TARGET_EXTENSIONS {
                    let path = targets_dir.join(format!("{target}.{ext}"));
                    if path.is_file() {
                        debug!("Loading inventory for {} from {}", target, path.display());
                        return self.load_target(&path, target);
                    }
                }
                Err(InventoryError::TargetNotFound {
                    target: target.to_string(),
                })
            }
            None => {
                let mut all = Map::new();
                for (name, path) in self.target_files(&targets_dir)? {
                    let value = self.load_target(&path, &name)?;
                    all.insert(name, value);
                }
                debug!(
                    "Loaded global inventory with {} targets from {}",
                    all.len(),
                    targets_dir.display()
                );
                Ok(Value::Object(all))
            }
        }
    }
}

/// In-memory inventory keyed by target name.
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    targets: Map<String, Value>,
}

impl StaticInventory {
    pub fn new(targets: Map<String, Value>) -> Self {
        Self { targets }
    }

    pub fn with_target(mut self, name: impl Into<String>, inventory: Value) -> Self {
        self.targets.insert(name.into(), inventory);
        self
    }
}

impl InventoryProvider for StaticInventory {
    fn inventory(
        &self,
        _search_paths: &[PathBuf],
        target_name: Option<&str>,
        _inventory_path: Option<&Path>,
    ) -> Result<Value, InventoryError> {
        match target_name {
            Some(target) => {
                self.targets
                    .get(target)
                    .cloned()
                    .ok_or_else(|| InventoryError::TargetNotFound {
                        target: target.to_string(),
                    })
            }
            None => Ok(Value::Object(self.targets.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_target(dir: &Path, file: &str, content: &str) {
        let targets = dir.join("inventory").join(TARGETS_DIR);
        fs::create_dir_all(&targets).unwrap();
        fs::write(targets.join(file), content).unwrap();
    }

    #[test]
    fn test_target_scoped_inventory() {
        let temp = TempDir::new().unwrap();
        write_target(
            temp.path(),
            "minikube.yml",
            "parameters:\n  kapitan:\n    vars:\n      target: minikube\n",
        );

        let inventory = FileInventory::new()
            .inventory(&[temp.path().to_path_buf()], Some("minikube"), None)
            .unwrap();

        assert_eq!(inventory["parameters"]["kapitan"]["vars"]["target"], "minikube");
    }

    #[test]
    fn test_global_inventory_collects_all_targets() {
        let temp = TempDir::new().unwrap();
        write_target(temp.path(), "dev.yml", "parameters: {env: dev}\n");
        write_target(temp.path(), "prod.json", r#"{"parameters": {"env": "prod"}}"#);
        write_target(temp.path(), "notes.txt", "ignored");

        let inventory = FileInventory::new()
            .inventory(&[temp.path().to_path_buf()], None, None)
            .unwrap();

        assert_eq!(
            inventory,
            json!({
                "dev": {"parameters": {"env": "dev"}},
                "prod": {"parameters": {"env": "prod"}}
            })
        );
    }

    #[test]
    fn test_missing_target() {
        let temp = TempDir::new().unwrap();
        write_target(temp.path(), "dev.yml", "parameters: {}\n");

        let result = FileInventory::new().inventory(&[temp.path().to_path_buf()], Some("qa"), None);
        assert!(matches!(result, Err(InventoryError::TargetNotFound { target }) if target == "qa"));
    }

    #[test]
    fn test_explicit_inventory_path() {
        let temp = TempDir::new().unwrap();
        write_target(temp.path(), "dev.yml", "parameters: {env: dev}\n");
        let inventory_path = temp.path().join("inventory");

        let inventory = FileInventory::new()
            .inventory(&[], Some("dev"), Some(&inventory_path))
            .unwrap();
        assert_eq!(inventory["parameters"]["env"], "dev");
    }

    #[test]
    fn test_static_inventory() {
        let provider = StaticInventory::default()
            .with_target("dev", json!({"parameters": {"replicas": 1}}));

        let dev = provider.inventory(&[], Some("dev"), None).unwrap();
        assert_eq!(dev["parameters"]["replicas"], 1);

        let global = provider.inventory(&[], None, None).unwrap();
        assert!(global.get("dev").is_some());
    }
}
