use crate::error::Result;
use crate::inventory::InventoryProvider;
use crate::runtime::task::KadetTask;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// State visible to component code during one compile: the search roots and
/// the inventory accessors for the compile's target.
pub struct RuntimeContext {
    search_paths: Vec<PathBuf>,
    provider: Arc<dyn InventoryProvider>,
    target_name: Option<String>,
    inventory_path: Option<PathBuf>,
}

impl RuntimeContext {
    pub fn new(
        search_paths: Vec<PathBuf>,
        provider: Arc<dyn InventoryProvider>,
        target_name: Option<String>,
        inventory_path: Option<PathBuf>,
    ) -> Self {
        Self {
            search_paths,
            provider,
            target_name,
            inventory_path,
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn inventory(&self) -> Result<Value> {
        Ok(self.provider.inventory(
            &self.search_paths,
            self.target_name.as_deref(),
            self.inventory_path.as_deref(),
        )?)
    }

    pub fn inventory_global(&self) -> Result<Value> {
        Ok(self
            .provider
            .inventory(&self.search_paths, None, self.inventory_path.as_deref())?)
    }

    /// A fresh task bound to this compile's identity.
    pub fn task(&self) -> KadetTask {
        KadetTask::new(
            self.target_name.clone(),
            self.search_paths.clone(),
            self.inventory_path.clone(),
            self.provider.clone(),
        )
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("search_paths", &self.search_paths)
            .field("target_name", &self.target_name)
            .field("inventory_path", &self.inventory_path)
            .finish()
    }
}
