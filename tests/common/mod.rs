//! Shared fixtures for integration tests

#![allow(dead_code)]

use kadet::{CompileConfig, Kadet};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// Isolated workspace holding components, inventory and compiled output
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl Default for TestEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnvironment {
    pub fn new() -> Self {
        let temp_dir = tempdir().expect("Failed to create temporary directory");
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root().join("compiled")
    }

    /// Writes `content` to `relative` under the workspace, creating parents.
    pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Writes `components/<name>.rhai`.
    pub fn component(&self, name: &str, source: &str) -> PathBuf {
        self.create_file(&format!("components/{name}.rhai"), source)
    }

    /// Writes `inventory/targets/<target>.yml`.
    pub fn target(&self, target: &str, yaml: &str) -> PathBuf {
        self.create_file(&format!("inventory/targets/{target}.yml"), yaml)
    }

    /// Compiler searching the workspace root, then `lib/`.
    pub fn kadet(&self) -> Kadet {
        Kadet::with_file_inventory(vec![self.root().to_path_buf(), self.root().join("lib")])
    }

    pub fn config(&self, output: &str) -> CompileConfig {
        CompileConfig {
            output: output.to_string(),
            ..Default::default()
        }
    }

    pub fn read_output(&self, file_name: &str) -> String {
        fs::read_to_string(self.output_dir().join(file_name)).expect("Missing output file")
    }

    pub fn read_yaml(&self, file_name: &str) -> Value {
        serde_yaml::from_str(&self.read_output(file_name)).expect("Invalid YAML output")
    }

    pub fn read_json(&self, file_name: &str) -> Value {
        serde_json::from_str(&self.read_output(file_name)).expect("Invalid JSON output")
    }

    pub fn output_files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.output_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}
