//! Compile orchestration: load a component, run its entry point, write its
//! output items

use crate::error::{KadetError, Result};
use crate::inventory::{FileInventory, InventoryProvider};
use crate::modules::{self, ImportHooks, ModuleRegistry};
use crate::output::{normalize, prune_empty, to_script_map, CompiledFile, FileWriter, WriteOptions};
use crate::runtime::{
    build_engine, ComponentScript, EntryPoint, RuntimeContext, ScriptTask, Task, TaskHandle,
};
use crate::types::{CompileConfig, OutputType};
use rhai::Dynamic;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// Input parameter carrying the destination directory of the compile.
pub const COMPILE_PATH_PARAM: &str = "compile_path";

/// Result of a successful compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    /// Files written, in output item order.
    Written(Vec<PathBuf>),
    /// The component produced nothing to write.
    NoOutput,
}

impl CompileOutcome {
    pub fn files(&self) -> &[PathBuf] {
        match self {
            CompileOutcome::Written(files) => files,
            CompileOutcome::NoOutput => &[],
        }
    }
}

/// Compiles components against a fixed set of search roots and an
/// inventory provider.
pub struct Kadet {
    search_paths: Vec<PathBuf>,
    provider: Arc<dyn InventoryProvider>,
    input_params: Map<String, Value>,
}

impl Kadet {
    pub fn new(search_paths: Vec<PathBuf>, provider: Arc<dyn InventoryProvider>) -> Self {
        Self {
            search_paths,
            provider,
            input_params: Map::new(),
        }
    }

    /// Compiler reading inventory from files.
    pub fn with_file_inventory(search_paths: Vec<PathBuf>) -> Self {
        Self::new(search_paths, Arc::new(FileInventory::new()))
    }

    pub fn default_output_type() -> &'static str {
        "yaml"
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Parameters for the next compile only. They are cleared when it starts.
    pub fn set_input_params(&mut self, input_params: Map<String, Value>) {
        self.input_params = input_params;
    }

    fn take_input_params(&mut self, output_path: &Path) -> Map<String, Value> {
        let mut input_params = std::mem::take(&mut self.input_params);
        input_params.insert(
            COMPILE_PATH_PARAM.to_string(),
            Value::String(output_path.display().to_string()),
        );
        input_params
    }

    /// Runtime context for a compile of `config`.
    pub fn context(&self, config: &CompileConfig) -> RuntimeContext {
        RuntimeContext::new(
            self.search_paths.clone(),
            self.provider.clone(),
            config.target_name.clone(),
            config.inventory_path.clone(),
        )
    }

    /// Compiles the component at `component` (a path, or a module name found
    /// in the search roots) into `output_path`.
    pub fn compile_file(
        &mut self,
        component: &Path,
        output_path: &Path,
        config: &CompileConfig,
    ) -> Result<CompileOutcome> {
        let input_params = self.take_input_params(output_path);
        let script_params = to_script_map(&input_params)?;

        let context = Rc::new(self.context(config));
        let registry = ModuleRegistry::shared();
        let hooks = ImportHooks::new();
        let engine = build_engine(context.clone(), registry.clone(), hooks.clone());

        let spec = modules::resolve(&component.to_string_lossy(), &self.search_paths)?;
        info!(
            "Compiling {} to {}",
            spec.origin.display(),
            output_path.display()
        );

        let raw = {
            let _hook = hooks.install(self.search_paths.clone());
            let script = ComponentScript::load(&engine, registry, spec)?;

            match script.entry_point()? {
                EntryPoint::Task => {
                    let task = ScriptTask::new(&script, TaskHandle::new(Rc::new(context.task())));
                    task.run(script_params)?
                }
                EntryPoint::Main { takes_params } => script.call_main(takes_params, script_params)?,
            }
        };

        self.write_output(&raw, component, output_path, config)
    }

    /// Runs a native task through the same normalize, prune and write steps
    /// as a scripted component.
    pub fn compile_task(
        &mut self,
        task: &dyn Task,
        output_path: &Path,
        config: &CompileConfig,
    ) -> Result<CompileOutcome> {
        let input_params = self.take_input_params(output_path);
        let raw = task.run(to_script_map(&input_params)?)?;
        self.write_output(&raw, Path::new("<task>"), output_path, config)
    }

    /// Normalizes `raw` and writes one file per top-level key.
    pub fn write_output(
        &self,
        raw: &Dynamic,
        component: &Path,
        output_path: &Path,
        config: &CompileConfig,
    ) -> Result<CompileOutcome> {
        let mut tree = normalize(raw)?;
        if config.prune {
            debug!("Pruning output of {}", component.display());
            tree = prune_empty(&tree).unwrap_or(Value::Null);
        }

        let items = match tree {
            Value::Null => None,
            Value::Object(items) if items.is_empty() => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(items) => Some(items),
            other => {
                return Err(KadetError::Compile(format!(
                    "{}: output must be a mapping of item name to content, got {}",
                    component.display(),
                    type_name(&other)
                )))
            }
        };

        let Some(items) = items else {
            info!("{}: no output", component.display());
            return Ok(CompileOutcome::NoOutput);
        };

        fs::create_dir_all(output_path).map_err(|e| KadetError::io(output_path.display(), e))?;

        let options = WriteOptions {
            indent: config.indent,
            reveal: config.reveal,
            target_name: config.target_name.clone(),
        };

        let mut written = Vec::with_capacity(items.len());
        for (item_key, item_value) in items {
            let output_type: OutputType = config.output.parse().map_err(|_| {
                KadetError::Configuration(format!(
                    "Output type defined in inventory for {} not supported: {}: {:?}",
                    component.display(),
                    config.output,
                    ["json", "yaml", "yml", "plain"]
                ))
            })?;

            let path = output_path.join(output_type.file_name(&item_key));
            let mut file = CompiledFile::create(&path, options.clone())?;
            match output_type {
                OutputType::Json => file.write_json(&item_value)?,
                OutputType::Yaml | OutputType::Yml => file.write_yaml(&item_value)?,
                OutputType::Plain => file.write_text(&item_value)?,
            }
            written.push(file.commit()?);
        }

        info!(
            "{}: wrote {} file(s) to {}",
            component.display(),
            written.len(),
            output_path.display()
        );
        Ok(CompileOutcome::Written(written))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::StaticInventory;
    use crate::runtime::BaseObj;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixed(Value);

    impl Task for Fixed {
        fn run(&self, _input_params: rhai::Map) -> Result<Dynamic> {
            Ok(crate::output::to_dynamic(&self.0)?)
        }
    }

    fn kadet() -> Kadet {
        Kadet::new(Vec::new(), Arc::new(StaticInventory::default()))
    }

    #[test]
    fn test_input_params_are_taken_and_reset() {
        let mut kadet = kadet();
        let mut params = Map::new();
        params.insert("replicas".into(), json!(3));
        kadet.set_input_params(params);

        let first = kadet.take_input_params(Path::new("/out"));
        assert_eq!(first["replicas"], 3);
        assert_eq!(first[COMPILE_PATH_PARAM], "/out");

        let second = kadet.take_input_params(Path::new("/out"));
        assert!(second.get("replicas").is_none());
    }

    #[test]
    fn test_compile_native_task() {
        let temp = TempDir::new().unwrap();
        let mut kadet = kadet();
        let config = CompileConfig {
            output: "json".into(),
            ..Default::default()
        };

        let outcome = kadet
            .compile_task(&Fixed(json!({"svc": {"port": 80}})), temp.path(), &config)
            .unwrap();
        assert_eq!(outcome.files(), &[temp.path().join("svc.json")]);
    }

    #[test]
    fn test_scalar_output_is_compile_error() {
        let temp = TempDir::new().unwrap();
        let result = kadet().write_output(
            &Dynamic::from(42_i64),
            Path::new("comp.rhai"),
            temp.path(),
            &CompileConfig::default(),
        );
        assert!(matches!(result, Err(KadetError::Compile(_))));
    }

    #[test]
    fn test_unknown_output_only_fails_with_items() {
        let temp = TempDir::new().unwrap();
        let config = CompileConfig {
            output: "toml".into(),
            ..Default::default()
        };

        let empty = kadet().write_output(
            &Dynamic::from_map(rhai::Map::new()),
            Path::new("comp.rhai"),
            temp.path(),
            &config,
        );
        assert_eq!(empty.unwrap(), CompileOutcome::NoOutput);

        let obj = BaseObj::new();
        obj.set("a", 1_i64);
        let result = kadet().write_output(
            &Dynamic::from(obj),
            Path::new("comp.rhai"),
            temp.path(),
            &config,
        );
        match result {
            Err(KadetError::Configuration(message)) => {
                assert!(message.contains("comp.rhai"));
                assert!(message.contains("toml"));
            }
            other => panic!("Expected Configuration error, got {other:?}"),
        }
    }

    #[test]
    fn test_base_task_is_not_implemented() {
        let temp = TempDir::new().unwrap();
        let task = kadet().context(&CompileConfig::default()).task();

        let result = kadet().compile_task(&task, temp.path(), &CompileConfig::default());
        assert!(matches!(result, Err(KadetError::NotImplemented(_))));
    }
}
