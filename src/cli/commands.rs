use crate::cli::options::CompileArgs;
use crate::compiler::{CompileOutcome, Kadet};
use crate::error::{KadetError, Result};
use crate::modules::{self, ModuleSpec};
use crate::types::CompileConfig;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Result of compiling one component.
#[derive(Debug, Clone)]
pub struct ComponentReport {
    pub component: PathBuf,
    pub outcome: Result<CompileOutcome>,
}

impl ComponentReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Reads a YAML or JSON file holding a mapping of input parameters.
pub fn load_input_params(path: &Path) -> Result<Map<String, Value>> {
    let content = fs::read_to_string(path).map_err(|e| KadetError::io(path.display(), e))?;

    let value: Value = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&content).map_err(|e| {
            KadetError::Configuration(format!("invalid input params {}: {e}", path.display()))
        })?
    } else {
        serde_yaml::from_str(&content).map_err(|e| {
            KadetError::Configuration(format!("invalid input params {}: {e}", path.display()))
        })?
    };

    match value {
        Value::Object(params) => Ok(params),
        Value::Null => Ok(Map::new()),
        _ => Err(KadetError::Configuration(format!(
            "input params in {} must be a mapping",
            path.display()
        ))),
    }
}

/// Compiles every component concurrently, each with its own isolated
/// compiler and script engine.
pub async fn compile_components(args: &CompileArgs) -> Result<Vec<ComponentReport>> {
    let input_params = match &args.input_params {
        Some(path) => load_input_params(path)?,
        None => Map::new(),
    };
    let config = CompileConfig::from(args);

    info!(
        "Compiling {} component(s) into {}",
        args.components.len(),
        args.output_path.display()
    );

    let handles = args.components.iter().cloned().map(|component| {
        let search_paths = args.search_paths.clone();
        let output_path = args.output_path.clone();
        let config = config.clone();
        let input_params = input_params.clone();

        tokio::task::spawn_blocking(move || {
            let mut kadet = Kadet::with_file_inventory(search_paths);
            kadet.set_input_params(input_params);
            let outcome = kadet.compile_file(&component, &output_path, &config);
            ComponentReport { component, outcome }
        })
    });

    join_all(handles)
        .await
        .into_iter()
        .map(|joined| {
            joined.map_err(|e| KadetError::Compile(format!("compile task failed: {e}")))
        })
        .collect()
}

pub fn resolve_component(name: &str, search_paths: &[PathBuf]) -> Result<ModuleSpec> {
    let spec = modules::resolve(name, search_paths)?;
    debug!("{} resolved to {}", name, spec.origin.display());
    Ok(spec)
}

pub fn print_compile_summary(reports: &[ComponentReport]) {
    for report in reports {
        match &report.outcome {
            Ok(CompileOutcome::Written(files)) => {
                println!("✅ {}", report.component.display());
                for file in files {
                    println!("    {}", file.display());
                }
            }
            Ok(CompileOutcome::NoOutput) => {
                println!("⚪ {}: no output", report.component.display());
            }
            Err(e) => {
                error!("{}: {}", report.component.display(), e);
                println!("❌ {}: {}", report.component.display(), e);
            }
        }
    }

    let failed = reports.iter().filter(|r| !r.is_success()).count();
    println!();
    println!(
        "📊 {} compiled, {} failed",
        reports.len() - failed,
        failed
    );
}
