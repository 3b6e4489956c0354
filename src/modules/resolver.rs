use crate::modules::error::ModuleError;
use rhai::{Engine, AST};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Extension of component script files.
pub const MODULE_EXTENSION: &str = "rhai";

/// Entry file of a directory component.
pub const PACKAGE_ENTRY: &str = "mod.rhai";

const REGISTRY_PREFIX: &str = "kadet_component_";

/// A located component module: its derived name, registry name and entry file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub module_name: String,
    pub name: String,
    pub origin: PathBuf,
}

impl ModuleSpec {
    fn new(module_name: String, origin: PathBuf) -> Self {
        Self {
            name: Self::registry_name(&module_name),
            module_name,
            origin,
        }
    }

    /// Unique name a module is registered under: `kadet_component_<name>`.
    pub fn registry_name(module_name: &str) -> String {
        format!("{REGISTRY_PREFIX}{module_name}")
    }
}

/// Locates the module at `path` without searching.
///
/// A directory is a package named after its basename whose entry is
/// `mod.rhai`; a file is named after its stem. A path with no extension that
/// is not a directory is tried as `<path>.rhai`. When `check_name` is given
/// the derived name must equal it.
pub fn module_from_path(path: &Path, check_name: Option<&str>) -> Result<ModuleSpec, ModuleError> {
    let not_found = || ModuleError::NotFound {
        path: path.display().to_string(),
    };

    let (module_name, origin) = if path.is_dir() {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(not_found)?;
        (name.to_string(), path.join(PACKAGE_ENTRY))
    } else {
        let origin = if path.extension().is_none() {
            path.with_extension(MODULE_EXTENSION)
        } else {
            path.to_path_buf()
        };
        let name = origin
            .file_stem()
            .and_then(|n| n.to_str())
            .ok_or_else(not_found)?;
        (name.to_string(), origin)
    };

    if !origin.is_file() {
        return Err(not_found());
    }

    if let Some(check_name) = check_name {
        if check_name != module_name {
            return Err(ModuleError::NameMismatch {
                module_name,
                check_name: check_name.to_string(),
            });
        }
    }

    Ok(ModuleSpec::new(module_name, origin))
}

/// Tries `root/<module_name>` for every root in order; the first match wins.
pub fn find_in_search_paths(
    module_name: &str,
    search_paths: &[PathBuf],
) -> Result<ModuleSpec, ModuleError> {
    let check_name = Path::new(module_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(module_name);

    for root in search_paths {
        let candidate = root.join(module_name);
        match module_from_path(&candidate, Some(check_name)) {
            Ok(spec) => {
                debug!(
                    "Resolved module {} from {}",
                    module_name,
                    spec.origin.display()
                );
                return Ok(spec);
            }
            Err(e) => trace!("Skipping {}: {}", root.display(), e),
        }
    }

    Err(ModuleError::NotInSearchPaths {
        name: module_name.to_string(),
        searched: search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    })
}

/// Resolves either a direct path or a bare module name.
///
/// Absolute paths, paths with an extension and explicitly relative paths
/// (`./x`, `../x`) are loaded directly; anything else is searched for.
pub fn resolve(name_or_path: &str, search_paths: &[PathBuf]) -> Result<ModuleSpec, ModuleError> {
    let path = Path::new(name_or_path);
    if is_direct_path(path) {
        module_from_path(path, None)
    } else {
        find_in_search_paths(name_or_path, search_paths)
    }
}

fn is_direct_path(path: &Path) -> bool {
    path.is_absolute()
        || path.extension().is_some()
        || path.starts_with(".")
        || path.starts_with("..")
}

/// A module whose script has been compiled but not yet executed.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub spec: ModuleSpec,
    pub ast: AST,
}

impl LoadedModule {
    pub fn load(engine: &Engine, spec: ModuleSpec) -> Result<Self, ModuleError> {
        let ast = engine
            .compile_file(spec.origin.clone())
            .map_err(|e| ModuleError::Parse {
                name: spec.name.clone(),
                error: e.to_string(),
            })?;
        Ok(Self { spec, ast })
    }

    /// Parameter counts of every script function called `name`.
    pub fn arities(&self, name: &str) -> Vec<usize> {
        self.ast
            .iter_functions()
            .filter(|f| f.name == name)
            .map(|f| f.params.len())
            .collect()
    }
}
