//! Builder objects: a mutable `root` populated through two construction hooks

use crate::error::{KadetError, Result};
use crate::output::{normalize, to_dynamic};
use rhai::{Dynamic, Map};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

pub const DEFAULT_KIND: &str = "BaseObj";

const DEFAULT_NEED_MESSAGE: &str = "key and value needed";

/// Construction hooks of a builder kind.
///
/// `new` declares and validates required kwargs, `body` populates `root`.
/// Both run exactly once, in that order, from [`BaseObj::build`].
pub trait ObjectHooks {
    fn kind(&self) -> &str {
        DEFAULT_KIND
    }

    fn new(&self, _obj: &BaseObj) -> Result<()> {
        Ok(())
    }

    fn body(&self, _obj: &BaseObj) -> Result<()> {
        Ok(())
    }
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ObjectHooks for NoHooks {}

#[derive(Debug, Clone, Default)]
struct ObjState {
    kind: String,
    kwargs: Map,
    root: Map,
}

/// Handle to a builder object.
///
/// Clones share state, so hooks and scripts holding a copy mutate the same
/// `root`. `root` is a Rhai object map, which is ordered by key: output
/// items and mapping keys come out sorted, not in insertion order.
#[derive(Clone)]
pub struct BaseObj(Rc<RefCell<ObjState>>);

impl BaseObj {
    fn empty(kind: &str, kwargs: Map) -> Self {
        BaseObj(Rc::new(RefCell::new(ObjState {
            kind: kind.to_string(),
            kwargs,
            root: Map::new(),
        })))
    }

    /// Runs the fixed construction sequence: empty root, kwargs snapshot,
    /// `new`, then `body`.
    pub fn build(hooks: &dyn ObjectHooks, kwargs: Map) -> Result<Self> {
        let obj = Self::empty(hooks.kind(), kwargs);
        hooks.new(&obj)?;
        hooks.body(&obj)?;
        Ok(obj)
    }

    pub fn new() -> Self {
        Self::empty(DEFAULT_KIND, Map::new())
    }

    pub fn with_kwargs(kwargs: Map) -> Self {
        Self::empty(DEFAULT_KIND, kwargs)
    }

    /// Default instance whose root is replaced by `root`. No hooks run.
    pub fn from_dict(root: Map) -> Self {
        let obj = Self::new();
        obj.set_root(root);
        obj
    }

    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = script_map(read_json(path)?, path)?;
        Ok(Self::from_dict(root))
    }

    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let root = script_map(read_yaml(path)?, path)?;
        Ok(Self::from_dict(root))
    }

    /// Merges a YAML or JSON file into `root`. Top-level keys of the file
    /// overwrite existing ones; nested values are not merged.
    pub fn update_root(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => read_yaml(path)?,
            Some("json") => read_json(path)?,
            _ => {
                return Err(KadetError::Compile(format!(
                    "file extension for {} not yaml or json",
                    path.display()
                )))
            }
        };

        let incoming = script_map(content, path)?;
        self.0.borrow_mut().root.extend(incoming);
        Ok(())
    }

    /// Fails unless `key` was passed as a kwarg. The value itself is not
    /// inspected.
    pub fn need(&self, key: &str, msg: Option<&str>) -> Result<()> {
        let state = self.0.borrow();
        if state.kwargs.contains_key(key) {
            return Ok(());
        }
        Err(KadetError::Compile(format!(
            "{}: \"{}\": {}",
            state.kind,
            key,
            msg.unwrap_or(DEFAULT_NEED_MESSAGE)
        )))
    }

    pub fn kind(&self) -> String {
        self.0.borrow().kind.clone()
    }

    pub fn kwargs(&self) -> Map {
        self.0.borrow().kwargs.clone()
    }

    pub fn kwarg(&self, key: &str) -> Option<Dynamic> {
        self.0.borrow().kwargs.get(key).cloned()
    }

    pub fn root(&self) -> Map {
        self.0.borrow().root.clone()
    }

    pub fn set_root(&self, root: Map) {
        self.0.borrow_mut().root = root;
    }

    pub fn get(&self, key: &str) -> Option<Dynamic> {
        self.0.borrow().root.get(key).cloned()
    }

    pub fn set(&self, key: &str, value: impl Into<Dynamic>) {
        self.0.borrow_mut().root.insert(key.into(), value.into());
    }

    /// The normalized `root`.
    pub fn to_dict(&self) -> Result<Value> {
        Ok(normalize(&Dynamic::from(self.clone()))?)
    }

    pub fn ptr_eq(&self, other: &BaseObj) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for BaseObj {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BaseObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.borrow();
        f.debug_struct("BaseObj")
            .field("kind", &state.kind)
            .field("kwargs", &state.kwargs.keys().collect::<Vec<_>>())
            .field("root", &state.root.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| KadetError::io(path.display(), e))
}

fn read_json(path: &Path) -> Result<Value> {
    serde_json::from_str(&read_to_string(path)?)
        .map_err(|e| KadetError::Compile(format!("invalid JSON in {}: {e}", path.display())))
}

fn read_yaml(path: &Path) -> Result<Value> {
    serde_yaml::from_str(&read_to_string(path)?)
        .map_err(|e| KadetError::Compile(format!("invalid YAML in {}: {e}", path.display())))
}

fn script_map(content: Value, path: &Path) -> Result<Map> {
    match content {
        Value::Null => Ok(Map::new()),
        Value::Object(_) => {
            let value = to_dynamic(&content)?;
            value.try_cast::<Map>().ok_or_else(|| {
                KadetError::Compile(format!("{} does not contain a mapping", path.display()))
            })
        }
        _ => Err(KadetError::Compile(format!(
            "{} does not contain a mapping",
            path.display()
        ))),
    }
}
