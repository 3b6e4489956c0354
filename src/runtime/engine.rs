//! Script engine construction and the component-facing API

use crate::error::{KadetError, Result};
use crate::modules::{ComponentResolver, ImportHooks, SharedRegistry};
use crate::output::to_dynamic;
use crate::runtime::context::RuntimeContext;
use crate::runtime::object::{BaseObj, ObjectHooks};
use crate::runtime::task::TaskHandle;
use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, ImmutableString, Map, NativeCallContext};
use serde_json::Value;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, info};

type ScriptResult<T> = std::result::Result<T, Box<EvalAltResult>>;

/// `new` is reserved in Rhai; scripts write the key quoted: `#{ "new": |obj| ... }`.
const NEW_HOOK: &str = "new";
const BODY_HOOK: &str = "body";

/// Builds the engine for one compile.
///
/// Imports resolve through `registry` and the active `hooks`; the context
/// functions (`inventory()`, `inventory_global()`, `search_paths()`) are bound
/// to `context`.
pub fn build_engine(
    context: Rc<RuntimeContext>,
    registry: SharedRegistry,
    hooks: ImportHooks,
) -> Engine {
    let mut engine = Engine::new();
    engine.set_module_resolver(ComponentResolver::new(registry, hooks));

    engine.on_print(|text| info!(target: "kadet::script", "{text}"));
    engine.on_debug(|text, source, pos| {
        debug!(target: "kadet::script", "{}{pos:?}: {text}", source.unwrap_or_default())
    });

    register_base_obj(&mut engine);
    register_task(&mut engine);
    register_context(&mut engine, context);

    engine
        .register_type_with_name::<KadetError>("KadetError")
        .register_fn("to_string", |err: &mut KadetError| err.to_string());

    engine
}

/// `new`/`body` closures supplied by a script for one builder kind, as in
/// `base_obj("Deployment", kwargs, #{ "new": |obj| obj.need("name"), body: |obj| ... })`.
pub struct ScriptHooks<'a, 'c> {
    context: &'a NativeCallContext<'c>,
    kind: String,
    new: Option<FnPtr>,
    body: Option<FnPtr>,
}

impl<'a, 'c> ScriptHooks<'a, 'c> {
    pub fn from_map(context: &'a NativeCallContext<'c>, kind: &str, hooks: &Map) -> Result<Self> {
        if let Some(unknown) = hooks
            .keys()
            .find(|k| k.as_str() != NEW_HOOK && k.as_str() != BODY_HOOK)
        {
            return Err(KadetError::Configuration(format!(
                "{kind}: unknown hook \"{unknown}\" (expected \"new\" or \"body\")"
            )));
        }

        let hook = |name: &str| -> Result<Option<FnPtr>> {
            match hooks.get(name) {
                None => Ok(None),
                Some(value) if value.is_unit() => Ok(None),
                Some(value) => {
                    let type_name = value.type_name();
                    value.clone().try_cast::<FnPtr>().map(Some).ok_or_else(|| {
                        KadetError::Configuration(format!(
                            "{kind}: hook \"{name}\" must be a function, got {type_name}"
                        ))
                    })
                }
            }
        };

        Ok(Self {
            context,
            kind: kind.to_string(),
            new: hook(NEW_HOOK)?,
            body: hook(BODY_HOOK)?,
        })
    }

    fn call(&self, hook: Option<&FnPtr>, obj: &BaseObj) -> Result<()> {
        if let Some(hook) = hook {
            hook.call_within_context::<Dynamic>(self.context, (obj.clone(),))
                .map_err(KadetError::from_script_error)?;
        }
        Ok(())
    }
}

impl ObjectHooks for ScriptHooks<'_, '_> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn new(&self, obj: &BaseObj) -> Result<()> {
        self.call(self.new.as_ref(), obj)
    }

    fn body(&self, obj: &BaseObj) -> Result<()> {
        self.call(self.body.as_ref(), obj)
    }
}

fn script_err(err: impl Into<KadetError>) -> Box<EvalAltResult> {
    err.into().into_script_error()
}

fn to_script(value: &Value) -> ScriptResult<Dynamic> {
    to_dynamic(value).map_err(script_err)
}

fn paths_to_array(paths: impl IntoIterator<Item = PathBuf>) -> Array {
    paths
        .into_iter()
        .map(|p| Dynamic::from(p.display().to_string()))
        .collect()
}

fn register_base_obj(engine: &mut Engine) {
    engine
        .register_type_with_name::<BaseObj>("BaseObj")
        .register_fn("base_obj", BaseObj::new)
        .register_fn("base_obj", BaseObj::with_kwargs)
        .register_fn(
            "base_obj",
            |ctx: NativeCallContext, kind: &str, kwargs: Map| -> ScriptResult<BaseObj> {
                let hooks = ScriptHooks::from_map(&ctx, kind, &Map::new()).map_err(script_err)?;
                BaseObj::build(&hooks, kwargs).map_err(script_err)
            },
        )
        .register_fn(
            "base_obj",
            |ctx: NativeCallContext, kind: &str, kwargs: Map, hooks: Map| -> ScriptResult<BaseObj> {
                let hooks = ScriptHooks::from_map(&ctx, kind, &hooks).map_err(script_err)?;
                BaseObj::build(&hooks, kwargs).map_err(script_err)
            },
        )
        .register_fn("base_obj_from_dict", BaseObj::from_dict)
        .register_fn("base_obj_from_json", |path: &str| {
            BaseObj::from_json(path).map_err(script_err)
        })
        .register_fn("base_obj_from_yaml", |path: &str| {
            BaseObj::from_yaml(path).map_err(script_err)
        })
        .register_fn("need", |obj: &mut BaseObj, key: &str| {
            obj.need(key, None).map_err(script_err)
        })
        .register_fn("need", |obj: &mut BaseObj, key: &str, msg: &str| {
            obj.need(key, Some(msg)).map_err(script_err)
        })
        .register_fn("update_root", |obj: &mut BaseObj, path: &str| {
            obj.update_root(path).map_err(script_err)
        })
        .register_fn("to_dict", |obj: &mut BaseObj| -> ScriptResult<Dynamic> {
            let value = obj.to_dict().map_err(script_err)?;
            to_script(&value)
        })
        .register_fn("to_string", |obj: &mut BaseObj| format!("{obj:?}"))
        .register_get_set(
            "root",
            |obj: &mut BaseObj| obj.root(),
            |obj: &mut BaseObj, root: Map| obj.set_root(root),
        )
        .register_get("kwargs", |obj: &mut BaseObj| obj.kwargs())
        .register_get("kind", |obj: &mut BaseObj| obj.kind())
        .register_indexer_get(
            |obj: &mut BaseObj, key: ImmutableString| -> ScriptResult<Dynamic> {
                obj.get(&key)
                    .ok_or_else(|| script_err(KadetError::Lookup(key.to_string())))
            },
        )
        .register_indexer_set(|obj: &mut BaseObj, key: ImmutableString, value: Dynamic| {
            obj.set(&key, value)
        });
}

fn task_view(view: Result<&Value>) -> ScriptResult<Dynamic> {
    to_script(view.map_err(script_err)?)
}

fn register_task(engine: &mut Engine) {
    engine
        .register_type_with_name::<TaskHandle>("Task")
        .register_get("inventory", |t: &mut TaskHandle| task_view(t.task().inventory()))
        .register_get("inv", |t: &mut TaskHandle| task_view(t.task().inventory()))
        .register_get("inventory_global", |t: &mut TaskHandle| {
            task_view(t.task().inventory_global())
        })
        .register_get("params", |t: &mut TaskHandle| task_view(t.task().params()))
        .register_get("target", |t: &mut TaskHandle| task_view(t.task().target()))
        .register_get("target_name", |t: &mut TaskHandle| {
            t.task()
                .target_name()
                .map(|name| Dynamic::from(name.to_string()))
                .unwrap_or(Dynamic::UNIT)
        })
        .register_get("search_paths", |t: &mut TaskHandle| {
            paths_to_array(t.task().search_paths().to_vec())
        })
        .register_fn(
            "find_in_search_path",
            |t: &mut TaskHandle, pattern: &str| -> ScriptResult<Array> {
                let mut found: Vec<PathBuf> = t
                    .task()
                    .find_in_search_path(pattern)
                    .map_err(script_err)?
                    .into_iter()
                    .collect();
                found.sort();
                Ok(paths_to_array(found))
            },
        );
}

fn register_context(engine: &mut Engine, context: Rc<RuntimeContext>) {
    let ctx = context.clone();
    engine.register_fn("inventory", move || -> ScriptResult<Dynamic> {
        to_script(&ctx.inventory().map_err(script_err)?)
    });

    let ctx = context.clone();
    engine.register_fn("inventory_global", move || -> ScriptResult<Dynamic> {
        to_script(&ctx.inventory_global().map_err(script_err)?)
    });

    engine.register_fn("search_paths", move || {
        paths_to_array(context.search_paths().to_vec())
    });
}
