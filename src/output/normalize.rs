//! Conversion of script values into plain serializable trees.

use crate::output::OutputError;
use crate::runtime::BaseObj;
use rhai::{Array, Dynamic, Map};
use serde_json::{Number, Value};

/// Recursively converts `value` into a tree of plain mappings, sequences and
/// scalars.
///
/// Builder objects contribute their `root`; maps and arrays are rebuilt with
/// every element normalized. The input is never mutated. Values with no plain
/// representation (function pointers, blobs, timestamps, non-finite floats)
/// are rejected.
pub fn normalize(value: &Dynamic) -> Result<Value, OutputError> {
    let value = value.flatten_clone();

    if value.is::<BaseObj>() {
        return normalize_map(&value.cast::<BaseObj>().root());
    }
    if value.is_map() {
        return normalize_map(&value.cast::<Map>());
    }
    if value.is_array() {
        return value
            .cast::<Array>()
            .iter()
            .map(normalize)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }

    scalar(value)
}

fn normalize_map(map: &Map) -> Result<Value, OutputError> {
    map.iter()
        .map(|(key, value)| Ok((key.to_string(), normalize(value)?)))
        .collect::<Result<serde_json::Map<_, _>, _>>()
        .map(Value::Object)
}

fn scalar(value: Dynamic) -> Result<Value, OutputError> {
    if value.is_unit() {
        return Ok(Value::Null);
    }
    if let Ok(b) = value.as_bool() {
        return Ok(Value::Bool(b));
    }
    if let Ok(i) = value.as_int() {
        return Ok(Value::Number(i.into()));
    }
    if let Ok(f) = value.as_float() {
        return Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| OutputError::Unserializable {
                type_name: format!("non-finite float {f}"),
            });
    }
    if let Ok(c) = value.as_char() {
        return Ok(Value::String(c.to_string()));
    }

    let type_name = value.type_name().to_string();
    value
        .into_string()
        .map(Value::String)
        .map_err(|_| OutputError::Unserializable { type_name })
}

/// Converts a plain tree into a script value.
pub fn to_dynamic(value: &Value) -> Result<Dynamic, OutputError> {
    rhai::serde::to_dynamic(value).map_err(|e| OutputError::Unserializable {
        type_name: e.to_string(),
    })
}

/// Converts a JSON object into a script object map.
pub fn to_script_map(map: &serde_json::Map<String, Value>) -> Result<Map, OutputError> {
    let value = rhai::serde::to_dynamic(map).map_err(|e| OutputError::Unserializable {
        type_name: e.to_string(),
    })?;
    let type_name = value.type_name().to_string();
    value
        .try_cast::<Map>()
        .ok_or(OutputError::Unserializable { type_name })
}
