use serde_json::Value;

/// Strips nulls and empty containers from a normalized tree.
///
/// `None` means the value itself pruned away: it was `null` or an empty
/// mapping or sequence. A container that only becomes empty once its children
/// are pruned is kept. Falsy scalars (`0`, `""`, `false`) are kept.
pub fn prune_empty(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        Value::Array(items) => Some(Value::Array(items.iter().filter_map(prune_empty).collect())),
        Value::Object(map) => Some(Value::Object(
            map.iter()
                .filter_map(|(k, v)| prune_empty(v).map(|v| (k.clone(), v)))
                .collect(),
        )),
        scalar => Some(scalar.clone()),
    }
}
