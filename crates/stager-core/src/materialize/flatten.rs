use std::collections::HashSet;

use serde_json::{Map, Value};
use stager_model::{ConfigTree, FlattenedConfig};

use crate::error::CoreError;

/// Flatten a nested config object into dotted-path keys, depth first, in document order.
///
/// Strings are taken verbatim; every other leaf (numbers, bools, null, arrays, empty objects)
/// is rendered as compact JSON. Two leaves mapping to the same dotted key is an error.
pub fn flatten(tree: &ConfigTree) -> Result<FlattenedConfig, CoreError> {
    let Value::Object(map) = tree else {
        return Err(CoreError::InvalidInput(format!(
            "config root must be an object, got {}",
            kind_of(tree)
        )));
    };

    let mut out = FlattenedConfig::new();
    let mut seen = HashSet::new();
    walk(map, "", &mut out, &mut seen)?;
    Ok(out)
}

/// Environment variable name for a flattened key.
pub fn env_key(flat_key: &str) -> String {
    flat_key.replace('.', "__")
}

fn walk(
    map: &Map<String, Value>,
    prefix: &str,
    out: &mut FlattenedConfig,
    seen: &mut HashSet<String>,
) -> Result<(), CoreError> {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        match value {
            Value::Object(inner) if !inner.is_empty() => walk(inner, &path, out, seen)?,
            leaf => {
                if !seen.insert(path.clone()) {
                    return Err(CoreError::InvalidInput(format!(
                        "config key `{path}` is defined twice once flattened"
                    )));
                }
                let rendered = match leaf {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                out.push(path, rendered);
            }
        }
    }
    Ok(())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
