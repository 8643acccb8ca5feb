//! Document path codec — converts between the nested CV document and the
//! flat dotted-path mapping the rule engine operates on.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// A CV document keyed by dotted paths, e.g. `personal.fullName`.
pub type FlatDocument = BTreeMap<String, Value>;

/// Flattens a nested document into dotted-path form via depth-first traversal.
///
/// Non-empty plain objects are recursed into; everything else (scalars,
/// arrays, empty objects) is a leaf. A non-object root yields an empty map.
pub fn flatten(document: &Value) -> FlatDocument {
    let mut flat = FlatDocument::new();
    if let Value::Object(map) = document {
        flatten_into(map, "", &mut flat);
    }
    flat
}

fn flatten_into(map: &Map<String, Value>, prefix: &str, out: &mut FlatDocument) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) if !inner.is_empty() => flatten_into(inner, &path, out),
            _ => {
                out.insert(path, value.clone());
            }
        }
    }
}

/// Rebuilds a nested document from dotted-path form.
///
/// Intermediate nodes are created as objects on demand; a non-object
/// intermediate is overwritten by an object (last write wins when paths
/// conflict in depth). Purely structural, no validation.
pub fn unflatten(flat: &FlatDocument) -> Value {
    let mut root = Map::new();
    for (path, value) in flat {
        let mut segments = path.split('.').peekable();
        let mut cursor = &mut root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                cursor.insert(segment.to_string(), value.clone());
            } else {
                let entry = cursor
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                if !entry.is_object() {
                    *entry = Value::Object(Map::new());
                }
                let Value::Object(inner) = entry else {
                    unreachable!()
                };
                cursor = inner;
            }
        }
    }
    Value::Object(root)
}
