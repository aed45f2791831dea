//! Tolerant dotted-path access over JSON values
//!
//! Step input and output mappings address values inside the execution context
//! and step outputs with dotted paths ("user.address.city", "items.0.sku").
//! A path that does not resolve yields `None`, never an error.

use serde_json::{Map, Value};

/// Look up `path` inside `root`, descending one dotted segment at a time.
///
/// Object segments key into maps; segments that parse as `usize` index into
/// arrays. An empty path returns the root itself.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }

    let mut current = root;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => {
                let index: usize = segment.parse().ok()?;
                items.get(index)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Look up `path` inside a top-level map, e.g. the execution context.
///
/// The first segment keys into the map; remaining segments descend via
/// [`lookup`].
pub fn lookup_in<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        Some((head, rest)) => lookup(map.get(head)?, rest),
        None => map.get(path),
    }
}
