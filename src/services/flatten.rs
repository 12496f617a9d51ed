use serde_json::{Map, Value};

use crate::error::{Result, SyncError};
use crate::model::catalog::{FlatMap, ResourceTree, KEY_SEPARATOR};

/// Non-empty objects are descended into; everything else (including `{}`) is a leaf.
fn is_branch(value: &Value) -> bool {
    matches!(value, Value::Object(m) if !m.is_empty())
}

pub fn flatten(tree: &ResourceTree) -> Result<FlatMap> {
    let mut out = FlatMap::new();
    flatten_into(tree, "", &mut out)?;
    Ok(out)
}

fn flatten_into(tree: &ResourceTree, prefix: &str, out: &mut FlatMap) -> Result<()> {
    for (k, v) in tree {
        if k.contains(KEY_SEPARATOR) {
            return Err(SyncError::InvalidKey {
                parent: prefix.to_string(),
                segment: k.clone(),
            });
        }

        let key = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}{KEY_SEPARATOR}{k}")
        };

        match v {
            Value::Object(child) if is_branch(v) => flatten_into(child, &key, out)?,
            _ => {
                out.insert(key, v.clone());
            }
        }
    }
    Ok(())
}

pub fn unflatten(map: &FlatMap) -> Result<ResourceTree> {
    let mut out = ResourceTree::new();
    for (k, v) in map {
        insert_path(&mut out, k, v.clone())?;
    }
    Ok(out)
}

/// Writes `value` at the dotted `key`, creating intermediate objects on demand.
pub fn insert_path(tree: &mut ResourceTree, key: &str, value: Value) -> Result<()> {
    let parts: Vec<&str> = key.split(KEY_SEPARATOR).collect();
    let (last, parents) = match parts.split_last() {
        Some(split) => split,
        None => return Ok(()),
    };

    let mut cur = tree;
    for (depth, p) in parents.iter().enumerate() {
        let slot = cur
            .entry(p.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        cur = match slot {
            Value::Object(m) => m,
            _ => {
                return Err(SyncError::KeyConflict {
                    key: key.to_string(),
                    at: parts[..=depth].join("."),
                })
            }
        };
    }

    if let Some(Value::Object(existing)) = cur.get(*last) {
        if matches!(&value, Value::Object(m) if m.is_empty()) {
            return Ok(());
        }
        if !existing.is_empty() {
            return Err(SyncError::KeyConflict {
                key: key.to_string(),
                at: key.to_string(),
            });
        }
    }

    cur.insert(last.to_string(), value);
    Ok(())
}
