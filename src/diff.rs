//! Structural JSON diff/patch between successive, parsed info objects.
//!
//! This diffs the *parsed* tree, not the serialized bytes, so whitespace or
//! key-order drift between the serializer and the original never pollutes a
//! patch. Arrays are diffed positionally (see [`diff_array`]) rather than by
//! a general edit-distance algorithm: v86 metadata arrays are append-mostly,
//! and the simpler discipline is cheap to prove correct by round-trip.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CodecError, Result};

/// One step into a JSON tree: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// One edit in a structural diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum DiffOp {
    Add {
        path: Vec<PathSegment>,
        values: Vec<(PathSegment, Value)>,
    },
    Remove {
        path: Vec<PathSegment>,
        values: Vec<(PathSegment, Value)>,
    },
    Change {
        path: Vec<PathSegment>,
        old: Value,
        new: Value,
    },
}

/// Computes the structural diff from `prev` to `curr` as UTF-8 JSON bytes.
///
/// # Errors
/// Returns [`CodecError::MalformedInfo`] only if the op list itself fails to
/// serialize, which does not happen for well-formed `Value` inputs.
pub fn diff(prev: &Value, curr: &Value) -> Result<Vec<u8>> {
    let mut ops = Vec::new();
    diff_value(&mut Vec::new(), prev, curr, &mut ops);
    serde_json::to_vec(&ops).map_err(|e| CodecError::MalformedInfo(e.to_string()))
}

/// Applies a diff produced by [`diff`] to `prev`, returning the patched
/// value.
///
/// # Errors
/// Returns [`CodecError::MalformedContainer`] if `patch_bytes` doesn't parse
/// as an op list, or if an op's path doesn't resolve against `prev` (type
/// mismatch or missing key/index).
pub fn patch(prev: &Value, patch_bytes: &[u8]) -> Result<Value> {
    let ops: Vec<DiffOp> = serde_json::from_slice(patch_bytes)
        .map_err(|e| CodecError::MalformedContainer(format!("invalid info patch: {e}")))?;

    let mut result = prev.clone();
    for op in ops {
        apply_op(&mut result, op)?;
    }
    Ok(result)
}

fn diff_value(path: &mut Vec<PathSegment>, prev: &Value, curr: &Value, ops: &mut Vec<DiffOp>) {
    match (prev, curr) {
        (Value::Object(p), Value::Object(c)) => diff_object(path, p, c, ops),
        (Value::Array(p), Value::Array(c)) => diff_array(path, p, c, ops),
        _ if prev == curr => {}
        _ => ops.push(DiffOp::Change {
            path: path.clone(),
            old: prev.clone(),
            new: curr.clone(),
        }),
    }
}

fn diff_object(
    path: &mut Vec<PathSegment>,
    prev: &Map<String, Value>,
    curr: &Map<String, Value>,
    ops: &mut Vec<DiffOp>,
) {
    let removed: Vec<_> = prev
        .iter()
        .filter(|(k, _)| !curr.contains_key(*k))
        .map(|(k, v)| (PathSegment::Key(k.clone()), v.clone()))
        .collect();
    if !removed.is_empty() {
        ops.push(DiffOp::Remove { path: path.clone(), values: removed });
    }

    let added: Vec<_> = curr
        .iter()
        .filter(|(k, _)| !prev.contains_key(*k))
        .map(|(k, v)| (PathSegment::Key(k.clone()), v.clone()))
        .collect();
    if !added.is_empty() {
        ops.push(DiffOp::Add { path: path.clone(), values: added });
    }

    for (key, curr_value) in curr {
        if let Some(prev_value) = prev.get(key) {
            path.push(PathSegment::Key(key.clone()));
            diff_value(path, prev_value, curr_value, ops);
            path.pop();
        }
    }
}

/// Diffs two arrays positionally: indices in the common prefix are recursed
/// into individually, and a length change produces one `Add`/`Remove`
/// covering the appended or trimmed tail.
fn diff_array(path: &mut Vec<PathSegment>, prev: &[Value], curr: &[Value], ops: &mut Vec<DiffOp>) {
    if curr.len() < prev.len() {
        let removed: Vec<_> = prev[curr.len()..]
            .iter()
            .enumerate()
            .map(|(i, v)| (PathSegment::Index(curr.len() + i), v.clone()))
            .collect();
        ops.push(DiffOp::Remove { path: path.clone(), values: removed });
    } else if curr.len() > prev.len() {
        let added: Vec<_> = curr[prev.len()..]
            .iter()
            .enumerate()
            .map(|(i, v)| (PathSegment::Index(prev.len() + i), v.clone()))
            .collect();
        ops.push(DiffOp::Add { path: path.clone(), values: added });
    }

    for i in 0..prev.len().min(curr.len()) {
        path.push(PathSegment::Index(i));
        diff_value(path, &prev[i], &curr[i], ops);
        path.pop();
    }
}

fn apply_op(root: &mut Value, op: DiffOp) -> Result<()> {
    match op {
        DiffOp::Change { path, new, .. } => {
            *navigate_mut(root, &path)? = new;
        }
        DiffOp::Add { path, values } => {
            let target = navigate_mut(root, &path)?;
            for (key, value) in values {
                insert_child(target, &key, value)?;
            }
        }
        DiffOp::Remove { path, values } => {
            let target = navigate_mut(root, &path)?;
            // Remove array indices from highest to lowest so earlier
            // removals don't shift the positions of later ones.
            let mut index_keys: Vec<usize> = values
                .iter()
                .filter_map(|(k, _)| match k {
                    PathSegment::Index(i) => Some(*i),
                    PathSegment::Key(_) => None,
                })
                .collect();
            index_keys.sort_unstable_by(|a, b| b.cmp(a));

            for (key, _) in &values {
                if let PathSegment::Key(k) = key {
                    if let Value::Object(map) = target {
                        map.remove(k);
                    }
                }
            }
            if let Value::Array(arr) = target {
                for i in index_keys {
                    if i < arr.len() {
                        arr.remove(i);
                    }
                }
            }
        }
    }
    Ok(())
}

fn insert_child(target: &mut Value, key: &PathSegment, value: Value) -> Result<()> {
    match (target, key) {
        (Value::Object(map), PathSegment::Key(k)) => {
            map.insert(k.clone(), value);
            Ok(())
        }
        (Value::Array(arr), PathSegment::Index(i)) => {
            if *i >= arr.len() {
                arr.push(value);
            } else {
                arr.insert(*i, value);
            }
            Ok(())
        }
        _ => Err(CodecError::MalformedContainer(
            "add op target/key type mismatch".to_string(),
        )),
    }
}

fn navigate_mut<'a>(root: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value> {
    let mut cur = root;
    for seg in path {
        cur = match (cur, seg) {
            (Value::Object(map), PathSegment::Key(k)) => map
                .get_mut(k)
                .ok_or_else(|| CodecError::MalformedContainer(format!("path key {k:?} missing")))?,
            (Value::Array(arr), PathSegment::Index(i)) => arr.get_mut(*i).ok_or_else(|| {
                CodecError::MalformedContainer(format!("path index {i} out of bounds"))
            })?,
            _ => return Err(CodecError::MalformedContainer("path type mismatch".to_string())),
        };
    }
    Ok(cur)
}
