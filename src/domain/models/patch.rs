//! Declarative patch protocol.
//!
//! Engines never mutate shared state. They return an ordered list of
//! patches and an external commit step applies them to the state tree.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of change a patch describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    /// Replace the value at the path
    Set,
    /// Shallow-merge an object into the object at the path
    Merge,
    /// Remove the key at the path
    Unset,
}

/// One state change addressed by path segments.
///
/// Segments are kept as a list rather than a dotted string because file
/// keys routinely contain dots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    /// Replace the value at `path`.
    pub fn set<T: Serialize>(path: Vec<String>, value: &T) -> Self {
        Self {
            op: PatchOp::Set,
            path,
            value: Some(to_value(value)),
        }
    }

    /// Shallow-merge an object into the value at `path`.
    pub fn merge<T: Serialize>(path: Vec<String>, value: &T) -> Self {
        Self {
            op: PatchOp::Merge,
            path,
            value: Some(to_value(value)),
        }
    }

    /// Remove the value at `path`.
    pub fn unset(path: Vec<String>) -> Self {
        Self {
            op: PatchOp::Unset,
            path,
            value: None,
        }
    }

    /// Dotted rendering for logs and CLI output.
    pub fn display_path(&self) -> String {
        self.path.join(".")
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(err) => {
            tracing::error!(error = %err, "patch value failed to serialize");
            Value::Null
        }
    }
}

/// Apply patches in order to a JSON state tree.
///
/// `set` and `merge` create missing intermediate objects (replacing
/// non-object intermediates). `unset` on a missing path is a no-op. A patch
/// with an empty path addresses the root itself.
pub fn apply_patches(root: &mut Value, patches: &[Patch]) {
    for patch in patches {
        apply_patch(root, patch);
    }
}

fn apply_patch(root: &mut Value, patch: &Patch) {
    match patch.op {
        PatchOp::Set => {
            let value = patch.value.clone().unwrap_or(Value::Null);
            *slot_mut(root, &patch.path) = value;
        }
        PatchOp::Merge => {
            let slot = slot_mut(root, &patch.path);
            match patch.value.clone() {
                Some(Value::Object(incoming)) => {
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    if let Some(target) = slot.as_object_mut() {
                        target.extend(incoming);
                    }
                }
                Some(other) => *slot = other,
                None => {}
            }
        }
        PatchOp::Unset => {
            let Some((last, parents)) = patch.path.split_last() else {
                *root = Value::Null;
                return;
            };
            let mut current = &mut *root;
            for segment in parents {
                match current.get_mut(segment.as_str()) {
                    Some(next) => current = next,
                    None => return,
                }
            }
            if let Some(object) = current.as_object_mut() {
                object.remove(last);
            }
        }
    }
}

/// Walk to the slot at `path`, creating objects along the way.
fn slot_mut<'a>(root: &'a mut Value, path: &[String]) -> &'a mut Value {
    let mut current = root;
    for segment in path {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => map.entry(segment.clone()).or_insert(Value::Null),
            _ => unreachable!("slot was just made an object"),
        };
    }
    current
}
