//! Schema normalizer: dereferences `$ref` chains and classifies a fragment
//! of a JSON-schema document as an object, an array or a scalar.
//!
//! Normalization stops at the first object node. Expanding that object's
//! members (and terminating on cycles) is the resolver's job; this module
//! only guarantees that a pure reference loop does not recurse forever.
pub mod pointer;

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::error::{Error, Result};
pub use pointer::Pointer;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// One schema document. Every pointer handed around refers into `root`.
#[derive(Debug, Clone)]
pub struct Document {
    root: Value,
    fingerprint: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// Object node at `pointer`; `ref_name` is the last segment of the
    /// reference it was reached through, if any.
    Object { pointer: Pointer, ref_name: Option<String> },
    Array(Box<Normalized>),
    /// Primitive or enum node.
    Scalar { pointer: Pointer, ref_name: Option<String> },
    /// Composition, reference loop or anything else with no concrete shape.
    Opaque,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Document {
    pub fn new(root: Value) -> Self {
        let fingerprint = fingerprint(&root);
        Self { root, fingerprint }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub fn node(&self, pointer: &Pointer) -> Result<&Value> {
        pointer
            .resolve(&self.root)
            .ok_or_else(|| Error::unresolved(pointer.to_string(), "no such node in document"))
    }

    pub fn normalize(&self, at: &Pointer) -> Result<Normalized> {
        let mut seen = HashSet::new();
        self.normalize_at(at.clone(), None, &mut seen)
    }

    fn normalize_at(
        &self,
        at: Pointer,
        ref_name: Option<String>,
        seen: &mut HashSet<Pointer>,
    ) -> Result<Normalized> {
        let node = self.node(&at)?;

        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            if !seen.insert(at.clone()) {
                tracing::warn!(pointer = %at, reference, "reference loop without a concrete node");
                return Ok(Normalized::Opaque);
            }
            let target = pointer::dereference(&self.root, &at, reference)?;
            let ref_name = target.last().map(str::to_owned).or(ref_name);
            return self.normalize_at(target, ref_name, seen);
        }

        let declared = declared_type(node);
        if declared.is_none() && node.get("properties").is_none() {
            if let Some(member) = single_composition_member(node) {
                return self.normalize_at(at.child(member.0).child(member.1.to_string()), ref_name, seen);
            }
            if is_composition(node) {
                return Ok(Normalized::Opaque);
            }
        }

        match declared {
            Some("object") => Ok(Normalized::Object { pointer: at, ref_name }),
            Some("array") => match node.get("items") {
                Some(Value::Object(_)) => {
                    let items = self.normalize_at(at.child("items"), None, seen)?;
                    Ok(Normalized::Array(Box::new(items)))
                }
                _ => Ok(Normalized::Array(Box::new(Normalized::Opaque))),
            },
            None if node.get("properties").is_some_and(Value::is_object) => {
                Ok(Normalized::Object { pointer: at, ref_name })
            }
            _ => Ok(Normalized::Scalar { pointer: at, ref_name }),
        }
    }
}

/// First non-`null` entry of `type`, which may be a string or an array.
pub fn declared_type(node: &Value) -> Option<&str> {
    match node.get("type")? {
        Value::String(single) => Some(single.as_str()),
        Value::Array(many) => {
            let mut names = many.iter().filter_map(Value::as_str);
            let first = names.clone().next();
            names.find(|name| *name != "null").or(first)
        }
        _ => None,
    }
}

/// Structural hash, independent of object key order.
pub fn fingerprint(value: &Value) -> u64 {
    use std::collections::hash_map::DefaultHasher;

    let mut h = DefaultHasher::new();
    hash_value(value, &mut h);
    h.finish()
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn hash_value(value: &Value, h: &mut impl Hasher) {
    match value {
        Value::Null => 0u8.hash(h),
        Value::Bool(flag) => (1u8, *flag).hash(h),
        Value::Number(number) => (2u8, number.to_string()).hash(h),
        Value::String(text) => (3u8, text).hash(h),
        Value::Array(items) => {
            (4u8, items.len()).hash(h);
            for item in items {
                hash_value(item, h);
            }
        }
        Value::Object(fields) => {
            (5u8, fields.len()).hash(h);
            let mut keys: Vec<&String> = fields.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(h);
                // separator keeps {"ab": x} apart from {"a": "b" ...}
                0xFFu8.hash(h);
                hash_value(&fields[key], h);
            }
        }
    }
}

const COMPOSITIONS: [&str; 3] = ["allOf", "anyOf", "oneOf"];

fn is_composition(node: &Value) -> bool {
    COMPOSITIONS.iter().any(|key| node.get(key).is_some())
}

/// `allOf` with one member, or `anyOf`/`oneOf` with one non-null member.
fn single_composition_member(node: &Value) -> Option<(&'static str, usize)> {
    let present: Vec<&'static str> = COMPOSITIONS.into_iter().filter(|key| node.get(key).is_some()).collect();
    let [key] = present.as_slice() else {
        return None;
    };
    let members = node.get(*key)?.as_array()?;
    if *key == "allOf" {
        return (members.len() == 1).then_some((*key, 0));
    }
    let mut concrete = members
        .iter()
        .enumerate()
        .filter(|(_, member)| declared_type(member) != Some("null"));
    match (concrete.next(), concrete.next()) {
        (Some((index, _)), None) => Some((*key, index)),
        _ => None,
    }
}
