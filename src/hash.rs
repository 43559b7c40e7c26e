//! # Stable Hash
//!
//! Turns an arbitrary structured input into the key under which an operation's
//! state and cached results live.
//!
//! Object keys are sorted (recursively) before hashing, so two inputs that only
//! differ in key order always produce the same [`InputHash`]. Inputs that are
//! not objects, including an absent (`null`) input, all map to the empty-input
//! key, i.e. `hash(&json!({}))`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Hex-encoded BLAKE3 digest of a canonicalized value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputHash(String);

impl InputHash {
    /// The key shared by every absent or non-object input.
    pub fn empty() -> Self {
        digest(&Value::Object(serde_json::Map::new()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        f.write_str(&self.0[..self.0.len().min(12)])
    }
}

/// Hashes an operation input.
///
/// Only objects get their own key. Arrays, strings, numbers and booleans all
/// share [`InputHash::empty`], so two operations whose inputs are different
/// arrays end up in the same state entry.
///
/// Numbers hash by their JSON text: `1` and `1.0` are different inputs.
pub fn hash(input: &Value) -> InputHash {
    match input {
        Value::Object(_) => digest(input),
        _ => InputHash::empty(),
    }
}

/// Hashes any value, objects and scalars alike.
///
/// Used by the memoizer, whose keys are projections of the call arguments and
/// may legitimately be strings or numbers.
pub fn digest(value: &Value) -> InputHash {
    let mut hasher = blake3::Hasher::new();
    write_canonical(value, &mut hasher);
    InputHash(hasher.finalize().to_hex().to_string())
}

fn write_canonical(value: &Value, hasher: &mut blake3::Hasher) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            hasher.update(b"{");
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    hasher.update(b",");
                }
                hasher.update(Value::from(key.as_str()).to_string().as_bytes());
                hasher.update(b":");
                if let Some(inner) = map.get(key) {
                    write_canonical(inner, hasher);
                }
            }
            hasher.update(b"}");
        }
        Value::Array(items) => {
            hasher.update(b"[");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    hasher.update(b",");
                }
                write_canonical(item, hasher);
            }
            hasher.update(b"]");
        }
        scalar => {
            hasher.update(scalar.to_string().as_bytes());
        }
    }
}

/// Either a raw input or a precomputed hash, for getters that accept both.
#[derive(Debug, Clone, Copy)]
pub enum InputRef<'a> {
    Input(&'a Value),
    Hash(&'a InputHash),
}

impl InputRef<'_> {
    pub fn resolve(&self) -> InputHash {
        match self {
            InputRef::Input(input) => hash(input),
            InputRef::Hash(hashed) => (*hashed).clone(),
        }
    }
}

impl<'a> From<&'a Value> for InputRef<'a> {
    fn from(input: &'a Value) -> Self {
        InputRef::Input(input)
    }
}

impl<'a> From<&'a InputHash> for InputRef<'a> {
    fn from(hashed: &'a InputHash) -> Self {
        InputRef::Hash(hashed)
    }
}
