// SPDX-FileCopyrightText: 2026 Wahub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Safe serialisation of upstream message envelopes.
//!
//! Upstream envelopes contain values that have no direct JSON form: raw key
//! material as byte arrays, foreign buffer handles, and callable references
//! nested deep in the tree. [`sanitize`] converts a [`RawValue`] tree into a
//! stable, schema-bearing `serde_json::Value` so persistence and webhook
//! payloads never choke on them. Ingestion must never fail on a weird
//! envelope; the fallback object marks the substitution instead.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Map, Value};

/// Maximum tree depth before sanitisation bails out to the fallback object.
const MAX_DEPTH: usize = 64;

/// An upstream envelope value prior to sanitisation.
///
/// Transports build this tree from whatever their underlying library hands
/// them; variants beyond the plain JSON ones capture the non-serialisable
/// shapes named by the substitution rules.
#[derive(Debug, Clone)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A plain byte array (e.g. media keys).
    Bytes(Vec<u8>),
    /// A foreign buffer handle from the upstream runtime.
    Buffer(Vec<u8>),
    /// A callable reference; only its name survives.
    Function(String),
    /// A non-plain complex object; only its string rendering survives.
    Opaque(String),
    Array(Vec<RawValue>),
    Object(Vec<(String, RawValue)>),
}

impl RawValue {
    /// Convenience constructor for an object from key/value pairs.
    pub fn object(pairs: Vec<(&str, RawValue)>) -> Self {
        RawValue::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }
}

impl From<&Value> for RawValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(*b),
            Value::Number(n) => RawValue::Number(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => RawValue::String(s.clone()),
            Value::Array(items) => {
                RawValue::Array(items.iter().map(RawValue::from).collect())
            }
            Value::Object(map) => RawValue::Object(
                map.iter().map(|(k, v)| (k.clone(), RawValue::from(v))).collect(),
            ),
        }
    }
}

/// The fallback object stored when sanitisation fails outright.
pub fn serialization_fallback() -> Value {
    json!({ "__serialization_error": true })
}

/// Sanitise a raw envelope into a plain JSON tree.
///
/// Substitutions:
/// - byte arrays   -> `{"__type": "bytes", "data": <base64>}`
/// - buffers       -> `{"__type": "buffer", "data": <base64>}`
/// - functions     -> `{"__type": "function", "name": <name>}`
/// - opaque values -> `{"__type": "opaque", "to_string": <repr>}`
///
/// Trees deeper than [`MAX_DEPTH`] collapse to the fallback object at the
/// offending node; the surrounding tree is preserved.
pub fn sanitize(raw: &RawValue) -> Value {
    sanitize_at(raw, 0)
}

fn sanitize_at(raw: &RawValue, depth: usize) -> Value {
    if depth > MAX_DEPTH {
        return serialization_fallback();
    }

    match raw {
        RawValue::Null => Value::Null,
        RawValue::Bool(b) => Value::Bool(*b),
        RawValue::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        RawValue::String(s) => Value::String(s.clone()),
        RawValue::Bytes(bytes) => json!({
            "__type": "bytes",
            "data": BASE64.encode(bytes),
        }),
        RawValue::Buffer(bytes) => json!({
            "__type": "buffer",
            "data": BASE64.encode(bytes),
        }),
        RawValue::Function(name) => json!({
            "__type": "function",
            "name": name,
        }),
        RawValue::Opaque(repr) => json!({
            "__type": "opaque",
            "to_string": repr,
        }),
        RawValue::Array(items) => Value::Array(
            items.iter().map(|item| sanitize_at(item, depth + 1)).collect(),
        ),
        RawValue::Object(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                map.insert(key.clone(), sanitize_at(value, depth + 1));
            }
            Value::Object(map)
        }
    }
}
