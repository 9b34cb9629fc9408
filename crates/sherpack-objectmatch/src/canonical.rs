//! Canonical encoding of `{metadata, spec}` pairs
//!
//! Two structurally equal projections always produce the same bytes: every
//! JSON object is written with its keys in sorted order, whatever order the
//! source maps iterate in.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::meta::ReducedMeta;

/// The comparable projection of one object
#[derive(Debug, Serialize)]
pub struct Projection<'a, S: Serialize> {
    pub metadata: &'a ReducedMeta,
    pub spec: Option<&'a S>,
}

/// Canonical form of a projection
#[derive(Debug, Clone, PartialEq)]
pub struct Canonical {
    /// Sorted-key document, kept for diagnostics
    pub value: Value,
    /// Compact encoding of `value`
    pub bytes: Vec<u8>,
}

/// Serialize a reduced metadata block and spec into canonical bytes
pub fn canonicalize<S: Serialize>(
    metadata: &ReducedMeta,
    spec: Option<&S>,
) -> Result<Canonical, serde_json::Error> {
    let value = sort_keys(serde_json::to_value(Projection { metadata, spec })?);
    let bytes = serde_json::to_vec(&value)?;
    Ok(Canonical { value, bytes })
}

/// Rebuild `value` with every object's keys in ascending order
///
/// `serde_json::Map` only keeps keys sorted when the `preserve_order` feature
/// is off; rebuilding from a sorted list gives the same result either way.
pub fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let sorted: Map<String, Value> = entries
                .into_iter()
                .map(|(k, v)| (k, sort_keys(v)))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}
