//! Helpers for partial-update (PATCH) request bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

/// Keys a PATCH body carried that the endpoint does not understand.
pub type UnknownFields = BTreeMap<String, serde_json::Value>;

/// Deserialize a field that distinguishes "absent" from "explicitly null".
///
/// Use with `#[serde(default, deserialize_with = "double_option")]` on an
/// `Option<Option<T>>`: absent yields `None`, `null` yields `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Message listing unsupported keys, or `None` when there are none.
pub fn unknown_fields_message(unknown: &UnknownFields) -> Option<String> {
    if unknown.is_empty() {
        return None;
    }
    let keys: Vec<&str> = unknown.keys().map(String::as_str).collect();
    Some(format!("Unsupported fields: {}", keys.join(", ")))
}
