// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dot-path access into JSON payloads.
//!
//! Used by the HTTP adapter to project query-string and route parameters
//! into the request body (`"some.other.key"` -> `payload.some.other.key`).

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("Invalid payload path: '{0}'")]
    InvalidPath(String),

    #[error("Cannot set '{0}': payload is not an object")]
    NotAnObject(String),

    #[error("Request body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("Unreadable request: {0}")]
    InvalidRequest(String),
}

/// Sets `value` at the dot-separated `path`, creating intermediate objects.
/// Intermediate values that are not objects are replaced.
pub fn insert_path(target: &mut Value, path: &str, value: Value) -> Result<(), PayloadError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(PayloadError::InvalidPath(path.to_string()));
    }

    let Value::Object(root) = target else {
        return Err(PayloadError::NotAnObject(path.to_string()));
    };

    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| PayloadError::InvalidPath(path.to_string()))?;

    let mut current: &mut Map<String, Value> = root;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry {
            Value::Object(map) => map,
            _ => return Err(PayloadError::NotAnObject(path.to_string())),
        };
    }

    current.insert(last.to_string(), value);
    Ok(())
}
