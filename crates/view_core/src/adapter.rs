//! Response normalization: extracts a payload from an envelope and unwraps
//! the conventional list container when present.

use serde_json::Value;
use shared::protocol::Envelope;

use crate::error::CoreError;

/// Conventional key servers use to wrap list-shaped results.
const LIST_WRAPPER_KEY: &str = "resultList";

/// Extracts the normalized payload from an envelope. Fails only when the
/// envelope carries no payload at all; callers treat that the same as a
/// transport failure.
pub fn read_list(envelope: &Envelope) -> Result<Value, CoreError> {
    let payload = envelope
        .payload
        .as_ref()
        .ok_or_else(|| CoreError::Normalization("envelope has no payload".into()))?;
    Ok(normalize(payload.clone()))
}

/// Unwraps one level of the conventional list container. Idempotent: an
/// already-normalized value passes through unchanged.
pub fn normalize(payload: Value) -> Value {
    match payload {
        Value::Object(mut map) => match map.remove(LIST_WRAPPER_KEY) {
            Some(list @ Value::Array(_)) => list,
            Some(other) => {
                // The key held something non-list; leave the object intact.
                map.insert(LIST_WRAPPER_KEY.to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

#[cfg(test)]
#[path = "tests/adapter_tests.rs"]
mod tests;
