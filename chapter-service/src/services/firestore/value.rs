//! Decoding of Firestore REST typed values into plain JSON.
//!
//! The REST API wraps every value in a single-key object naming its type,
//! e.g. `{"integerValue": "9"}` or `{"mapValue": {"fields": {...}}}`.

use crate::services::store::{Record, StoreError};
use serde_json::{Map, Value};

/// Decodes a document's `fields` object into a [`Record`].
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Record, StoreError> {
    fields
        .iter()
        .map(|(name, value)| {
            decode_value(value)
                .map(|decoded| (name.clone(), decoded))
                .map_err(|e| StoreError::Decode(format!("field `{}`: {}", name, e)))
        })
        .collect()
}

/// Decodes one typed value.
pub fn decode_value(value: &Value) -> Result<Value, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a typed value object, got {}", value))?;

    let (kind, inner) = match object.iter().next() {
        Some(entry) if object.len() == 1 => entry,
        _ => return Err(format!("expected exactly one value type, got {}", value)),
    };

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| format!("invalid booleanValue {}", inner)),
        // int64 travels as a decimal string
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| format!("invalid integerValue {:?}: {}", s, e)),
            Value::Number(n) if n.is_i64() => Ok(inner.clone()),
            _ => Err(format!("invalid integerValue {}", inner)),
        },
        // NaN and the infinities arrive as strings and have no JSON number form
        "doubleValue" => match inner {
            Value::Number(_) | Value::String(_) => Ok(inner.clone()),
            _ => Err(format!("invalid doubleValue {}", inner)),
        },
        "stringValue" | "timestampValue" | "bytesValue" | "referenceValue" => match inner {
            Value::String(_) => Ok(inner.clone()),
            _ => Err(format!("invalid {} {}", kind, inner)),
        },
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                None => return Ok(Value::Array(Vec::new())),
                Some(Value::Array(values)) => values,
                Some(other) => return Err(format!("invalid arrayValue {}", other)),
            };
            values
                .iter()
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                None => return Ok(Value::Object(Map::new())),
                Some(Value::Object(fields)) => fields,
                Some(other) => return Err(format!("invalid mapValue {}", other)),
            };
            fields
                .iter()
                .map(|(name, value)| decode_value(value).map(|decoded| (name.clone(), decoded)))
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object)
        }
        other => Err(format!("unsupported value type `{}`", other)),
    }
}
