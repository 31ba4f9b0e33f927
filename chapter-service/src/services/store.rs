//! Read-only document store abstraction.
//!
//! A store returns documents as [`Record`]s: plain string-keyed maps of JSON
//! values, so callers read fields through explicit accessors instead of a
//! fixed schema.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Error type for store reads.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("Firestore API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode document: {0}")]
    Decode(String),
}

/// Error raised when a stored field does not have the expected shape.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("field `{field}` is not {expected}: {found}")]
    InvalidType {
        field: String,
        expected: &'static str,
        found: Value,
    },

    #[error("document body is not an object")]
    NotAnObject,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetches one document; `Ok(None)` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        document_id: &str,
    ) -> Result<Option<Record>, StoreError>;
}

/// The fields of a single stored document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Builds a record from a JSON object.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            _ => Err(RecordError::NotAnObject),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Integer field, or `default` when the field is absent.
    ///
    /// Integral doubles and numeric strings are accepted. Anything else,
    /// including a stored null, is an error.
    pub fn get_i64_or(&self, field: &str, default: i64) -> Result<i64, RecordError> {
        let Some(value) = self.fields.get(field) else {
            return Ok(default);
        };

        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        parsed.ok_or_else(|| RecordError::InvalidType {
            field: field.to_string(),
            expected: "an integer",
            found: value.clone(),
        })
    }

    /// String field passed through verbatim; missing or null reads as `None`.
    pub fn get_optional_str(&self, field: &str) -> Result<Option<String>, RecordError> {
        match self.fields.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(RecordError::InvalidType {
                field: field.to_string(),
                expected: "a string",
                found: other.clone(),
            }),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}
