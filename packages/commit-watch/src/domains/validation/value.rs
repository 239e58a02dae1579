//! Decoded payload values.
//!
//! Payloads are JSON. Decoding keeps integers apart from floats and recognizes
//! RFC 3339 timestamps, so the walker can match on the variant instead of
//! guessing at run time.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::error::DecodeError;

pub type Fields = HashMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Time(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Fields),
}

impl Value {
    /// Variant name used in violation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Time(_) => "time",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64::MAX, or a fractional number
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => match DateTime::parse_from_rfc3339(&s) {
                Ok(t) => Value::Time(t.with_timezone(&Utc)),
                Err(_) => Value::String(s),
            },
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

/// Top-level fields of one payload. Lives for one validation pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedMessage {
    fields: Fields,
}

impl DecodedMessage {
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let json: serde_json::Value = serde_json::from_slice(payload)?;
        match Value::from(json) {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(DecodeError::NotAnObject {
                found: other.kind(),
            }),
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}
