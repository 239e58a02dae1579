use thiserror::Error;

use super::catalog::PropertyType;

/// Why a payload could not be decoded.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("payload must be a JSON object, got {found}")]
    NotAnObject { found: &'static str },
}

/// The first rule a decoded payload broke. Paths are dotted (`s.x`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("missing property: {path}")]
    Missing { path: String },

    #[error("property {path} is not {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: PropertyType,
        found: &'static str,
    },

    #[error("property {path} is not greater than 0")]
    NotGreaterThanZero { path: String },

    #[error("property {path} is blank")]
    Blank { path: String },
}

impl Violation {
    pub fn path(&self) -> &str {
        match self {
            Violation::Missing { path }
            | Violation::TypeMismatch { path, .. }
            | Violation::NotGreaterThanZero { path }
            | Violation::Blank { path } => path,
        }
    }
}
