//! Depth-first rule walk.
//!
//! Properties are checked in declaration order and the walk stops at the first
//! violation. Cancellation is polled before each property.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use super::catalog::{Constraint, PropertySpec, PropertyType};
use super::error::{DecodeError, Violation};
use super::value::{DecodedMessage, Fields, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(Violation),
    /// Cancelled before the walk finished. No verdict.
    Aborted,
}

/// What a worker does with one payload.
#[derive(Debug)]
pub enum Verdict {
    Passed,
    Undecodable(DecodeError),
    Failed(Violation),
    Aborted,
}

impl Verdict {
    /// Reason to report in a consequence, or `None` when none is due.
    pub fn failure_reason(&self) -> Option<String> {
        match self {
            Verdict::Undecodable(e) => Some(e.to_string()),
            Verdict::Failed(v) => Some(v.to_string()),
            Verdict::Passed | Verdict::Aborted => None,
        }
    }
}

/// Decode a payload and check it against `properties`.
pub fn validate(payload: &[u8], properties: &[PropertySpec], cancel: &CancellationToken) -> Verdict {
    match DecodedMessage::decode(payload) {
        Ok(message) => match check_message(&message, properties, cancel) {
            Outcome::Passed => Verdict::Passed,
            Outcome::Failed(v) => Verdict::Failed(v),
            Outcome::Aborted => Verdict::Aborted,
        },
        Err(e) => Verdict::Undecodable(e),
    }
}

pub fn check_message(
    message: &DecodedMessage,
    properties: &[PropertySpec],
    cancel: &CancellationToken,
) -> Outcome {
    check_fields(message.fields(), properties, "", cancel)
}

fn check_fields(
    fields: &Fields,
    properties: &[PropertySpec],
    prefix: &str,
    cancel: &CancellationToken,
) -> Outcome {
    for property in properties {
        if cancel.is_cancelled() {
            return Outcome::Aborted;
        }

        let path = if prefix.is_empty() {
            property.name.clone()
        } else {
            format!("{}.{}", prefix, property.name)
        };

        // A present `null` is type checked like any other value
        let value = match fields.get(&property.name) {
            Some(value) => value,
            None if property.constraint == Constraint::Optional => continue,
            None => return Outcome::Failed(Violation::Missing { path }),
        };

        match check_value(value, property, &path) {
            Ok(Some(children)) if !property.children.is_empty() => {
                match check_fields(children, &property.children, &path, cancel) {
                    Outcome::Passed => {}
                    other => return other,
                }
            }
            Ok(_) => {}
            Err(violation) => return Outcome::Failed(violation),
        }
    }

    Outcome::Passed
}

/// Type and constraint check for one present value. Returns the child fields
/// of a struct so the caller can recurse.
fn check_value<'a>(
    value: &'a Value,
    property: &PropertySpec,
    path: &str,
) -> Result<Option<&'a Fields>, Violation> {
    let mismatch = || Violation::TypeMismatch {
        path: path.to_string(),
        expected: property.property_type,
        found: value.kind(),
    };
    let greater_than_zero = property.constraint == Constraint::GreaterThanZero;
    let not_positive = || Violation::NotGreaterThanZero {
        path: path.to_string(),
    };

    match property.property_type {
        PropertyType::Struct => match value {
            Value::Object(children) => Ok(Some(children)),
            _ => Err(mismatch()),
        },
        PropertyType::Bool => match value {
            Value::Bool(_) => Ok(None),
            _ => Err(mismatch()),
        },
        PropertyType::Int => match value {
            Value::Int(n) if i32::try_from(*n).is_ok() => {
                if greater_than_zero && *n <= 0 {
                    Err(not_positive())
                } else {
                    Ok(None)
                }
            }
            _ => Err(mismatch()),
        },
        PropertyType::Int64 => match value {
            Value::Int(n) => {
                if greater_than_zero && *n <= 0 {
                    Err(not_positive())
                } else {
                    Ok(None)
                }
            }
            _ => Err(mismatch()),
        },
        PropertyType::Float32 | PropertyType::Float64 => {
            let n = match value {
                Value::Float(f) => *f,
                Value::Int(i) => *i as f64,
                _ => return Err(mismatch()),
            };
            if property.property_type == PropertyType::Float32 && !fits_f32(n) {
                return Err(mismatch());
            }
            if greater_than_zero && (n.is_nan() || n <= 0.0) {
                Err(not_positive())
            } else {
                Ok(None)
            }
        }
        PropertyType::String => {
            let blank = match value {
                Value::String(s) => s.is_empty(),
                // Timestamps are strings on the wire
                Value::Time(_) => false,
                _ => return Err(mismatch()),
            };
            if property.constraint == Constraint::NotBlank && blank {
                Err(Violation::Blank {
                    path: path.to_string(),
                })
            } else {
                Ok(None)
            }
        }
        PropertyType::Time => match value {
            Value::Time(t) => {
                if greater_than_zero && *t <= DateTime::<Utc>::UNIX_EPOCH {
                    Err(not_positive())
                } else {
                    Ok(None)
                }
            }
            _ => Err(mismatch()),
        },
    }
}

fn fits_f32(n: f64) -> bool {
    n.is_finite() && n.abs() <= f32::MAX as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(properties: &[PropertySpec], payload: &str) -> Outcome {
        let message = DecodedMessage::decode(payload.as_bytes()).unwrap();
        check_message(&message, properties, &CancellationToken::new())
    }

    #[test]
    fn test_mandatory_bool() {
        let props = [PropertySpec::new("example", PropertyType::Bool)];

        assert_eq!(check(&props, r#"{"example": true}"#), Outcome::Passed);
        assert_eq!(
            check(&props, "{}"),
            Outcome::Failed(Violation::Missing {
                path: "example".to_string()
            })
        );
        assert!(matches!(
            check(&props, r#"{"example": "yes"}"#),
            Outcome::Failed(Violation::TypeMismatch { found: "string", .. })
        ));
    }

    #[test]
    fn test_int_greater_than_zero_boundary() {
        let props = [PropertySpec::new("n", PropertyType::Int).greater_than_zero()];

        assert!(matches!(
            check(&props, r#"{"n": -1}"#),
            Outcome::Failed(Violation::NotGreaterThanZero { .. })
        ));
        assert!(matches!(
            check(&props, r#"{"n": 0}"#),
            Outcome::Failed(Violation::NotGreaterThanZero { .. })
        ));
        assert_eq!(check(&props, r#"{"n": 5}"#), Outcome::Passed);
    }

    #[test]
    fn test_int_rejects_fractions_and_wide_values() {
        let props = [PropertySpec::new("n", PropertyType::Int)];
        assert!(matches!(
            check(&props, r#"{"n": 1.5}"#),
            Outcome::Failed(Violation::TypeMismatch { .. })
        ));
        assert!(matches!(
            check(&props, r#"{"n": 4294967296}"#),
            Outcome::Failed(Violation::TypeMismatch { .. })
        ));

        let wide = [PropertySpec::new("n", PropertyType::Int64)];
        assert_eq!(check(&wide, r#"{"n": 4294967296}"#), Outcome::Passed);
    }

    #[test]
    fn test_floats_accept_integers() {
        let props = [PropertySpec::new("f", PropertyType::Float64).greater_than_zero()];
        assert_eq!(check(&props, r#"{"f": 3}"#), Outcome::Passed);
        assert_eq!(check(&props, r#"{"f": 0.25}"#), Outcome::Passed);
        assert!(matches!(
            check(&props, r#"{"f": -0.1}"#),
            Outcome::Failed(Violation::NotGreaterThanZero { .. })
        ));

        let narrow = [PropertySpec::new("f", PropertyType::Float32)];
        assert!(matches!(
            check(&narrow, r#"{"f": 1e300}"#),
            Outcome::Failed(Violation::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_nested_not_blank() {
        let props = [PropertySpec::new("s", PropertyType::Struct)
            .with_children(vec![PropertySpec::new("x", PropertyType::String).not_blank()])];

        assert_eq!(
            check(&props, r#"{"s": {"x": ""}}"#),
            Outcome::Failed(Violation::Blank {
                path: "s.x".to_string()
            })
        );
        assert_eq!(check(&props, r#"{"s": {"x": "ok"}}"#), Outcome::Passed);
        assert!(matches!(
            check(&props, r#"{"s": 1}"#),
            Outcome::Failed(Violation::TypeMismatch { ref path, .. }) if path == "s"
        ));
    }

    #[test]
    fn test_struct_without_children_checks_presence_only() {
        let props = [PropertySpec::new("meta", PropertyType::Struct)];
        assert_eq!(check(&props, r#"{"meta": {"anything": [1]}}"#), Outcome::Passed);
        assert!(matches!(check(&props, "{}"), Outcome::Failed(Violation::Missing { .. })));
    }

    #[test]
    fn test_optional_absent_passes() {
        let props = [
            PropertySpec::new("note", PropertyType::String).optional(),
            PropertySpec::new("id", PropertyType::Int64),
        ];

        assert_eq!(check(&props, r#"{"id": 7}"#), Outcome::Passed);
        // Present optional values are still type checked
        assert!(matches!(
            check(&props, r#"{"note": 3, "id": 7}"#),
            Outcome::Failed(Violation::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_present_null_is_a_type_mismatch() {
        let optional = [PropertySpec::new("note", PropertyType::String).optional()];
        assert_eq!(
            check(&optional, r#"{"note": null}"#),
            Outcome::Failed(Violation::TypeMismatch {
                path: "note".to_string(),
                expected: PropertyType::String,
                found: "null",
            })
        );

        let mandatory = [PropertySpec::new("s", PropertyType::Struct)];
        assert!(matches!(
            check(&mandatory, r#"{"s": null}"#),
            Outcome::Failed(Violation::TypeMismatch { found: "null", .. })
        ));
    }

    #[test]
    fn test_first_violation_wins() {
        let props = [
            PropertySpec::new("a", PropertyType::Bool),
            PropertySpec::new("b", PropertyType::Bool),
        ];
        assert_eq!(
            check(&props, r#"{"a": 1}"#),
            Outcome::Failed(Violation::TypeMismatch {
                path: "a".to_string(),
                expected: PropertyType::Bool,
                found: "integer",
            })
        );
    }

    #[test]
    fn test_time_properties() {
        let props = [PropertySpec::new("at", PropertyType::Time).greater_than_zero()];
        assert_eq!(check(&props, r#"{"at": "2024-03-01T12:00:00Z"}"#), Outcome::Passed);
        assert!(matches!(
            check(&props, r#"{"at": "1970-01-01T00:00:00Z"}"#),
            Outcome::Failed(Violation::NotGreaterThanZero { .. })
        ));
        assert!(matches!(
            check(&props, r#"{"at": "yesterday"}"#),
            Outcome::Failed(Violation::TypeMismatch { .. })
        ));

        let as_string = [PropertySpec::new("at", PropertyType::String).not_blank()];
        assert_eq!(check(&as_string, r#"{"at": "2024-03-01T12:00:00Z"}"#), Outcome::Passed);
    }

    #[test]
    fn test_cancelled_walk_is_aborted() {
        let props = [PropertySpec::new("example", PropertyType::Bool)];
        let message = DecodedMessage::decode(b"{}").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(check_message(&message, &props, &cancel), Outcome::Aborted);
    }

    #[test]
    fn test_validate_is_repeatable() {
        let props = [PropertySpec::new("example", PropertyType::Bool)];
        let cancel = CancellationToken::new();

        for _ in 0..3 {
            assert!(matches!(validate(b"{}", &props, &cancel), Verdict::Failed(_)));
            assert!(matches!(
                validate(br#"{"example": false}"#, &props, &cancel),
                Verdict::Passed
            ));
        }

        let verdict = validate(b"not json", &props, &cancel);
        assert!(matches!(verdict, Verdict::Undecodable(_)));
        assert!(verdict.failure_reason().is_some());
    }
}
