//! Validation engine.
//!
//! One [`ValidatorWorker`] per catalog entry reads its topic, decodes each
//! payload and walks the property tree. Payloads that fail are reported to the
//! consequence dispatcher; nothing is retried.

pub mod catalog;
pub mod error;
pub mod service;
pub mod value;
pub mod walker;

pub use catalog::{
    ConsequenceKind, Constraint, PropertySpec, PropertyType, SchemaCatalog, ValidatorSpec,
};
pub use error::{DecodeError, Violation};
pub use service::ValidatorWorker;
pub use value::{DecodedMessage, Value};
pub use walker::{check_message, validate, Outcome, Verdict};
