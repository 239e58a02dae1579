//! Schema catalog.
//!
//! Validators are fixed at build time. The catalog is built once at startup
//! and each worker holds a shared, read-only [`ValidatorSpec`].

use std::fmt;
use std::sync::Arc;

/// Which notification a failing payload triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsequenceKind {
    Email,
    ApiCall,
}

impl fmt::Display for ConsequenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsequenceKind::Email => write!(f, "email"),
            ConsequenceKind::ApiCall => write!(f, "api call"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Struct,
    Bool,
    Int,
    Int64,
    Float32,
    Float64,
    String,
    Time,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Struct => "struct",
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Int64 => "int64",
            PropertyType::Float32 => "float32",
            PropertyType::Float64 => "float64",
            PropertyType::String => "string",
            PropertyType::Time => "time",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule applied to a property. Every constraint other than `Optional`
/// also requires the property to be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Constraint {
    #[default]
    Mandatory,
    Optional,
    /// Strings only
    NotBlank,
    /// Numbers and times only
    GreaterThanZero,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: String,
    pub property_type: PropertyType,
    pub constraint: Constraint,
    /// Only meaningful for `PropertyType::Struct`
    pub children: Vec<PropertySpec>,
}

impl PropertySpec {
    /// A mandatory property with no children.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            constraint: Constraint::Mandatory,
            children: Vec::new(),
        }
    }

    pub fn optional(mut self) -> Self {
        self.constraint = Constraint::Optional;
        self
    }

    pub fn not_blank(mut self) -> Self {
        self.constraint = Constraint::NotBlank;
        self
    }

    pub fn greater_than_zero(mut self) -> Self {
        self.constraint = Constraint::GreaterThanZero;
        self
    }

    pub fn with_children(mut self, children: Vec<PropertySpec>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorSpec {
    pub topic: String,
    pub consequence: ConsequenceKind,
    /// E-mail address or API endpoint
    pub endpoint: String,
    pub template: Option<String>,
    /// Consumer group for this topic. Falls back to `VALIDATOR_GROUP`.
    pub group: Option<String>,
    pub properties: Vec<PropertySpec>,
}

#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    validators: Vec<Arc<ValidatorSpec>>,
}

impl SchemaCatalog {
    pub fn new(validators: Vec<ValidatorSpec>) -> Self {
        Self {
            validators: validators.into_iter().map(Arc::new).collect(),
        }
    }

    /// Validators shipped with this build.
    pub fn builtin() -> Self {
        Self::new(vec![ValidatorSpec {
            topic: "data.test".to_string(),
            consequence: ConsequenceKind::Email,
            endpoint: "alert@email.com".to_string(),
            template: Some("Something went wrong with the message:".to_string()),
            group: None,
            properties: vec![PropertySpec::new("example", PropertyType::Bool)],
        }])
    }

    /// Validators in registration order.
    pub fn validators(&self) -> impl Iterator<Item = Arc<ValidatorSpec>> + '_ {
        self.validators.iter().cloned()
    }

    pub fn for_topic(&self, topic: &str) -> Option<Arc<ValidatorSpec>> {
        self.validators.iter().find(|v| v.topic == topic).cloned()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}
