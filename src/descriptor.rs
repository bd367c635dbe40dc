//! Event and error descriptors
//!
//! A descriptor names one kind of beacon: its id (`evid` for events, `errc`
//! for errors), the endpoint it is sent to, an optional field schema and, for
//! errors, a severity. Descriptors are shared as `Arc<Descriptor>`; the
//! registry compares them by pointer, so the `Arc` a caller registered is the
//! one it must emit with.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::encode::number_token;

/// Which pipeline a descriptor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Event,
    Error,
}

impl Kind {
    /// Query parameter carrying the descriptor id
    pub fn id_param(self) -> &'static str {
        match self {
            Kind::Event => "evid",
            Kind::Error => "errc",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Kind::Event => "Event",
            Kind::Error => "Error",
        }
    }

    /// The descriptor's id for this kind, if present and non-empty
    pub fn id_of(self, desc: &Descriptor) -> Option<&str> {
        let id = match self {
            Kind::Event => desc.evid.as_deref(),
            Kind::Error => desc.errc.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Event => write!(f, "event"),
            Kind::Error => write!(f, "error"),
        }
    }
}

/// Declared type of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
}

impl FieldType {
    /// Runtime type of a field value. `Null` has none.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::String(_) => Some(FieldType::String),
            Value::Number(_) => Some(FieldType::Number),
            Value::Bool(_) => Some(FieldType::Boolean),
            Value::Object(_) | Value::Array(_) => Some(FieldType::Object),
            Value::Null => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type name of a value for diagnostics
pub fn type_name(value: &Value) -> &'static str {
    FieldType::of(value).map(FieldType::name).unwrap_or("null")
}

/// Error severity levels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Recoverable = 10,
    Warning = 20,
    #[default]
    Error = 30,
    Fatal = 40,
}

impl Severity {
    pub fn level(self) -> u32 {
        self as u32
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "recoverable" => Some(Severity::Recoverable),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "fatal" => Some(Severity::Fatal),
            _ => None,
        }
    }
}

/// Severity as written on a descriptor: a level name or a raw number
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SeverityValue {
    Level(Number),
    Named(String),
}

impl SeverityValue {
    /// Zero and the empty name count as unset
    pub fn is_set(&self) -> bool {
        match self {
            SeverityValue::Level(level) => level.as_f64().is_some_and(|level| level != 0.0),
            SeverityValue::Named(name) => !name.is_empty(),
        }
    }

    /// Wire form: numbers pass through, names map through [`Severity`]
    /// with unrecognized names falling back to `error`
    pub fn token(&self) -> String {
        match self {
            SeverityValue::Level(level) => number_token(level),
            SeverityValue::Named(name) => Severity::from_name(name).unwrap_or_default().level().to_string(),
        }
    }
}

impl From<Severity> for SeverityValue {
    fn from(severity: Severity) -> Self {
        SeverityValue::Level(Number::from(severity.level()))
    }
}

impl From<Number> for SeverityValue {
    fn from(level: Number) -> Self {
        SeverityValue::Level(level)
    }
}

impl From<&str> for SeverityValue {
    fn from(name: &str) -> Self {
        SeverityValue::Named(name.to_string())
    }
}

/// Describes one event or error
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Descriptor {
    /// Event id
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub evid: Option<String>,

    /// Error code
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub errc: Option<String>,

    /// Overrides the context's default endpoint for this kind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Minimum type check for emitted fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, FieldType>>,

    #[serde(default, alias = "sev", skip_serializing_if = "Option::is_none")]
    pub severity: Option<SeverityValue>,
}

impl Descriptor {
    pub fn event(evid: impl Into<String>) -> Self {
        Self {
            evid: Some(evid.into()),
            ..Self::default()
        }
    }

    pub fn error(errc: impl Into<String>) -> Self {
        Self {
            errc: Some(errc.into()),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Declare a field type; creates the schema on first use
    pub fn with_field(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.get_or_insert_with(IndexMap::new).insert(name.into(), field_type);
        self
    }

    pub fn with_severity(mut self, severity: impl Into<SeverityValue>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    /// Wrap for registration and emission
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
    Float(f64),
}

/// Ids may be written as numbers in catalogs
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawId>::deserialize(deserializer)?;
    Ok(raw.map(|raw| match raw {
        RawId::Text(text) => text,
        RawId::Int(int) => int.to_string(),
        RawId::Float(float) => float.to_string(),
    }))
}
