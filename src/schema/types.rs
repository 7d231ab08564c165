//! Schema type definitions
//!
//! Supported field types:
//! - string: UTF-8 string
//! - int: 64-bit integer (signed or unsigned)
//! - float: 64-bit floating point, integers accepted
//! - bool: Boolean
//! - datetime: RFC 3339 timestamp string, normalized to UTC
//! - uuid: UUID string, normalized to lowercase hyphenated form
//! - any: arbitrary JSON, passed through untouched
//! - object: nested object with its own declared fields
//! - array: homogeneous array with element type
//! - map: free-form string keys with a single value type

use std::collections::HashSet;

use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::config::UnknownFields;

use super::errors::{MappingError, MappingResult};
use super::validator::SchemaValidator;

/// Supported field types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    DateTime,
    Uuid,
    Any,
    /// Nested object with its own field declarations
    Object {
        fields: Vec<FieldDecl>,
    },
    /// Homogeneous array with single element type
    Array {
        element_type: Box<FieldType>,
    },
    /// String-keyed map with single value type
    Map {
        value_type: Box<FieldType>,
    },
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "datetime",
            FieldType::Uuid => "uuid",
            FieldType::Any => "any",
            FieldType::Object { .. } => "object",
            FieldType::Array { .. } => "array",
            FieldType::Map { .. } => "map",
        }
    }

    pub fn object(fields: Vec<FieldDecl>) -> Self {
        FieldType::Object { fields }
    }

    pub fn array_of(element_type: FieldType) -> Self {
        FieldType::Array {
            element_type: Box::new(element_type),
        }
    }

    pub fn map_of(value_type: FieldType) -> Self {
        FieldType::Map {
            value_type: Box::new(value_type),
        }
    }

    fn has_length(&self) -> bool {
        matches!(
            self,
            FieldType::String | FieldType::Array { .. } | FieldType::Map { .. }
        )
    }

    fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float)
    }
}

/// A compiled regular expression that serializes as its source text.
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.0.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(de::Error::custom)
    }
}

/// Value constraints checked after a field passes its type check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Minimum length of a string (in chars), array, or map
    MinLength(usize),
    /// Maximum length of a string (in chars), array, or map
    MaxLength(usize),
    /// Inclusive numeric lower bound
    Min(f64),
    /// Inclusive numeric upper bound
    Max(f64),
    /// Value must equal one of the listed JSON values
    OneOf(Vec<Value>),
    /// String must match the regular expression
    Pattern(Pattern),
}

impl Constraint {
    /// Builds a pattern constraint, failing on an invalid expression.
    pub fn pattern(source: &str) -> MappingResult<Self> {
        Pattern::new(source)
            .map(Constraint::Pattern)
            .map_err(|e| MappingError::definition("<pattern>", e.to_string()))
    }

    fn applies_to(&self, field_type: &FieldType) -> bool {
        match self {
            Constraint::MinLength(_) | Constraint::MaxLength(_) => field_type.has_length(),
            Constraint::Min(_) | Constraint::Max(_) => field_type.is_numeric(),
            Constraint::OneOf(_) => true,
            Constraint::Pattern(_) => matches!(field_type, FieldType::String),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::OneOf(_) => "one_of",
            Constraint::Pattern(_) => "pattern",
        }
    }
}

fn default_required() -> bool {
    true
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Field definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field data type
    #[serde(flatten)]
    pub field_type: FieldType,
    /// Whether field must be present on load
    #[serde(default = "default_required")]
    pub required: bool,
    /// Whether `null` is an accepted value
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// JSON key when it differs from the attribute name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_key: Option<String>,
    /// Value loaded when an optional field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl FieldDef {
    /// Create a required field of the given type
    pub fn required(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: true,
            nullable: false,
            data_key: None,
            default: None,
            constraints: Vec::new(),
        }
    }

    /// Create an optional field of the given type
    pub fn optional(field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(field_type)
        }
    }

    pub fn required_string() -> Self {
        Self::required(FieldType::String)
    }

    pub fn optional_string() -> Self {
        Self::optional(FieldType::String)
    }

    pub fn required_int() -> Self {
        Self::required(FieldType::Int)
    }

    pub fn optional_int() -> Self {
        Self::optional(FieldType::Int)
    }

    pub fn required_float() -> Self {
        Self::required(FieldType::Float)
    }

    pub fn required_bool() -> Self {
        Self::required(FieldType::Bool)
    }

    pub fn optional_bool() -> Self {
        Self::optional(FieldType::Bool)
    }

    pub fn required_datetime() -> Self {
        Self::required(FieldType::DateTime)
    }

    pub fn required_uuid() -> Self {
        Self::required(FieldType::Uuid)
    }

    pub fn required_object(fields: Vec<FieldDecl>) -> Self {
        Self::required(FieldType::object(fields))
    }

    pub fn optional_object(fields: Vec<FieldDecl>) -> Self {
        Self::optional(FieldType::object(fields))
    }

    pub fn required_array(element_type: FieldType) -> Self {
        Self::required(FieldType::array_of(element_type))
    }

    pub fn optional_array(element_type: FieldType) -> Self {
        Self::optional(FieldType::array_of(element_type))
    }

    /// Accept `null` as a value
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Read and write the field under a different JSON key
    pub fn data_key(mut self, key: impl Into<String>) -> Self {
        self.data_key = Some(key.into());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// JSON key for a field declared under `name`
    pub fn key<'a>(&'a self, name: &'a str) -> &'a str {
        self.data_key.as_deref().unwrap_or(name)
    }
}

/// A named field declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(flatten)]
    pub def: FieldDef,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, def: FieldDef) -> Self {
        Self {
            name: name.into(),
            def,
        }
    }

    /// JSON key this field is read from and written to
    pub fn key(&self) -> &str {
        self.def.key(&self.name)
    }
}

fn default_version() -> String {
    "1".to_string()
}

/// Complete schema definition.
///
/// Field order is significant: dump output follows declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    /// Schema name, used in logs and definition errors
    pub name: String,
    /// Descriptive version label; only one version is bound per type
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Field declarations in declaration order
    pub fields: Vec<FieldDecl>,
    /// Unknown-field policy overriding the active config
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<UnknownFields>,
}

impl SchemaDef {
    /// Create a new schema
    pub fn new(name: impl Into<String>, version: impl Into<String>, fields: Vec<FieldDecl>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            description: None,
            fields,
            unknown: None,
        }
    }

    /// Appends a field declaration
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.push(FieldDecl::new(name, def));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown = Some(policy);
        self
    }

    /// Parses a definition written as a JSON document and checks its structure.
    pub fn from_json_str(text: &str) -> MappingResult<Self> {
        let def: SchemaDef = serde_json::from_str(text)
            .map_err(|e| MappingError::definition("<json>", e.to_string()))?;
        def.validate_structure()?;
        Ok(def)
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.def)
    }

    /// Validates the schema structure itself (not a document)
    pub fn validate_structure(&self) -> MappingResult<()> {
        if self.name.is_empty() {
            return Err(MappingError::definition("", "schema name must not be empty"));
        }
        validate_fields(&self.name, &self.fields, "")
    }
}

fn validate_fields(schema: &str, fields: &[FieldDecl], prefix: &str) -> MappingResult<()> {
    let mut names = HashSet::new();
    let mut keys = HashSet::new();

    for decl in fields {
        let path = if prefix.is_empty() {
            decl.name.clone()
        } else {
            format!("{}.{}", prefix, decl.name)
        };

        if decl.name.is_empty() {
            return Err(MappingError::definition(schema, format!("empty field name under '{}'", prefix)));
        }
        if !names.insert(decl.name.as_str()) {
            return Err(MappingError::definition(schema, format!("field '{}' declared twice", path)));
        }
        if !keys.insert(decl.key()) {
            return Err(MappingError::definition(
                schema,
                format!("field '{}' reuses data key '{}'", path, decl.key()),
            ));
        }

        for constraint in &decl.def.constraints {
            if !constraint.applies_to(&decl.def.field_type) {
                return Err(MappingError::definition(
                    schema,
                    format!(
                        "constraint '{}' does not apply to {} field '{}'",
                        constraint.name(),
                        decl.def.field_type.type_name(),
                        path
                    ),
                ));
            }
        }

        if let Some(default) = &decl.def.default {
            if decl.def.required {
                return Err(MappingError::definition(
                    schema,
                    format!("required field '{}' cannot have a default", path),
                ));
            }
            if let Err(errors) = SchemaValidator::new(UnknownFields::Reject).check_value(&decl.def, default, &path) {
                return Err(MappingError::definition(
                    schema,
                    format!("default for '{}' is invalid: {}", path, errors),
                ));
            }
        }

        validate_nested(schema, &decl.def.field_type, &path)?;
    }

    Ok(())
}

fn validate_nested(schema: &str, field_type: &FieldType, path: &str) -> MappingResult<()> {
    match field_type {
        FieldType::Object { fields } => validate_fields(schema, fields, path),
        FieldType::Array { element_type } => validate_nested(schema, element_type, path),
        FieldType::Map { value_type } => validate_nested(schema, value_type, path),
        _ => Ok(()),
    }
}
