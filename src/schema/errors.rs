//! Mapping error types
//!
//! Error codes:
//! - JSONMAP_VALIDATION_FAILED (REJECT)
//! - JSONMAP_MALFORMED_INPUT (REJECT)
//! - JSONMAP_INCOMPLETE_OBJECT (REJECT)
//! - JSONMAP_ENCODING_FAILED (REJECT)
//! - JSONMAP_RECONSTRUCT_FAILED (REJECT)
//! - JSONMAP_INVALID_DEFINITION (FATAL)
//! - JSONMAP_UNBOUND_TYPE (FATAL)
//! - JSONMAP_ALREADY_BOUND (FATAL)
//! - JSONMAP_REGISTRY_INSTALLED (FATAL)

use std::fmt;

use thiserror::Error;

/// Severity levels for mapping errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller data rejected
    Reject,
    /// Programming error in schema setup
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// A single field-level problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Field path (e.g., "location.bucket", "tags[2]")
    pub field: String,
    /// Expected type or condition
    pub expected: String,
    /// Actual value or type found
    pub actual: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(field, "field to be present", "missing")
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::new(field, "no undeclared fields", "unknown field present")
    }

    pub fn type_mismatch(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    pub fn null_value(field: impl Into<String>) -> Self {
        Self::new(field, "non-null value", "null")
    }

    pub fn constraint(field: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::new(field, expected, actual)
    }

    /// Prefixes the field path, used when reporting errors of a collection element.
    pub(crate) fn nested_under(mut self, prefix: &str) -> Self {
        self.field = if self.field.starts_with('[') {
            format!("{}{}", prefix, self.field)
        } else {
            format!("{}.{}", prefix, self.field)
        };
        self
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field '{}': expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// The set of field-level problems found while loading one document.
///
/// Never empty when carried by [`MappingError::Validation`]. Entries are
/// ordered by field path so reports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// Field paths that failed, in report order.
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    /// First error reported for the given field path.
    pub fn get(&self, field: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Sorts by field path and returns `Err` if anything was recorded.
    pub(crate) fn into_result(mut self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            return Ok(());
        }
        self.errors.sort_by(|a, b| a.field.cmp(&b.field));
        Err(self)
    }

    pub(crate) fn nested_under(self, prefix: &str) -> Self {
        Self {
            errors: self.errors.into_iter().map(|e| e.nested_under(prefix)).collect(),
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl IntoIterator for ValidationErrors {
    type Item = FieldError;
    type IntoIter = std::vec::IntoIter<FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Errors raised by load, dump, and schema binding.
#[derive(Debug, Clone, Error)]
pub enum MappingError {
    /// One or more fields failed validation
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Input is not a well-formed field mapping
    #[error("malformed input: {reason}")]
    MalformedInput { reason: String },

    /// Outgoing instance lacks a field the schema reads
    #[error("incomplete {type_name}: field '{field}' {reason}")]
    IncompleteObject {
        type_name: &'static str,
        field: String,
        reason: String,
    },

    /// A value cannot be represented in JSON
    #[error("cannot encode field '{field}': {reason}")]
    Encoding { field: String, reason: String },

    /// The reconstruction hook rejected validated fields
    #[error("cannot reconstruct {type_name}: {reason}")]
    Reconstruct { type_name: &'static str, reason: String },

    /// Schema definition is malformed
    #[error("invalid schema definition '{schema}': {reason}")]
    Definition { schema: String, reason: String },

    /// No schema bound for the type
    #[error("no schema bound for type {type_name}")]
    Unbound { type_name: &'static str },

    /// A schema is already bound for the type
    #[error("schema for type {type_name} is already bound")]
    AlreadyBound { type_name: &'static str },

    /// The global binding table has already been installed
    #[error("global schema registry is already installed")]
    RegistryInstalled,
}

impl MappingError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        MappingError::MalformedInput { reason: reason.into() }
    }

    pub fn incomplete(type_name: &'static str, field: impl Into<String>, reason: impl Into<String>) -> Self {
        MappingError::IncompleteObject {
            type_name,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn encoding(field: impl Into<String>, reason: impl Into<String>) -> Self {
        MappingError::Encoding {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn reconstruct(type_name: &'static str, reason: impl Into<String>) -> Self {
        MappingError::Reconstruct {
            type_name,
            reason: reason.into(),
        }
    }

    pub fn definition(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        MappingError::Definition {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            MappingError::Validation(_) => "JSONMAP_VALIDATION_FAILED",
            MappingError::MalformedInput { .. } => "JSONMAP_MALFORMED_INPUT",
            MappingError::IncompleteObject { .. } => "JSONMAP_INCOMPLETE_OBJECT",
            MappingError::Encoding { .. } => "JSONMAP_ENCODING_FAILED",
            MappingError::Reconstruct { .. } => "JSONMAP_RECONSTRUCT_FAILED",
            MappingError::Definition { .. } => "JSONMAP_INVALID_DEFINITION",
            MappingError::Unbound { .. } => "JSONMAP_UNBOUND_TYPE",
            MappingError::AlreadyBound { .. } => "JSONMAP_ALREADY_BOUND",
            MappingError::RegistryInstalled => "JSONMAP_REGISTRY_INSTALLED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            MappingError::Definition { .. }
            | MappingError::Unbound { .. }
            | MappingError::AlreadyBound { .. }
            | MappingError::RegistryInstalled => Severity::Fatal,
            _ => Severity::Reject,
        }
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Field-level problems, if this is a validation error
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            MappingError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for MappingError {
    fn from(errors: ValidationErrors) -> Self {
        MappingError::Validation(errors)
    }
}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;
