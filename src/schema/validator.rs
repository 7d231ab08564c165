//! Schema validator for incoming documents
//!
//! Validation semantics:
//! - All required fields are present
//! - Field types match declarations (int accepted for float)
//! - `null` only where the field is nullable
//! - Undeclared fields handled per [`UnknownFields`]
//! - Every problem is reported, not just the first
//!
//! The validator does not mutate its input; it builds a new field map keyed
//! by attribute name with coerced values and defaults filled in.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use crate::config::UnknownFields;

use super::errors::{FieldError, MappingError, MappingResult, ValidationErrors};
use super::types::{Constraint, FieldDecl, FieldDef, FieldType};

/// Validates documents against field declarations.
pub struct SchemaValidator {
    unknown: UnknownFields,
}

impl SchemaValidator {
    pub fn new(unknown: UnknownFields) -> Self {
        Self { unknown }
    }

    /// Validates a document against the declared fields.
    ///
    /// # Errors
    ///
    /// - `MalformedInput` if the document is not an object or nests deeper
    ///   than `max_depth`
    /// - `Validation` with every field-level problem otherwise
    pub fn validate_document(
        &self,
        fields: &[FieldDecl],
        document: &Value,
        max_depth: usize,
    ) -> MappingResult<Map<String, Value>> {
        let obj = document.as_object().ok_or_else(|| {
            MappingError::malformed(format!("expected a JSON object, got {}", json_type_name(document)))
        })?;

        let depth = json_depth(document);
        if depth > max_depth {
            return Err(MappingError::malformed(format!(
                "document nesting depth {} exceeds limit {}",
                depth, max_depth
            )));
        }

        let mut errors = ValidationErrors::new();
        let validated = self.validate_object(obj, fields, "", &mut errors);
        errors.into_result()?;
        Ok(validated)
    }

    /// Checks a single value against a field definition, returning the coerced value.
    pub fn check_value(&self, def: &FieldDef, value: &Value, path: &str) -> Result<Value, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let checked = self.validate_field(def, value, path, &mut errors);
        errors.into_result()?;
        Ok(checked.unwrap_or(Value::Null))
    }

    fn validate_object(
        &self,
        obj: &Map<String, Value>,
        fields: &[FieldDecl],
        path_prefix: &str,
        errors: &mut ValidationErrors,
    ) -> Map<String, Value> {
        let mut out = Map::new();

        for decl in fields {
            let key = decl.key();
            let field_path = make_path(path_prefix, key);

            match obj.get(key) {
                Some(value) => {
                    if let Some(checked) = self.validate_field(&decl.def, value, &field_path, errors) {
                        out.insert(decl.name.clone(), checked);
                    }
                }
                None if decl.def.required => errors.push(FieldError::missing_field(field_path)),
                None => {
                    let checked = decl
                        .def
                        .default
                        .as_ref()
                        .and_then(|default| self.validate_field(&decl.def, default, &field_path, errors));
                    if let Some(checked) = checked {
                        out.insert(decl.name.clone(), checked);
                    }
                }
            }
        }

        if self.unknown != UnknownFields::Ignore {
            for (key, value) in obj {
                if fields.iter().any(|decl| decl.key() == key) {
                    continue;
                }
                match self.unknown {
                    UnknownFields::Reject => errors.push(FieldError::unknown_field(make_path(path_prefix, key))),
                    // A renamed field's attribute name would shadow the validated value.
                    UnknownFields::Include if fields.iter().any(|decl| decl.name == *key) => {
                        errors.push(FieldError::unknown_field(make_path(path_prefix, key)));
                    }
                    UnknownFields::Include => {
                        out.insert(key.clone(), value.clone());
                    }
                    UnknownFields::Ignore => {}
                }
            }
        }

        out
    }

    fn validate_field(
        &self,
        def: &FieldDef,
        value: &Value,
        field_path: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        if value.is_null() {
            if def.nullable {
                return Some(Value::Null);
            }
            errors.push(FieldError::null_value(field_path));
            return None;
        }

        let before = errors.len();
        let checked = self.validate_value(value, &def.field_type, field_path, errors)?;
        if errors.len() == before {
            check_constraints(&checked, &def.constraints, field_path, errors);
        }
        Some(checked)
    }

    /// Validates a value against a field type, returning the coerced value.
    fn validate_value(
        &self,
        value: &Value,
        expected_type: &FieldType,
        field_path: &str,
        errors: &mut ValidationErrors,
    ) -> Option<Value> {
        let mismatch = |errors: &mut ValidationErrors| -> Option<Value> {
            errors.push(type_error(field_path, expected_type.type_name(), value));
            None
        };

        match expected_type {
            FieldType::String if value.is_string() => Some(value.clone()),
            FieldType::Int if value.is_i64() || value.is_u64() => Some(value.clone()),
            FieldType::Float => match value.as_f64().and_then(Number::from_f64) {
                Some(n) => Some(Value::Number(n)),
                None => mismatch(errors),
            },
            FieldType::Bool if value.is_boolean() => Some(value.clone()),
            FieldType::DateTime => match value.as_str().map(normalize_datetime) {
                Some(Some(normalized)) => Some(Value::String(normalized)),
                Some(None) => {
                    errors.push(FieldError::type_mismatch(field_path, "RFC 3339 datetime", "unparseable string"));
                    None
                }
                None => mismatch(errors),
            },
            FieldType::Uuid => match value.as_str().map(normalize_uuid) {
                Some(Some(normalized)) => Some(Value::String(normalized)),
                Some(None) => {
                    errors.push(FieldError::type_mismatch(field_path, "uuid", "unparseable string"));
                    None
                }
                None => mismatch(errors),
            },
            FieldType::Any => Some(value.clone()),
            FieldType::Object { fields } => match value.as_object() {
                Some(obj) => Some(Value::Object(self.validate_object(obj, fields, field_path, errors))),
                None => mismatch(errors),
            },
            FieldType::Array { element_type } => {
                let Some(arr) = value.as_array() else {
                    return mismatch(errors);
                };
                let mut out = Vec::with_capacity(arr.len());
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}[{}]", field_path, i);
                    if elem.is_null() {
                        errors.push(FieldError::null_value(elem_path));
                        continue;
                    }
                    if let Some(checked) = self.validate_value(elem, element_type, &elem_path, errors) {
                        out.push(checked);
                    }
                }
                Some(Value::Array(out))
            }
            FieldType::Map { value_type } => {
                let Some(obj) = value.as_object() else {
                    return mismatch(errors);
                };
                let mut out = Map::new();
                for (key, entry) in obj {
                    let entry_path = make_path(field_path, key);
                    if entry.is_null() {
                        errors.push(FieldError::null_value(entry_path));
                        continue;
                    }
                    if let Some(checked) = self.validate_value(entry, value_type, &entry_path, errors) {
                        out.insert(key.clone(), checked);
                    }
                }
                Some(Value::Object(out))
            }
            _ => mismatch(errors),
        }
    }
}

fn check_constraints(value: &Value, constraints: &[Constraint], field_path: &str, errors: &mut ValidationErrors) {
    for constraint in constraints {
        match constraint {
            Constraint::MinLength(min) => {
                if let Some(len) = value_length(value) {
                    if len < *min {
                        errors.push(FieldError::constraint(
                            field_path,
                            format!("length >= {}", min),
                            format!("length {}", len),
                        ));
                    }
                }
            }
            Constraint::MaxLength(max) => {
                if let Some(len) = value_length(value) {
                    if len > *max {
                        errors.push(FieldError::constraint(
                            field_path,
                            format!("length <= {}", max),
                            format!("length {}", len),
                        ));
                    }
                }
            }
            Constraint::Min(min) => {
                if let Some(n) = value.as_f64() {
                    if n < *min {
                        errors.push(FieldError::constraint(field_path, format!(">= {}", min), value.to_string()));
                    }
                }
            }
            Constraint::Max(max) => {
                if let Some(n) = value.as_f64() {
                    if n > *max {
                        errors.push(FieldError::constraint(field_path, format!("<= {}", max), value.to_string()));
                    }
                }
            }
            Constraint::OneOf(allowed) => {
                if !allowed.iter().any(|choice| same_value(choice, value)) {
                    let choices: Vec<String> = allowed.iter().map(Value::to_string).collect();
                    errors.push(FieldError::constraint(
                        field_path,
                        format!("one of [{}]", choices.join(", ")),
                        value.to_string(),
                    ));
                }
            }
            Constraint::Pattern(pattern) => {
                if let Some(text) = value.as_str() {
                    if !pattern.is_match(text) {
                        errors.push(FieldError::constraint(
                            field_path,
                            format!("match for /{}/", pattern.as_str()),
                            value.to_string(),
                        ));
                    }
                }
            }
        }
    }
}

/// JSON equality, except numbers compare by value so `1` matches `1.0`.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => a == b,
    }
}

fn value_length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        _ => None,
    }
}

/// Parses an RFC 3339 timestamp and renders it in UTC.
pub(crate) fn normalize_datetime(text: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Parses a UUID in any accepted form and renders it hyphenated lowercase.
pub(crate) fn normalize_uuid(text: &str) -> Option<String> {
    Uuid::parse_str(text).ok().map(|id| id.hyphenated().to_string())
}

/// Returns the JSON type name for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "int"
            } else {
                "float"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Creates a field path from prefix and field name.
pub(crate) fn make_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", prefix, field)
    }
}

/// Maximum container nesting of a JSON value; scalars have depth 0.
fn json_depth(value: &Value) -> usize {
    let mut max = 0;
    let mut stack = vec![(value, 0usize)];
    while let Some((current, depth)) = stack.pop() {
        match current {
            Value::Array(items) => {
                max = max.max(depth + 1);
                stack.extend(items.iter().map(|v| (v, depth + 1)));
            }
            Value::Object(obj) => {
                max = max.max(depth + 1);
                stack.extend(obj.values().map(|v| (v, depth + 1)));
            }
            _ => {}
        }
    }
    max
}

fn type_error(field_path: &str, expected: &str, actual: &Value) -> FieldError {
    FieldError::type_mismatch(field_path, expected, json_type_name(actual))
}
