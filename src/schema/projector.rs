//! Projects an outgoing instance onto its declared fields.
//!
//! The projector receives the instance already rendered as a JSON value and
//! keeps only declared fields, renamed to their data keys and in declaration
//! order. The same declarations used for loading are applied:
//! - a declared field absent from the instance is `IncompleteObject`
//! - a value that does not fit its declaration is `Encoding`

use serde_json::{Map, Value};

use super::errors::{MappingError, MappingResult};
use super::types::{FieldDecl, FieldType};
use super::validator::{json_type_name, make_path, normalize_datetime, normalize_uuid};

pub struct Projector {
    type_name: &'static str,
}

impl Projector {
    pub fn new(type_name: &'static str) -> Self {
        Self { type_name }
    }

    /// Projects a rendered instance.
    pub fn project(&self, fields: &[FieldDecl], rendered: Value) -> MappingResult<Map<String, Value>> {
        match rendered {
            Value::Object(obj) => self.project_object(&obj, fields, ""),
            other => Err(MappingError::incomplete(
                self.type_name,
                "$root",
                format!("rendered as {} instead of an object", json_type_name(&other)),
            )),
        }
    }

    fn project_object(
        &self,
        obj: &Map<String, Value>,
        fields: &[FieldDecl],
        path_prefix: &str,
    ) -> MappingResult<Map<String, Value>> {
        let mut out = Map::new();

        for decl in fields {
            let field_path = make_path(path_prefix, &decl.name);

            match obj.get(&decl.name) {
                None if decl.def.required => {
                    return Err(MappingError::incomplete(self.type_name, field_path, "is missing"));
                }
                None => {}
                Some(Value::Null) if decl.def.nullable => {
                    out.insert(decl.key().to_string(), Value::Null);
                }
                Some(Value::Null) if decl.def.required => {
                    // serde renders non-finite floats as null
                    if decl.def.field_type == FieldType::Float {
                        return Err(MappingError::encoding(field_path, "float is null or not finite"));
                    }
                    return Err(MappingError::incomplete(self.type_name, field_path, "is null"));
                }
                Some(Value::Null) => {}
                Some(value) => {
                    let projected = self.project_value(value, &decl.def.field_type, &field_path)?;
                    out.insert(decl.key().to_string(), projected);
                }
            }
        }

        Ok(out)
    }

    fn project_value(&self, value: &Value, expected_type: &FieldType, field_path: &str) -> MappingResult<Value> {
        let mismatch = || {
            MappingError::encoding(
                field_path,
                format!("expected {}, got {}", expected_type.type_name(), json_type_name(value)),
            )
        };

        match expected_type {
            FieldType::String if value.is_string() => Ok(value.clone()),
            FieldType::Int if value.is_i64() || value.is_u64() => Ok(value.clone()),
            FieldType::Float if value.is_number() => Ok(value.clone()),
            FieldType::Bool if value.is_boolean() => Ok(value.clone()),
            FieldType::DateTime => value
                .as_str()
                .and_then(normalize_datetime)
                .map(Value::String)
                .ok_or_else(mismatch),
            FieldType::Uuid => value
                .as_str()
                .and_then(normalize_uuid)
                .map(Value::String)
                .ok_or_else(mismatch),
            FieldType::Any => Ok(value.clone()),
            FieldType::Object { fields } => {
                let obj = value.as_object().ok_or_else(mismatch)?;
                self.project_object(obj, fields, field_path).map(Value::Object)
            }
            FieldType::Array { element_type } => {
                let arr = value.as_array().ok_or_else(mismatch)?;
                arr.iter()
                    .enumerate()
                    .map(|(i, elem)| self.project_value(elem, element_type, &format!("{}[{}]", field_path, i)))
                    .collect::<MappingResult<Vec<_>>>()
                    .map(Value::Array)
            }
            FieldType::Map { value_type } => {
                let obj = value.as_object().ok_or_else(mismatch)?;
                let mut out = Map::new();
                for (key, entry) in obj {
                    let projected = self.project_value(entry, value_type, &make_path(field_path, key))?;
                    out.insert(key.clone(), projected);
                }
                Ok(Value::Object(out))
            }
            _ => Err(mismatch()),
        }
    }
}
