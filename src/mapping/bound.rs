//! A schema bound to a Rust type.

use std::any::type_name;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{MappingConfig, DEFAULT_CONFIG};
use crate::schema::{
    json_type_name, Fields, MappingError, MappingResult, Projector, SchemaDef, SchemaValidator,
    ValidationErrors,
};

/// Turns validated fields into an instance.
pub type ReconstructFn<T> = fn(Fields) -> MappingResult<T>;

/// Renders an instance as a JSON value before projection.
pub type ProjectFn<T> = fn(&T) -> MappingResult<Value>;

/// Reconstruction hook that deserializes the validated fields with serde.
///
/// Optional fields the document omitted are simply absent, so the target
/// type should mark them `#[serde(default)]`.
pub fn reconstruct_with_serde<T: DeserializeOwned>(fields: Fields) -> MappingResult<T> {
    fields.deserialize()
}

/// Projection that renders the instance with its `Serialize` impl.
pub fn project_with_serde<T: Serialize>(instance: &T) -> MappingResult<Value> {
    serde_json::to_value(instance).map_err(|e| MappingError::encoding("$root", e.to_string()))
}

/// Schema definition plus the hooks that connect it to `T`.
///
/// Immutable once built and safe to share between threads.
pub struct Schema<T> {
    def: SchemaDef,
    reconstruct: ReconstructFn<T>,
    project: ProjectFn<T>,
    config: Option<MappingConfig>,
}

impl<T> Schema<T> {
    /// Binds a definition with explicit reconstruction and projection hooks.
    ///
    /// # Errors
    ///
    /// Returns `Definition` if the definition fails its structure check.
    pub fn with_hooks(def: SchemaDef, reconstruct: ReconstructFn<T>, project: ProjectFn<T>) -> MappingResult<Self> {
        def.validate_structure()?;
        Ok(Self {
            def,
            reconstruct,
            project,
            config: None,
        })
    }

    /// Binds a definition with a reconstruction hook, projecting via `Serialize`.
    pub fn new(def: SchemaDef, reconstruct: ReconstructFn<T>) -> MappingResult<Self>
    where
        T: Serialize,
    {
        Self::with_hooks(def, reconstruct, project_with_serde::<T>)
    }

    /// Binds a definition using serde in both directions.
    pub fn derived(def: SchemaDef) -> MappingResult<Self>
    where
        T: Serialize + DeserializeOwned,
    {
        Self::with_hooks(def, reconstruct_with_serde::<T>, project_with_serde::<T>)
    }

    pub fn with_config(mut self, config: MappingConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub(crate) fn has_config(&self) -> bool {
        self.config.is_some()
    }

    pub fn definition(&self) -> &SchemaDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Effective config: the schema's own, else the defaults.
    pub fn config(&self) -> &MappingConfig {
        self.config.as_ref().unwrap_or(&DEFAULT_CONFIG)
    }

    fn validator(&self) -> SchemaValidator {
        SchemaValidator::new(self.def.unknown.unwrap_or(self.config().unknown_fields))
    }

    /// Validates a document without reconstructing.
    pub fn validate(&self, data: &Value) -> MappingResult<Fields> {
        trace!(schema = %self.def.name, "validating document");
        let validated = self
            .validator()
            .validate_document(&self.def.fields, data, self.config().max_depth)
            .inspect_err(|e| {
                if let Some(errors) = e.validation_errors() {
                    debug!(schema = %self.def.name, errors = errors.len(), "document rejected");
                }
            })?;
        Ok(Fields::new(type_name::<T>(), validated))
    }

    /// Validates a document and builds an instance from it.
    pub fn load(&self, data: &Value) -> MappingResult<T> {
        let fields = self.validate(data)?;
        (self.reconstruct)(fields)
    }

    /// Parses JSON text, then loads it.
    pub fn load_str(&self, text: &str) -> MappingResult<T> {
        self.load(&parse_text(text)?)
    }

    /// Loads every element of a JSON array.
    ///
    /// Field errors from all elements are reported together, prefixed with
    /// the element index (e.g. `[2].key`).
    pub fn load_many(&self, data: &Value) -> MappingResult<Vec<T>> {
        let items = data.as_array().ok_or_else(|| {
            MappingError::malformed(format!("expected a JSON array, got {}", json_type_name(data)))
        })?;

        let mut validated = Vec::with_capacity(items.len());
        let mut errors = ValidationErrors::new();
        for (i, item) in items.iter().enumerate() {
            match self.validate(item) {
                Ok(fields) => validated.push(fields),
                Err(MappingError::Validation(item_errors)) => {
                    errors.extend(item_errors.nested_under(&format!("[{}]", i)));
                }
                Err(MappingError::MalformedInput { reason }) => {
                    return Err(MappingError::malformed(format!("element [{}]: {}", i, reason)));
                }
                Err(other) => return Err(other),
            }
        }
        errors.into_result()?;

        validated
            .into_iter()
            .enumerate()
            .map(|(i, fields)| (self.reconstruct)(fields).map_err(|e| element_error(i, e)))
            .collect()
    }

    pub fn load_many_str(&self, text: &str) -> MappingResult<Vec<T>> {
        self.load_many(&parse_text(text)?)
    }

    /// Projects an instance onto the declared fields.
    pub fn dump(&self, instance: &T) -> MappingResult<Map<String, Value>> {
        trace!(schema = %self.def.name, "dumping instance");
        let rendered = (self.project)(instance)?;
        Projector::new(type_name::<T>()).project(&self.def.fields, rendered)
    }

    /// Dumps an instance to JSON text.
    pub fn dumps(&self, instance: &T) -> MappingResult<String> {
        let map = self.dump(instance)?;
        self.encode(&Value::Object(map))
    }

    pub fn dump_many(&self, instances: &[T]) -> MappingResult<Vec<Map<String, Value>>> {
        instances.iter().map(|instance| self.dump(instance)).collect()
    }

    pub fn dumps_many(&self, instances: &[T]) -> MappingResult<String> {
        let items = self
            .dump_many(instances)?
            .into_iter()
            .map(Value::Object)
            .collect();
        self.encode(&Value::Array(items))
    }

    fn encode(&self, value: &Value) -> MappingResult<String> {
        let encoded = if self.config().pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.map_err(|e| MappingError::encoding("$root", e.to_string()))
    }
}

/// Tags a hook failure with the index of the element it came from.
fn element_error(index: usize, err: MappingError) -> MappingError {
    match err {
        MappingError::Validation(errors) => MappingError::Validation(errors.nested_under(&format!("[{}]", index))),
        MappingError::Reconstruct { type_name, reason } => MappingError::Reconstruct {
            type_name,
            reason: format!("element [{}]: {}", index, reason),
        },
        other => other,
    }
}

fn parse_text(text: &str) -> MappingResult<Value> {
    serde_json::from_str(text).map_err(|e| MappingError::malformed(format!("invalid JSON: {}", e)))
}

impl<T> Clone for Schema<T> {
    fn clone(&self) -> Self {
        Self {
            def: self.def.clone(),
            reconstruct: self.reconstruct,
            project: self.project,
            config: self.config.clone(),
        }
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("type", &type_name::<T>())
            .field("name", &self.def.name)
            .field("version", &self.def.version)
            .field("fields", &self.def.fields.len())
            .field("config", &self.config)
            .finish()
    }
}
