//! Binding table from Rust types to their schemas.
//!
//! Bindings are collected in a [`RegistryBuilder`] during initialization and
//! frozen into a [`SchemaRegistry`]. A registry can be used directly or
//! installed once as the process-global table that [`JsonMapped`] consults
//! by default.
//!
//! [`JsonMapped`]: super::JsonMapped

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::MappingConfig;
use crate::schema::{MappingError, MappingResult};

use super::bound::Schema;

static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();

#[derive(Debug)]
struct Binding {
    type_name: &'static str,
    schema_name: String,
    schema: Box<dyn Any + Send + Sync>,
}

/// Collects type-to-schema bindings before they are frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    config: MappingConfig,
    bindings: HashMap<TypeId, Binding>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config applied to every bound schema that has none of its own.
    pub fn with_config(mut self, config: MappingConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a schema to `T`.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyBound` if `T` already has a schema.
    pub fn bind<T: 'static>(&mut self, schema: Schema<T>) -> MappingResult<()> {
        let type_id = TypeId::of::<T>();
        if self.bindings.contains_key(&type_id) {
            warn!(type_name = type_name::<T>(), "schema already bound");
            return Err(MappingError::AlreadyBound {
                type_name: type_name::<T>(),
            });
        }

        let schema = if schema.has_config() {
            schema
        } else {
            schema.with_config(self.config.clone())
        };

        debug!(
            type_name = type_name::<T>(),
            schema = %schema.name(),
            version = %schema.definition().version,
            "schema bound"
        );
        self.bindings.insert(
            type_id,
            Binding {
                type_name: type_name::<T>(),
                schema_name: schema.name().to_string(),
                schema: Box::new(schema),
            },
        );
        Ok(())
    }

    /// Chaining form of [`bind`](Self::bind).
    pub fn with<T: 'static>(mut self, schema: Schema<T>) -> MappingResult<Self> {
        self.bind(schema)?;
        Ok(self)
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            bindings: self.bindings,
        }
    }
}

/// Frozen binding table. Read-only and shareable between threads.
#[derive(Debug)]
pub struct SchemaRegistry {
    bindings: HashMap<TypeId, Binding>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Gets the schema bound to `T`.
    pub fn schema<T: 'static>(&self) -> MappingResult<&Schema<T>> {
        self.bindings
            .get(&TypeId::of::<T>())
            .and_then(|binding| binding.schema.downcast_ref::<Schema<T>>())
            .ok_or(MappingError::Unbound {
                type_name: type_name::<T>(),
            })
    }

    pub fn is_bound<T: 'static>(&self) -> bool {
        self.bindings.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of bound types.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bound (type name, schema name) pairs, sorted by type name.
    pub fn bindings(&self) -> Vec<(&'static str, &str)> {
        let mut pairs: Vec<_> = self
            .bindings
            .values()
            .map(|b| (b.type_name, b.schema_name.as_str()))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn load<T: 'static>(&self, data: &Value) -> MappingResult<T> {
        self.schema::<T>()?.load(data)
    }

    pub fn dump<T: 'static>(&self, instance: &T) -> MappingResult<Map<String, Value>> {
        self.schema::<T>()?.dump(instance)
    }

    /// Installs this registry as the process-global table.
    ///
    /// # Errors
    ///
    /// Returns `RegistryInstalled` if a global table already exists.
    pub fn install(self) -> MappingResult<&'static SchemaRegistry> {
        let count = self.len();
        let mut installed = false;
        let registry = GLOBAL.get_or_init(|| {
            installed = true;
            self
        });

        if !installed {
            warn!("global schema registry already installed");
            return Err(MappingError::RegistryInstalled);
        }
        debug!(bindings = count, "global schema registry installed");
        Ok(registry)
    }
}

/// The process-global table, if installed.
pub fn global() -> Option<&'static SchemaRegistry> {
    GLOBAL.get()
}

/// Looks up `T` in the process-global table.
pub fn global_schema<T: 'static>() -> MappingResult<&'static Schema<T>> {
    match GLOBAL.get() {
        Some(registry) => registry.schema::<T>(),
        None => Err(MappingError::Unbound {
            type_name: type_name::<T>(),
        }),
    }
}
