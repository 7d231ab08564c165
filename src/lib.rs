//! jsonmap - schema-driven mapping between typed objects and JSON
//!
//! Each mapped type is bound to one declarative schema. Loading validates a
//! JSON field mapping against the schema and hands the validated fields to a
//! reconstruction hook that builds the typed instance. Dumping projects an
//! instance back onto the declared fields.
//!
//! # Usage
//!
//! ```ignore
//! use jsonmap::{FieldDef, JsonMapped, Schema, SchemaDef, SchemaRegistry};
//!
//! let def = SchemaDef::new("object_store_location", "1", Vec::new())
//!     .field("bucket", FieldDef::required_string())
//!     .field("key", FieldDef::required_string());
//!
//! SchemaRegistry::builder()
//!     .with(Schema::<ObjectStoreLocation>::derived(def)?)?
//!     .build()
//!     .install()?;
//!
//! let loc = ObjectStoreLocation::from_json(&json!({"bucket": "b1", "key": "k1"}))?;
//! let out = loc.to_json()?;
//! ```

pub mod config;
pub mod mapping;
pub mod schema;

pub use config::{MappingConfig, UnknownFields};
pub use mapping::{static_schema, JsonMapped, RegistryBuilder, Schema, SchemaRegistry};
pub use schema::{
    Constraint, FieldDecl, FieldDef, FieldError, FieldType, Fields, MappingError, MappingResult, SchemaDef,
    Severity, ValidationErrors,
};
