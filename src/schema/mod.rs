//! Declarative schema subsystem
//!
//! A schema is an ordered list of field declarations. It is used in both
//! directions: incoming documents are validated and coerced against it, and
//! outgoing instances are projected onto it.
//!
//! # Design Principles
//!
//! - Same declarations for load and dump
//! - Every field problem reported in one error
//! - Unknown fields handled by explicit policy
//! - Definitions are plain data and can be written as JSON
//! - Deterministic validation

mod errors;
mod fields;
mod projector;
mod types;
mod validator;

pub use errors::{FieldError, MappingError, MappingResult, Severity, ValidationErrors};
pub use fields::Fields;
pub use projector::Projector;
pub use types::{Constraint, FieldDecl, FieldDef, FieldType, Pattern, SchemaDef};
pub use validator::SchemaValidator;

pub(crate) use validator::json_type_name;
