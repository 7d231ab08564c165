//! Binding of Rust types to schemas
//!
//! A mapped type gets `from_json` / `to_json` / `to_json_str` through the
//! [`JsonMapped`] trait. Each operation delegates to the [`Schema`] bound to
//! the type: load validates then calls the schema's reconstruction hook, dump
//! renders the instance then projects it onto the declared fields.
//!
//! Bindings are write-once. A [`SchemaRegistry`] is frozen after build and
//! the global table can be installed only once.

mod bound;
mod mapped;
pub mod registry;

pub use bound::{project_with_serde, reconstruct_with_serde, ProjectFn, ReconstructFn, Schema};
pub use mapped::{static_schema, JsonMapped};
pub use registry::{RegistryBuilder, SchemaRegistry};
