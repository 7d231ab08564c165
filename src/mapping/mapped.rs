//! The serializable capability.

use std::sync::OnceLock;

use serde_json::{Map, Value};

use crate::schema::MappingResult;

use super::bound::Schema;
use super::registry;

/// A type that crosses the object/JSON boundary through its bound schema.
///
/// Every method has a default implementation. By default the schema is looked
/// up in the process-global [`SchemaRegistry`](super::SchemaRegistry); a type
/// can instead override [`schema`](JsonMapped::schema) to build its schema
/// lazily with [`static_schema`].
///
/// ```ignore
/// impl JsonMapped for ObjectStoreLocation {
///     fn schema() -> MappingResult<&'static Schema<Self>> {
///         static SCHEMA: OnceLock<Schema<ObjectStoreLocation>> = OnceLock::new();
///         static_schema(&SCHEMA, || Schema::derived(location_def()))
///     }
/// }
///
/// let loc = ObjectStoreLocation::from_json(&json!({"bucket": "b1", "key": "k1"}))?;
/// assert_eq!(loc.to_json_str()?, r#"{"bucket":"b1","key":"k1"}"#);
/// ```
pub trait JsonMapped: Sized + 'static {
    /// The schema bound to this type.
    fn schema() -> MappingResult<&'static Schema<Self>> {
        registry::global_schema::<Self>()
    }

    /// Validates a field mapping and reconstructs an instance from it.
    fn from_json(data: &Value) -> MappingResult<Self> {
        Self::schema()?.load(data)
    }

    fn from_json_str(text: &str) -> MappingResult<Self> {
        Self::schema()?.load_str(text)
    }

    /// Loads every element of a JSON array.
    fn from_json_many(data: &Value) -> MappingResult<Vec<Self>> {
        Self::schema()?.load_many(data)
    }

    /// Projects this instance onto its declared fields.
    fn to_json(&self) -> MappingResult<Map<String, Value>> {
        Self::schema()?.dump(self)
    }

    fn to_json_str(&self) -> MappingResult<String> {
        Self::schema()?.dumps(self)
    }

    fn to_json_many(items: &[Self]) -> MappingResult<Vec<Map<String, Value>>> {
        Self::schema()?.dump_many(items)
    }

    fn to_json_str_many(items: &[Self]) -> MappingResult<String> {
        Self::schema()?.dumps_many(items)
    }
}

/// Returns the schema in `cell`, building it on first use.
///
/// If two threads race on first use both may build, but only one schema is
/// ever stored and returned.
pub fn static_schema<T>(
    cell: &'static OnceLock<Schema<T>>,
    build: impl FnOnce() -> MappingResult<Schema<T>>,
) -> MappingResult<&'static Schema<T>> {
    if let Some(schema) = cell.get() {
        return Ok(schema);
    }
    let schema = build()?;
    Ok(cell.get_or_init(|| schema))
}
