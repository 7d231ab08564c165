//! Validated field map handed to reconstruction hooks.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::errors::{MappingError, MappingResult};
use super::validator::json_type_name;

/// Validated, coerced fields keyed by attribute name in declaration order.
///
/// Accessors take values out of the map, so each field is moved into the
/// constructed instance without cloning. Absent fields and `null` read as
/// `None` through the `opt_*` accessors; the plain accessors treat them as a
/// reconstruction error.
#[derive(Debug, Clone, PartialEq)]
pub struct Fields {
    type_name: &'static str,
    values: Map<String, Value>,
}

impl Fields {
    pub fn new(type_name: &'static str, values: Map<String, Value>) -> Self {
        Self { type_name, values }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Removes a field, returning its raw value.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn string(&mut self, name: &str) -> MappingResult<String> {
        let value = self.opt_string(name)?;
        self.require(name, value)
    }

    pub fn opt_string(&mut self, name: &str) -> MappingResult<Option<String>> {
        self.take_as(name, "string", |v| match v {
            Value::String(s) => Ok(s),
            other => Err(other),
        })
    }

    pub fn i64(&mut self, name: &str) -> MappingResult<i64> {
        let value = self.opt_i64(name)?;
        self.require(name, value)
    }

    pub fn opt_i64(&mut self, name: &str) -> MappingResult<Option<i64>> {
        self.take_as(name, "int", |v| v.as_i64().ok_or(v))
    }

    pub fn u64(&mut self, name: &str) -> MappingResult<u64> {
        let value = self.opt_u64(name)?;
        self.require(name, value)
    }

    pub fn opt_u64(&mut self, name: &str) -> MappingResult<Option<u64>> {
        self.take_as(name, "unsigned int", |v| v.as_u64().ok_or(v))
    }

    pub fn f64(&mut self, name: &str) -> MappingResult<f64> {
        let value = self.opt_f64(name)?;
        self.require(name, value)
    }

    pub fn opt_f64(&mut self, name: &str) -> MappingResult<Option<f64>> {
        self.take_as(name, "float", |v| v.as_f64().ok_or(v))
    }

    pub fn bool(&mut self, name: &str) -> MappingResult<bool> {
        let value = self.opt_bool(name)?;
        self.require(name, value)
    }

    pub fn opt_bool(&mut self, name: &str) -> MappingResult<Option<bool>> {
        self.take_as(name, "bool", |v| v.as_bool().ok_or(v))
    }

    pub fn datetime(&mut self, name: &str) -> MappingResult<DateTime<Utc>> {
        let value = self.opt_datetime(name)?;
        self.require(name, value)
    }

    pub fn opt_datetime(&mut self, name: &str) -> MappingResult<Option<DateTime<Utc>>> {
        self.take_as(name, "datetime", |v| {
            v.as_str()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or(v)
        })
    }

    pub fn uuid(&mut self, name: &str) -> MappingResult<Uuid> {
        let value = self.opt_uuid(name)?;
        self.require(name, value)
    }

    pub fn opt_uuid(&mut self, name: &str) -> MappingResult<Option<Uuid>> {
        self.take_as(name, "uuid", |v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()).ok_or(v))
    }

    /// Deserializes a single field into any serde type.
    pub fn decode<D: DeserializeOwned>(&mut self, name: &str) -> MappingResult<D> {
        let value = self.opt_decode(name)?;
        self.require(name, value)
    }

    pub fn opt_decode<D: DeserializeOwned>(&mut self, name: &str) -> MappingResult<Option<D>> {
        match self.values.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| MappingError::reconstruct(self.type_name, format!("field '{}': {}", name, e))),
        }
    }

    /// Deserializes every remaining field into `T` at once.
    pub fn deserialize<T: DeserializeOwned>(self) -> MappingResult<T> {
        let type_name = self.type_name;
        serde_json::from_value(Value::Object(self.values))
            .map_err(|e| MappingError::reconstruct(type_name, e.to_string()))
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    fn take_as<R>(
        &mut self,
        name: &str,
        expected: &str,
        convert: impl FnOnce(Value) -> Result<R, Value>,
    ) -> MappingResult<Option<R>> {
        match self.values.remove(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => convert(value).map(Some).map_err(|v| {
                MappingError::reconstruct(
                    self.type_name,
                    format!("field '{}' is {}, not {}", name, json_type_name(&v), expected),
                )
            }),
        }
    }

    fn require<R>(&self, name: &str, value: Option<R>) -> MappingResult<R> {
        value.ok_or_else(|| MappingError::reconstruct(self.type_name, format!("field '{}' is absent", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => Fields::new("Sample", map),
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_typed_accessors() {
        let mut f = fields(json!({
            "name": "b1",
            "count": 4,
            "ratio": 0.5,
            "on": true,
            "at": "2024-01-01T00:00:00Z",
            "id": "67e55044-10b1-426f-9247-bb680e5fe0c8"
        }));

        assert_eq!(f.string("name").unwrap(), "b1");
        assert_eq!(f.i64("count").unwrap(), 4);
        assert_eq!(f.f64("ratio").unwrap(), 0.5);
        assert!(f.bool("on").unwrap());
        assert_eq!(f.datetime("at").unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(f.uuid("id").unwrap().to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
        assert!(f.is_empty());
    }

    #[test]
    fn test_optional_accessors() {
        let mut f = fields(json!({ "note": null }));
        assert_eq!(f.opt_string("note").unwrap(), None);
        assert_eq!(f.opt_i64("missing").unwrap(), None);
    }

    #[test]
    fn test_absent_required_is_reconstruct_error() {
        let mut f = fields(json!({}));
        let err = f.string("key").unwrap_err();
        assert_eq!(err.code(), "JSONMAP_RECONSTRUCT_FAILED");
        assert!(err.to_string().contains("Sample"));
        assert!(err.to_string().contains("key"));
    }

    #[test]
    fn test_wrong_accessor_is_reconstruct_error() {
        let mut f = fields(json!({ "count": "four" }));
        let err = f.i64("count").unwrap_err();
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_decode_and_deserialize() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Pair {
            a: i64,
            b: Vec<String>,
        }

        let mut f = fields(json!({ "tags": ["x", "y"], "a": 1, "b": ["z"] }));
        let tags: Vec<String> = f.decode("tags").unwrap();
        assert_eq!(tags, vec!["x", "y"]);

        let pair: Pair = f.deserialize().unwrap();
        assert_eq!(pair, Pair { a: 1, b: vec!["z".into()] });
    }
}
