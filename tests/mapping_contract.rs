//! Mapping Contract Tests
//!
//! Tests for the load/dump contract:
//! - Round-trip preserves every declared field
//! - Dump is idempotent
//! - Missing and wrong-typed fields are rejected by name
//! - Unknown fields follow the configured policy
//! - Schemas are shareable across threads

use std::sync::{Arc, OnceLock};
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use jsonmap::{
    static_schema, Constraint, FieldDecl, FieldDef, FieldType, Fields, JsonMapped, MappingConfig, MappingError,
    MappingResult, Schema, SchemaDef, UnknownFields,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

// =============================================================================
// Mapped Types
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
struct ObjectStoreLocation {
    bucket: String,
    key: String,
}

fn make_location(mut fields: Fields) -> MappingResult<ObjectStoreLocation> {
    Ok(ObjectStoreLocation {
        bucket: fields.string("bucket")?,
        key: fields.string("key")?,
    })
}

fn location_def() -> SchemaDef {
    SchemaDef::new("object_store_location", "1", Vec::new())
        .field("bucket", FieldDef::required_string())
        .field("key", FieldDef::required_string())
}

impl JsonMapped for ObjectStoreLocation {
    fn schema() -> MappingResult<&'static Schema<Self>> {
        static SCHEMA: OnceLock<Schema<ObjectStoreLocation>> = OnceLock::new();
        static_schema(&SCHEMA, || Schema::new(location_def(), make_location))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ArchiveRecord {
    id: Uuid,
    created_at: DateTime<Utc>,
    location: Location,
    size_bytes: u64,
    #[serde(default)]
    ratio: Option<f64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_state")]
    state: String,
    #[serde(default)]
    owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Location {
    bucket: String,
    key: String,
}

fn default_state() -> String {
    "active".to_string()
}

fn archive_def() -> SchemaDef {
    let location = vec![
        FieldDecl::new("bucket", FieldDef::required_string()),
        FieldDecl::new("key", FieldDef::required_string()),
    ];

    SchemaDef::new("archive_record", "2", Vec::new())
        .description("archived object with its storage location")
        .field("id", FieldDef::required_uuid())
        .field("created_at", FieldDef::required_datetime().data_key("createdAt"))
        .field("location", FieldDef::required_object(location))
        .field("size_bytes", FieldDef::required_int().constraint(Constraint::Min(0.0)))
        .field("ratio", FieldDef::optional(FieldType::Float))
        .field(
            "tags",
            FieldDef::optional_array(FieldType::String).constraint(Constraint::MaxLength(3)),
        )
        .field(
            "state",
            FieldDef::optional_string()
                .with_default(json!("active"))
                .constraint(Constraint::OneOf(vec![json!("active"), json!("archived")])),
        )
        .field("owner", FieldDef::optional_string().nullable())
}

impl JsonMapped for ArchiveRecord {
    fn schema() -> MappingResult<&'static Schema<Self>> {
        static SCHEMA: OnceLock<Schema<ArchiveRecord>> = OnceLock::new();
        static_schema(&SCHEMA, || Schema::derived(archive_def()))
    }
}

fn sample_record() -> ArchiveRecord {
    ArchiveRecord {
        id: Uuid::new_v4(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap(),
        location: Location {
            bucket: "analysis".into(),
            key: "images/sha256:abc".into(),
        },
        size_bytes: 4096,
        ratio: Some(0.25),
        tags: vec!["nightly".into()],
        state: "archived".into(),
        owner: Some("ops".into()),
    }
}

fn validation_errors(err: MappingError) -> jsonmap::ValidationErrors {
    match err {
        MappingError::Validation(errors) => errors,
        other => panic!("expected validation error, got {:?}", other),
    }
}

// =============================================================================
// Bucket / Key Scenario
// =============================================================================

/// Valid mapping loads into an instance with the declared fields.
#[test]
fn test_location_loads() {
    let loc = ObjectStoreLocation::from_json(&json!({ "bucket": "b1", "key": "k1" })).unwrap();
    assert_eq!(loc.bucket, "b1");
    assert_eq!(loc.key, "k1");
}

/// Dump yields exactly the declared fields.
#[test]
fn test_location_dumps() {
    let loc = ObjectStoreLocation {
        bucket: "b1".into(),
        key: "k1".into(),
    };
    assert_eq!(Value::Object(loc.to_json().unwrap()), json!({ "bucket": "b1", "key": "k1" }));
    assert_eq!(loc.to_json_str().unwrap(), r#"{"bucket":"b1","key":"k1"}"#);
}

/// Missing required field is named in the validation error.
#[test]
fn test_location_missing_key() {
    let err = ObjectStoreLocation::from_json(&json!({ "bucket": "b1" })).unwrap_err();
    let errors = validation_errors(err);
    assert_eq!(errors.fields(), vec!["key"]);
    assert_eq!(errors.get("key").unwrap().actual, "missing");
}

/// Wrong-typed field is named in the validation error.
#[test]
fn test_location_wrong_type() {
    let err = ObjectStoreLocation::from_json(&json!({ "bucket": 5, "key": "k1" })).unwrap_err();
    let errors = validation_errors(err);
    let bucket = errors.get("bucket").unwrap();
    assert_eq!(bucket.expected, "string");
    assert_eq!(bucket.actual, "int");
}

/// Unknown fields are dropped by default.
#[test]
fn test_location_ignores_unknown() {
    let loc = ObjectStoreLocation::from_json(&json!({ "bucket": "b1", "key": "k1", "region": "us-east-1" })).unwrap();
    assert_eq!(
        Value::Object(loc.to_json().unwrap()),
        json!({ "bucket": "b1", "key": "k1" })
    );
}

/// Scalars and arrays are protocol errors, not field errors.
#[test]
fn test_location_malformed_input() {
    for input in [json!(5), json!("b1/k1"), json!(null), json!([{ "bucket": "b1", "key": "k1" }])] {
        let err = ObjectStoreLocation::from_json(&input).unwrap_err();
        assert!(matches!(err, MappingError::MalformedInput { .. }), "{:?}", input);
    }
}

/// Text input parses before validation.
#[test]
fn test_location_from_text() {
    let loc = ObjectStoreLocation::from_json_str(r#"{"bucket":"b1","key":"k1"}"#).unwrap();
    assert_eq!(loc.key, "k1");

    let err = ObjectStoreLocation::from_json_str(r#"{"bucket":"b1","#).unwrap_err();
    assert_eq!(err.code(), "JSONMAP_MALFORMED_INPUT");
}

// =============================================================================
// Round-Trip and Idempotence
// =============================================================================

/// from_json(to_json(x)) == x across every field type.
#[test]
fn test_round_trip() {
    let record = sample_record();
    let dumped = record.to_json().unwrap();
    let loaded = ArchiveRecord::from_json(&Value::Object(dumped)).unwrap();
    assert_eq!(loaded, record);
}

/// Text round-trip goes through the same path.
#[test]
fn test_round_trip_text() {
    let record = sample_record();
    let text = record.to_json_str().unwrap();
    assert_eq!(ArchiveRecord::from_json_str(&text).unwrap(), record);
}

/// Dumping twice yields identical output.
#[test]
fn test_dump_idempotent() {
    let record = sample_record();
    assert_eq!(record.to_json().unwrap(), record.to_json().unwrap());
    assert_eq!(record.to_json_str().unwrap(), record.to_json_str().unwrap());
}

/// Output follows declaration order and data keys.
#[test]
fn test_dump_order_and_keys() {
    let record = sample_record();
    let dumped = record.to_json().unwrap();
    let keys: Vec<&str> = dumped.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["id", "createdAt", "location", "size_bytes", "ratio", "tags", "state", "owner"]
    );
    assert_eq!(dumped.get("createdAt"), Some(&json!("2024-05-17T08:30:00Z")));
}

// =============================================================================
// Optional Fields and Defaults
// =============================================================================

/// Absent optional fields load through serde defaults and schema defaults.
#[test]
fn test_optional_fields_and_defaults() {
    let id = Uuid::new_v4();
    let record = ArchiveRecord::from_json(&json!({
        "id": id.to_string(),
        "createdAt": "2024-05-17T10:30:00+02:00",
        "location": { "bucket": "b", "key": "k" },
        "size_bytes": 10
    }))
    .unwrap();

    assert_eq!(record.id, id);
    assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap());
    assert_eq!(record.ratio, None);
    assert!(record.tags.is_empty());
    assert_eq!(record.state, "active");
    assert_eq!(record.owner, None);
}

/// A nullable field accepts null on load and emits it on dump.
#[test]
fn test_nullable_owner() {
    let mut record = sample_record();
    record.owner = None;

    let dumped = record.to_json().unwrap();
    assert_eq!(dumped.get("owner"), Some(&Value::Null));
    assert_eq!(ArchiveRecord::from_json(&Value::Object(dumped)).unwrap(), record);
}

/// Optional non-nullable fields that render as null are omitted.
#[test]
fn test_absent_optional_omitted() {
    let mut record = sample_record();
    record.ratio = None;

    let dumped = record.to_json().unwrap();
    assert!(!dumped.contains_key("ratio"));
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Every field problem is reported in one error, including nested paths.
#[test]
fn test_all_errors_collected() {
    let err = ArchiveRecord::from_json(&json!({
        "id": "not-a-uuid",
        "createdAt": 17,
        "location": { "bucket": "b" },
        "size_bytes": -1,
        "tags": ["a", "b", "c", "d"],
        "state": "deleted"
    }))
    .unwrap_err();

    let errors = validation_errors(err);
    assert_eq!(
        errors.fields(),
        vec!["createdAt", "id", "location.key", "size_bytes", "state", "tags"]
    );
    assert_eq!(errors.get("createdAt").unwrap().actual, "int");
}

/// Error message carries field, expected, and actual.
#[test]
fn test_error_message_detail() {
    let err = ObjectStoreLocation::from_json(&json!({ "bucket": true, "key": "k" })).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("bucket"));
    assert!(message.contains("string"));
    assert!(message.contains("bool"));
}

// =============================================================================
// Unknown-Field Policies
// =============================================================================

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Labelled {
    name: String,
    #[serde(flatten)]
    extra: serde_json::Map<String, Value>,
}

fn labelled_schema(policy: UnknownFields) -> Schema<Labelled> {
    let def = SchemaDef::new("labelled", "1", Vec::new()).field("name", FieldDef::required_string());
    Schema::derived(def)
        .unwrap()
        .with_config(MappingConfig::default().with_unknown_fields(policy))
}

/// Reject reports each unknown key as a field error.
#[test]
fn test_unknown_reject() {
    let err = labelled_schema(UnknownFields::Reject)
        .load(&json!({ "name": "n", "color": "red", "size": 3 }))
        .unwrap_err();
    assert_eq!(validation_errors(err).fields(), vec!["color", "size"]);
}

/// Include hands unknown keys to the reconstruction hook.
#[test]
fn test_unknown_include() {
    let loaded = labelled_schema(UnknownFields::Include)
        .load(&json!({ "name": "n", "color": "red" }))
        .unwrap();
    assert_eq!(loaded.extra.get("color"), Some(&json!("red")));
}

/// Include never lets an attribute name stand in for a renamed field.
#[test]
fn test_unknown_include_keeps_renamed_field_checked() {
    let schema = Schema::<ArchiveRecord>::derived(archive_def())
        .unwrap()
        .with_config(MappingConfig::default().with_unknown_fields(UnknownFields::Include));
    let doc = json!({
        "id": Uuid::new_v4().to_string(),
        "createdAt": "2024-05-17T08:30:00Z",
        "created_at": 5,
        "location": { "bucket": "b", "key": "k" },
        "size_bytes": 1
    });

    let errors = validation_errors(schema.validate(&doc).unwrap_err());
    assert_eq!(errors.fields(), vec!["created_at"]);

    let mut doc = doc;
    doc.as_object_mut().unwrap().remove("created_at");
    let record = schema.load(&doc).unwrap();
    assert_eq!(record.created_at, Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap());
}

/// Ignore drops unknown keys before the hook sees them.
#[test]
fn test_unknown_ignore() {
    let loaded = labelled_schema(UnknownFields::Ignore)
        .load(&json!({ "name": "n", "color": "red" }))
        .unwrap();
    assert!(loaded.extra.is_empty());
}

// =============================================================================
// Dump Failures
// =============================================================================

#[derive(Debug, Serialize)]
struct Partial {
    bucket: String,
}

#[derive(Debug, Serialize)]
struct Measurement {
    value: f64,
}

/// An instance lacking a declared field is incomplete.
#[test]
fn test_dump_incomplete_object() {
    let schema: Schema<Partial> = Schema::new(location_def(), |_| {
        Err(MappingError::reconstruct("Partial", "load not supported"))
    })
    .unwrap();

    let err = schema.dump(&Partial { bucket: "b".into() }).unwrap_err();
    assert!(matches!(err, MappingError::IncompleteObject { ref field, .. } if field == "key"));
}

/// Non-finite floats cannot be encoded.
#[test]
fn test_dump_non_finite_float() {
    let def = SchemaDef::new("measurement", "1", Vec::new()).field("value", FieldDef::required_float());
    let schema: Schema<Measurement> = Schema::new(def, |mut fields| {
        Ok(Measurement {
            value: fields.f64("value")?,
        })
    })
    .unwrap();

    let err = schema.dumps(&Measurement { value: f64::NAN }).unwrap_err();
    assert_eq!(err.code(), "JSONMAP_ENCODING_FAILED");

    assert_eq!(schema.dumps(&Measurement { value: 1.5 }).unwrap(), r#"{"value":1.5}"#);
}

/// Reconstruction failures surface as their own kind.
#[test]
fn test_reconstruct_failure() {
    let schema: Schema<Partial> = Schema::new(location_def(), |_| {
        Err(MappingError::reconstruct("Partial", "load not supported"))
    })
    .unwrap();

    let err = schema.load(&json!({ "bucket": "b", "key": "k" })).unwrap_err();
    assert_eq!(err.code(), "JSONMAP_RECONSTRUCT_FAILED");
}

// =============================================================================
// Declarative Definitions
// =============================================================================

/// A schema written as JSON behaves like one built in code.
#[test]
fn test_definition_from_json_document() {
    let def = SchemaDef::from_json_str(
        r#"{
            "name": "object_store_location",
            "fields": [
                {"name": "bucket", "type": "string"},
                {"name": "key", "type": "string", "constraints": [{"min_length": 1}]}
            ]
        }"#,
    )
    .unwrap();

    let schema = Schema::new(def, make_location).unwrap();
    let loc = schema.load(&json!({ "bucket": "b1", "key": "k1" })).unwrap();
    assert_eq!(loc, ObjectStoreLocation { bucket: "b1".into(), key: "k1".into() });

    let err = schema.load(&json!({ "bucket": "b1", "key": "" })).unwrap_err();
    assert!(validation_errors(err).contains("key"));
}

// =============================================================================
// Concurrency
// =============================================================================

/// One schema serves many threads without coordination.
#[test]
fn test_concurrent_use() {
    let schema = Arc::new(Schema::<ArchiveRecord>::derived(archive_def()).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let mut record = sample_record();
                record.size_bytes = i;
                let dumped = schema.dump(&record).unwrap();
                let loaded = schema.load(&Value::Object(dumped)).unwrap();
                assert_eq!(loaded, record);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}

/// Lazily built static schemas are shared across threads.
#[test]
fn test_concurrent_static_schema() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            thread::spawn(move || {
                let loc = ObjectStoreLocation::from_json(&json!({ "bucket": format!("b{}", i), "key": "k" })).unwrap();
                loc.to_json_str().unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), format!(r#"{{"bucket":"b{}","key":"k"}}"#, i));
    }
}
