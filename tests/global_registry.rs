//! Global Registry Tests
//!
//! Tests for the process-global binding table:
//! - JsonMapped resolves schemas through the installed table
//! - The table installs exactly once
//! - Types without a binding fail with a typed error

use std::sync::Once;

use jsonmap::mapping::registry;
use jsonmap::{FieldDef, JsonMapped, MappingConfig, MappingError, Schema, SchemaDef, SchemaRegistry, UnknownFields};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ImageRef {
    registry: String,
    repo: String,
    #[serde(default)]
    tag: Option<String>,
}

impl JsonMapped for ImageRef {}

#[derive(Debug)]
struct Unregistered;

impl JsonMapped for Unregistered {}

static INSTALL: Once = Once::new();

fn ensure_installed() {
    INSTALL.call_once(|| {
        let def = SchemaDef::new("image_ref", "1", Vec::new())
            .field("registry", FieldDef::required_string())
            .field("repo", FieldDef::required_string())
            .field("tag", FieldDef::optional_string());

        SchemaRegistry::builder()
            .with_config(MappingConfig::default().with_unknown_fields(UnknownFields::Reject))
            .with(Schema::<ImageRef>::derived(def).unwrap())
            .unwrap()
            .build()
            .install()
            .unwrap();
    });
}

// =============================================================================
// Default Binding Lookup
// =============================================================================

/// Default trait methods go through the installed table.
#[test]
fn test_mapped_type_uses_global_binding() {
    ensure_installed();

    let image = ImageRef::from_json(&json!({ "registry": "docker.io", "repo": "library/alpine" })).unwrap();
    assert_eq!(image.tag, None);

    let dumped = image.to_json().unwrap();
    assert_eq!(
        Value::Object(dumped),
        json!({ "registry": "docker.io", "repo": "library/alpine" })
    );
}

/// Registry config reaches schemas bound without their own.
#[test]
fn test_global_config_applies() {
    ensure_installed();

    let err = ImageRef::from_json(&json!({ "registry": "r", "repo": "p", "digest": "sha256:0" })).unwrap_err();
    assert!(err.validation_errors().unwrap().contains("digest"));
}

/// Collections load and dump through the same binding.
#[test]
fn test_global_many() {
    ensure_installed();

    let images = ImageRef::from_json_many(&json!([
        { "registry": "r", "repo": "a", "tag": "1" },
        { "registry": "r", "repo": "b" }
    ]))
    .unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(
        ImageRef::to_json_str_many(&images).unwrap(),
        r#"[{"registry":"r","repo":"a","tag":"1"},{"registry":"r","repo":"b"}]"#
    );
}

// =============================================================================
// Write-Once Semantics
// =============================================================================

/// A second install is refused.
#[test]
fn test_second_install_rejected() {
    ensure_installed();

    let err = SchemaRegistry::builder().build().install().unwrap_err();
    assert!(matches!(err, MappingError::RegistryInstalled));
    assert!(registry::global().unwrap().is_bound::<ImageRef>());
}

/// A type with no binding reports itself as unbound.
#[test]
fn test_unregistered_type() {
    ensure_installed();

    let err = Unregistered::from_json(&json!({ "name": "x" })).unwrap_err();
    assert_eq!(err.code(), "JSONMAP_UNBOUND_TYPE");
    assert!(err.to_string().contains("Unregistered"));
}
