//! Mapping configuration
//!
//! Behavior knobs shared by every schema bound through a registry. A schema
//! may carry its own config, and a definition's `unknown` override beats both.

use serde::{Deserialize, Serialize};

use crate::schema::{MappingError, MappingResult};

/// Default limit on container nesting in loaded documents
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// How undeclared fields in an incoming document are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownFields {
    /// Drop them silently
    #[default]
    Ignore,
    /// Report each one as a field error
    Reject,
    /// Pass them through to the reconstruction hook untouched
    Include,
}

/// Mapping configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingConfig {
    /// Unknown-field policy (default: ignore)
    #[serde(default)]
    pub unknown_fields: UnknownFields,

    /// Pretty-print text output (default: false)
    #[serde(default)]
    pub pretty: bool,

    /// Maximum container nesting accepted on load (default: 64)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

pub(crate) static DEFAULT_CONFIG: MappingConfig = MappingConfig {
    unknown_fields: UnknownFields::Ignore,
    pretty: false,
    max_depth: DEFAULT_MAX_DEPTH,
};

impl Default for MappingConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.clone()
    }
}

impl MappingConfig {
    /// Parses a config written as JSON; absent keys take their defaults.
    pub fn from_json_str(text: &str) -> MappingResult<Self> {
        serde_json::from_str(text).map_err(|e| MappingError::definition("<config>", e.to_string()))
    }

    pub fn with_unknown_fields(mut self, policy: UnknownFields) -> Self {
        self.unknown_fields = policy;
        self
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MappingConfig::default();
        assert_eq!(config.unknown_fields, UnknownFields::Ignore);
        assert!(!config.pretty);
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = MappingConfig::from_json_str(r#"{"unknown_fields": "reject"}"#).unwrap();
        assert_eq!(config.unknown_fields, UnknownFields::Reject);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_bad_policy_rejected() {
        let err = MappingConfig::from_json_str(r#"{"unknown_fields": "maybe"}"#).unwrap_err();
        assert_eq!(err.code(), "JSONMAP_INVALID_DEFINITION");
    }

    #[test]
    fn test_builders() {
        let config = MappingConfig::default().with_pretty(true).with_max_depth(8);
        assert!(config.pretty);
        assert_eq!(config.max_depth, 8);
    }
}
