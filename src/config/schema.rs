//! Configuration schema definitions.
//!
//! This module contains the struct definitions that map to the
//! configuration document format:
//!
//! ```json
//! {
//!   "basic_tests": {
//!     "defaults": { "directory": "/srv/app" },
//!     "steps": [
//!       { "description": "List files", "command": "ls -la {{directory}}", "use_shell": true }
//!     ]
//!   }
//! }
//! ```

use crate::error::{JumpInError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Description used when a step does not provide one.
pub const DEFAULT_DESCRIPTION: &str = "No description provided";

/// A parsed configuration document: section name to raw section body.
///
/// Sections are decoded on demand so that a malformed or unknown top-level
/// key never prevents running a well-formed section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    sections: Map<String, Value>,
}

impl ConfigDocument {
    /// Wrap a parsed value, which must be a mapping at the top level.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(sections) => Ok(Self { sections }),
            other => Err(JumpInError::MalformedConfig {
                message: format!(
                    "top level must be a mapping of section names, found {}",
                    value_kind(&other)
                ),
            }),
        }
    }

    /// Names of every top-level key, sorted.
    pub fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    /// Check whether a section key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.sections.contains_key(key)
    }

    /// Decode one section.
    ///
    /// # Errors
    ///
    /// Returns `SectionNotFound` if the key is absent and `MalformedConfig`
    /// if its body does not match [`SectionConfig`].
    pub fn section(&self, key: &str) -> Result<SectionConfig> {
        let raw = self
            .sections
            .get(key)
            .ok_or_else(|| JumpInError::SectionNotFound {
                section: key.to_string(),
                available: self.available_sections(),
            })?;

        SectionConfig::deserialize(raw).map_err(|e| JumpInError::MalformedConfig {
            message: format!("section '{}': {}", key, e),
        })
    }

    fn available_sections(&self) -> String {
        if self.sections.is_empty() {
            "none".to_string()
        } else {
            self.section_names().join(", ")
        }
    }
}

/// One named section: defaults plus an ordered step list.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SectionConfig {
    /// Key/value pairs available as `{{key}}` placeholders.
    /// `directory` is also the default working directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<BTreeMap<String, String>>,

    /// Steps, executed in authored order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<Vec<StepSpec>>,
}

impl SectionConfig {
    /// Default working directory declared by the section, if non-empty.
    pub fn default_directory(&self) -> Option<&str> {
        self.defaults
            .as_ref()
            .and_then(|d| d.get("directory"))
            .map(String::as_str)
            .filter(|d| !d.is_empty())
    }

    /// Number of declared steps.
    pub fn step_count(&self) -> usize {
        self.steps.as_ref().map_or(0, Vec::len)
    }
}

/// A step as authored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// A shell line (with `use_shell`) or an argv list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "command_schema")]
    pub command: Option<Value>,

    /// Run the command through the system shell.
    #[serde(default, skip_serializing_if = "is_false")]
    pub use_shell: bool,

    /// Kill the step after this many seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    /// Record a failure and keep going instead of halting the run.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_errors: bool,

    /// Working directory, overriding `defaults.directory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn command_schema(_gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "description": "A shell line (with use_shell) or an argv list",
        "oneOf": [
            { "type": "string" },
            { "type": "array", "items": { "type": "string" }, "minItems": 1 }
        ]
    })
}

/// JSON Schema for a whole configuration document.
pub fn document_schema() -> schemars::Schema {
    schemars::schema_for!(BTreeMap<String, SectionConfig>)
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
