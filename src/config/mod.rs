//! Configuration loading, parsing, and plan resolution.
//!
//! This module handles all aspects of configuration:
//! - Schema definitions in [`schema`]
//! - Parsing and section resolution in [`loader`]
//! - Placeholder substitution in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use jump_in::config::{parse_document, resolve_plan, ConfigFormat, LoadOptions};
//!
//! let doc = parse_document(
//!     r#"{"hello": {"defaults": {"directory": "/tmp"},
//!                   "steps": [{"command": "echo hi", "use_shell": true}]}}"#,
//!     ConfigFormat::Json,
//! ).unwrap();
//!
//! let plan = resolve_plan(&doc, "hello", &LoadOptions::default()).unwrap();
//! assert_eq!(plan.steps[0].directory, std::path::PathBuf::from("/tmp"));
//! ```
//!
//! # Document Shape
//!
//! A mapping from section name to `{ "defaults": {...}, "steps": [...] }`.
//! Unknown top-level keys are ignored unless they are the requested section.

pub mod interpolation;
pub mod loader;
pub mod schema;

// Schema re-exports
pub use schema::{
    document_schema, ConfigDocument, SectionConfig, StepSpec, DEFAULT_DESCRIPTION,
};

// Loader re-exports
pub use loader::{
    load_document, load_plan, parse_document, resolve_plan, ConfigFormat, LoadOptions, Plan,
};

// Interpolation re-exports
pub use interpolation::{
    extract_placeholders, replace_placeholders, substitute_value, Delimiters, Template,
};

#[cfg(test)]
mod tests {
    #[test]
    fn serde_yaml_parses_basic_yaml() {
        let yaml = "name: test\nvalue: 42";
        let parsed: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed["name"], "test");
        assert_eq!(parsed["value"], 42);
    }

    #[test]
    fn yaml_converts_to_json_value() {
        let yaml = "steps:\n  - command: [ls, -la]\n    timeout: 1.5";
        let parsed: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
        let json = serde_json::to_value(parsed).unwrap();
        assert_eq!(json["steps"][0]["command"][1], "-la");
        assert_eq!(json["steps"][0]["timeout"], 1.5);
    }
}
