//! Configuration loading and plan resolution.
//!
//! Turns a configuration document plus a section key into a [`Plan`]: the
//! ordered list of [`ResolvedStep`]s the orchestrator executes. Every
//! configuration problem is reported here, before any command runs.

use crate::config::interpolation::{extract_placeholders, Delimiters};
use crate::config::schema::ConfigDocument;
use crate::error::{JumpInError, Result};
use crate::steps::resolved::{ResolveContext, ResolvedStep, StepCommand};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Syntax of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    #[default]
    Json,
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.yml`/`.yaml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yml") | Some("yaml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Inputs to plan resolution that would otherwise come from ambient process state.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Fallback working directory. `None` captures `std::env::current_dir()` once.
    pub cwd: Option<PathBuf>,

    /// Placeholder delimiters.
    pub delimiters: Delimiters,
}

/// The resolved, ready-to-run steps of one section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Section key the plan was resolved from.
    pub section: String,

    /// Section defaults, with `directory` filled in.
    pub defaults: BTreeMap<String, String>,

    /// Steps in execution order.
    pub steps: Vec<ResolvedStep>,
}

impl Plan {
    /// Number of steps in the plan.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps. Never true for a resolved plan.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parse configuration text.
///
/// # Errors
///
/// Returns `MalformedConfig` if the text is not valid JSON/YAML or its
/// top level is not a mapping.
pub fn parse_document(content: &str, format: ConfigFormat) -> Result<ConfigDocument> {
    let value = match format {
        ConfigFormat::Json => {
            serde_json::from_str::<serde_json::Value>(content).map_err(|e| {
                JumpInError::MalformedConfig {
                    message: e.to_string(),
                }
            })?
        }
        ConfigFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| JumpInError::MalformedConfig {
                    message: e.to_string(),
                })?;
            serde_json::to_value(yaml).map_err(|e| JumpInError::MalformedConfig {
                message: e.to_string(),
            })?
        }
    };

    ConfigDocument::from_value(value)
}

/// Read and parse a configuration file.
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist and `MalformedConfig`
/// if it can't be parsed.
pub fn load_document(path: &Path) -> Result<ConfigDocument> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            JumpInError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            JumpInError::Io(e)
        }
    })?;

    parse_document(&content, ConfigFormat::from_path(path)).map_err(|e| match e {
        JumpInError::MalformedConfig { message } => JumpInError::MalformedConfig {
            message: format!("{}: {}", path.display(), message),
        },
        other => other,
    })
}

/// Resolve one section of a parsed document into a [`Plan`].
///
/// # Errors
///
/// - `SectionNotFound` if `section_key` is absent
/// - `EmptySection` if the section has no steps
/// - `InvalidInputType` / `MalformedConfig` for a step that cannot be resolved
pub fn resolve_plan(
    document: &ConfigDocument,
    section_key: &str,
    options: &LoadOptions,
) -> Result<Plan> {
    let section = document.section(section_key)?;

    let specs = match section.steps.as_deref() {
        Some(steps) if !steps.is_empty() => steps,
        _ => {
            return Err(JumpInError::EmptySection {
                section: section_key.to_string(),
            })
        }
    };

    let directory = match section.default_directory() {
        Some(dir) => PathBuf::from(dir),
        None => match &options.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        },
    };

    let mut defaults = section.defaults.clone().unwrap_or_default();
    defaults.insert("directory".to_string(), directory.display().to_string());

    let ctx = ResolveContext {
        section: section_key,
        defaults: &defaults,
        directory: &directory,
        delimiters: &options.delimiters,
    };

    let steps = specs
        .iter()
        .enumerate()
        .map(|(index, spec)| ResolvedStep::resolve(&ctx, index, spec))
        .collect::<Result<Vec<_>>>()?;

    for step in &steps {
        debug!(
            "Resolved step {} of '{}': {} (in {})",
            step.index,
            section_key,
            step.command,
            step.directory.display()
        );
        let leftover = match &step.command {
            StepCommand::Shell(line) => extract_placeholders(line, &options.delimiters),
            StepCommand::Argv(argv) => argv
                .iter()
                .flat_map(|arg| extract_placeholders(arg, &options.delimiters))
                .collect(),
        };
        if !leftover.is_empty() {
            debug!(
                "Step {} leaves placeholders unresolved: {:?}",
                step.index, leftover
            );
        }
    }

    Ok(Plan {
        section: section_key.to_string(),
        defaults,
        steps,
    })
}

/// Load a configuration file and resolve one section.
pub fn load_plan(path: &Path, section_key: &str) -> Result<Plan> {
    let document = load_document(path)?;
    resolve_plan(&document, section_key, &LoadOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
    {
        "test_section": {
            "defaults": { "directory": "/tmp" },
            "steps": [
                { "description": "Test command", "command": "echo 'Hello, World!'", "use_shell": true }
            ]
        }
    }
    "#;

    fn opts(cwd: &str) -> LoadOptions {
        LoadOptions {
            cwd: Some(PathBuf::from(cwd)),
            ..Default::default()
        }
    }

    #[test]
    fn format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YAML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("commands")), ConfigFormat::Json);
    }

    #[test]
    fn resolves_section_defaults() {
        let doc = parse_document(SAMPLE, ConfigFormat::Json).unwrap();
        let plan = resolve_plan(&doc, "test_section", &opts("/elsewhere")).unwrap();

        assert_eq!(plan.len(), 1);
        let step = &plan.steps[0];
        assert_eq!(step.directory, PathBuf::from("/tmp"));
        assert_eq!(
            step.command,
            StepCommand::Shell("echo 'Hello, World!'".to_string())
        );
        assert_eq!(step.description, "Test command");
        assert_eq!(step.timeout, None);
        assert!(!step.ignore_errors);
    }

    #[test]
    fn syntax_error_is_malformed() {
        let err = parse_document("{ not json", ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, JumpInError::MalformedConfig { .. }));
    }

    #[test]
    fn missing_section_is_reported() {
        let doc = parse_document(SAMPLE, ConfigFormat::Json).unwrap();
        let err = resolve_plan(&doc, "nonexistent_section", &opts("/")).unwrap_err();
        assert!(matches!(err, JumpInError::SectionNotFound { .. }));
    }

    #[test]
    fn missing_or_empty_steps_are_reported() {
        for body in [
            r#"{"s": {}}"#,
            r#"{"s": {"steps": []}}"#,
            r#"{"s": {"steps": null}}"#,
        ] {
            let doc = parse_document(body, ConfigFormat::Json).unwrap();
            let err = resolve_plan(&doc, "s", &opts("/")).unwrap_err();
            assert!(
                matches!(err, JumpInError::EmptySection { ref section } if section == "s"),
                "{}",
                body
            );
        }
    }

    #[test]
    fn falls_back_to_captured_cwd() {
        let doc = parse_document(
            r#"{"s": {"steps": [{"command": ["ls", "{{directory}}"]}]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let plan = resolve_plan(&doc, "s", &opts("/work")).unwrap();

        assert_eq!(plan.steps[0].directory, PathBuf::from("/work"));
        assert_eq!(
            plan.steps[0].command,
            StepCommand::Argv(vec!["ls".into(), "/work".into()])
        );
        assert_eq!(plan.defaults.get("directory").map(String::as_str), Some("/work"));
    }

    #[test]
    fn preserves_order_and_indices() {
        let doc = parse_document(
            r#"{"s": {"steps": [
                {"command": "first"},
                {"command": "second", "ignore_errors": true},
                {"command": "third", "timeout": 2}
            ]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let plan = resolve_plan(&doc, "s", &opts("/")).unwrap();

        let names: Vec<String> = plan.steps.iter().map(|s| s.command.to_string()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(
            plan.steps.iter().map(|s| s.index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(plan.steps[1].ignore_errors);
        assert_eq!(plan.steps[2].timeout, Some(Duration::from_secs(2)));
    }

    #[test]
    fn extra_defaults_are_placeholders() {
        let doc = parse_document(
            r#"{"s": {
                "defaults": {"directory": "/srv", "env_name": "analysis"},
                "steps": [{"command": "echo {{env_name}} {{directory}}", "use_shell": true}]
            }}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let plan = resolve_plan(&doc, "s", &opts("/")).unwrap();
        assert_eq!(
            plan.steps[0].command,
            StepCommand::Shell("echo analysis /srv".to_string())
        );
    }

    #[test]
    fn custom_delimiters_are_honoured() {
        let doc = parse_document(
            r#"{"s": {"steps": [{"command": "echo <<directory>> {{directory}}", "use_shell": true}]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let options = LoadOptions {
            cwd: Some(PathBuf::from("/w")),
            delimiters: Delimiters::new("<<", ">>"),
        };
        let plan = resolve_plan(&doc, "s", &options).unwrap();
        assert_eq!(
            plan.steps[0].command,
            StepCommand::Shell("echo /w {{directory}}".to_string())
        );
    }

    #[test]
    fn invalid_step_fails_whole_plan() {
        let doc = parse_document(
            r#"{"s": {"steps": [{"command": "ok"}, {"command": 7}]}}"#,
            ConfigFormat::Json,
        )
        .unwrap();
        let err = resolve_plan(&doc, "s", &opts("/")).unwrap_err();
        assert!(matches!(err, JumpInError::InvalidInputType { .. }));
        assert!(err.to_string().contains("step 1"));
    }

    #[test]
    fn yaml_documents_are_supported() {
        let yaml = r#"
build:
  defaults:
    directory: /opt/app
  steps:
    - description: Compile
      command: [make, all]
"#;
        let doc = parse_document(yaml, ConfigFormat::Yaml).unwrap();
        let plan = resolve_plan(&doc, "build", &opts("/")).unwrap();
        assert_eq!(
            plan.steps[0].command,
            StepCommand::Argv(vec!["make".into(), "all".into()])
        );
        assert_eq!(plan.steps[0].directory, PathBuf::from("/opt/app"));
    }

    #[test]
    fn load_document_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = load_document(&temp.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, JumpInError::ConfigNotFound { .. }));
    }

    #[test]
    fn load_document_reports_path_on_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        fs::write(&path, "{\"a\": ").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, JumpInError::MalformedConfig { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn load_plan_reads_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("commands.json");
        fs::write(&path, SAMPLE).unwrap();

        let plan = load_plan(&path, "test_section").unwrap();
        assert_eq!(plan.section, "test_section");
        assert_eq!(plan.steps[0].directory, PathBuf::from("/tmp"));
    }
}
