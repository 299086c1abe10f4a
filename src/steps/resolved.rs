//! Resolved step ready for execution.
//!
//! A ResolvedStep combines section defaults with a step's own options,
//! producing a fully-specified step that can be executed.

use crate::config::interpolation::{replace_placeholders, Delimiters, Template};
use crate::config::schema::{StepSpec, DEFAULT_DESCRIPTION};
use crate::error::{JumpInError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What a step runs: a shell line or a direct argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StepCommand {
    /// Interpreted by the system shell.
    Shell(String),
    /// Executed directly, no shell metacharacter expansion.
    Argv(Vec<String>),
}

impl StepCommand {
    /// Whether this command goes through the shell.
    pub fn uses_shell(&self) -> bool {
        matches!(self, Self::Shell(_))
    }
}

impl fmt::Display for StepCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shell(line) => write!(f, "{}", line),
            Self::Argv(argv) => {
                let rendered: Vec<String> = argv
                    .iter()
                    .map(|arg| {
                        if arg.is_empty() || arg.contains(char::is_whitespace) {
                            format!("{:?}", arg)
                        } else {
                            arg.clone()
                        }
                    })
                    .collect();
                write!(f, "{}", rendered.join(" "))
            }
        }
    }
}

/// Section-level inputs shared by every step during resolution.
#[derive(Debug, Clone)]
pub struct ResolveContext<'a> {
    /// Section name, for diagnostics.
    pub section: &'a str,

    /// Section defaults (placeholder values).
    pub defaults: &'a BTreeMap<String, String>,

    /// Section default working directory.
    pub directory: &'a Path,

    /// Placeholder delimiters.
    pub delimiters: &'a Delimiters,
}

/// A fully resolved step ready for execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedStep {
    /// 0-based position within the section.
    pub index: usize,

    /// Description.
    pub description: String,

    /// Command to execute, placeholders substituted.
    pub command: StepCommand,

    /// Working directory.
    pub directory: PathBuf,

    /// Wall-clock limit.
    pub timeout: Option<Duration>,

    /// Continue on failure.
    pub ignore_errors: bool,
}

impl ResolvedStep {
    /// Resolve an authored step against its section.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInputType` for a missing, empty or wrongly shaped
    /// command and `MalformedConfig` for a non-positive timeout.
    pub fn resolve(ctx: &ResolveContext<'_>, index: usize, spec: &StepSpec) -> Result<Self> {
        let directory = match spec.directory.as_deref().filter(|d| !d.is_empty()) {
            Some(dir) => PathBuf::from(replace_placeholders(
                dir,
                ctx.defaults,
                ctx.delimiters,
            )),
            None => ctx.directory.to_path_buf(),
        };

        let mut values = ctx.defaults.clone();
        values.insert("directory".to_string(), directory.display().to_string());

        let command = resolve_command(ctx, index, spec, &values)?;
        let timeout = resolve_timeout(ctx, index, spec.timeout)?;

        Ok(Self {
            index,
            description: spec
                .description
                .clone()
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            command,
            directory,
            timeout,
            ignore_errors: spec.ignore_errors,
        })
    }

    /// Whether this step runs through the shell.
    pub fn use_shell(&self) -> bool {
        self.command.uses_shell()
    }
}

fn resolve_command(
    ctx: &ResolveContext<'_>,
    index: usize,
    spec: &StepSpec,
    values: &BTreeMap<String, String>,
) -> Result<StepCommand> {
    let invalid = |detail: String| JumpInError::InvalidInputType {
        message: format!("section '{}', step {}: {}", ctx.section, index, detail),
    };

    let raw = spec
        .command
        .as_ref()
        .ok_or_else(|| invalid("no command given".to_string()))?;

    let template = Template::try_from(raw).map_err(|e| match e {
        JumpInError::InvalidInputType { message } => invalid(message),
        other => other,
    })?;

    if template.is_blank() {
        return Err(invalid("command is empty".to_string()));
    }

    match (spec.use_shell, template) {
        (true, Template::Text(line)) => Ok(StepCommand::Shell(
            replace_placeholders(&line, values, ctx.delimiters),
        )),
        (true, Template::Sequence(_)) => Err(invalid(
            "use_shell requires a single command string, not a list".to_string(),
        )),
        (false, Template::Text(line)) => {
            // Split before substituting so each value stays one argument
            let words: Vec<String> = line.split_whitespace().map(str::to_string).collect();
            Ok(StepCommand::Argv(substitute_each(&words, values, ctx.delimiters)))
        }
        (false, Template::Sequence(argv)) => {
            Ok(StepCommand::Argv(substitute_each(&argv, values, ctx.delimiters)))
        }
    }
}

fn substitute_each(
    argv: &[String],
    values: &BTreeMap<String, String>,
    delims: &Delimiters,
) -> Vec<String> {
    argv.iter()
        .map(|arg| replace_placeholders(arg, values, delims))
        .collect()
}

fn resolve_timeout(
    ctx: &ResolveContext<'_>,
    index: usize,
    timeout: Option<f64>,
) -> Result<Option<Duration>> {
    match timeout {
        None => Ok(None),
        Some(secs) if secs.is_finite() && secs > 0.0 => Ok(Some(Duration::from_secs_f64(secs))),
        Some(secs) => Err(JumpInError::MalformedConfig {
            message: format!(
                "section '{}', step {}: timeout must be a positive number of seconds, got {}",
                ctx.section, index, secs
            ),
        }),
    }
}
