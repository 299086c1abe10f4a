//! Step execution engine.
//!
//! Runs one resolved step and turns every possible process fault into a
//! [`StepOutcome`]. Nothing here returns an error: the orchestrator decides
//! whether to halt by looking at the outcome's status.

use crate::error::ErrorKind;
use crate::shell::{execute_argv, execute_shell, CommandOptions, CommandResult};
use crate::steps::resolved::{ResolvedStep, StepCommand};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Final status of an executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Command exited with status 0.
    Success,

    /// Command failed and the run must halt.
    Failed,

    /// Command failed but the step allows errors.
    FailedIgnored,
}

impl StepStatus {
    /// Get a display character for this status.
    pub fn display_char(&self) -> char {
        match self {
            StepStatus::Success => '✓',
            StepStatus::Failed => '✗',
            StepStatus::FailedIgnored => '⚠',
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
            StepStatus::FailedIgnored => "failed (ignored)",
        };
        write!(f, "{}", s)
    }
}

/// Why a step failed.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepFailure {
    /// The executable could not be located.
    #[error("Command not found: {command}")]
    CommandNotFound { command: String },

    /// The step exceeded its timeout and was killed.
    #[error("Command timed out after {seconds} seconds")]
    Timeout { seconds: f64 },

    /// The command exited with a non-zero status.
    #[error("Command failed with exit code {code}")]
    NonZeroExit { code: i32, stderr: String },

    /// Any other launch or runtime fault.
    #[error("{message}")]
    Other { message: String },
}

impl StepFailure {
    /// Classify into the shared [`ErrorKind`] set.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CommandNotFound { .. } => ErrorKind::CommandNotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            Self::Other { .. } => ErrorKind::Other,
        }
    }
}

/// Result of executing one step. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Index of the step within its section.
    pub index: usize,

    /// Step description.
    pub description: String,

    /// Command as it was run.
    pub command: String,

    /// Final status.
    pub status: StepStatus,

    /// Captured standard output.
    pub stdout: String,

    /// Captured standard error.
    pub stderr: String,

    /// Exit code (if the process ran to completion).
    pub exit_code: Option<i32>,

    /// Execution duration.
    pub duration: Duration,

    /// Failure classification (if failed).
    pub failure: Option<StepFailure>,
}

impl StepOutcome {
    fn success(step: &ResolvedStep, result: CommandResult) -> Self {
        Self {
            index: step.index,
            description: step.description.clone(),
            command: step.command.to_string(),
            status: StepStatus::Success,
            stdout: result.stdout,
            stderr: result.stderr,
            exit_code: result.exit_code,
            duration: result.duration,
            failure: None,
        }
    }

    fn failure(
        step: &ResolvedStep,
        failure: StepFailure,
        result: Option<CommandResult>,
        duration: Duration,
    ) -> Self {
        let status = if step.ignore_errors {
            StepStatus::FailedIgnored
        } else {
            StepStatus::Failed
        };
        let (stdout, stderr, exit_code, duration) = match result {
            Some(r) => (r.stdout, r.stderr, r.exit_code, r.duration),
            None => (String::new(), String::new(), None, duration),
        };

        Self {
            index: step.index,
            description: step.description.clone(),
            command: step.command.to_string(),
            status,
            stdout,
            stderr,
            exit_code,
            duration,
            failure: Some(failure),
        }
    }

    /// Whether this outcome must stop the run.
    pub fn halts_run(&self) -> bool {
        self.status == StepStatus::Failed
    }

    /// Whether the command itself succeeded.
    pub fn succeeded(&self) -> bool {
        self.status == StepStatus::Success
    }

    /// Generate a summary line for display.
    pub fn summary_line(&self) -> String {
        let duration_str = format_duration(self.duration);
        match (&self.status, &self.failure) {
            (StepStatus::Success, _) => format!(
                "{} Step {}: {} ({})",
                self.status.display_char(),
                self.index,
                self.description,
                duration_str
            ),
            (_, failure) => {
                let error = failure
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "unknown error".to_string());
                format!(
                    "{} Step {}: {} - {}",
                    self.status.display_char(),
                    self.index,
                    self.description,
                    error
                )
            }
        }
    }
}

/// Format a duration for display.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, millis / 100)
    } else {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    }
}

/// Options for step execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    /// Extra environment variables for every command.
    pub env: HashMap<String, String>,
}

/// Execute a single step.
pub fn execute_step(step: &ResolvedStep, options: &ExecutionOptions) -> StepOutcome {
    let start = Instant::now();

    if !step.directory.is_dir() {
        let failure = StepFailure::Other {
            message: format!(
                "Working directory does not exist: {}",
                step.directory.display()
            ),
        };
        return finish(step, failure, None, start.elapsed());
    }

    let command_options = CommandOptions {
        cwd: Some(step.directory.clone()),
        env: options.env.clone(),
        timeout: step.timeout,
    };

    debug!(
        "Step {}: running {:?} in {}",
        step.index,
        step.command,
        step.directory.display()
    );

    let result = match &step.command {
        StepCommand::Shell(line) => execute_shell(line, &command_options),
        StepCommand::Argv(argv) => execute_argv(argv, &command_options),
    };

    match result {
        Ok(result) if result.timed_out => {
            let seconds = step.timeout.map(|t| t.as_secs_f64()).unwrap_or_default();
            finish(step, StepFailure::Timeout { seconds }, Some(result), start.elapsed())
        }
        Ok(result) if result.success => StepOutcome::success(step, result),
        Ok(result) => {
            let failure = match result.exit_code {
                Some(code) => StepFailure::NonZeroExit {
                    code,
                    stderr: result.stderr.trim().to_string(),
                },
                None => StepFailure::Other {
                    message: "Command was terminated by a signal".to_string(),
                },
            };
            finish(step, failure, Some(result), start.elapsed())
        }
        Err(e) => finish(step, classify_spawn_error(step, &e), None, start.elapsed()),
    }
}

fn classify_spawn_error(step: &ResolvedStep, err: &io::Error) -> StepFailure {
    match err.kind() {
        io::ErrorKind::NotFound => StepFailure::CommandNotFound {
            command: step.command.to_string(),
        },
        _ => StepFailure::Other {
            message: format!("Failed to launch '{}': {}", step.command, err),
        },
    }
}

fn finish(
    step: &ResolvedStep,
    failure: StepFailure,
    result: Option<CommandResult>,
    elapsed: Duration,
) -> StepOutcome {
    if step.ignore_errors {
        warn!(
            "Step {} ({}) failed, continuing: {}",
            step.index, step.description, failure
        );
    } else {
        error!("Step {} ({}) failed: {}", step.index, step.description, failure);
    }
    StepOutcome::failure(step, failure, result, elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn shell_step(line: &str) -> ResolvedStep {
        ResolvedStep {
            index: 0,
            description: "test step".to_string(),
            command: StepCommand::Shell(line.to_string()),
            directory: std::env::temp_dir(),
            timeout: None,
            ignore_errors: false,
        }
    }

    fn argv_step(argv: &[&str]) -> ResolvedStep {
        ResolvedStep {
            command: StepCommand::Argv(argv.iter().map(|s| s.to_string()).collect()),
            ..shell_step("")
        }
    }

    #[test]
    fn successful_step() {
        let outcome = execute_step(&shell_step("echo hello"), &ExecutionOptions::default());

        assert_eq!(outcome.status, StepStatus::Success);
        assert!(outcome.stdout.contains("hello"));
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.failure.is_none());
        assert!(!outcome.halts_run());
    }

    #[test]
    fn non_zero_exit_is_classified() {
        let outcome = execute_step(
            &shell_step("echo broken >&2; exit 2"),
            &ExecutionOptions::default(),
        );

        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(outcome.halts_run());
        assert_eq!(
            outcome.failure,
            Some(StepFailure::NonZeroExit {
                code: 2,
                stderr: "broken".to_string()
            })
        );
        assert_eq!(outcome.failure.unwrap().kind(), ErrorKind::NonZeroExit);
    }

    #[test]
    fn ignored_failure_does_not_halt() {
        let step = ResolvedStep {
            ignore_errors: true,
            ..shell_step("exit 1")
        };
        let outcome = execute_step(&step, &ExecutionOptions::default());

        assert_eq!(outcome.status, StepStatus::FailedIgnored);
        assert!(!outcome.halts_run());
        assert!(!outcome.succeeded());
    }

    #[test]
    fn missing_program_is_command_not_found() {
        let outcome = execute_step(
            &argv_step(&["no-such-binary-for-jump-in"]),
            &ExecutionOptions::default(),
        );

        assert_eq!(outcome.status, StepStatus::Failed);
        assert_eq!(
            outcome.failure.as_ref().map(StepFailure::kind),
            Some(ErrorKind::CommandNotFound)
        );
        assert!(outcome.exit_code.is_none());
    }

    #[test]
    fn missing_directory_is_other() {
        let step = ResolvedStep {
            directory: PathBuf::from("/definitely/not/here/jump-in"),
            ..shell_step("echo hi")
        };
        let outcome = execute_step(&step, &ExecutionOptions::default());

        assert_eq!(
            outcome.failure.as_ref().map(StepFailure::kind),
            Some(ErrorKind::Other)
        );
        assert!(outcome.failure.unwrap().to_string().contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn permission_denied_is_other() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let script = temp.path().join("not-executable.sh");
        std::fs::write(&script, "#!/bin/sh\necho hi\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o644)).unwrap();

        let outcome = execute_step(
            &argv_step(&[script.to_str().unwrap()]),
            &ExecutionOptions::default(),
        );

        assert_eq!(
            outcome.failure.as_ref().map(StepFailure::kind),
            Some(ErrorKind::Other)
        );
    }

    #[cfg(unix)]
    #[test]
    fn timeout_is_classified() {
        let step = ResolvedStep {
            timeout: Some(Duration::from_millis(200)),
            ..shell_step("sleep 5")
        };
        let outcome = execute_step(&step, &ExecutionOptions::default());

        assert_eq!(outcome.status, StepStatus::Failed);
        assert!(matches!(
            outcome.failure,
            Some(StepFailure::Timeout { seconds }) if (seconds - 0.2).abs() < 1e-9
        ));
    }

    #[test]
    fn env_is_passed_through() {
        let mut options = ExecutionOptions::default();
        options
            .env
            .insert("JUMP_IN_TEST".to_string(), "present".to_string());

        let line = if cfg!(windows) {
            "echo %JUMP_IN_TEST%"
        } else {
            "echo $JUMP_IN_TEST"
        };
        let outcome = execute_step(&shell_step(line), &options);

        assert!(outcome.stdout.contains("present"));
    }

    #[test]
    fn summary_line_mentions_failure() {
        let outcome = execute_step(&shell_step("exit 4"), &ExecutionOptions::default());
        let line = outcome.summary_line();
        assert!(line.contains("Step 0"));
        assert!(line.contains("exit code 4"));
    }

    #[test]
    fn format_duration_scales() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn status_display() {
        assert_eq!(StepStatus::Success.to_string(), "success");
        assert_eq!(StepStatus::FailedIgnored.to_string(), "failed (ignored)");
        assert_eq!(StepStatus::Failed.display_char(), '✗');
    }
}
