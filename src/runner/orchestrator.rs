//! Sequential execution of a resolved plan.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::config::{load_document, resolve_plan, LoadOptions, Plan};
use crate::error::{ErrorKind, JumpInError};
use crate::steps::{execute_step, ExecutionOptions, ResolvedStep, StepOutcome};

/// Progress events emitted during a run.
#[derive(Debug)]
pub enum RunProgress<'a> {
    /// A step is about to start.
    StepStarting {
        step: &'a ResolvedStep,
        total: usize,
    },
    /// A step finished.
    StepFinished {
        step: &'a ResolvedStep,
        outcome: &'a StepOutcome,
    },
}

/// Overall status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step succeeded or failed with `ignore_errors`.
    AllSucceeded,
    /// A step failed and the remaining steps were not run.
    HaltedOnError,
    /// The plan could not be loaded; nothing ran.
    ConfigError,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::AllSucceeded => 0,
            Self::HaltedOnError => 1,
            Self::ConfigError => 2,
        }
    }
}

/// Result of one pass over a section.
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    /// Section that was run.
    pub section: String,
    /// Outcomes in execution order.
    pub outcomes: Vec<StepOutcome>,
    /// Overall status.
    pub status: RunStatus,
    /// Index of the step that halted the run.
    pub halted_at: Option<usize>,
    /// Configuration diagnostic (for `ConfigError`).
    pub diagnostic: Option<String>,
    /// Configuration error classification (for `ConfigError`).
    pub error_kind: Option<ErrorKind>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total duration.
    pub duration: Duration,
}

impl RunResult {
    /// A run that never started because its configuration failed to load.
    pub fn config_error(section: &str, err: &JumpInError) -> Self {
        Self {
            section: section.to_string(),
            outcomes: Vec::new(),
            status: RunStatus::ConfigError,
            halted_at: None,
            diagnostic: Some(err.to_string()),
            error_kind: Some(err.kind()),
            started_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    /// Whether the run counts as successful.
    pub fn success(&self) -> bool {
        self.status == RunStatus::AllSucceeded
    }

    /// The outcome of the step that halted the run.
    pub fn halting_outcome(&self) -> Option<&StepOutcome> {
        self.halted_at
            .and_then(|index| self.outcomes.iter().find(|o| o.index == index))
    }

    /// Outcomes of steps that failed but were allowed to.
    pub fn ignored_failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == crate::steps::StepStatus::FailedIgnored)
    }
}

/// Drives a [`Plan`] one step at a time.
pub struct Orchestrator<'a> {
    plan: &'a Plan,
    options: ExecutionOptions,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator for a resolved plan.
    pub fn new(plan: &'a Plan) -> Self {
        Self {
            plan,
            options: ExecutionOptions::default(),
        }
    }

    /// Use custom execution options for every step.
    pub fn with_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Run every step.
    pub fn run(&self) -> RunResult {
        self.run_with_progress(|_| {})
    }

    /// Run every step with a progress callback.
    ///
    /// Steps run strictly in order. The first outcome with status
    /// `Failed` stops the run; later steps are never started.
    pub fn run_with_progress(&self, mut on_progress: impl FnMut(RunProgress<'_>)) -> RunResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = self.plan.steps.len();

        let mut outcomes = Vec::with_capacity(total);
        let mut halted_at = None;

        for step in &self.plan.steps {
            info!(
                "Step {}: {} ({} in {})",
                step.index,
                step.description,
                step.command,
                step.directory.display()
            );
            on_progress(RunProgress::StepStarting { step, total });

            let outcome = execute_step(step, &self.options);

            info!("{}", outcome.summary_line());
            on_progress(RunProgress::StepFinished {
                step,
                outcome: &outcome,
            });

            let halts = outcome.halts_run();
            outcomes.push(outcome);

            if halts {
                error!(
                    "Halting section '{}' at step {}",
                    self.plan.section, step.index
                );
                halted_at = Some(step.index);
                break;
            }
        }

        let status = if halted_at.is_some() {
            RunStatus::HaltedOnError
        } else {
            RunStatus::AllSucceeded
        };

        RunResult {
            section: self.plan.section.clone(),
            outcomes,
            status,
            halted_at,
            diagnostic: None,
            error_kind: None,
            started_at,
            duration: start.elapsed(),
        }
    }
}

/// Load `section` from the file at `path` and run it.
///
/// Load failures produce a `ConfigError` result and run nothing.
pub fn run_section(
    path: &Path,
    section: &str,
    on_progress: impl FnMut(RunProgress<'_>),
) -> RunResult {
    run_section_with(path, section, &LoadOptions::default(), on_progress)
}

/// [`run_section`] with explicit load options (base directory, delimiters).
pub fn run_section_with(
    path: &Path,
    section: &str,
    load_options: &LoadOptions,
    on_progress: impl FnMut(RunProgress<'_>),
) -> RunResult {
    let plan = load_document(path).and_then(|doc| resolve_plan(&doc, section, load_options));

    match plan {
        Ok(plan) => Orchestrator::new(&plan).run_with_progress(on_progress),
        Err(e) => {
            error!("Configuration error for '{}': {}", section, e);
            RunResult::config_error(section, &e)
        }
    }
}
