//! Run command implementation.
//!
//! The `jump-in run` command executes one section of a config file.

use std::path::{Path, PathBuf};

use crate::cli::args::RunArgs;
use crate::config::{load_document, resolve_plan, LoadOptions, Plan};
use crate::error::Result;
use crate::runner::{run_section_with, RunProgress, RunResult, RunStatus};
use crate::steps::{format_duration, StepOutcome, StepStatus};
use crate::ui::{SpinnerHandle, Theme, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    working_dir: PathBuf,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(working_dir: &Path, args: RunArgs) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
            args,
        }
    }

    /// Get the fallback working directory.
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Get the command arguments.
    pub fn args(&self) -> &RunArgs {
        &self.args
    }

    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            cwd: Some(self.working_dir.clone()),
            ..Default::default()
        }
    }

    fn load_plan(&self) -> Result<Plan> {
        let document = load_document(&self.args.config)?;
        resolve_plan(&document, &self.args.section, &self.load_options())
    }

    fn run(&self, on_progress: impl FnMut(RunProgress<'_>)) -> RunResult {
        run_section_with(
            &self.args.config,
            &self.args.section,
            &self.load_options(),
            on_progress,
        )
    }

    fn execute_json(&self) -> Result<CommandResult> {
        let (json, exit_code) = if self.args.dry_run {
            match self.load_plan() {
                Ok(plan) => (serde_json::to_string_pretty(&plan), 0),
                Err(e) => {
                    let result = RunResult::config_error(&self.args.section, &e);
                    (
                        serde_json::to_string_pretty(&result),
                        result.status.exit_code(),
                    )
                }
            }
        } else {
            let result = self.run(|_| {});
            (
                serde_json::to_string_pretty(&result),
                result.status.exit_code(),
            )
        };

        println!("{}", json.map_err(anyhow::Error::from)?);
        Ok(exit_result(exit_code))
    }

    fn show_dry_run(&self, plan: &Plan, ui: &mut dyn UserInterface) {
        let theme = Theme::detect();
        ui.message("Dry run: no commands will be executed");
        for step in &plan.steps {
            ui.message(&format!(
                "  {}",
                theme.format_step(step.index + 1, plan.len(), &step.description)
            ));
            ui.message(&format!("      $ {}", step.command));
            ui.message(&format!("      in {}", step.directory.display()));
            if let Some(timeout) = step.timeout {
                ui.message(&format!("      timeout {}", format_duration(timeout)));
            }
            if step.ignore_errors {
                ui.message("      errors ignored");
            }
        }
    }

    fn report(&self, result: &RunResult, ui: &mut dyn UserInterface) {
        let ran = result.outcomes.len();
        let ignored = result.ignored_failures().count();

        match (result.status, result.halting_outcome()) {
            (RunStatus::HaltedOnError, Some(outcome)) => {
                ui.error(&format!(
                    "Setup for '{}' halted at step {} ({}): {}",
                    result.section,
                    outcome.index + 1,
                    outcome.description,
                    failure_text(outcome)
                ));
            }
            _ => {
                let label = if ran == 1 { "step" } else { "steps" };
                let mut msg = format!(
                    "Setup for '{}' complete ({} {} in {})",
                    result.section,
                    ran,
                    label,
                    format_duration(result.duration)
                );
                if ignored > 0 {
                    msg.push_str(&format!(", {} failure(s) ignored", ignored));
                }
                ui.success(&msg);
            }
        }
    }
}

impl Command for RunCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        if self.args.json {
            return self.execute_json();
        }

        ui.show_header(&format!("Jumping into: {}", self.args.config.display()));

        if self.args.dry_run {
            let plan = match self.load_plan() {
                Ok(plan) => plan,
                Err(e) => {
                    ui.error(&e.to_string());
                    return Ok(CommandResult::failure(RunStatus::ConfigError.exit_code()));
                }
            };
            ui.show_header(&format!("Running setup for: {}", plan.section));
            self.show_dry_run(&plan, ui);
            return Ok(CommandResult::success());
        }

        ui.show_header(&format!("Running setup for: {}", self.args.section));

        let mode = ui.output_mode();
        let mut spinner: Option<Box<dyn SpinnerHandle>> = None;

        let result = self.run(|event| match event {
            RunProgress::StepStarting { step, total } => {
                spinner = Some(ui.start_spinner(&format!(
                    "[{}/{}] {}",
                    step.index + 1,
                    total,
                    step.description
                )));
            }
            RunProgress::StepFinished { outcome, .. } => {
                if let Some(mut handle) = spinner.take() {
                    finish_spinner(&mut *handle, outcome);
                }
                if mode.shows_command_output() {
                    ui.show_command_output(&format!("$ {}", outcome.command), &outcome.stdout);
                }
                if outcome.status != StepStatus::Success {
                    ui.show_command_output("stderr", &outcome.stderr);
                }
            }
        });

        if result.status == RunStatus::ConfigError {
            let diagnostic = result.diagnostic.as_deref().unwrap_or("configuration error");
            ui.error(diagnostic);
            return Ok(exit_result(result.status.exit_code()));
        }

        self.report(&result, ui);
        Ok(exit_result(result.status.exit_code()))
    }
}

fn finish_spinner(spinner: &mut dyn SpinnerHandle, outcome: &StepOutcome) {
    let elapsed = format_duration(outcome.duration);
    match outcome.status {
        StepStatus::Success => {
            spinner.finish_success(&format!("{} ({})", outcome.description, elapsed))
        }
        StepStatus::FailedIgnored => spinner.finish_warning(&format!(
            "{} failed, continuing: {}",
            outcome.description,
            failure_text(outcome)
        )),
        StepStatus::Failed => spinner.finish_error(&format!(
            "{}: {}",
            outcome.description,
            failure_text(outcome)
        )),
    }
}

fn failure_text(outcome: &StepOutcome) -> String {
    outcome
        .failure
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

fn exit_result(code: i32) -> CommandResult {
    if code == 0 {
        CommandResult::success()
    } else {
        CommandResult::failure(code)
    }
}
