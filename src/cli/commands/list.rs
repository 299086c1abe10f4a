//! List command implementation.
//!
//! The `jump-in list` command lists the sections of a config file.

use crate::cli::args::ListArgs;
use crate::config::{load_document, ConfigDocument};
use crate::error::Result;
use crate::ui::{Theme, UserInterface};

use super::dispatcher::{Command, CommandResult};

/// The list command implementation.
pub struct ListCommand {
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(args: ListArgs) -> Self {
        Self { args }
    }

    /// Get the command arguments.
    pub fn args(&self) -> &ListArgs {
        &self.args
    }
}

/// One line per section: name, step count, and default directory.
pub fn section_lines(doc: &ConfigDocument, theme: &Theme) -> Vec<String> {
    doc.section_names()
        .into_iter()
        .map(|name| match doc.section(name) {
            Ok(section) => {
                let count = section.step_count();
                let label = if count == 1 { "step" } else { "steps" };
                let mut line = format!(
                    "  {} {}",
                    theme.highlight.apply_to(name),
                    theme.dim.apply_to(format!("({} {})", count, label))
                );
                if let Some(dir) = section.default_directory() {
                    line.push_str(&format!(" {}", theme.dim.apply_to(format!("in {}", dir))));
                }
                line
            }
            Err(e) => format!(
                "  {} {}",
                theme.highlight.apply_to(name),
                theme.warning.apply_to(format!("(invalid: {})", e))
            ),
        })
        .collect()
}

impl Command for ListCommand {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let doc = match load_document(&self.args.config) {
            Ok(doc) => doc,
            Err(e) => {
                ui.error(&e.to_string());
                return Ok(CommandResult::failure(2));
            }
        };

        let names = doc.section_names();
        if names.is_empty() {
            ui.warning(&format!(
                "No sections defined in {}",
                self.args.config.display()
            ));
            return Ok(CommandResult::success());
        }

        ui.show_header(&format!("Sections in {}", self.args.config.display()));
        for line in section_lines(&doc, &Theme::detect()) {
            ui.message(&line);
        }

        Ok(CommandResult::success())
    }
}
