//! Schema command implementation.
//!
//! The `jump-in schema` command prints the JSON Schema of the config format.

use crate::config::document_schema;
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{Command, CommandResult};

/// The schema command implementation.
pub struct SchemaCommand;

impl SchemaCommand {
    /// Render the schema as pretty-printed JSON.
    pub fn render() -> Result<String> {
        let schema = document_schema();
        Ok(serde_json::to_string_pretty(&schema).map_err(anyhow::Error::from)?)
    }
}

impl Command for SchemaCommand {
    fn execute(&self, _ui: &mut dyn UserInterface) -> Result<CommandResult> {
        // Machine-readable output goes straight to stdout regardless of mode
        println!("{}", Self::render()?);
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_describes_steps() {
        let rendered = SchemaCommand::render().unwrap();
        let schema: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert!(rendered.contains("ignore_errors"));
        assert!(rendered.contains("use_shell"));
        assert_eq!(schema["type"], "object");
    }
}
