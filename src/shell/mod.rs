//! Process execution for step commands.

pub mod command;
pub mod platform;

pub use command::{execute_argv, execute_shell, CommandOptions, CommandResult};
pub use platform::{is_ci, shell_executable, shell_flag};
