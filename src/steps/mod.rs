//! Step resolution and execution.
//!
//! This module provides the core step execution engine:
//!
//! - [`ResolvedStep`] - A fully resolved step ready for execution
//! - [`StepCommand`] - Shell line or direct argv
//! - [`execute_step`] - Execute a step, capturing output
//! - [`StepOutcome`] - Capture execution results
//! - [`StepFailure`] - Classify why a step failed
//!
//! # Example
//!
//! ```no_run
//! use jump_in::steps::{execute_step, ExecutionOptions, ResolvedStep, StepCommand, StepStatus};
//!
//! let step = ResolvedStep {
//!     index: 0,
//!     description: "Say hello".to_string(),
//!     command: StepCommand::Shell("echo hello".to_string()),
//!     directory: std::env::temp_dir(),
//!     timeout: None,
//!     ignore_errors: false,
//! };
//!
//! let outcome = execute_step(&step, &ExecutionOptions::default());
//! match outcome.status {
//!     StepStatus::Success => println!("{}", outcome.stdout),
//!     StepStatus::Failed | StepStatus::FailedIgnored => {
//!         println!("Step failed: {:?}", outcome.failure)
//!     }
//! }
//! ```

pub mod executor;
pub mod resolved;

pub use executor::{
    execute_step, format_duration, ExecutionOptions, StepFailure, StepOutcome, StepStatus,
};
pub use resolved::{ResolveContext, ResolvedStep, StepCommand};
