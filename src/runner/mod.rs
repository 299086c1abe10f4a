//! Step execution orchestration.

pub mod orchestrator;

pub use orchestrator::{run_section, run_section_with, Orchestrator, RunProgress, RunResult, RunStatus};
