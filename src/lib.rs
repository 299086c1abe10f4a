//! jump-in - Declarative setup steps from a JSON config file.
//!
//! A config file maps section names to an ordered list of shell steps plus
//! a `defaults` map. Running a section substitutes `{{key}}` placeholders
//! from the defaults, then runs each step in order with optional timeouts,
//! stopping at the first failure that is not marked `ignore_errors`.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, placeholder substitution, and plan resolution
//! - [`error`] - Error types and result aliases
//! - [`runner`] - Sequential run orchestration
//! - [`shell`] - Process execution with timeouts
//! - [`steps`] - Step resolution and execution
//! - [`ui`] - Spinners and terminal output
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use jump_in::config::{replace_placeholders, Delimiters};
//!
//! let mut defaults = BTreeMap::new();
//! defaults.insert("name".to_string(), "World".to_string());
//! let line = replace_placeholders("echo Hello, {{name}}!", &defaults, &Delimiters::default());
//! assert_eq!(line, "echo Hello, World!");
//! ```
//!
//! For file-based runs, see [`runner::run_section`] and the integration tests.

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod shell;
pub mod steps;
pub mod ui;

pub use error::{ErrorKind, JumpInError, Result};
