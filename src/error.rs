//! Error types for jump-in operations.
//!
//! This module defines [`JumpInError`], the error type for everything that
//! can go wrong before a command runs (loading, parsing, resolving a plan),
//! and [`ErrorKind`], the closed set of failure kinds shared with
//! [`StepFailure`](crate::steps::StepFailure).
//!
//! # Error Handling Strategy
//!
//! - Configuration errors are returned as `JumpInError` and never reach the executor
//! - Step failures are values inside a [`StepOutcome`](crate::steps::StepOutcome), not errors
//! - `anyhow::Error` (via `JumpInError::Other`) only wraps unexpected errors at the CLI edge

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for jump-in operations.
#[derive(Debug, Error)]
pub enum JumpInError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration is not valid structured data, or has the wrong shape.
    #[error("Malformed configuration: {message}")]
    MalformedConfig { message: String },

    /// The requested section is not defined in the document.
    #[error("Section '{section}' not found (available: {available})")]
    SectionNotFound { section: String, available: String },

    /// The section defines no steps.
    #[error("Steps not defined in '{section}'")]
    EmptySection { section: String },

    /// A template or command had a shape that cannot be executed.
    #[error("Invalid input type: {message}")]
    InvalidInputType { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl JumpInError {
    /// Classify this error into the shared [`ErrorKind`] set.
    ///
    /// Missing files and IO faults are reported as `MalformedConfig`: from
    /// the caller's side the document could not be read as configuration.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConfigNotFound { .. } | Self::MalformedConfig { .. } | Self::Io(_) => {
                ErrorKind::MalformedConfig
            }
            Self::SectionNotFound { .. } => ErrorKind::SectionNotFound,
            Self::EmptySection { .. } => ErrorKind::EmptySection,
            Self::InvalidInputType { .. } => ErrorKind::InvalidInputType,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

/// Closed enumeration of every failure kind the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CommandNotFound,
    Timeout,
    NonZeroExit,
    Other,
    MalformedConfig,
    SectionNotFound,
    EmptySection,
    InvalidInputType,
}

impl ErrorKind {
    /// Whether this kind is detected before any command runs.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedConfig
                | Self::SectionNotFound
                | Self::EmptySection
                | Self::InvalidInputType
        )
    }
}

/// Result type alias for jump-in operations.
pub type Result<T> = std::result::Result<T, JumpInError>;
