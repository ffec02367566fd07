//! Error types and error code constants for tuguml.
//!
//! This module provides a unified error type (`UmlError`) that bridges
//! domain-specific errors from the subsystems (Java front end, artifact
//! stores, renderers, configuration) into a common format suitable for
//! JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid input (bad arguments, empty or missing source root)
//! - `3`: Resolution errors (artifact or component not found)
//! - `4`: Store errors (artifact could not be saved, loaded or deleted)
//! - `5`: Render errors (diagram renderer failed or timed out)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! Subsystem crates implement `From<TheirError> for UmlError`; the core crate
//! knows nothing about them.

use std::fmt;

use thiserror::Error;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid input from caller (bad arguments, unusable source root).
    InvalidArguments = 2,
    /// Resolution errors (artifact or component not found).
    ResolutionError = 3,
    /// Artifact persistence failed.
    StoreError = 4,
    /// Diagram rendering failed.
    RenderError = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum UmlError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// The source root holds no parseable compilation unit.
    #[error("no parseable Java sources under {path}")]
    EmptySourceDirectory { path: String },

    /// The source root does not exist or is not a directory.
    #[error("source root not found: {path}")]
    SourceNotFound { path: String },

    /// A requested artifact or component does not exist.
    #[error("not found: {name}")]
    NotFound { name: String },

    /// Persisting or loading an artifact failed.
    #[error("store error: {message}")]
    StoreError { message: String },

    /// The diagram renderer failed.
    #[error("render error: {message}")]
    RenderError { message: String },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&UmlError> for OutputErrorCode {
    fn from(err: &UmlError) -> Self {
        match err {
            UmlError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            UmlError::EmptySourceDirectory { .. } => OutputErrorCode::InvalidArguments,
            UmlError::SourceNotFound { .. } => OutputErrorCode::InvalidArguments,
            UmlError::NotFound { .. } => OutputErrorCode::ResolutionError,
            UmlError::StoreError { .. } => OutputErrorCode::StoreError,
            UmlError::RenderError { .. } => OutputErrorCode::RenderError,
            UmlError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<UmlError> for OutputErrorCode {
    fn from(err: UmlError) -> Self {
        OutputErrorCode::from(&err)
    }
}

impl From<serde_json::Error> for UmlError {
    fn from(err: serde_json::Error) -> Self {
        UmlError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl UmlError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        UmlError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        UmlError::NotFound { name: name.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        UmlError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
