//! Shared error type across tally crates.

use thiserror::Error;

/// Stable error codes (used in logs and HTTP responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed histogram bounds or config values.
    InvalidConfiguration,
    /// Rejected mutation argument.
    InvalidArgument,
    /// Unknown metric name.
    NotFound,
    /// Snapshot could not be serialized or written.
    ExportFailure,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ExportFailure => "EXPORT_FAILURE",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, TallyError>;

/// Unified error type used by core and agent.
#[derive(Debug, Error)]
pub enum TallyError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("export failed: {0}")]
    ExportFailure(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl TallyError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            TallyError::InvalidConfiguration(_) => ErrorCode::InvalidConfiguration,
            TallyError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            TallyError::NotFound(_) => ErrorCode::NotFound,
            TallyError::ExportFailure(_) => ErrorCode::ExportFailure,
            TallyError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            TallyError::Internal(_) => ErrorCode::Internal,
        }
    }
}
