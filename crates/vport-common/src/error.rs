//! Common error types for the vport ecosystem.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`VportError`].
pub type VportResult<T> = Result<T, VportError>;

/// Common errors across the vport ecosystem.
#[derive(Error, Diagnostic, Debug)]
pub enum VportError {
    /// Caller-supplied network configuration is incomplete or invalid.
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(vport::config))]
    Config {
        /// What is missing or malformed.
        message: String,
    },

    /// The control database could not be reached, or stopped answering.
    #[error("Connection to {endpoint} failed: {message}")]
    #[diagnostic(
        code(vport::connection_failed),
        help("Check that ovsdb-server is running and listening on the endpoint")
    )]
    ConnectionFailed {
        /// The endpoint that was dialed.
        endpoint: String,
        /// The underlying failure.
        message: String,
    },

    /// A submitted transaction reported an error, or a conditional
    /// mutation matched zero rows when at least one was expected.
    #[error("Transaction failed: {error}{}", .details.as_ref().map(|d| format!(" ({d})")).unwrap_or_default())]
    #[diagnostic(code(vport::transaction_failed))]
    TransactionFailed {
        /// The database's own error string, preserved verbatim.
        error: String,
        /// The database's detail string, when present.
        details: Option<String>,
    },

    /// A single link-control step failed.
    #[error("Device operation '{operation}' on {device} failed: {message}")]
    #[diagnostic(code(vport::device_operation_failed))]
    DeviceOperationFailed {
        /// The device the operation targeted.
        device: String,
        /// The step that failed (e.g. "set mtu", "rename").
        operation: String,
        /// The underlying failure.
        message: String,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(vport::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(vport::serialization))]
    Serialization(String),
}

impl From<serde_json::Error> for VportError {
    fn from(err: serde_json::Error) -> Self {
        VportError::Serialization(err.to_string())
    }
}
