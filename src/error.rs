/// Unified error handling for kvbridge
///
/// Every failure crosses the backend, registry and driver boundaries as an
/// `EngineError` value. Errors are grouped into the five kinds callers care
/// about: configuration, connectivity, command, interruption and history I/O.

use crate::config::ConfigError;
use crate::core::BackendKind;
use crate::PROJECT_NAME;
use std::fmt;
use std::io;
use thiserror::Error;

/// Main error type for kvbridge operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed settings, missing master, unsupported backend
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Connect/disconnect/network failures
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Unknown command, arity mismatch, unsupported operation
    #[error("{0}")]
    Command(#[from] CommandError),

    /// The operation was cancelled through the driver interrupt flag
    #[error("Interrupted exec.")]
    Interrupted,

    /// A cluster node signalled that the request belongs to another node
    #[error("-> Redirected to slot [{slot}] located at {target}")]
    Redirect {
        slot: u16,
        target: String,
        ask: bool,
    },

    /// History log I/O errors
    #[error("History log error: {0}")]
    History(#[from] io::Error),

    /// Wire protocol errors
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal errors (should not happen in normal operation)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Command dispatch errors
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Unknown sequence: '{0}'.")]
    UnknownSequence(String),

    #[error("Invalid input argument(s) for command: {command}, syntax: {command} {params}")]
    InvalidArgs { command: String, params: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    NotSupported(String),

    #[error("{0}")]
    Backend(String),
}

/// Broad classification used by callers deciding how to present an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Connectivity,
    Command,
    Interrupted,
    Io,
}

/// Result type alias for kvbridge operations
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Create a connectivity error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        EngineError::Connection {
            message: message.into(),
        }
    }

    pub fn not_connected() -> Self {
        EngineError::connection("Not connected")
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(message: S) -> Self {
        EngineError::Protocol(message.into())
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        EngineError::Internal {
            message: message.into(),
        }
    }

    /// Create a backend-reported command error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        EngineError::Command(CommandError::Backend(message.into()))
    }

    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        EngineError::Command(CommandError::InvalidInput(message.into()))
    }

    pub fn unknown_sequence<S: Into<String>>(sequence: S) -> Self {
        EngineError::Command(CommandError::UnknownSequence(sequence.into()))
    }

    pub fn invalid_args<S: Into<String>>(command: S, params: S) -> Self {
        EngineError::Command(CommandError::InvalidArgs {
            command: command.into(),
            params: params.into(),
        })
    }

    /// Create a "not supported" error for an operation the backend cannot express
    pub fn not_supported(operation: &str, backend: BackendKind) -> Self {
        EngineError::Command(CommandError::NotSupported(format!(
            "Sorry, but now {} not supported {} command for {}.",
            PROJECT_NAME, operation, backend
        )))
    }

    pub fn missing_master<S: Into<String>>(cluster: S) -> Self {
        EngineError::Config(ConfigError::MissingMaster(cluster.into()))
    }

    pub fn unsupported_backend(kind: BackendKind) -> Self {
        EngineError::Config(ConfigError::UnsupportedBackend(kind.to_string()))
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Config(_) => ErrorKind::Configuration,
            EngineError::Connection { .. } => ErrorKind::Connectivity,
            EngineError::Protocol(_) => ErrorKind::Connectivity,
            EngineError::Redirect { .. } => ErrorKind::Connectivity,
            EngineError::Command(_) => ErrorKind::Command,
            EngineError::Internal { .. } => ErrorKind::Command,
            EngineError::Interrupted => ErrorKind::Interrupted,
            EngineError::History(_) => ErrorKind::Io,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, EngineError::Interrupted)
    }

    /// Check if this error is recoverable (the same driver can be used again)
    pub fn is_recoverable(&self) -> bool {
        match self {
            EngineError::Connection { .. } => true,
            EngineError::Interrupted => true,
            EngineError::Redirect { .. } => true,
            EngineError::History(_) => true,
            EngineError::Command(_) => true,
            _ => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EngineError::Config(_) => ErrorSeverity::Critical,
            EngineError::Internal { .. } => ErrorSeverity::Critical,
            EngineError::Connection { .. } => ErrorSeverity::Warning,
            EngineError::History(_) => ErrorSeverity::Warning,
            EngineError::Interrupted => ErrorSeverity::Info,
            EngineError::Redirect { .. } => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but don't crash the system
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = EngineError::connection("Connection refused");
        assert!(matches!(error, EngineError::Connection { .. }));
        assert_eq!(error.to_string(), "Connection error: Connection refused");
    }

    #[test]
    fn test_not_supported_message() {
        let error = EngineError::not_supported("change ttl", BackendKind::Lmdb);
        assert_eq!(
            error.to_string(),
            "Sorry, but now kvbridge not supported change ttl command for LMDB."
        );
        assert_eq!(error.kind(), ErrorKind::Command);
    }

    #[test]
    fn test_invalid_args_message() {
        let error = EngineError::invalid_args("SET", "<key> <value>");
        assert_eq!(
            error.to_string(),
            "Invalid input argument(s) for command: SET, syntax: SET <key> <value>"
        );
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(EngineError::Interrupted.kind(), ErrorKind::Interrupted);
        assert_eq!(
            EngineError::missing_master("cluster").kind(),
            ErrorKind::Configuration
        );
        let io_error = EngineError::History(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(io_error.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_severity() {
        let config_error = EngineError::Config(ConfigError::ValidationError("test".to_string()));
        assert_eq!(config_error.severity(), ErrorSeverity::Critical);
        assert_eq!(EngineError::Interrupted.severity(), ErrorSeverity::Info);
        assert_eq!(
            EngineError::connection("refused").severity(),
            ErrorSeverity::Warning
        );
    }

    #[test]
    fn test_error_recoverability() {
        assert!(EngineError::Interrupted.is_recoverable());
        assert!(EngineError::connection("refused").is_recoverable());

        let config_error = EngineError::Config(ConfigError::ValidationError("test".to_string()));
        assert!(!config_error.is_recoverable());
    }
}
