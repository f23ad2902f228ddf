//! Error types for the mapping facade.

use thiserror::Error;

/// Result type for facade operations.
pub type OdmResult<T> = Result<T, OdmError>;

/// Errors that can occur while resolving, constructing, or forwarding
/// operations to the driver.
#[derive(Error, Debug)]
pub enum OdmError {
    /// A resolved type token has no registered constructor.
    #[error("type resolution error: {0}")]
    TypeResolution(String),

    /// A registered type does not satisfy the requested contract
    /// (collection vs. GridFS).
    #[error("type conformance error: {0}")]
    TypeConformance(String),

    /// Invalid configuration: capped-collection sizing, rejected write
    /// concern, bad mapping registration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A server command returned a non-success status.
    #[error("command failed with code {code}: {message}")]
    Command {
        /// Server error code.
        code: i32,
        /// Server error message.
        message: String,
    },

    /// A server reply was missing a field or carried an unexpected type.
    #[error("malformed server reply: {0}")]
    Reply(String),

    /// Connection-level failure reported while creating the client.
    #[error("connection error: {0}")]
    Connection(String),

    /// Any other MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),
}

impl OdmError {
    /// Create a type resolution error.
    pub fn type_resolution(message: impl Into<String>) -> Self {
        Self::TypeResolution(message.into())
    }

    /// Create a type conformance error.
    pub fn type_conformance(message: impl Into<String>) -> Self {
        Self::TypeConformance(message.into())
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a command error.
    pub fn command(code: i32, message: impl Into<String>) -> Self {
        Self::Command {
            code,
            message: message.into(),
        }
    }

    /// Create a malformed-reply error.
    pub fn reply(message: impl Into<String>) -> Self {
        Self::Reply(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Wrap a driver error, normalizing server command failures into
    /// [`OdmError::Command`] so callers see the server code and message.
    pub fn from_driver(err: mongodb::error::Error) -> Self {
        if let mongodb::error::ErrorKind::Command(ref command_err) = *err.kind {
            return Self::Command {
                code: command_err.code,
                message: command_err.message.clone(),
            };
        }
        Self::Driver(err)
    }

    /// Check if this is a type resolution error.
    pub fn is_type_resolution(&self) -> bool {
        matches!(self, Self::TypeResolution(_))
    }

    /// Check if this is a type conformance error.
    pub fn is_type_conformance(&self) -> bool {
        matches!(self, Self::TypeConformance(_))
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a server command error.
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = OdmError::configuration("size must be positive");
        assert!(err.is_configuration());

        let err = OdmError::type_resolution("no such token");
        assert!(err.is_type_resolution());

        let err = OdmError::type_conformance("registered as gridfs");
        assert!(err.is_type_conformance());

        let err = OdmError::command(11, "boom");
        assert!(err.is_command());
    }

    #[test]
    fn test_error_display() {
        let err = OdmError::configuration("test error");
        assert_eq!(err.to_string(), "configuration error: test error");

        let err = OdmError::command(11, "boom");
        assert_eq!(err.to_string(), "command failed with code 11: boom");

        let err = OdmError::reply("field 'was' is not an i32");
        assert_eq!(
            err.to_string(),
            "malformed server reply: field 'was' is not an i32"
        );
    }

    #[test]
    fn test_command_error_fields() {
        let err = OdmError::command(13, "unauthorized");
        match err {
            OdmError::Command { code, message } => {
                assert_eq!(code, 13);
                assert_eq!(message, "unauthorized");
            }
            _ => panic!("expected command error"),
        }
    }
}
