use momentum_domain::shared::{DomainError, ErrorCode, ErrorSeverity};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Message shown instead of store or runtime details
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred, please try again later";

/// Structured error returned by every facade operation
///
/// - Error code for programmatic handling
/// - Human-readable message
/// - Severity level for presentation
/// - Recoverability flag for retry logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandError {
    /// Numeric error code (1xxx-6xxx range)
    pub code: u16,

    /// Human-readable error message
    pub message: String,

    /// Error severity level
    pub severity: ErrorSeverity,

    /// Whether the operation can be retried
    pub recoverable: bool,
}

impl CommandError {
    /// Create an error from an error code and message
    pub fn from_code(error_code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: error_code.code(),
            message: message.into(),
            severity: error_code.severity(),
            recoverable: error_code.is_recoverable(),
        }
    }

    /// Map a domain error for callers. Internal kinds get a generic message
    /// unless `expose_internal` is set; the detail is logged either way.
    pub fn from_domain(err: DomainError, expose_internal: bool) -> Self {
        let code = err.code();
        if !code.is_internal() {
            return err.into();
        }

        error!("[facade] Internal error: {}", err.format_with_code());
        if expose_internal {
            err.into()
        } else {
            Self::from_code(code, INTERNAL_ERROR_MESSAGE)
        }
    }

    /// Create a generic infrastructure error
    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InfrastructureError, message)
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::InvalidInput, message)
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::from_code(ErrorCode::NotFound, message)
    }
}

impl From<DomainError> for CommandError {
    fn from(err: DomainError) -> Self {
        Self {
            code: err.code().code(),
            message: err.message(),
            severity: err.severity(),
            recoverable: err.is_recoverable(),
        }
    }
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        Self::infrastructure(message)
    }
}

impl From<&str> for CommandError {
    fn from(message: &str) -> Self {
        Self::infrastructure(message.to_string())
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        Self::infrastructure(err.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::from_code(ErrorCode::SerializationError, err.to_string())
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_from_domain_error() {
        let cmd_err: CommandError = DomainError::AlreadyClaimed { milestone: 10 }.into();

        assert_eq!(cmd_err.code, 3001);
        assert!(cmd_err.message.contains("10"));
        assert_eq!(cmd_err.severity, ErrorSeverity::Info);
        assert!(!cmd_err.recoverable);
    }

    #[test]
    fn test_internal_errors_are_masked_unless_exposed() {
        let err = DomainError::Repository("UNIQUE constraint failed: claims.user_id".to_string());

        let masked = CommandError::from_domain(err.clone(), false);
        assert_eq!(masked.code, 4001);
        assert_eq!(masked.message, INTERNAL_ERROR_MESSAGE);
        assert_eq!(masked.severity, ErrorSeverity::Error);

        let exposed = CommandError::from_domain(err, true);
        assert!(exposed.message.contains("UNIQUE constraint"));
    }

    #[test]
    fn test_business_errors_are_never_masked() {
        let err = DomainError::InsufficientStreak {
            required: 10,
            current: 4,
        };
        let cmd_err = CommandError::from_domain(err, false);
        assert_eq!(cmd_err.code, 3002);
        assert!(cmd_err.message.contains("10"));
        assert!(cmd_err.message.contains("4"));
    }

    #[test]
    fn test_conflicts_are_recoverable() {
        let cmd_err = CommandError::from_domain(
            DomainError::TransactionConflict("database is locked".to_string()),
            false,
        );
        assert_eq!(cmd_err.code, 4002);
        assert!(cmd_err.recoverable);
        assert_eq!(cmd_err.severity, ErrorSeverity::Warning);
    }

    #[test]
    fn test_command_error_from_string() {
        let cmd_err: CommandError = "Something went wrong".into();

        assert_eq!(cmd_err.code, 5001);
        assert_eq!(cmd_err.message, "Something went wrong");
        assert_eq!(cmd_err.severity, ErrorSeverity::Error);
    }

    #[test]
    fn test_command_error_display() {
        let err = CommandError::invalid_input("page must be at least 1");
        assert_eq!(err.to_string(), "[6002] page must be at least 1");
        assert_eq!(CommandError::not_found("x").code, 2001);
    }
}
