use momentum_domain::shared::DomainError;

/// Extension trait for Result types to simplify error handling
pub trait ResultExt<T, E> {
    /// Convert error to DomainError::Infrastructure
    /// Usage: `result.to_infra_err()?`
    fn to_infra_err(self) -> Result<T, DomainError>;

    /// Convert error to DomainError::Serialization with context
    fn to_serialization_err(self, context: &str) -> Result<T, DomainError>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn to_infra_err(self) -> Result<T, DomainError> {
        self.map_err(|e| DomainError::Infrastructure(e.to_string()))
    }

    fn to_serialization_err(self, context: &str) -> Result<T, DomainError> {
        self.map_err(|e| DomainError::Serialization(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_infra_err() {
        let result: Result<i32, &str> = Err("task panicked");
        match result.to_infra_err() {
            Err(DomainError::Infrastructure(msg)) => assert_eq!(msg, "task panicked"),
            _ => panic!("Expected Infrastructure error"),
        }
    }

    #[test]
    fn test_to_serialization_err_keeps_context() {
        let result: Result<i32, &str> = Err("trailing comma");
        match result.to_serialization_err("Default catalog") {
            Err(DomainError::Serialization(msg)) => {
                assert_eq!(msg, "Default catalog: trailing comma")
            }
            _ => panic!("Expected Serialization error"),
        }
    }
}
