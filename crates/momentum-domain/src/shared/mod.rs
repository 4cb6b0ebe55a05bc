use serde::{Deserialize, Serialize};

pub mod clock;
pub mod pagination;
pub mod random;
pub mod transaction;

pub use clock::Clock;
pub use pagination::{Page, PageRequest, Pagination};
pub use random::RandomSource;
pub use transaction::TransactionContext;

/// Maximum accepted length of a caller-supplied user identifier
pub const MAX_USER_ID_LEN: usize = 128;

/// Identifier of a user, supplied by the (authenticated) transport layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Validate and wrap a caller-supplied identifier
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidInput(
                "User id cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_USER_ID_LEN {
            return Err(DomainError::InvalidInput(format!(
                "User id exceeds {} characters",
                MAX_USER_ID_LEN
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Wrap an identifier read back from persistence
    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Resource Not Found (2xxx)
    NotFound = 2001,
    RewardNotFound = 2002,
    FreezeNotFoundOrExpired = 2003,

    // Business Logic (3xxx)
    AlreadyClaimed = 3001,
    InsufficientStreak = 3002,
    FreezeLimitReached = 3003,
    FreezeNotApplicable = 3004,
    ExperimentInactive = 3005,
    SurpriseNotTriggered = 3006,

    // Data & Persistence (4xxx)
    RepositoryError = 4001,
    TransactionConflict = 4002,
    DataIntegrityError = 4003,
    SerializationError = 4004,

    // Infrastructure (5xxx)
    InfrastructureError = 5001,

    // Validation (6xxx)
    ValidationError = 6001,
    InvalidInput = 6002,
    InvalidMilestoneId = 6003,
    InvalidFreezeId = 6004,
}

impl ErrorCode {
    /// Get error code as integer
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get error severity
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ErrorCode::NotFound
            | ErrorCode::RewardNotFound
            | ErrorCode::FreezeNotFoundOrExpired
            | ErrorCode::AlreadyClaimed
            | ErrorCode::InsufficientStreak
            | ErrorCode::FreezeLimitReached
            | ErrorCode::FreezeNotApplicable
            | ErrorCode::ExperimentInactive
            | ErrorCode::SurpriseNotTriggered
            | ErrorCode::ValidationError
            | ErrorCode::InvalidInput
            | ErrorCode::InvalidMilestoneId
            | ErrorCode::InvalidFreezeId => ErrorSeverity::Info,

            ErrorCode::TransactionConflict => ErrorSeverity::Warning,

            ErrorCode::RepositoryError
            | ErrorCode::DataIntegrityError
            | ErrorCode::SerializationError
            | ErrorCode::InfrastructureError => ErrorSeverity::Error,
        }
    }

    /// Check if error is recoverable (safe for the caller to retry later)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::TransactionConflict | ErrorCode::InfrastructureError
        )
    }

    /// Internal errors carry store or runtime details that must not reach end users
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ErrorCode::RepositoryError
                | ErrorCode::DataIntegrityError
                | ErrorCode::SerializationError
                | ErrorCode::InfrastructureError
        )
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Milestone {milestone} has already been claimed")]
    AlreadyClaimed { milestone: u32 },

    #[error("Milestone requires a {required}-day streak, current streak is {current}")]
    InsufficientStreak { required: u32, current: u32 },

    #[error("No reward configured for milestone {milestone} in variant '{variant}'")]
    RewardNotFound { variant: String, milestone: u32 },

    #[error("Freeze limit reached: at most {limit} unused freezes can be held")]
    FreezeLimitReached { limit: u32 },

    #[error("Freeze {0} not found or expired")]
    FreezeNotFoundOrExpired(i64),

    #[error("Freeze cannot be applied: {0}")]
    FreezeNotApplicable(String),

    #[error("Invalid milestone id: {0}")]
    InvalidMilestoneId(String),

    #[error("Invalid freeze id: {0}")]
    InvalidFreezeId(String),

    #[error("No active experiment for feature '{0}'")]
    ExperimentInactive(String),

    #[error("Surprise reward for milestone {milestone} was not triggered")]
    SurpriseNotTriggered { milestone: u32 },

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DomainError {
    /// Get error code
    pub fn code(&self) -> ErrorCode {
        match self {
            DomainError::NotFound(_) => ErrorCode::NotFound,
            DomainError::AlreadyClaimed { .. } => ErrorCode::AlreadyClaimed,
            DomainError::InsufficientStreak { .. } => ErrorCode::InsufficientStreak,
            DomainError::RewardNotFound { .. } => ErrorCode::RewardNotFound,
            DomainError::FreezeLimitReached { .. } => ErrorCode::FreezeLimitReached,
            DomainError::FreezeNotFoundOrExpired(_) => ErrorCode::FreezeNotFoundOrExpired,
            DomainError::FreezeNotApplicable(_) => ErrorCode::FreezeNotApplicable,
            DomainError::InvalidMilestoneId(_) => ErrorCode::InvalidMilestoneId,
            DomainError::InvalidFreezeId(_) => ErrorCode::InvalidFreezeId,
            DomainError::ExperimentInactive(_) => ErrorCode::ExperimentInactive,
            DomainError::SurpriseNotTriggered { .. } => ErrorCode::SurpriseNotTriggered,
            DomainError::TransactionConflict(_) => ErrorCode::TransactionConflict,
            DomainError::Repository(_) => ErrorCode::RepositoryError,
            DomainError::Infrastructure(_) => ErrorCode::InfrastructureError,
            DomainError::Validation(_) => ErrorCode::ValidationError,
            DomainError::DataIntegrity(_) => ErrorCode::DataIntegrityError,
            DomainError::InvalidInput(_) => ErrorCode::InvalidInput,
            DomainError::Serialization(_) => ErrorCode::SerializationError,
        }
    }

    /// Human-readable message (the `Display` output)
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Get error severity
    pub fn severity(&self) -> ErrorSeverity {
        self.code().severity()
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        self.code().is_recoverable()
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::TransactionConflict(_))
    }

    /// Format error with code
    pub fn format_with_code(&self) -> String {
        format!("[{}] {}", self.code().code(), self)
    }
}
