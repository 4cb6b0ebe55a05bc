use momentum_domain::shared::DomainError;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Map sqlx errors onto domain errors with an operation label
pub trait ResultExt<T> {
    fn map_repo_error(self, context: &str) -> Result<T, DomainError>;
}

impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn map_repo_error(self, context: &str) -> Result<T, DomainError> {
        self.map_err(|e| map_sqlx_error(e, context))
    }
}

pub(crate) fn map_sqlx_error(err: sqlx::Error, context: &str) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if is_lock_contention(db.code().as_deref()) => {
            DomainError::TransactionConflict(format!("{}: {}", context, db.message()))
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            DomainError::Infrastructure(format!("{}: {}", context, err))
        }
        _ => DomainError::Repository(format!("{}: {}", context, err)),
    }
}

/// True for a uniqueness/primary key violation
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// SQLITE_BUSY / SQLITE_LOCKED, including their extended codes
fn is_lock_contention(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok())
        .map(|c| matches!(c & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}
