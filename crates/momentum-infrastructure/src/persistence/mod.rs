mod database;
mod repositories;
mod result_ext;
mod transaction;

pub use database::Database;
pub use result_ext::ResultExt;
pub use transaction::{SqliteTransactionContext, SqliteUnitOfWork};

use momentum_domain::shared::DomainError;

/// Narrow an INTEGER column into a domain counter
pub(crate) fn to_u32(value: i64, column: &str) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|_| {
        DomainError::DataIntegrity(format!("Column {} holds out-of-range value {}", column, value))
    })
}

pub(crate) fn to_u64(value: i64, column: &str) -> Result<u64, DomainError> {
    u64::try_from(value).map_err(|_| {
        DomainError::DataIntegrity(format!("Column {} holds out-of-range value {}", column, value))
    })
}

/// Widen a domain counter for binding; SQLite integers are signed 64-bit
pub(crate) fn to_i64(value: u64, column: &str) -> Result<i64, DomainError> {
    i64::try_from(value).map_err(|_| {
        DomainError::Validation(format!("Value {} for {} exceeds storage range", value, column))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_conversions() {
        assert_eq!(to_u32(7, "c").unwrap(), 7);
        assert!(matches!(
            to_u32(-1, "c"),
            Err(DomainError::DataIntegrity(_))
        ));
        assert!(to_u64(-5, "c").is_err());
        assert!(to_i64(u64::MAX, "c").is_err());
    }
}
