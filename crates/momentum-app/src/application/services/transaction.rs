use std::future::Future;
use tracing::warn;

use momentum_domain::shared::DomainError;
use momentum_domain::store::EngagementTransaction;

/// Commit on success, roll back on failure
pub(crate) async fn finish<T>(
    tx: Box<dyn EngagementTransaction>,
    result: Result<T, DomainError>,
) -> Result<T, DomainError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!("[store] Rollback after '{}' failed: {}", err, rollback_err);
            }
            Err(err)
        }
    }
}

/// Run a transactional operation, retrying exactly once on a store conflict.
/// A second conflict is returned to the caller as a transient failure.
pub(crate) async fn with_conflict_retry<T, F, Fut>(
    operation: &str,
    mut attempt: F,
) -> Result<T, DomainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DomainError>>,
{
    match attempt().await {
        Err(err) if err.is_conflict() => {
            warn!("[store] {} hit a conflict, retrying once: {}", operation, err);
            attempt().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_a_single_conflict() {
        let calls = AtomicUsize::new(0);
        let result = with_conflict_retry("op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DomainError::TransactionConflict("busy".into()))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_second_conflict_is_surfaced() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_conflict_retry("op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::TransactionConflict("busy".into()))
        })
        .await;
        assert!(result.unwrap_err().is_recoverable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_conflict_retry("op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(DomainError::AlreadyClaimed { milestone: 3 })
        })
        .await;
        assert_eq!(result, Err(DomainError::AlreadyClaimed { milestone: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
