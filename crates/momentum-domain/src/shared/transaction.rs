use async_trait::async_trait;

use super::DomainError;

/// Abstract transaction context for the Unit of Work pattern.
/// Lets the application layer draw transactional boundaries without
/// depending on a specific database implementation.
#[async_trait]
pub trait TransactionContext: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<(), DomainError>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<(), DomainError>;
}
