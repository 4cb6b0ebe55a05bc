use async_trait::async_trait;
use momentum_domain::shared::{DomainError, TransactionContext};
use momentum_domain::store::{EngagementTransaction, UnitOfWork};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction as SqlxTransaction};
use std::sync::Arc;

use super::ResultExt;

/// Sqlite implementation of TransactionContext.
/// Repository ports are implemented directly on it so every read and write
/// of one unit of work shares the same connection.
pub struct SqliteTransactionContext {
    tx: Option<SqlxTransaction<'static, Sqlite>>,
}

impl SqliteTransactionContext {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>) -> Self {
        Self { tx: Some(tx) }
    }

    /// Connection of the open transaction
    pub(crate) fn conn(&mut self) -> Result<&mut SqliteConnection, DomainError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| DomainError::Repository("Transaction already finished".to_string()))
    }
}

#[async_trait]
impl TransactionContext for SqliteTransactionContext {
    async fn commit(mut self: Box<Self>) -> Result<(), DomainError> {
        match self.tx.take() {
            Some(tx) => tx.commit().await.map_repo_error("Commit transaction"),
            None => Err(DomainError::Repository(
                "Transaction already finished".to_string(),
            )),
        }
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), DomainError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_repo_error("Rollback transaction"),
            None => Err(DomainError::Repository(
                "Transaction already finished".to_string(),
            )),
        }
    }
}

/// Sqlite implementation of Unit of Work
pub struct SqliteUnitOfWork {
    pool: Arc<SqlitePool>,
}

impl SqliteUnitOfWork {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UnitOfWork for SqliteUnitOfWork {
    async fn begin(&self) -> Result<Box<dyn EngagementTransaction>, DomainError> {
        let tx = self.pool.begin().await.map_repo_error("Begin transaction")?;
        Ok(Box::new(SqliteTransactionContext::new(tx)))
    }
}
