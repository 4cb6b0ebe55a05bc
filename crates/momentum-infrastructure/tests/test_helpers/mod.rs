#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use std::sync::Arc;

use momentum_domain::shared::UserId;
use momentum_domain::store::UnitOfWork;
use momentum_infrastructure::persistence::{Database, SqliteUnitOfWork};
use momentum_infrastructure::InMemoryUnitOfWork;

/// Migrated private in-memory SQLite database
pub async fn setup_in_memory_db() -> Database {
    let db = Database::in_memory()
        .await
        .expect("Failed to open in-memory database");
    db.run_migrations().await.expect("Failed to run migrations");
    db
}

pub async fn sqlite_store() -> (Database, Arc<dyn UnitOfWork>) {
    let db = setup_in_memory_db().await;
    let uow: Arc<dyn UnitOfWork> = Arc::new(SqliteUnitOfWork::new(db.shared_pool()));
    (db, uow)
}

pub fn memory_store() -> Arc<dyn UnitOfWork> {
    Arc::new(InMemoryUnitOfWork::new())
}

pub fn day(year: i32, month: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, d).expect("valid date")
}

pub fn noon(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0).expect("valid time"))
}

pub fn user(id: &str) -> UserId {
    UserId::parse(id).expect("valid user id")
}
