use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" and of the calendar day activity is attributed to.
///
/// Streak arithmetic works on calendar days, so implementations decide which
/// timezone "today" belongs to.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate;
}
