mod repository;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId};

pub use repository::{ActivityLogRepository, ActivityTotals};

/// Metrics reported by a single completed practice session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityMetrics {
    pub practice_seconds: u32,
    pub characters_typed: u32,
    pub words_typed: u32,
    pub wpm: f64,
    pub accuracy: f64,
}

impl ActivityMetrics {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !self.wpm.is_finite() || self.wpm < 0.0 {
            return Err(DomainError::Validation(format!(
                "WPM must be a non-negative number, got {}",
                self.wpm
            )));
        }
        if !self.accuracy.is_finite() || !(0.0..=100.0).contains(&self.accuracy) {
            return Err(DomainError::Validation(format!(
                "Accuracy must be between 0 and 100, got {}",
                self.accuracy
            )));
        }
        Ok(())
    }
}

/// One aggregated record per user per calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    user_id: UserId,
    date: NaiveDate,
    practice_seconds: u64,
    characters_typed: u64,
    words_typed: u64,
    average_wpm: f64,
    average_accuracy: f64,
    session_count: u32,
    updated_at: DateTime<Utc>,
}

impl DailyActivityRecord {
    /// Start the record for a day with its first session
    pub fn first_session(
        user_id: UserId,
        date: NaiveDate,
        metrics: &ActivityMetrics,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            date,
            practice_seconds: metrics.practice_seconds as u64,
            characters_typed: metrics.characters_typed as u64,
            words_typed: metrics.words_typed as u64,
            average_wpm: metrics.wpm,
            average_accuracy: metrics.accuracy,
            session_count: 1,
            updated_at: now,
        }
    }

    /// Restore from persistence
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        user_id: UserId,
        date: NaiveDate,
        practice_seconds: u64,
        characters_typed: u64,
        words_typed: u64,
        average_wpm: f64,
        average_accuracy: f64,
        session_count: u32,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            date,
            practice_seconds,
            characters_typed,
            words_typed,
            average_wpm,
            average_accuracy,
            session_count,
            updated_at,
        }
    }

    /// Fold another session of the same day into the aggregates.
    /// Totals accumulate; WPM and accuracy keep a running mean per session.
    pub fn record_session(&mut self, metrics: &ActivityMetrics, now: DateTime<Utc>) {
        let n = self.session_count as f64;
        self.average_wpm = (self.average_wpm * n + metrics.wpm) / (n + 1.0);
        self.average_accuracy = (self.average_accuracy * n + metrics.accuracy) / (n + 1.0);
        self.practice_seconds += metrics.practice_seconds as u64;
        self.characters_typed += metrics.characters_typed as u64;
        self.words_typed += metrics.words_typed as u64;
        self.session_count += 1;
        self.updated_at = now;
    }

    // Getters
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn practice_seconds(&self) -> u64 {
        self.practice_seconds
    }

    pub fn characters_typed(&self) -> u64 {
        self.characters_typed
    }

    pub fn words_typed(&self) -> u64 {
        self.words_typed
    }

    pub fn average_wpm(&self) -> f64 {
        self.average_wpm
    }

    pub fn average_accuracy(&self) -> f64 {
        self.average_accuracy
    }

    pub fn session_count(&self) -> u32 {
        self.session_count
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(seconds: u32, wpm: f64, accuracy: f64) -> ActivityMetrics {
        ActivityMetrics {
            practice_seconds: seconds,
            characters_typed: seconds * 3,
            words_typed: seconds / 2,
            wpm,
            accuracy,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_second_session_accumulates_and_averages() {
        let user = UserId::from_string("u1");
        let mut record =
            DailyActivityRecord::first_session(user, day(), &metrics(60, 40.0, 90.0), Utc::now());

        record.record_session(&metrics(120, 60.0, 100.0), Utc::now());

        assert_eq!(record.practice_seconds(), 180);
        assert_eq!(record.characters_typed(), 540);
        assert_eq!(record.session_count(), 2);
        assert_eq!(record.average_wpm(), 50.0);
        assert_eq!(record.average_accuracy(), 95.0);
    }

    #[test]
    fn test_running_mean_over_three_sessions() {
        let user = UserId::from_string("u1");
        let mut record =
            DailyActivityRecord::first_session(user, day(), &metrics(10, 30.0, 80.0), Utc::now());
        record.record_session(&metrics(10, 60.0, 80.0), Utc::now());
        record.record_session(&metrics(10, 90.0, 80.0), Utc::now());

        assert!((record.average_wpm() - 60.0).abs() < 1e-9);
        assert_eq!(record.date(), day());
    }

    #[test]
    fn test_metrics_validation() {
        assert!(metrics(10, 50.0, 99.5).validate().is_ok());
        assert!(metrics(10, -1.0, 90.0).validate().is_err());
        assert!(metrics(10, 50.0, 100.5).validate().is_err());
        assert!(metrics(10, f64::NAN, 90.0).validate().is_err());
    }
}
