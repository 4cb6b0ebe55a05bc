mod repository;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::{DomainError, UserId};

pub use repository::StreakRepository;

/// How a day's activity moved the streak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreakTransition {
    /// First qualifying activity ever
    Started,
    /// Already practiced today (or the clock went backwards)
    SameDay,
    /// Practiced on the day after the last activity
    Extended,
    /// A single missed day was covered by a freeze.
    /// `consumed_freeze` is false when the freeze was applied ahead of time.
    Bridged { consumed_freeze: bool },
    /// The gap could not be bridged; the streak restarts at 1
    Reset { previous_streak: u32, gap_days: i64 },
}

/// Durable per-user streak record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakState {
    user_id: UserId,
    current_streak: u32,
    longest_streak: u32,
    last_activity_date: Option<NaiveDate>,
    freeze_count: u32,
    freeze_pending_consumption: bool,
    updated_at: DateTime<Utc>,
}

impl StreakState {
    /// Lazily created record for a user who has never practiced
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            freeze_count: 0,
            freeze_pending_consumption: false,
            updated_at: now,
        }
    }

    /// Restore from persistence, rejecting rows that break the streak invariant
    pub fn restore(
        user_id: UserId,
        current_streak: u32,
        longest_streak: u32,
        last_activity_date: Option<NaiveDate>,
        freeze_count: u32,
        freeze_pending_consumption: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if longest_streak < current_streak {
            return Err(DomainError::DataIntegrity(format!(
                "Streak for {} has longest {} below current {}",
                user_id, longest_streak, current_streak
            )));
        }

        Ok(Self {
            user_id,
            current_streak,
            longest_streak,
            last_activity_date,
            freeze_count,
            freeze_pending_consumption,
            updated_at,
        })
    }

    /// Calendar days between the last activity and `today`
    pub fn days_since_last_activity(&self, today: NaiveDate) -> Option<i64> {
        self.last_activity_date
            .map(|last| today.signed_duration_since(last).num_days())
    }

    /// Advance the state machine with activity on `today`
    pub fn apply_activity(&mut self, today: NaiveDate, now: DateTime<Utc>) -> StreakTransition {
        let transition = match self.days_since_last_activity(today) {
            None => {
                self.current_streak = 1;
                self.longest_streak = self.longest_streak.max(1);
                StreakTransition::Started
            }
            Some(diff) if diff <= 0 => StreakTransition::SameDay,
            Some(1) => {
                self.current_streak += 1;
                self.longest_streak = self.longest_streak.max(self.current_streak);
                StreakTransition::Extended
            }
            Some(2) if self.freeze_pending_consumption => {
                self.freeze_pending_consumption = false;
                StreakTransition::Bridged {
                    consumed_freeze: false,
                }
            }
            Some(2) if self.freeze_count > 0 => {
                self.freeze_count -= 1;
                self.freeze_pending_consumption = false;
                StreakTransition::Bridged {
                    consumed_freeze: true,
                }
            }
            Some(gap) => {
                let previous = self.current_streak;
                self.current_streak = 1;
                self.longest_streak = self.longest_streak.max(1);
                self.freeze_pending_consumption = false;
                StreakTransition::Reset {
                    previous_streak: previous,
                    gap_days: gap,
                }
            }
        };

        // lastActivityDate never moves backwards
        if self.last_activity_date.is_none_or(|last| today > last) {
            self.last_activity_date = Some(today);
        }
        self.updated_at = now;

        transition
    }

    /// Apply a freeze ahead of practice for the single day missed yesterday
    pub fn mark_freeze_pending(
        &mut self,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if self.freeze_pending_consumption {
            return Err(DomainError::FreezeNotApplicable(
                "a freeze is already protecting this gap".to_string(),
            ));
        }

        match self.days_since_last_activity(today) {
            Some(2) => {
                self.freeze_pending_consumption = true;
                self.updated_at = now;
                Ok(())
            }
            Some(diff) if diff < 2 => Err(DomainError::FreezeNotApplicable(
                "no missed day to protect".to_string(),
            )),
            Some(diff) => Err(DomainError::FreezeNotApplicable(format!(
                "a freeze covers a single missed day, {} days were missed",
                diff - 1
            ))),
            None => Err(DomainError::FreezeNotApplicable(
                "there is no streak to protect yet".to_string(),
            )),
        }
    }

    /// Align the cached freeze count with the freeze ledger
    pub fn sync_freeze_count(&mut self, available: u32) {
        self.freeze_count = available;
    }

    /// Practiced yesterday but not yet today
    pub fn is_at_risk(&self, today: NaiveDate) -> bool {
        self.current_streak > 0 && self.days_since_last_activity(today) == Some(1)
    }

    // Getters
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    pub fn last_activity_date(&self) -> Option<NaiveDate> {
        self.last_activity_date
    }

    pub fn freeze_count(&self) -> u32 {
        self.freeze_count
    }

    pub fn freeze_pending_consumption(&self) -> bool {
        self.freeze_pending_consumption
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn fresh() -> StreakState {
        StreakState::new(UserId::from_string("user-1"), Utc::now())
    }

    fn with_history(current: u32, longest: u32, last: NaiveDate, freezes: u32) -> StreakState {
        StreakState::restore(
            UserId::from_string("user-1"),
            current,
            longest,
            Some(last),
            freezes,
            false,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let mut state = fresh();
        let t = state.apply_activity(d(1), Utc::now());
        assert_eq!(t, StreakTransition::Started);
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 1);
        assert_eq!(state.last_activity_date(), Some(d(1)));
    }

    #[test]
    fn test_same_day_does_not_increment() {
        let mut state = with_history(4, 6, d(10), 0);
        assert_eq!(state.apply_activity(d(10), Utc::now()), StreakTransition::SameDay);
        assert_eq!(state.current_streak(), 4);
        assert_eq!(state.longest_streak(), 6);
    }

    #[test]
    fn test_next_day_extends_and_raises_longest() {
        let mut state = with_history(6, 6, d(10), 0);
        assert_eq!(state.apply_activity(d(11), Utc::now()), StreakTransition::Extended);
        assert_eq!(state.current_streak(), 7);
        assert_eq!(state.longest_streak(), 7);
    }

    #[test]
    fn test_single_gap_consumes_freeze() {
        let mut state = with_history(5, 9, d(10), 1);
        let t = state.apply_activity(d(12), Utc::now());
        assert_eq!(
            t,
            StreakTransition::Bridged {
                consumed_freeze: true
            }
        );
        assert_eq!(state.current_streak(), 5);
        assert_eq!(state.freeze_count(), 0);
        assert_eq!(state.last_activity_date(), Some(d(12)));
    }

    #[test]
    fn test_single_gap_without_freeze_resets() {
        let mut state = with_history(5, 9, d(10), 0);
        let t = state.apply_activity(d(12), Utc::now());
        assert_eq!(
            t,
            StreakTransition::Reset {
                previous_streak: 5,
                gap_days: 2
            }
        );
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 9);
    }

    #[test]
    fn test_multi_day_gap_resets_even_with_freezes() {
        let mut state = with_history(5, 5, d(10), 3);
        state.apply_activity(d(14), Utc::now());
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.freeze_count(), 3);
    }

    #[test]
    fn test_pending_freeze_bridges_without_second_consumption() {
        let mut state = with_history(3, 3, d(10), 2);
        state.mark_freeze_pending(d(12), Utc::now()).unwrap();
        assert!(state.freeze_pending_consumption());

        let t = state.apply_activity(d(12), Utc::now());
        assert_eq!(
            t,
            StreakTransition::Bridged {
                consumed_freeze: false
            }
        );
        assert_eq!(state.freeze_count(), 2);
        assert!(!state.freeze_pending_consumption());
        assert_eq!(state.current_streak(), 3);
    }

    #[test]
    fn test_pending_freeze_is_dropped_when_gap_grows() {
        let mut state = with_history(3, 3, d(10), 0);
        state.mark_freeze_pending(d(12), Utc::now()).unwrap();
        state.apply_activity(d(13), Utc::now());
        assert_eq!(state.current_streak(), 1);
        assert!(!state.freeze_pending_consumption());
    }

    #[test]
    fn test_mark_pending_requires_exactly_one_missed_day() {
        let mut state = with_history(3, 3, d(10), 1);
        assert!(matches!(
            state.mark_freeze_pending(d(11), Utc::now()),
            Err(DomainError::FreezeNotApplicable(_))
        ));
        assert!(state.mark_freeze_pending(d(13), Utc::now()).is_err());
        assert!(state.mark_freeze_pending(d(12), Utc::now()).is_ok());
        assert!(state.mark_freeze_pending(d(12), Utc::now()).is_err());
        assert!(fresh().mark_freeze_pending(d(12), Utc::now()).is_err());
    }

    #[test]
    fn test_clock_going_backwards_keeps_last_date() {
        let mut state = with_history(2, 2, d(10), 0);
        assert_eq!(state.apply_activity(d(8), Utc::now()), StreakTransition::SameDay);
        assert_eq!(state.last_activity_date(), Some(d(10)));
        assert_eq!(state.current_streak(), 2);
    }

    #[test]
    fn test_restore_rejects_broken_invariant() {
        let result = StreakState::restore(
            UserId::from_string("u"),
            5,
            4,
            Some(d(1)),
            0,
            false,
            Utc::now(),
        );
        assert!(matches!(result, Err(DomainError::DataIntegrity(_))));
    }

    #[test]
    fn test_documented_scenario() {
        let mut state = fresh();
        state.apply_activity(d(1), Utc::now());
        state.apply_activity(d(2), Utc::now());
        assert_eq!((state.current_streak(), state.longest_streak()), (2, 2));

        state.sync_freeze_count(1);
        state.apply_activity(d(4), Utc::now());
        assert_eq!(
            (state.current_streak(), state.longest_streak(), state.freeze_count()),
            (2, 2, 0)
        );

        state.apply_activity(d(6), Utc::now());
        assert_eq!(state.current_streak(), 1);
        assert_eq!(state.longest_streak(), 2);
    }

    #[test]
    fn test_longest_never_below_current_over_random_walk() {
        let mut state = fresh();
        let mut day = d(1);
        for step in 0..60u32 {
            let gap = match step % 7 {
                0 | 1 | 2 | 4 => 1,
                3 => 0,
                5 => 2,
                _ => 4,
            };
            day += Duration::days(gap);
            if step % 5 == 0 {
                state.sync_freeze_count(1);
            }
            state.apply_activity(day, Utc::now());
            assert!(state.longest_streak() >= state.current_streak());
        }
    }

    #[test]
    fn test_at_risk_only_when_yesterday_was_last() {
        let state = with_history(3, 3, d(10), 0);
        assert!(state.is_at_risk(d(11)));
        assert!(!state.is_at_risk(d(10)));
        assert!(!state.is_at_risk(d(12)));
    }
}
