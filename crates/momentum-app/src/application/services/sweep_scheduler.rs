use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, TimeZone, Utc};
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::freeze_service::reconcile_freezes;
use super::notification_service::NotificationService;
use super::streak_service::load_streak;
use super::transaction::finish;
use momentum_domain::analytics::EngagementSnapshot;
use momentum_domain::shared::{Clock, DomainError, UserId};
use momentum_domain::store::UnitOfWork;

/// When the daily sweep runs and what it alerts on
#[derive(Debug, Clone, Copy)]
pub struct SweepSettings {
    pub hour: u32,
    pub minute: u32,
    pub utc_offset: FixedOffset,
    pub at_risk_threshold: f64,
    /// Upper bound on each sweep step
    pub step_timeout: Duration,
}

/// What a single sweep did. Failed steps leave their part at zero / `None`.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub expired_freezes: u64,
    pub resynced_users: usize,
    pub snapshot: Option<EngagementSnapshot>,
    pub alerts_delivered: usize,
}

/// First `hour:minute` at `offset` strictly after `now`
pub fn next_run_after(
    now: DateTime<Utc>,
    offset: FixedOffset,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Utc>> {
    let local_now = now.with_timezone(&offset);
    let target = local_now
        .date_naive()
        .and_hms_opt(hour.min(23), minute.min(59), 0)
        .and_then(|dt| offset.from_local_datetime(&dt).single())?;
    let next = if target <= local_now {
        target + ChronoDuration::days(1)
    } else {
        target
    };
    Some(next.with_timezone(&Utc))
}

/// One pass of the daily sweep: expire stale freezes, snapshot aggregates,
/// alert operators. Every step logs its own failure and the sweep moves on.
pub struct SweepJob {
    uow: Arc<dyn UnitOfWork>,
    clock: Arc<dyn Clock>,
    notifications: Arc<NotificationService>,
    settings: SweepSettings,
}

impl SweepJob {
    pub fn new(
        uow: Arc<dyn UnitOfWork>,
        clock: Arc<dyn Clock>,
        notifications: Arc<NotificationService>,
        settings: SweepSettings,
    ) -> Self {
        Self {
            uow,
            clock,
            notifications,
            settings,
        }
    }

    pub async fn run_once(&self) -> SweepReport {
        let started = std::time::Instant::now();
        info!("[sweep] Starting engagement sweep");
        let mut report = SweepReport::default();

        if let Some((expired, resynced)) = self.step("expire freezes", self.expire_freezes()).await {
            report.expired_freezes = expired;
            report.resynced_users = resynced;
        }

        report.snapshot = self
            .step("snapshot", self.take_snapshot(report.expired_freezes))
            .await;

        if let Some(snapshot) = &report.snapshot {
            report.alerts_delivered += self.notifications.send_to_all(&snapshot.summary()).await;
            if let Some(alert) = snapshot.at_risk_alert(self.settings.at_risk_threshold) {
                warn!(
                    "[sweep] {} of {} streaks at risk",
                    snapshot.at_risk_users, snapshot.total_users
                );
                report.alerts_delivered += self.notifications.send_to_all(&alert).await;
            }
        }

        info!(
            "[sweep] Finished in {}ms: {} freezes expired, {} users resynced",
            started.elapsed().as_millis(),
            report.expired_freezes,
            report.resynced_users
        );
        report
    }

    async fn step<T>(
        &self,
        name: &str,
        work: impl Future<Output = Result<T, DomainError>>,
    ) -> Option<T> {
        match tokio::time::timeout(self.settings.step_timeout, work).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!("[sweep] Step '{}' failed: {}", name, e.format_with_code());
                None
            }
            Err(_) => {
                error!(
                    "[sweep] Step '{}' timed out after {}s",
                    name,
                    self.settings.step_timeout.as_secs()
                );
                None
            }
        }
    }

    async fn expire_freezes(&self) -> Result<(u64, usize), DomainError> {
        let now = self.clock.now();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let expired = tx.expire_stale_freezes(now).await?;
            let users: BTreeSet<UserId> = expired.iter().map(|f| f.user_id().clone()).collect();
            for user_id in &users {
                let mut state = load_streak(tx.as_mut(), user_id, now).await?;
                reconcile_freezes(tx.as_mut(), &mut state, now).await?;
                tx.save_streak(&state).await?;
            }
            Ok::<_, DomainError>((expired.len() as u64, users.len()))
        }
        .await;
        finish(tx, result).await
    }

    async fn take_snapshot(&self, expired_freezes: u64) -> Result<EngagementSnapshot, DomainError> {
        let now = self.clock.now();
        let today = self.clock.today();
        let mut tx = self.uow.begin().await?;
        let result = async {
            let mut snapshot = tx
                .collect_snapshot(today, now - ChronoDuration::hours(24), now)
                .await?;
            snapshot.expired_freezes = expired_freezes;
            tx.save_snapshot(&snapshot).await?;
            Ok::<_, DomainError>(snapshot)
        }
        .await;
        finish(tx, result).await
    }
}

/// Owns the recurring sweep task and its cancellation signal
pub struct SweepScheduler {
    job: Arc<SweepJob>,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SweepScheduler {
    pub fn new(job: SweepJob) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            job: Arc::new(job),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn job(&self) -> &SweepJob {
        &self.job
    }

    pub async fn is_running(&self) -> bool {
        self.handle
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Spawn the sweep loop; a second call while running is ignored
    pub async fn start(&self) {
        let mut slot = self.handle.lock().await;
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!("[sweep] Scheduler already running");
            return;
        }

        self.shutdown_tx.send_replace(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let job = Arc::clone(&self.job);
        let settings = job.settings;

        let handle = tokio::spawn(async move {
            loop {
                let now = job.clock.now();
                let Some(next_run) =
                    next_run_after(now, settings.utc_offset, settings.hour, settings.minute)
                else {
                    error!(
                        "[sweep] Cannot compute next run for {:02}:{:02}, scheduler exits",
                        settings.hour, settings.minute
                    );
                    break;
                };
                let wait = (next_run - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(60));
                info!(
                    "[sweep] Next run at {} (in {} seconds)",
                    next_run.with_timezone(&settings.utc_offset).format("%Y-%m-%d %H:%M:%S %:z"),
                    wait.as_secs()
                );

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        job.run_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("[sweep] Scheduler loop stopped");
        });

        *slot = Some(handle);
        info!(
            "[sweep] Scheduler started, daily at {:02}:{:02} (UTC{})",
            settings.hour, settings.minute, settings.utc_offset
        );
    }

    /// Signal the loop and wait for it to finish
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
        let handle = self.handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!("[sweep] Scheduler task ended abnormally: {}", e);
            }
            info!("[sweep] Scheduler stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.from_utc_datetime(
            &NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(h, min, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_next_run_later_today() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            next_run_after(at(2025, 3, 1, 1, 0), utc, 3, 30),
            Some(at(2025, 3, 1, 3, 30))
        );
    }

    #[test]
    fn test_next_run_rolls_to_tomorrow_when_passed_or_equal() {
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(
            next_run_after(at(2025, 3, 1, 3, 30), utc, 3, 30),
            Some(at(2025, 3, 2, 3, 30))
        );
    }

    #[test]
    fn test_next_run_respects_offset() {
        // 03:30 at UTC+02:00 is 01:30 UTC
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(
            next_run_after(at(2025, 3, 1, 0, 0), plus_two, 3, 30),
            Some(at(2025, 3, 1, 1, 30))
        );
        assert_eq!(
            next_run_after(at(2025, 3, 1, 2, 0), plus_two, 3, 30),
            Some(at(2025, 3, 2, 1, 30))
        );
    }
}
