use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cycle::{Trigger, UpdateCycle};
use crate::error::ScheduleError;

/// Every day at 17:00 UTC (seconds-precision cron syntax).
pub const DEFAULT_SCHEDULE: &str = "0 0 17 * * *";

#[derive(Debug, Clone)]
pub struct DailySchedule {
    expression: String,
    schedule: cron::Schedule,
}

impl DailySchedule {
    pub fn parse(expression: &str) -> Result<Self, ScheduleError> {
        let schedule =
            cron::Schedule::from_str(expression).map_err(|err| ScheduleError::InvalidCron {
                expression: expression.to_owned(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            expression: expression.to_owned(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn next_after(&self, after: DateTime<Utc>) -> Result<DateTime<Utc>, ScheduleError> {
        self.schedule
            .after(&after)
            .next()
            .ok_or_else(|| ScheduleError::Exhausted(self.expression.clone()))
    }
}

pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    pub async fn stop(self) -> Result<(), ScheduleError> {
        let _ = self.cancel_tx.send(());
        self.join.await.map_err(ScheduleError::from)
    }
}

/// Fires a scheduled update cycle at every occurrence of `schedule`.
///
/// Each firing runs on its own task, so a stalled cycle does not delay the
/// timer; the cycle's own lock orders overlapping runs.
pub fn spawn_scheduler(schedule: DailySchedule, cycle: Arc<UpdateCycle>) -> SchedulerHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let join = tokio::spawn(async move {
        let mut after = Utc::now();
        loop {
            let next = match schedule.next_after(after) {
                Ok(next) => next,
                Err(err) => {
                    error!(error = %err, "scheduler stopped");
                    break;
                }
            };
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next, schedule = schedule.expression(), "next update check scheduled");

            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!("scheduler shutdown requested");
                    break;
                }
                _ = tokio::time::sleep(wait) => {
                    info!("running daily manga update check");
                    let cycle = Arc::clone(&cycle);
                    tokio::spawn(async move {
                        let report = cycle.run(Trigger::Scheduled).await;
                        info!(records = report.records, outcome = ?report.outcome, "scheduled check finished");
                    });
                    after = next;
                }
            }
        }
    });

    SchedulerHandle { cancel_tx, join }
}
