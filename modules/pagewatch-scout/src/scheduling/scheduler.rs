use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use pagewatch_common::{CheckSummary, Task};

use crate::checker::TaskChecker;
use crate::traits::TaskStore;

/// Runs every due task once, in order. Safe to call on any timer: due-ness
/// comes from stored state alone.
pub struct TaskScheduler {
    store: Arc<dyn TaskStore>,
    checker: Arc<TaskChecker>,
}

impl TaskScheduler {
    pub fn new(store: Arc<dyn TaskStore>, checker: Arc<TaskChecker>) -> Self {
        Self { store, checker }
    }

    pub async fn check_all(&self) -> Result<CheckSummary> {
        self.check_all_at(Utc::now()).await
    }

    /// One scheduling pass using `now` for due-ness.
    pub async fn check_all_at(&self, now: DateTime<Utc>) -> Result<CheckSummary> {
        let tasks = self.store.active_tasks().await?;
        let mut summary = CheckSummary {
            total: tasks.len(),
            ..CheckSummary::default()
        };
        info!(total = summary.total, "Active tasks loaded");

        for task in due_tasks(&tasks, now) {
            let outcome = self.checker.check_task(task.id).await;
            summary.checked += 1;
            if outcome.found() {
                summary.found += 1;
            }
        }

        info!(
            checked = summary.checked,
            found = summary.found,
            total = summary.total,
            "Scheduling pass complete"
        );
        Ok(summary)
    }

    /// Run a pass every `period` until `shutdown` resolves.
    ///
    /// The one shutdown future is raced against both the idle wait and the
    /// pass itself. Stopping mid-pass drops the in-flight cycle uncommitted.
    pub async fn watch<F>(&self, period: Duration, shutdown: F)
    where
        F: Future,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        info!(interval_secs = period.as_secs(), "Watching");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = &mut shutdown => {
                    warn!("Stopped during a scheduling pass, in-flight cycle discarded");
                    break;
                }
                result = self.check_all() => {
                    if let Err(e) = result {
                        warn!(error = format!("{e:#}").as_str(), "Scheduling pass failed");
                    }
                }
            }
        }

        info!("Watch stopped");
    }
}

/// Active tasks due at `now`, in input order.
pub fn due_tasks(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|task| {
            let due = task.is_active && task.is_due(now);
            if !due {
                debug!(task_id = %task.id, next_check = ?task.next_check(), "Not due, skipping");
            }
            due
        })
        .collect()
}
