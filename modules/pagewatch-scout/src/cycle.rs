use pagewatch_common::PendingAlert;
use uuid::Uuid;

/// Writes produced by one check cycle, held in memory until the cycle
/// completes. Dropping it discards the cycle; nothing reaches the store
/// until [`TaskStore::commit_cycle`](crate::traits::TaskStore::commit_cycle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckCycle {
    task_id: Uuid,
    links: Vec<String>,
    alerts: Vec<PendingAlert>,
}

impl CheckCycle {
    pub fn new(task_id: Uuid) -> Self {
        Self {
            task_id,
            links: Vec::new(),
            alerts: Vec::new(),
        }
    }

    /// Mark a detail link as processed. Repeats are ignored.
    pub fn record_link(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.links.contains(&url) {
            self.links.push(url);
        }
    }

    pub fn add_alert(&mut self, context: impl Into<String>) {
        self.alerts.push(PendingAlert {
            context: context.into(),
        });
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn alerts(&self) -> &[PendingAlert] {
        &self.alerts
    }
}
