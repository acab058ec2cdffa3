// Storage boundary for the checker, scheduler and task service.
//
// PgStore implements it for production; testing::MemoryStore for
// deterministic tests with no database.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pagewatch_common::{Alert, NewTask, Task};

use crate::cycle::CheckCycle;

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(&self, new: &NewTask) -> Result<Task>;

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>>;

    /// Returns whether a task was removed. Links and alerts go with it.
    async fn delete_task(&self, id: Uuid) -> Result<bool>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool>;

    /// All tasks, newest first.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn active_tasks(&self) -> Result<Vec<Task>>;

    /// Which of `urls` are already recorded as processed for this task.
    async fn known_links(&self, task_id: Uuid, urls: &[String]) -> Result<HashSet<String>>;

    /// Apply a finished cycle and stamp `last_checked`, all or nothing.
    async fn commit_cycle(&self, cycle: &CheckCycle, checked_at: DateTime<Utc>) -> Result<()>;

    /// Most recent alerts across all tasks, newest first.
    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>>;
}

#[async_trait]
impl TaskStore for pagewatch_store::PgStore {
    async fn create_task(&self, new: &NewTask) -> Result<Task> {
        Ok(self.create_task(new).await?)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.get_task(id).await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        Ok(self.delete_task(id).await?)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        Ok(self.set_active(id, active).await?)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.list_tasks().await?)
    }

    async fn active_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.active_tasks().await?)
    }

    async fn known_links(&self, task_id: Uuid, urls: &[String]) -> Result<HashSet<String>> {
        Ok(self.known_links(task_id, urls).await?)
    }

    async fn commit_cycle(&self, cycle: &CheckCycle, checked_at: DateTime<Utc>) -> Result<()> {
        Ok(self
            .commit_cycle(cycle.task_id(), cycle.links(), cycle.alerts(), checked_at)
            .await?)
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>> {
        Ok(self.recent_alerts(limit).await?)
    }
}
