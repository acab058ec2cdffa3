// Task lifecycle and the read surface over alerts.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use url::Url;
use uuid::Uuid;

use pagewatch_common::{AlertView, NewTask, PagewatchError, Task};

use crate::checker::{CheckOutcome, TaskChecker};
use crate::traits::TaskStore;

/// Alerts shown when no limit is given.
pub const DEFAULT_ALERT_WINDOW: i64 = 20;

/// Trim, add `https://` when no scheme is given, and require an http(s) URL
/// with a host. Returns the parsed URL's canonical form.
pub fn normalize_task_url(raw: &str) -> std::result::Result<String, PagewatchError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PagewatchError::Validation("url must not be empty".into()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| PagewatchError::Validation(format!("invalid url {raw:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(PagewatchError::Validation(format!(
            "url {raw:?} must use http or https, not {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(PagewatchError::Validation(format!("url {raw:?} has no host")));
    }
    Ok(parsed.to_string())
}

pub struct TaskService {
    store: Arc<dyn TaskStore>,
    checker: Arc<TaskChecker>,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, checker: Arc<TaskChecker>) -> Self {
        Self { store, checker }
    }

    pub async fn create_task(&self, url: &str, keyword: &str, interval_minutes: i32) -> Result<Task> {
        let new = NewTask {
            url: normalize_task_url(url)?,
            keyword: keyword.to_string(),
            interval_minutes,
        };
        new.validate()?;

        let task = self.store.create_task(&new).await?;
        info!(task_id = %task.id, url = task.url.as_str(), keyword = task.keyword.as_str(), "Task created");
        Ok(task)
    }

    /// Remove a task together with its links and alerts.
    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        if !self.store.delete_task(id).await? {
            return Err(PagewatchError::TaskNotFound(id).into());
        }
        info!(task_id = %id, "Task deleted");
        Ok(())
    }

    /// Pause or resume a task without losing its history.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<()> {
        if !self.store.set_active(id, active).await? {
            return Err(PagewatchError::TaskNotFound(id).into());
        }
        info!(task_id = %id, active, "Task activity changed");
        Ok(())
    }

    /// Run a cycle immediately, ignoring due-ness.
    pub async fn check_now(&self, id: Uuid) -> Result<CheckOutcome> {
        if self.store.get_task(id).await?.is_none() {
            return Err(PagewatchError::TaskNotFound(id).into());
        }
        Ok(self.checker.check_task(id).await)
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.store.list_tasks().await
    }

    /// Newest alerts with the originating link split out of the context.
    pub async fn recent_alerts(&self, limit: Option<i64>) -> Result<Vec<AlertView>> {
        let limit = limit.unwrap_or(DEFAULT_ALERT_WINDOW).max(0);
        let alerts = self.store.recent_alerts(limit).await?;
        Ok(alerts.iter().map(|a| a.view()).collect())
    }
}
