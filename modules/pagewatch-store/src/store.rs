// Postgres persistence for tasks, processed links and alerts.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use pagewatch_common::{Alert, NewTask, PendingAlert, Task};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: Uuid,
    url: String,
    keyword: String,
    interval_minutes: i32,
    is_active: bool,
    last_checked: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            url: row.url,
            keyword: row.keyword,
            interval_minutes: row.interval_minutes,
            is_active: row.is_active,
            last_checked: row.last_checked,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    id: Uuid,
    task_id: Uuid,
    found_at: DateTime<Utc>,
    context: String,
}

impl From<AlertRow> for Alert {
    fn from(row: AlertRow) -> Self {
        Alert {
            id: row.id,
            task_id: row.task_id,
            found_at: row.found_at,
            context: row.context,
        }
    }
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    // --- tasks ---

    pub async fn create_task(&self, new: &NewTask) -> Result<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, url, keyword, interval_minutes)
            VALUES ($1, $2, $3, $4)
            RETURNING id, url, keyword, interval_minutes, is_active, last_checked, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.url)
        .bind(&new.keyword)
        .bind(new.interval_minutes)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, url, keyword, interval_minutes, is_active, last_checked, created_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Task::from))
    }

    /// Delete a task and, through the cascade, its links and alerts.
    /// Returns whether a row was removed.
    pub async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE tasks SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All tasks, newest first.
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, url, keyword, interval_minutes, is_active, last_checked, created_at
            FROM tasks
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    pub async fn active_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, url, keyword, interval_minutes, is_active, last_checked, created_at
            FROM tasks
            WHERE is_active
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    // --- links ---

    /// The subset of `urls` already recorded as processed for this task.
    pub async fn known_links(&self, task_id: Uuid, urls: &[String]) -> Result<HashSet<String>> {
        if urls.is_empty() {
            return Ok(HashSet::new());
        }

        let known = sqlx::query_scalar::<_, String>(
            r#"
            SELECT url FROM task_links
            WHERE task_id = $1 AND url = ANY($2)
            "#,
        )
        .bind(task_id)
        .bind(urls)
        .fetch_all(&self.pool)
        .await?;

        Ok(known.into_iter().collect())
    }

    /// Persist everything a check cycle produced and stamp `last_checked`,
    /// all in one transaction.
    pub async fn commit_cycle(
        &self,
        task_id: Uuid,
        links: &[String],
        alerts: &[PendingAlert],
        checked_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for url in links {
            sqlx::query(
                r#"
                INSERT INTO task_links (task_id, url, first_seen)
                VALUES ($1, $2, $3)
                ON CONFLICT (task_id, url) DO NOTHING
                "#,
            )
            .bind(task_id)
            .bind(url)
            .bind(checked_at)
            .execute(&mut *tx)
            .await?;
        }

        for alert in alerts {
            sqlx::query(
                r#"
                INSERT INTO alerts (id, task_id, found_at, context)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(task_id)
            .bind(checked_at)
            .bind(&alert.context)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE tasks SET last_checked = $2 WHERE id = $1")
            .bind(task_id)
            .bind(checked_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            %task_id,
            links = links.len(),
            alerts = alerts.len(),
            "Check cycle committed"
        );
        Ok(())
    }

    // --- alerts ---

    /// Most recent alerts across all tasks.
    pub async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, task_id, found_at, context
            FROM alerts
            ORDER BY found_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Alert::from).collect())
    }

    pub async fn alerts_for_task(&self, task_id: Uuid, limit: i64) -> Result<Vec<Alert>> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT id, task_id, found_at, context
            FROM alerts
            WHERE task_id = $1
            ORDER BY found_at DESC
            LIMIT $2
            "#,
        )
        .bind(task_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Alert::from).collect())
    }
}
