// Test mocks for the check pipeline.
//
// Three mocks matching the three trait boundaries:
// - MockFetcher (PageFetcher): URL -> HTML, 403, or failure
// - MockExtractor (TextExtractor): URL -> text, absent, or failure
// - MemoryStore (TaskStore): stateful in-memory tasks, links and alerts
//
// Plus `task_fixture` for building tasks.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use pagewatch_common::{Alert, NewTask, Task, TaskLink};
use pagewatch_web::{FetchError, PageFetcher, TextExtractor};

use crate::cycle::CheckCycle;
use crate::traits::TaskStore;

/// An active, never-checked task with a 60 minute interval.
pub fn task_fixture(url: &str, keyword: &str) -> Task {
    Task {
        id: Uuid::new_v4(),
        url: url.to_string(),
        keyword: keyword.to_string(),
        interval_minutes: 60,
        is_active: true,
        last_checked: None,
        created_at: Utc::now(),
    }
}

#[derive(Clone)]
enum Canned {
    Body(String),
    Absent,
    Fail,
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns `Err` for unregistered URLs.
/// Builder pattern: `.on_page()`, `.on_forbidden()`, `.on_failure()`.
pub struct MockFetcher {
    pages: HashMap<String, Canned>,
    fetched: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), Canned::Body(html.to_string()));
        self
    }

    pub fn on_forbidden(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Canned::Absent);
        self
    }

    pub fn on_failure(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Canned::Fail);
        self
    }

    /// Every URL requested, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> pagewatch_web::Result<Option<String>> {
        self.fetched.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Canned::Body(html)) => Ok(Some(html.clone())),
            Some(Canned::Absent) => Ok(None),
            Some(Canned::Fail) => Err(FetchError::Failed(format!("MockFetcher: failure for {url}"))),
            None => Err(FetchError::Failed(format!(
                "MockFetcher: no page registered for {url}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// HashMap-based text extractor. Returns `Err` for unregistered URLs.
pub struct MockExtractor {
    texts: HashMap<String, Canned>,
    extracted: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            texts: HashMap::new(),
            extracted: Mutex::new(Vec::new()),
        }
    }

    pub fn on_text(mut self, url: &str, text: &str) -> Self {
        self.texts.insert(url.to_string(), Canned::Body(text.to_string()));
        self
    }

    /// Forbidden or empty page: extraction yields nothing.
    pub fn on_absent(mut self, url: &str) -> Self {
        self.texts.insert(url.to_string(), Canned::Absent);
        self
    }

    /// Network failure.
    pub fn on_failure(mut self, url: &str) -> Self {
        self.texts.insert(url.to_string(), Canned::Fail);
        self
    }

    /// Every URL extracted, in order.
    pub fn extracted(&self) -> Vec<String> {
        self.extracted.lock().unwrap().clone()
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn extract(&self, url: &str) -> pagewatch_web::Result<Option<String>> {
        self.extracted.lock().unwrap().push(url.to_string());
        match self.texts.get(url) {
            Some(Canned::Body(text)) => Ok(Some(text.clone())),
            Some(Canned::Absent) => Ok(None),
            Some(Canned::Fail) => Err(FetchError::Failed(format!(
                "MockExtractor: failure for {url}"
            ))),
            None => Err(FetchError::Failed(format!(
                "MockExtractor: no text registered for {url}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    links: Vec<TaskLink>,
    alerts: Vec<Alert>,
    commits: usize,
    fail_commits: bool,
}

/// In-memory TaskStore. Commits apply under one lock, so they are atomic.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn insert_task(&self, task: Task) {
        self.state.lock().unwrap().tasks.push(task);
    }

    /// Pre-record links as already processed for a task.
    pub fn seed_links(&self, task_id: Uuid, urls: &[&str]) {
        let mut state = self.state.lock().unwrap();
        for url in urls {
            state.links.push(TaskLink {
                task_id,
                url: url.to_string(),
                first_seen: Utc::now(),
            });
        }
    }

    /// Make every subsequent commit fail.
    pub fn fail_commits(&self) {
        self.state.lock().unwrap().fail_commits = true;
    }

    pub fn task(&self, id: Uuid) -> Option<Task> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    /// Recorded link URLs for a task, in insertion order.
    pub fn links_for(&self, task_id: Uuid) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .links
            .iter()
            .filter(|l| l.task_id == task_id)
            .map(|l| l.url.clone())
            .collect()
    }

    pub fn alerts_for(&self, task_id: Uuid) -> Vec<Alert> {
        self.state
            .lock()
            .unwrap()
            .alerts
            .iter()
            .filter(|a| a.task_id == task_id)
            .cloned()
            .collect()
    }

    /// Successful commits so far.
    pub fn commits(&self) -> usize {
        self.state.lock().unwrap().commits
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, new: &NewTask) -> Result<Task> {
        let task = Task {
            id: Uuid::new_v4(),
            url: new.url.clone(),
            keyword: new.keyword.clone(),
            interval_minutes: new.interval_minutes,
            is_active: true,
            last_checked: None,
            created_at: Utc::now(),
        };
        self.insert_task(task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.task(id))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Ok(false);
        }
        state.links.retain(|l| l.task_id != id);
        state.alerts.retain(|a| a.task_id != id);
        Ok(true)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match state.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.is_active = active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        let mut tasks = self.state.lock().unwrap().tasks.clone();
        tasks.reverse();
        Ok(tasks)
    }

    async fn active_tasks(&self) -> Result<Vec<Task>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .filter(|t| t.is_active)
            .cloned()
            .collect())
    }

    async fn known_links(&self, task_id: Uuid, urls: &[String]) -> Result<HashSet<String>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .links
            .iter()
            .filter(|l| l.task_id == task_id && urls.contains(&l.url))
            .map(|l| l.url.clone())
            .collect())
    }

    async fn commit_cycle(&self, cycle: &CheckCycle, checked_at: DateTime<Utc>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_commits {
            bail!("MemoryStore: commit rejected");
        }

        let task_id = cycle.task_id();
        for url in cycle.links() {
            let exists = state
                .links
                .iter()
                .any(|l| l.task_id == task_id && &l.url == url);
            if !exists {
                state.links.push(TaskLink {
                    task_id,
                    url: url.clone(),
                    first_seen: checked_at,
                });
            }
        }
        for pending in cycle.alerts() {
            state.alerts.push(Alert {
                id: Uuid::new_v4(),
                task_id,
                found_at: checked_at,
                context: pending.context.clone(),
            });
        }
        if let Some(task) = state.tasks.iter_mut().find(|t| t.id == task_id) {
            task.last_checked = Some(checked_at);
        }
        state.commits += 1;
        Ok(())
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>> {
        let mut alerts = self.state.lock().unwrap().alerts.clone();
        alerts.reverse();
        alerts.sort_by(|a, b| b.found_at.cmp(&a.found_at));
        alerts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(alerts)
    }
}
