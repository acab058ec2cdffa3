use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PagewatchError, Result};

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A subscription to watch a URL for a keyword at a fixed interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Listing page or article root.
    pub url: String,
    /// Exact, case-sensitive substring to look for.
    pub keyword: String,
    /// Minimum minutes between two completed checks.
    pub interval_minutes: i32,
    pub is_active: bool,
    /// Time of the most recent completed check. `None` until the first run.
    pub last_checked: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Earliest time the next check may run. `None` means the task was never checked.
    pub fn next_check(&self) -> Option<DateTime<Utc>> {
        self.last_checked
            .map(|last| last + Duration::minutes(i64::from(self.interval_minutes)))
    }

    /// Due iff never checked, or `now` has reached `last_checked + interval` (inclusive).
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_check() {
            None => true,
            Some(next) => now >= next,
        }
    }
}

/// Input for creating a task. The URL is expected to be normalized already.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub url: String,
    pub keyword: String,
    pub interval_minutes: i32,
}

impl NewTask {
    pub fn validate(&self) -> Result<()> {
        if self.keyword.is_empty() {
            return Err(PagewatchError::Validation("keyword must not be empty".into()));
        }
        if self.interval_minutes < 1 {
            return Err(PagewatchError::Validation(format!(
                "interval must be at least 1 minute, got {}",
                self.interval_minutes
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TaskLink
// ---------------------------------------------------------------------------

/// A detail URL that has already been processed for a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLink {
    pub task_id: Uuid,
    pub url: String,
    pub first_seen: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Alert
// ---------------------------------------------------------------------------

/// Evidence that a task's keyword was found.
///
/// Detail-page alerts carry the originating link as a `[<link>] ` prefix on
/// `context`; single-page alerts have no prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub task_id: Uuid,
    pub found_at: DateTime<Utc>,
    pub context: String,
}

impl Alert {
    /// The detail link this alert came from, if the context carries one.
    pub fn link(&self) -> Option<&str> {
        split_link_prefix(&self.context).map(|(link, _)| link)
    }

    /// The snippet with any link prefix removed.
    pub fn snippet(&self) -> &str {
        split_link_prefix(&self.context)
            .map(|(_, rest)| rest)
            .unwrap_or(&self.context)
    }

    pub fn view(&self) -> AlertView {
        AlertView {
            id: self.id,
            task_id: self.task_id,
            found_at: self.found_at,
            link: self.link().map(str::to_string),
            snippet: self.snippet().to_string(),
        }
    }
}

fn split_link_prefix(context: &str) -> Option<(&str, &str)> {
    let rest = context.strip_prefix('[')?;
    let end = rest.find("] ")?;
    let link = &rest[..end];
    if link.is_empty() {
        return None;
    }
    Some((link, &rest[end + 2..]))
}

/// Read-side projection of an alert: originating link parsed out of the context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertView {
    pub id: Uuid,
    pub task_id: Uuid,
    pub found_at: DateTime<Utc>,
    pub link: Option<String>,
    pub snippet: String,
}

/// A new alert produced during a check cycle, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAlert {
    pub context: String,
}

// ---------------------------------------------------------------------------
// Scheduling summary
// ---------------------------------------------------------------------------

/// Outcome of one scheduling pass over all active tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    /// Due tasks whose cycle ran, successful or not.
    pub checked: usize,
    /// Checked tasks that produced at least one alert.
    pub found: usize,
    /// Active tasks considered.
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn task(last_checked: Option<DateTime<Utc>>, interval_minutes: i32) -> Task {
        Task {
            id: Uuid::new_v4(),
            url: "https://example.com/list".into(),
            keyword: "RECALL".into(),
            interval_minutes,
            is_active: true,
            last_checked,
            created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn alert(context: &str) -> Alert {
        Alert {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            found_at: Utc::now(),
            context: context.into(),
        }
    }

    #[test]
    fn never_checked_is_due() {
        assert!(task(None, 60).is_due(Utc::now()));
    }

    #[test]
    fn due_boundary_is_inclusive() {
        let last = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t = task(Some(last), 60);

        assert!(!t.is_due(last + Duration::minutes(59)));
        assert!(t.is_due(last + Duration::minutes(60)));
        assert!(t.is_due(last + Duration::minutes(61)));
    }

    #[test]
    fn not_due_stays_not_due_for_earlier_times() {
        let last = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let t = task(Some(last), 30);
        let probe = last + Duration::minutes(20);

        assert!(!t.is_due(probe));
        for back in 1..=20 {
            assert!(!t.is_due(probe - Duration::minutes(back)));
        }
    }

    #[test]
    fn new_task_validation() {
        let ok = NewTask {
            url: "https://example.com/".into(),
            keyword: "RECALL".into(),
            interval_minutes: 1,
        };
        assert!(ok.validate().is_ok());

        let empty_keyword = NewTask {
            keyword: String::new(),
            ..ok.clone()
        };
        assert!(matches!(
            empty_keyword.validate(),
            Err(PagewatchError::Validation(_))
        ));

        let zero_interval = NewTask {
            interval_minutes: 0,
            ..ok
        };
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn detail_alert_exposes_link_and_snippet() {
        let a = alert("[https://example.com/b] ...product RECALL issued...");
        assert_eq!(a.link(), Some("https://example.com/b"));
        assert_eq!(a.snippet(), "...product RECALL issued...");
    }

    #[test]
    fn single_page_alert_has_no_link() {
        let a = alert("...product RECALL issued...");
        assert_eq!(a.link(), None);
        assert_eq!(a.snippet(), "...product RECALL issued...");
    }

    #[test]
    fn bracket_without_separator_is_not_a_link() {
        let a = alert("[note]...RECALL...");
        assert_eq!(a.link(), None);
        assert_eq!(a.snippet(), "[note]...RECALL...");
    }

    #[test]
    fn view_strips_prefix() {
        let a = alert("[https://example.com/a?id=1] ...x...");
        let v = a.view();
        assert_eq!(v.link.as_deref(), Some("https://example.com/a?id=1"));
        assert_eq!(v.snippet, "...x...");
        assert_eq!(v.task_id, a.task_id);
    }
}
