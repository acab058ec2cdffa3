//! Integration tests for PgStore.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.
//!
//! Tests share one database, so each asserts only on the tasks it created.

use chrono::{Duration, Utc};
use pagewatch_common::{NewTask, PendingAlert};
use pagewatch_store::PgStore;
use uuid::Uuid;

/// Get a migrated store, or skip if no test DB is available.
async fn test_store() -> Option<PgStore> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let store = PgStore::connect(&url).await.ok()?;
    store.migrate().await.ok()?;
    Some(store)
}

fn new_task(keyword: &str) -> NewTask {
    NewTask {
        url: format!("https://example.com/board/{}", Uuid::new_v4()),
        keyword: keyword.to_string(),
        interval_minutes: 60,
    }
}

fn pending(context: &str) -> PendingAlert {
    PendingAlert {
        context: context.to_string(),
    }
}

// =========================================================================
// Tasks
// =========================================================================

#[tokio::test]
async fn create_and_get_task() {
    let Some(store) = test_store().await else {
        return;
    };

    let input = new_task("RECALL");
    let created = store.create_task(&input).await.unwrap();

    assert_eq!(created.url, input.url);
    assert_eq!(created.keyword, "RECALL");
    assert_eq!(created.interval_minutes, 60);
    assert!(created.is_active);
    assert!(created.last_checked.is_none());

    let fetched = store.get_task(created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_task_is_none() {
    let Some(store) = test_store().await else {
        return;
    };
    assert!(store.get_task(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn set_active_toggles_and_filters_active_tasks() {
    let Some(store) = test_store().await else {
        return;
    };

    let task = store.create_task(&new_task("pause")).await.unwrap();
    assert!(store.set_active(task.id, false).await.unwrap());

    let active = store.active_tasks().await.unwrap();
    assert!(active.iter().all(|t| t.id != task.id));

    assert!(store.set_active(task.id, true).await.unwrap());
    let active = store.active_tasks().await.unwrap();
    assert!(active.iter().any(|t| t.id == task.id));

    assert!(!store.set_active(Uuid::new_v4(), false).await.unwrap());
}

#[tokio::test]
async fn list_tasks_is_newest_first() {
    let Some(store) = test_store().await else {
        return;
    };

    let first = store.create_task(&new_task("a")).await.unwrap();
    let second = store.create_task(&new_task("b")).await.unwrap();

    let tasks = store.list_tasks().await.unwrap();
    let pos_first = tasks.iter().position(|t| t.id == first.id).unwrap();
    let pos_second = tasks.iter().position(|t| t.id == second.id).unwrap();
    assert!(pos_second <= pos_first);
}

#[tokio::test]
async fn delete_cascades_links_and_alerts() {
    let Some(store) = test_store().await else {
        return;
    };

    let task = store.create_task(&new_task("gone")).await.unwrap();
    let links = vec!["https://example.com/post/1".to_string()];
    store
        .commit_cycle(task.id, &links, &[pending("...gone...")], Utc::now())
        .await
        .unwrap();

    assert!(store.delete_task(task.id).await.unwrap());
    assert!(store.get_task(task.id).await.unwrap().is_none());
    assert!(store.known_links(task.id, &links).await.unwrap().is_empty());
    assert!(store.alerts_for_task(task.id, 10).await.unwrap().is_empty());

    assert!(!store.delete_task(task.id).await.unwrap());
}

// =========================================================================
// Check cycle commits
// =========================================================================

#[tokio::test]
async fn commit_cycle_records_links_alerts_and_timestamp() {
    let Some(store) = test_store().await else {
        return;
    };

    let task = store.create_task(&new_task("RECALL")).await.unwrap();
    let checked_at = Utc::now();
    let links = vec![
        "https://example.com/post/1".to_string(),
        "https://example.com/post/2".to_string(),
    ];
    let alerts = vec![pending("[https://example.com/post/2] ...RECALL...")];

    store
        .commit_cycle(task.id, &links, &alerts, checked_at)
        .await
        .unwrap();

    let probe = vec![
        "https://example.com/post/1".to_string(),
        "https://example.com/post/2".to_string(),
        "https://example.com/post/3".to_string(),
    ];
    let known = store.known_links(task.id, &probe).await.unwrap();
    assert_eq!(known.len(), 2);
    assert!(!known.contains("https://example.com/post/3"));

    let stored = store.alerts_for_task(task.id, 10).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].link(), Some("https://example.com/post/2"));

    let reloaded = store.get_task(task.id).await.unwrap().unwrap();
    let stamped = reloaded.last_checked.unwrap();
    assert!((stamped - checked_at).num_milliseconds().abs() < 1);
}

#[tokio::test]
async fn duplicate_links_are_ignored() {
    let Some(store) = test_store().await else {
        return;
    };

    let task = store.create_task(&new_task("dup")).await.unwrap();
    let links = vec!["https://example.com/post/1".to_string()];

    store.commit_cycle(task.id, &links, &[], Utc::now()).await.unwrap();
    store.commit_cycle(task.id, &links, &[], Utc::now()).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM task_links WHERE task_id = $1")
        .bind(task.id)
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn links_are_scoped_per_task() {
    let Some(store) = test_store().await else {
        return;
    };

    let a = store.create_task(&new_task("a")).await.unwrap();
    let b = store.create_task(&new_task("b")).await.unwrap();
    let links = vec!["https://example.com/shared".to_string()];

    store.commit_cycle(a.id, &links, &[], Utc::now()).await.unwrap();

    assert_eq!(store.known_links(a.id, &links).await.unwrap().len(), 1);
    assert!(store.known_links(b.id, &links).await.unwrap().is_empty());
}

#[tokio::test]
async fn known_links_of_empty_input_is_empty() {
    let Some(store) = test_store().await else {
        return;
    };
    let task = store.create_task(&new_task("x")).await.unwrap();
    assert!(store.known_links(task.id, &[]).await.unwrap().is_empty());
}

// =========================================================================
// Alerts
// =========================================================================

#[tokio::test]
async fn alerts_are_newest_first_and_limited() {
    let Some(store) = test_store().await else {
        return;
    };

    let task = store.create_task(&new_task("order")).await.unwrap();
    let base = Utc::now();
    for i in 0..3 {
        store
            .commit_cycle(
                task.id,
                &[],
                &[pending(&format!("...hit {i}..."))],
                base + Duration::seconds(i),
            )
            .await
            .unwrap();
    }

    let alerts = store.alerts_for_task(task.id, 2).await.unwrap();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].context, "...hit 2...");
    assert_eq!(alerts[1].context, "...hit 1...");

    let recent = store.recent_alerts(5).await.unwrap();
    assert!(recent.len() <= 5);
    assert!(recent.windows(2).all(|w| w[0].found_at >= w[1].found_at));
}
