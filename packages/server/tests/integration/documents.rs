use std::sync::Arc;

use common::activity::{self, ActivityKind, ActivityMessage};
use common::document::{DocumentStore, SqlDocumentStore, collections};
use common::rsvp_status::RsvpStatus;
use sea_orm::{ConnectOptions, Database};
use serde_json::{Value, json};
use tempfile::TempDir;

async fn sql_store() -> (SqlDocumentStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("documents.db").display());
    let mut opt = ConnectOptions::new(url);
    opt.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("Failed to open SQLite");
    let store = SqlDocumentStore::new(db)
        .await
        .expect("Failed to create document table");
    (store, dir)
}

#[tokio::test]
async fn update_sees_missing_then_existing_document() {
    let (store, _dir) = sql_store().await;

    let first = store
        .update(
            collections::EVENT_STATS,
            "4",
            Box::new(|current| {
                assert!(current.is_none());
                json!({"going_count": 1})
            }),
        )
        .await
        .unwrap();
    assert_eq!(first["going_count"], 1);
    let created = store
        .get(collections::EVENT_STATS, "4")
        .await
        .unwrap()
        .unwrap()
        .created_at;

    store
        .update(
            collections::EVENT_STATS,
            "4",
            Box::new(|current| {
                let n = current
                    .as_ref()
                    .and_then(|doc| doc.get("going_count"))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                json!({"going_count": n + 1})
            }),
        )
        .await
        .unwrap();

    let doc = store
        .get(collections::EVENT_STATS, "4")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.data["going_count"], 2);
    assert_eq!(doc.created_at, created);
}

#[tokio::test]
async fn merge_set_creates_then_merges() {
    let (store, _dir) = sql_store().await;

    store
        .set(collections::DAILY_SUMMARIES, "2030-03-10", json!({"note": "kept"}), true)
        .await
        .unwrap();
    store
        .set(
            collections::DAILY_SUMMARIES,
            "2030-03-10",
            json!({"upcoming_count": 3}),
            true,
        )
        .await
        .unwrap();

    let doc = store
        .get(collections::DAILY_SUMMARIES, "2030-03-10")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(doc.data, json!({"note": "kept", "upcoming_count": 3}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_rsvps_on_new_event_are_all_counted() {
    let (store, _dir) = sql_store().await;
    let store = Arc::new(store);

    let tasks: Vec<_> = (1..=20)
        .map(|user_id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let message = ActivityMessage::new(
                    None,
                    ActivityKind::RsvpChanged {
                        user_id,
                        user_email: format!("user{user_id}@example.com"),
                        event_id: 5,
                        event_title: "Launch party".into(),
                        previous_status: None,
                        new_status: Some(RsvpStatus::Going),
                    },
                );
                activity::apply(store.as_ref(), &message).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stats = store
        .get(collections::EVENT_STATS, "5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stats.data["going_count"], 20);
    assert_eq!(stats.data["attendees"].as_object().unwrap().len(), 20);
}
