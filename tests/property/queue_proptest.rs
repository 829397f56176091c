//! Property-based tests for the durable queue

use attendance_sync::client::local_db::LocalDatabase;
use attendance_sync::client::offline::QueueStore;
use attendance_sync::shared::{ActionEnvelope, ActionPayload, AttendanceRecord, NewUser};
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

fn envelope(index: usize, registration: bool) -> ActionEnvelope {
    let payload = if registration {
        ActionPayload::UserRegistration(NewUser::new(
            format!("user{index}"),
            format!("user{index}@example.com"),
            "secret",
        ))
    } else {
        ActionPayload::AttendanceRecord(AttendanceRecord::now(format!("u-{index}")))
    };
    ActionEnvelope::new(payload)
}

async fn reopen(path: &Path) -> (Arc<LocalDatabase>, QueueStore) {
    let db = Arc::new(LocalDatabase::open(path).await.unwrap());
    let queue = QueueStore::load(Arc::clone(&db)).await;
    (db, queue)
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_queue_survives_restarts_in_order(
        kinds in prop::collection::vec(any::<bool>(), 0..12),
        restart_at in 0usize..12,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let envelopes: Vec<ActionEnvelope> = kinds
            .iter()
            .enumerate()
            .map(|(i, registration)| envelope(i, *registration))
            .collect();
        let split = restart_at.min(envelopes.len());

        let persisted: Vec<ActionEnvelope> = runtime().block_on(async {
            let (db, queue) = reopen(&path).await;
            for e in &envelopes[..split] {
                queue.append(e.clone()).await.unwrap();
            }
            drop(queue);
            db.close().await;

            let (db, queue) = reopen(&path).await;
            for e in &envelopes[split..] {
                queue.append(e.clone()).await.unwrap();
            }
            drop(queue);
            db.close().await;

            let (db, queue) = reopen(&path).await;
            let all = queue.all().await;
            db.close().await;
            all
        });

        prop_assert_eq!(persisted, envelopes);
    }

    #[test]
    fn test_drop_confirmed_keeps_remaining_order(
        count in 1usize..10,
        confirmed_mask in prop::collection::vec(any::<bool>(), 10),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.db");
        let envelopes: Vec<ActionEnvelope> = (0..count).map(|i| envelope(i, false)).collect();
        let confirmed: HashSet<Uuid> = envelopes
            .iter()
            .zip(&confirmed_mask)
            .filter(|(_, c)| **c)
            .map(|(e, _)| e.id)
            .collect();
        let expected: Vec<Uuid> = envelopes
            .iter()
            .filter(|e| !confirmed.contains(&e.id))
            .map(|e| e.id)
            .collect();

        let remaining: Vec<Uuid> = runtime().block_on(async {
            let (db, queue) = reopen(&path).await;
            for e in &envelopes {
                queue.append(e.clone()).await.unwrap();
            }
            let removed = queue.drop_confirmed(&confirmed).await;
            assert_eq!(removed, confirmed.len());
            drop(queue);
            db.close().await;

            let (db, queue) = reopen(&path).await;
            let ids = queue.all().await.iter().map(|e| e.id).collect();
            db.close().await;
            ids
        });

        prop_assert_eq!(remaining, expected);
    }
}
