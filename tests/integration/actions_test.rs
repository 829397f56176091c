//! Attendance action tests

use crate::common::*;
use assert_matches::assert_matches;
use attendance_sync::client::actions::USERS_SNAPSHOT_KEY;
use attendance_sync::client::local_db::LocalDatabase;
use attendance_sync::client::offline::{QUEUE_KEY, SAVED_LOCALLY_MESSAGE};
use attendance_sync::client::{ActionAck, AppContext, Config, GatewayError, RemoteRequest, Snapshot};
use attendance_sync::shared::{Coordinates, NewUser, PhotoBlob, SharedError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn users_json() -> serde_json::Value {
    json!([
        { "id": "a1", "name": "Ana", "email": "ana@example.com", "role": "admin" },
        { "id": "b2", "name": "Luis", "email": "luis@example.com" }
    ])
}

#[tokio::test]
async fn test_register_with_missing_field_is_rejected_locally() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), true).await;

    let err = context
        .actions()
        .register_user(NewUser::new("Ana", "", "secret"))
        .await
        .unwrap_err();

    assert_matches!(
        err,
        GatewayError::Validation(SharedError::ValidationError { ref field, .. }) if field == "email"
    );
    assert_eq!(remote.call_count(), 0);
    assert!(context.queue().is_empty().await);
}

#[tokio::test]
async fn test_register_offline_is_saved_locally() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), false).await;

    let ack = context.actions().register_user(new_user("Ana")).await.unwrap();

    assert_matches!(
        ack,
        ActionAck::SavedLocally { ref message, .. } if message == SAVED_LOCALLY_MESSAGE
    );
    assert_eq!(context.queue().pending_len().await, 1);
}

#[tokio::test]
async fn test_register_online_is_sent() {
    let remote = Arc::new(ScriptedRemote::with_default(MockResponse::Ok(json!({
        "message": "Usuario agregado"
    }))));
    let context = memory_context(Arc::clone(&remote), true).await;

    let ack = context.actions().register_user(new_user("Ana")).await.unwrap();

    assert_eq!(ack, ActionAck::Sent(json!({ "message": "Usuario agregado" })));
    assert_matches!(remote.calls()[0].request, RemoteRequest::RegisterUser(_));
}

#[tokio::test]
async fn test_list_users_fresh_then_cached() {
    let remote = Arc::new(ScriptedRemote::with_default(MockResponse::Ok(users_json())));
    let context = memory_context(Arc::clone(&remote), true).await;

    let fresh = context.actions().list_users().await;
    assert!(fresh.is_fresh());
    let fresh_users = fresh.into_option().unwrap();
    assert_eq!(fresh_users.len(), 2);
    assert_eq!(fresh_users[0].extra.get("role"), Some(&json!("admin")));

    context.monitor().apply_signal(false);
    let cached = context.actions().list_users().await;
    assert_eq!(cached, Snapshot::Cached(fresh_users));
    assert_eq!(remote.call_count(), 1);
}

#[tokio::test]
async fn test_list_users_offline_with_nothing_cached_is_empty() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), false).await;

    let users = context.actions().list_users().await;
    assert_eq!(users, Snapshot::Empty);
    assert!(users.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_list_users_server_error_serves_cache() {
    let remote = Arc::new(ScriptedRemote::with_default(MockResponse::Ok(users_json())));
    let context = memory_context(Arc::clone(&remote), true).await;
    context.actions().list_users().await;

    remote.set_default(MockResponse::Reject(
        500,
        json!({ "error": "Error al obtener usuarios" }),
    ));
    let users = context.actions().list_users().await;
    assert_matches!(users, Snapshot::Cached(ref list) if list.len() == 2);
}

#[tokio::test]
async fn test_corrupt_queue_does_not_affect_cached_users() {
    let remote = Arc::new(ScriptedRemote::with_default(MockResponse::Ok(users_json())));
    let db = Arc::new(LocalDatabase::in_memory().await.unwrap());

    let first = AppContext::with_database(Config::new(), Arc::clone(&db), remote.clone(), true).await;
    first.actions().list_users().await;

    db.put_value(QUEUE_KEY, "{not json").await.unwrap();

    let second = AppContext::with_database(Config::new(), Arc::clone(&db), remote, false).await;
    assert!(second.queue().is_empty().await);

    let users = second.actions().list_users().await;
    assert_matches!(users, Snapshot::Cached(ref list) if list.len() == 2);
    assert!(db.get_value(USERS_SNAPSHOT_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn test_submit_attendance_with_location() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), true).await;

    let record = attendance("a1").with_location(Coordinates::new(19.43, -99.13));
    let ack = context.actions().submit_attendance(record.clone()).await.unwrap();

    assert_matches!(ack, ActionAck::Sent(_));
    assert_eq!(
        remote.calls()[0].request,
        RemoteRequest::SubmitAttendance(record)
    );
}

#[tokio::test]
async fn test_upload_photo_online_uses_generated_filename() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), true).await;

    context
        .actions()
        .upload_photo(sample_photo(), Some(Coordinates::new(1.0, 2.0)))
        .await
        .unwrap();

    assert_matches!(
        &remote.calls()[0].request,
        RemoteRequest::UploadPhoto { filename, location: Some(_), .. } if filename.starts_with("photo_")
    );
    assert!(context.photos().filenames().await.is_empty());
}

#[tokio::test]
async fn test_empty_photo_is_rejected() {
    let remote = Arc::new(ScriptedRemote::accepting());
    let context = memory_context(Arc::clone(&remote), false).await;

    let result = context.actions().upload_photo(PhotoBlob::jpeg(Vec::new()), None).await;
    assert_matches!(result, Err(GatewayError::InvalidRequest { .. }));
    assert!(context.queue().is_empty().await);
}
