//! HTTP client tests against a mock attendance service

use assert_matches::assert_matches;
use attendance_sync::client::remote::IDEMPOTENCY_HEADER;
use attendance_sync::client::local_db::LocalDatabase;
use attendance_sync::client::offline::DeferralReason;
use attendance_sync::client::{
    AppContext, Config, GatewayOutcome, HttpRemote, RemoteError, RemoteRequest, RemoteService,
};
use attendance_sync::shared::{
    ActionEnvelope, ActionPayload, AppConfig, Coordinates, HttpMethod, NewUser, PhotoBlob,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn remote_for(url: &str) -> HttpRemote {
    let config = Config::with_builder(
        AppConfig::builder()
            .server_url(url)
            .request_timeout_secs(2),
    )
    .unwrap();
    HttpRemote::new(config).unwrap()
}

#[tokio::test]
async fn test_fetch_users() {
    let server = MockServer::start().await;
    let users = json!([{ "id": "a1", "name": "Ana" }]);
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(users.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let value = remote
        .execute(&RemoteRequest::FetchUsers, Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(value, users);
}

#[tokio::test]
async fn test_register_sends_idempotency_key() {
    let server = MockServer::start().await;
    let request_id = Uuid::new_v4();
    let user = NewUser::new("Ana", "ana@example.com", "secret");

    Mock::given(method("POST"))
        .and(path("/adduser"))
        .and(header(IDEMPOTENCY_HEADER, request_id.to_string().as_str()))
        .and(body_json(json!({
            "name": "Ana",
            "email": "ana@example.com",
            "password": "secret"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "message": "Usuario agregado" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let value = remote
        .execute(&RemoteRequest::RegisterUser(user), request_id)
        .await
        .unwrap();

    assert_eq!(value["message"], "Usuario agregado");
}

#[tokio::test]
async fn test_application_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/adduser"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Campos requeridos" })),
        )
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let err = remote
        .execute(
            &RemoteRequest::RegisterUser(NewUser::new("", "", "")),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        RemoteError::Application {
            status: 400,
            body: json!({ "error": "Campos requeridos" })
        }
    );
    assert!(!err.is_connectivity());
}

#[tokio::test]
async fn test_text_error_body_is_wrapped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let err = remote
        .execute(
            &RemoteRequest::SubmitAttendance(attendance_sync::shared::AttendanceRecord::now("a1")),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert_matches!(
        err,
        RemoteError::Application { status: 500, body: Value::String(ref text) } if text == "Internal Server Error"
    );
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let value = remote
        .execute(
            &RemoteRequest::SubmitAttendance(attendance_sync::shared::AttendanceRecord::now("a1")),
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_unreachable_server_is_connectivity_error() {
    let remote = remote_for("http://127.0.0.1:1");

    let err = remote
        .execute(&RemoteRequest::FetchUsers, Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(err.is_connectivity());
    assert!(!remote.probe().await);
}

#[tokio::test]
async fn test_probe_counts_any_answer() {
    let server = MockServer::start().await;
    // No mock mounted: wiremock answers 404
    let remote = remote_for(&server.uri());
    assert!(remote.probe().await);
}

#[tokio::test]
async fn test_photo_upload_is_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload-photo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    remote
        .execute(
            &RemoteRequest::UploadPhoto {
                filename: "photo_test.jpg".to_string(),
                photo: PhotoBlob::jpeg(vec![0xFF, 0xD8, 0xFF]),
                location: Some(Coordinates::new(19.43, -99.13)),
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"photo\"; filename=\"photo_test.jpg\""));
    assert!(body.contains("name=\"location\""));
    assert!(body.contains("19.43"));
}

#[tokio::test]
async fn test_generic_envelope_posts_to_sync_endpoint() {
    let server = MockServer::start().await;
    let envelope = ActionEnvelope::new(ActionPayload::GenericHttp {
        method: HttpMethod::Delete,
        endpoint: "/api/users/7".to_string(),
        body: None,
    });

    Mock::given(method("POST"))
        .and(path("/api/sync"))
        .and(header(IDEMPOTENCY_HEADER, envelope.id.to_string().as_str()))
        .and(body_json(serde_json::to_value(&envelope).unwrap()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    remote
        .execute(&RemoteRequest::SyncEnvelope(envelope.clone()), envelope.id)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_bodiless_gateway_error_is_connectivity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/adduser"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let err = remote
        .execute(
            &RemoteRequest::RegisterUser(NewUser::new("Ana", "ana@example.com", "secret")),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert!(err.is_connectivity());
}

#[tokio::test]
async fn test_service_json_on_503_is_application_error() {
    let server = MockServer::start().await;
    let body = json!({ "error": "En mantenimiento" });
    Mock::given(method("POST"))
        .and(path("/adduser"))
        .respond_with(ResponseTemplate::new(503).set_body_json(body.clone()))
        .mount(&server)
        .await;

    let remote = remote_for(&server.uri());
    let err = remote
        .execute(
            &RemoteRequest::RegisterUser(NewUser::new("Ana", "ana@example.com", "secret")),
            Uuid::new_v4(),
        )
        .await
        .unwrap_err();

    assert_eq!(err, RemoteError::Application { status: 503, body });
}

async fn context_against(uri: &str) -> AppContext {
    let config = Config::with_builder(
        AppConfig::builder()
            .server_url(uri)
            .request_timeout_secs(2),
    )
    .unwrap();
    let remote = Arc::new(HttpRemote::new(config.clone()).unwrap());
    let db = Arc::new(LocalDatabase::in_memory().await.unwrap());
    AppContext::with_database(config, db, remote, true).await
}

#[tokio::test]
async fn test_write_behind_failing_proxy_is_deferred() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/adduser"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let context = context_against(&server.uri()).await;
    let outcome = context
        .gateway()
        .execute_or_defer(RemoteRequest::RegisterUser(NewUser::new(
            "Ana",
            "ana@example.com",
            "secret",
        )))
        .await
        .unwrap();

    assert_matches!(
        outcome,
        GatewayOutcome::Deferred(ref receipt)
            if matches!(receipt.reason, DeferralReason::ConnectivityFailure { .. })
    );
    assert_eq!(context.queue().pending_len().await, 1);
}

#[tokio::test]
async fn test_replay_behind_failing_proxy_stays_queued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/attendance"))
        .respond_with(ResponseTemplate::new(504))
        .mount(&server)
        .await;

    let context = context_against(&server.uri()).await;
    context.monitor().apply_signal(false);
    context
        .gateway()
        .execute_or_defer(RemoteRequest::SubmitAttendance(
            attendance_sync::shared::AttendanceRecord::now("a1"),
        ))
        .await
        .unwrap();
    context.monitor().apply_signal(true);

    let outcome = context.synchronizer().sync().await;
    let report = outcome.report().unwrap();
    assert_eq!((report.failed, report.rejected), (1, 0));
    assert_eq!(context.queue().pending_len().await, 1);
    assert!(context.dead_letters().all().await.is_empty());
}
