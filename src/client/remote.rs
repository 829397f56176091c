/**
 * Remote Attendance Service Client
 *
 * Talks to the attendance HTTP service. Every failure is classified where the
 * call is made: the request either never reached the server (connectivity)
 * or the server answered with an error status (application rejection).
 * Nothing downstream inspects error text.
 */

use crate::client::config::Config;
use crate::shared::{ActionEnvelope, AttendanceRecord, Coordinates, HttpMethod, NewUser, PhotoBlob};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Header carrying the request id; replays of one envelope always reuse it
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Remote call failures
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RemoteError {
    /// The request never reached the server (unreachable, refused, timed out)
    #[error("Connectivity failure: {message}")]
    Connectivity {
        /// Human-readable error message
        message: String,
    },

    /// The server answered with an error status
    #[error("Server rejected the request with status {status}")]
    Application {
        /// HTTP status code
        status: u16,
        /// Response body, JSON when the server sent JSON
        body: Value,
    },

    /// The request could not be built (bad URL, bad content type)
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Human-readable error message
        message: String,
    },
}

impl RemoteError {
    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::Connectivity {
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, RemoteError::Connectivity { .. })
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::invalid_request(err.to_string())
        } else {
            Self::connectivity(err.to_string())
        }
    }
}

/// A call against the remote service
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRequest {
    /// `GET /users`
    FetchUsers,
    /// `POST /adduser`
    RegisterUser(NewUser),
    /// `POST /api/attendance`
    SubmitAttendance(AttendanceRecord),
    /// `POST /api/upload-photo` (multipart)
    UploadPhoto {
        filename: String,
        photo: PhotoBlob,
        location: Option<Coordinates>,
    },
    /// Arbitrary request against `endpoint`
    Generic {
        method: HttpMethod,
        endpoint: String,
        body: Option<Value>,
    },
    /// `POST /api/sync` with a queued generic envelope
    SyncEnvelope(ActionEnvelope),
}

impl RemoteRequest {
    /// Reads are answered from cache when offline and never queued
    pub fn is_read(&self) -> bool {
        match self {
            RemoteRequest::FetchUsers => true,
            RemoteRequest::Generic { method, .. } => *method == HttpMethod::Get,
            _ => false,
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            RemoteRequest::FetchUsers => HttpMethod::Get,
            RemoteRequest::Generic { method, .. } => *method,
            _ => HttpMethod::Post,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            RemoteRequest::FetchUsers => "/users",
            RemoteRequest::RegisterUser(_) => "/adduser",
            RemoteRequest::SubmitAttendance(_) => "/api/attendance",
            RemoteRequest::UploadPhoto { .. } => "/api/upload-photo",
            RemoteRequest::Generic { endpoint, .. } => endpoint,
            RemoteRequest::SyncEnvelope(_) => "/api/sync",
        }
    }
}

/// The remote attendance service
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Execute `request`. `request_id` is sent as the idempotency key.
    async fn execute(&self, request: &RemoteRequest, request_id: Uuid) -> Result<Value, RemoteError>;

    /// Whether the service is reachable at all. Any HTTP answer counts.
    async fn probe(&self) -> bool;
}

/// reqwest-backed `RemoteService`
#[derive(Debug, Clone)]
pub struct HttpRemote {
    config: Config,
    client: Client,
}

impl HttpRemote {
    pub fn new(config: Config) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RemoteError::invalid_request(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn request(&self, method: HttpMethod, endpoint: &str, request_id: Uuid) -> RequestBuilder {
        let method = match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };
        self.client
            .request(method, self.config.api_url(endpoint))
            .header(IDEMPOTENCY_HEADER, request_id.to_string())
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, RemoteError> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            // A body that cannot be read means the exchange broke off mid-way.
            let text = response.text().await?;
            return Ok(parse_body(&text));
        }

        let body = error_body(status, response.text().await);
        Err(classify_failure(status, body))
    }
}

/// The server already answered, so an error body that breaks off still
/// leaves an answer to classify.
fn error_body<E: std::fmt::Display>(status: StatusCode, read: Result<String, E>) -> Value {
    match read {
        Ok(text) => parse_body(&text),
        Err(e) => {
            tracing::debug!(status = status.as_u16(), error = %e, "error body could not be read");
            Value::Null
        }
    }
}

/// Statuses a proxy answers with while the service behind it is down
const GATEWAY_STATUSES: [StatusCode; 3] = [
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// A gateway status without a JSON body never came from the service itself.
fn classify_failure(status: StatusCode, body: Value) -> RemoteError {
    let from_service = matches!(body, Value::Object(_) | Value::Array(_));
    if GATEWAY_STATUSES.contains(&status) && !from_service {
        return RemoteError::connectivity(format!("upstream unavailable ({status})"));
    }
    RemoteError::Application {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn execute(&self, request: &RemoteRequest, request_id: Uuid) -> Result<Value, RemoteError> {
        let builder = self.request(request.method(), request.endpoint(), request_id);

        let builder = match request {
            RemoteRequest::FetchUsers => builder,
            RemoteRequest::RegisterUser(user) => builder.json(user),
            RemoteRequest::SubmitAttendance(record) => builder.json(record),
            RemoteRequest::UploadPhoto {
                filename,
                photo,
                location,
            } => {
                let part = Part::bytes(photo.bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(&photo.content_type)
                    .map_err(|e| RemoteError::invalid_request(e.to_string()))?;
                let mut form = Form::new().part("photo", part);
                if let Some(location) = location {
                    let location = serde_json::to_string(location)
                        .map_err(|e| RemoteError::invalid_request(e.to_string()))?;
                    form = form.text("location", location);
                }
                builder.multipart(form)
            }
            RemoteRequest::Generic { body, .. } => match body {
                Some(body) => builder.json(body),
                None => builder,
            },
            RemoteRequest::SyncEnvelope(envelope) => builder.json(envelope),
        };

        tracing::debug!(
            request_id = %request_id,
            method = request.method().as_str(),
            endpoint = request.endpoint(),
            "sending remote request"
        );

        self.send(builder).await
    }

    async fn probe(&self) -> bool {
        match self.client.get(self.config.api_url("/")).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(error = %e, "reachability probe failed");
                false
            }
        }
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
