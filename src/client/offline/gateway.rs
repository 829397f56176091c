//! # Offline-Aware Request Gateway
//!
//! Decides for every request whether it runs now or is queued for later.
//!
//! ## Decision
//!
//! - **Offline**: writes are queued immediately, no call is attempted
//! - **Online, success**: the server's answer is returned unmodified
//! - **Online, connectivity failure**: the write is queued
//! - **Online, server rejection**: the error is returned verbatim and nothing is
//!   queued, since replaying it would be rejected again
//!
//! Reads are never queued: when they cannot run the caller gets
//! `GatewayOutcome::Unavailable` and falls back to cached data.

use crate::client::local_db::StorageError;
use crate::client::offline::photos::PhotoStore;
use crate::client::offline::queue::QueueStore;
use crate::client::remote::{RemoteError, RemoteRequest, RemoteService};
use crate::client::sync::network_monitor::ConnectivityMonitor;
use crate::shared::{ActionEnvelope, ActionPayload, SharedError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Acknowledgement shown to the user for queued actions
pub const SAVED_LOCALLY_MESSAGE: &str = "Saved locally, will sync when the connection returns";

/// Result of a gateway call that did not fail
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayOutcome<T> {
    /// Executed now; the server's answer
    Completed(T),
    /// Not executed now; queued for the synchronizer
    Deferred(DeferredReceipt),
    /// A read that could not run; nothing was queued
    Unavailable(DeferralReason),
}

impl<T> GatewayOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, GatewayOutcome::Completed(_))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, GatewayOutcome::Deferred(_))
    }

    /// The value when completed
    pub fn completed(self) -> Option<T> {
        match self {
            GatewayOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Why a request did not run now
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferralReason {
    /// The monitor reported offline; no call was attempted
    Offline,
    /// The call was attempted and never reached the server
    ConnectivityFailure { message: String },
}

/// Proof that an action was queued
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredReceipt {
    pub envelope_id: Uuid,
    pub reason: DeferralReason,
}

impl DeferredReceipt {
    pub fn message(&self) -> &'static str {
        SAVED_LOCALLY_MESSAGE
    }
}

/// Gateway failures. A deferral is never one of these.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// The server was reached and refused the request
    #[error("Request rejected by server (status {status})")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Response body as sent by the server
        body: Value,
    },

    /// The request could not be built
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The server answered 2xx with a body of the wrong shape
    #[error("Unexpected response: {message}")]
    InvalidResponse { message: String },

    /// Rejected locally before any network or queue work
    #[error(transparent)]
    Validation(#[from] SharedError),

    /// The action could not be queued
    #[error("Could not save action locally: {message}")]
    Storage { message: String },
}

impl GatewayError {
    /// The server's `{"error": "..."}` text, when present
    pub fn server_message(&self) -> Option<&str> {
        match self {
            GatewayError::Rejected { body, .. } => body.get("error").and_then(Value::as_str),
            _ => None,
        }
    }
}

impl From<StorageError> for GatewayError {
    fn from(err: StorageError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

/// Offline-aware entry point for every remote request
#[derive(Clone)]
pub struct RequestGateway {
    monitor: Arc<ConnectivityMonitor>,
    remote: Arc<dyn RemoteService>,
    queue: Arc<QueueStore>,
    photos: Arc<PhotoStore>,
}

impl RequestGateway {
    pub fn new(
        monitor: Arc<ConnectivityMonitor>,
        remote: Arc<dyn RemoteService>,
        queue: Arc<QueueStore>,
        photos: Arc<PhotoStore>,
    ) -> Self {
        Self {
            monitor,
            remote,
            queue,
            photos,
        }
    }

    /// Execute `request` now, or queue it.
    pub async fn execute_or_defer(
        &self,
        request: RemoteRequest,
    ) -> Result<GatewayOutcome<Value>, GatewayError> {
        let request_id = Uuid::new_v4();

        if !self.monitor.is_online() {
            tracing::debug!(endpoint = request.endpoint(), "offline, not attempting request");
            return self.defer(request_id, request, DeferralReason::Offline).await;
        }

        match self.remote.execute(&request, request_id).await {
            Ok(value) => Ok(GatewayOutcome::Completed(value)),
            Err(RemoteError::Connectivity { message }) => {
                tracing::warn!(
                    endpoint = request.endpoint(),
                    error = %message,
                    "request did not reach the server"
                );
                self.defer(
                    request_id,
                    request,
                    DeferralReason::ConnectivityFailure { message },
                )
                .await
            }
            Err(RemoteError::Application { status, body }) => {
                tracing::info!(endpoint = request.endpoint(), status, "request rejected by server");
                Err(GatewayError::Rejected { status, body })
            }
            Err(RemoteError::InvalidRequest { message }) => {
                Err(GatewayError::InvalidRequest { message })
            }
        }
    }

    /// `execute_or_defer`, decoding a completed answer into `T`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        request: RemoteRequest,
    ) -> Result<GatewayOutcome<T>, GatewayError> {
        match self.execute_or_defer(request).await? {
            GatewayOutcome::Completed(value) => serde_json::from_value(value)
                .map(GatewayOutcome::Completed)
                .map_err(|e| GatewayError::InvalidResponse {
                    message: e.to_string(),
                }),
            GatewayOutcome::Deferred(receipt) => Ok(GatewayOutcome::Deferred(receipt)),
            GatewayOutcome::Unavailable(reason) => Ok(GatewayOutcome::Unavailable(reason)),
        }
    }

    /// Like `fetch`, but a request that did not run yields `fallback`.
    /// Server rejections still propagate.
    pub async fn read_with_fallback<T: DeserializeOwned>(
        &self,
        request: RemoteRequest,
        fallback: T,
    ) -> Result<T, GatewayError> {
        match self.fetch(request).await? {
            GatewayOutcome::Completed(value) => Ok(value),
            GatewayOutcome::Deferred(_) | GatewayOutcome::Unavailable(_) => {
                tracing::debug!("using fallback data");
                Ok(fallback)
            }
        }
    }

    async fn defer(
        &self,
        request_id: Uuid,
        request: RemoteRequest,
        reason: DeferralReason,
    ) -> Result<GatewayOutcome<Value>, GatewayError> {
        if request.is_read() {
            return Ok(GatewayOutcome::Unavailable(reason));
        }

        let payload = match request {
            RemoteRequest::RegisterUser(user) => ActionPayload::UserRegistration(user),
            RemoteRequest::SubmitAttendance(record) => ActionPayload::AttendanceRecord(record),
            RemoteRequest::UploadPhoto {
                filename,
                photo,
                location,
            } => {
                let filename = self.photos.save(filename, photo).await?;
                ActionPayload::AttendancePhoto { filename, location }
            }
            RemoteRequest::Generic {
                method,
                endpoint,
                body,
            } => ActionPayload::GenericHttp {
                method,
                endpoint,
                body,
            },
            RemoteRequest::SyncEnvelope(envelope) => envelope.payload,
            RemoteRequest::FetchUsers => return Ok(GatewayOutcome::Unavailable(reason)),
        };

        self.queue
            .append(ActionEnvelope::with_id(request_id, payload))
            .await?;

        Ok(GatewayOutcome::Deferred(DeferredReceipt {
            envelope_id: request_id,
            reason,
        }))
    }
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("online", &self.monitor.is_online())
            .finish_non_exhaustive()
    }
}
