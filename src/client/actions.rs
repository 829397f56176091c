//! Attendance actions
//!
//! The operations a user triggers. Writes either reach the server or are
//! saved locally with an explicit acknowledgement; the user list is served
//! from cache when the server cannot be reached.

use crate::client::offline::gateway::{GatewayError, GatewayOutcome, RequestGateway};
use crate::client::offline::photos::PhotoStore;
use crate::client::offline::{Snapshot, SnapshotCache};
use crate::client::remote::RemoteRequest;
use crate::shared::{AttendanceRecord, Coordinates, NewUser, PhotoBlob, User};
use serde_json::Value;
use uuid::Uuid;

/// Snapshot key of the user list
pub const USERS_SNAPSHOT_KEY: &str = "offline_users";

/// What happened to a write
#[derive(Debug, Clone, PartialEq)]
pub enum ActionAck {
    /// The server accepted it; its answer
    Sent(Value),
    /// Queued; it will be sent when the connection returns
    SavedLocally { envelope_id: Uuid, message: String },
}

impl ActionAck {
    pub fn is_saved_locally(&self) -> bool {
        matches!(self, ActionAck::SavedLocally { .. })
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceActions {
    gateway: RequestGateway,
    snapshots: SnapshotCache,
}

impl AttendanceActions {
    pub fn new(gateway: RequestGateway, snapshots: SnapshotCache) -> Self {
        Self { gateway, snapshots }
    }

    /// Register a user. Missing fields are rejected before anything is sent
    /// or queued.
    pub async fn register_user(&self, user: NewUser) -> Result<ActionAck, GatewayError> {
        user.validate()?;
        self.write(RemoteRequest::RegisterUser(user)).await
    }

    pub async fn submit_attendance(
        &self,
        record: AttendanceRecord,
    ) -> Result<ActionAck, GatewayError> {
        self.write(RemoteRequest::SubmitAttendance(record)).await
    }

    /// Upload a captured photo under a generated filename
    pub async fn upload_photo(
        &self,
        photo: PhotoBlob,
        location: Option<Coordinates>,
    ) -> Result<ActionAck, GatewayError> {
        if photo.is_empty() {
            return Err(GatewayError::InvalidRequest {
                message: "photo is empty".to_string(),
            });
        }

        self.write(RemoteRequest::UploadPhoto {
            filename: PhotoStore::generate_filename(),
            photo,
            location,
        })
        .await
    }

    /// Registered users, fresh when online, last known list otherwise
    pub async fn list_users(&self) -> Snapshot<Vec<User>> {
        self.snapshots
            .read_through(USERS_SNAPSHOT_KEY, || {
                self.gateway.fetch::<Vec<User>>(RemoteRequest::FetchUsers)
            })
            .await
    }

    async fn write(&self, request: RemoteRequest) -> Result<ActionAck, GatewayError> {
        match self.gateway.execute_or_defer(request).await? {
            GatewayOutcome::Completed(value) => Ok(ActionAck::Sent(value)),
            GatewayOutcome::Deferred(receipt) => Ok(ActionAck::SavedLocally {
                envelope_id: receipt.envelope_id,
                message: receipt.message().to_string(),
            }),
            // Writes are always queued when they cannot run
            GatewayOutcome::Unavailable(reason) => Err(GatewayError::Storage {
                message: format!("write was neither sent nor queued: {reason:?}"),
            }),
        }
    }
}
