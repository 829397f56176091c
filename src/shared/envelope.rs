//! # Action Envelopes
//!
//! An envelope is one deferred unit of work: everything needed to replay an
//! action against the remote service after the fact.
//!
//! ## Lifecycle
//!
//! - Created when a write is attempted offline, or when the live call never
//!   reached the server
//! - Read by the synchronizer and replayed in insertion order
//! - Removed (or flagged `synced` when kept for audit) only after the server
//!   acknowledged it
//!
//! Envelopes are immutable apart from the one-way `synced` flag.

use crate::shared::attendance::{AttendanceRecord, Coordinates, NewUser};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind tag of a deferred action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    UserRegistration,
    AttendanceRecord,
    AttendancePhoto,
    GenericHttp,
}

/// HTTP method of a generic envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// What the envelope replays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPayload {
    /// `POST /adduser`
    UserRegistration(NewUser),
    /// `POST /api/attendance`
    AttendanceRecord(AttendanceRecord),
    /// `POST /api/upload-photo`; the bytes live in the photo store under `filename`
    AttendancePhoto {
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<Coordinates>,
    },
    /// Any other request, replayed through `POST /api/sync`
    GenericHttp {
        method: HttpMethod,
        endpoint: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<Value>,
    },
}

impl ActionPayload {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionPayload::UserRegistration(_) => ActionKind::UserRegistration,
            ActionPayload::AttendanceRecord(_) => ActionKind::AttendanceRecord,
            ActionPayload::AttendancePhoto { .. } => ActionKind::AttendancePhoto,
            ActionPayload::GenericHttp { .. } => ActionKind::GenericHttp,
        }
    }
}

/// A deferred action with its identity and sync flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEnvelope {
    /// Unique within the queue for the envelope's lifetime; also sent to the
    /// server as the idempotency key on every attempt
    pub id: Uuid,
    pub payload: ActionPayload,
    pub created_at: DateTime<Utc>,
    /// false until the server confirmed delivery
    #[serde(default)]
    pub synced: bool,
}

impl ActionEnvelope {
    /// New envelope with a fresh id
    pub fn new(payload: ActionPayload) -> Self {
        Self::with_id(Uuid::new_v4(), payload)
    }

    /// New envelope reusing an id that was already sent to the server
    pub fn with_id(id: Uuid, payload: ActionPayload) -> Self {
        Self {
            id,
            payload,
            created_at: Utc::now(),
            synced: false,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.payload.kind()
    }

    /// Target endpoint and method of a generic envelope
    pub fn target(&self) -> Option<(HttpMethod, &str)> {
        match &self.payload {
            ActionPayload::GenericHttp {
                method, endpoint, ..
            } => Some((*method, endpoint.as_str())),
            _ => None,
        }
    }

    /// Filename of the stored photo for photo envelopes
    pub fn photo_filename(&self) -> Option<&str> {
        match &self.payload {
            ActionPayload::AttendancePhoto { filename, .. } => Some(filename.as_str()),
            _ => None,
        }
    }

    /// Flip `synced` to true. Returns false if it already was.
    pub fn mark_synced(&mut self) -> bool {
        if self.synced {
            return false;
        }
        self.synced = true;
        true
    }
}
