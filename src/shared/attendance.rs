//! Attendance domain records
//!
//! The payloads exchanged with the remote service: users, registration
//! requests, attendance records, coordinates and captured photos.

use crate::shared::error::SharedError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user as returned by `GET /users`. The password never leaves the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Any extra profile fields the server stores
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of `POST /adduser`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    /// The server answers 400 "Campos requeridos" for any empty field; catch it
    /// before the request is sent or queued.
    pub fn validate(&self) -> Result<(), SharedError> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(SharedError::validation(field, "Campos requeridos"));
            }
        }
        Ok(())
    }
}

/// A geolocation reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters, when the platform reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    pub captured_at: DateTime<Utc>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m: None,
            captured_at: Utc::now(),
        }
    }
}

/// Body of `POST /api/attendance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub user_id: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AttendanceRecord {
    /// Attendance for `user_id` recorded now
    pub fn now(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            recorded_at: Utc::now(),
            location: None,
            note: None,
        }
    }

    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }
}

/// A captured photo. Whoever holds it owns the bytes; handing it to the
/// network layer or the photo store moves it.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoBlob {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl PhotoBlob {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::new(bytes, "image/jpeg")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Photos can be megabytes; keep them out of debug logs.
impl std::fmt::Debug for PhotoBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoBlob")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
