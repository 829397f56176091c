//! Shared Module
//!
//! Types shared between the client and the remote attendance service. These
//! are the shapes that travel over HTTP and that get persisted in the local
//! offline queue.

/// Users, attendance records, coordinates and photo blobs
pub mod attendance;

/// Deferred action envelopes
pub mod envelope;

/// Shared error types
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use attendance::{AttendanceRecord, Coordinates, NewUser, PhotoBlob, User};
pub use envelope::{ActionEnvelope, ActionKind, ActionPayload, HttpMethod};
pub use error::SharedError;
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
