//! Attendance Sync - Offline-first client core
//!
//! Records attendance events (user registration, photo capture, geolocated
//! attendance records) and keeps them usable without network connectivity.
//! Actions attempted while offline are queued durably and replayed against the
//! remote service once connectivity returns.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared with the remote service
//!   - Action envelopes, attendance records, users
//!   - Configuration and shared error types
//!
//! - **`client`** - The offline-first client
//!   - Local SQLite store (queue, snapshots, photos)
//!   - Offline-aware request gateway and cache-backed reads
//!   - Connectivity monitor and synchronizer
//!   - Device subscriptions (geolocation, camera)
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attendance_sync::client::{AppContext, Config, HttpRemote, RemoteService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let remote = Arc::new(HttpRemote::new(config.clone())?);
//! let online = remote.probe().await;
//! let context = AppContext::open(config, remote, online).await?;
//!
//! let users = context.actions().list_users().await;
//! println!("{} users known", users.unwrap_or_default().len());
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - Connectivity failures are never errors: the action is queued and the caller
//!   gets a deferred outcome.
//! - Server rejections propagate verbatim as `GatewayError::Rejected`.
//! - Local storage failures degrade to in-memory state and are logged.

/// Shared types and data structures
pub mod shared;

/// Offline-first client
pub mod client;
