//! # Offline Layer
//!
//! Offline-first request handling: durable queuing of actions that cannot run
//! now, storage of captured photos, and cached reads.
//!
//! ## Architecture
//!
//! - **Queue Store**: durable FIFO of action envelopes
//! - **Photo Store**: base64 photo blobs referenced by queued envelopes
//! - **Dead Letters**: envelopes the server refused during replay
//! - **Gateway**: the execute-now-or-queue decision
//! - **Snapshot Cache**: last-known-good data for reads
//!
//! ## Key Components
//!
//! - `queue.rs`: durable queue store
//! - `photos.rs`: photo store
//! - `dead_letter.rs`: rejected envelopes
//! - `gateway.rs`: offline-aware request gateway
//! - `cache.rs`: cache-backed read path
//!
//! ## Usage
//!
//! ```rust,no_run
//! use attendance_sync::client::{AppContext, RemoteRequest};
//! use attendance_sync::shared::User;
//!
//! # async fn example(context: AppContext) -> Result<(), attendance_sync::client::GatewayError> {
//! let gateway = context.gateway();
//!
//! // Fall back to an empty list when the request cannot run
//! let users: Vec<User> = gateway
//!     .read_with_fallback(RemoteRequest::FetchUsers, Vec::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod dead_letter;
pub mod gateway;
pub mod photos;
pub mod queue;

// Re-export main types
pub use cache::{Snapshot, SnapshotCache};
pub use dead_letter::{DeadLetterStore, RejectedEnvelope};
pub use gateway::{
    DeferralReason, DeferredReceipt, GatewayError, GatewayOutcome, RequestGateway,
    SAVED_LOCALLY_MESSAGE,
};
pub use photos::PhotoStore;
pub use queue::{QueueStore, QUEUE_KEY};
