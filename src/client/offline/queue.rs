//! # Durable Queue Store
//!
//! Ordered queue of deferred action envelopes that survives restarts.
//!
//! ## Features
//!
//! - **Persistent Queue**: the whole queue is one JSON document under a fixed
//!   key, written with a single upsert
//! - **FIFO**: insertion order is kept; nothing reorders entries
//! - **Audit Mode**: confirmed entries can be flagged `synced` instead of removed
//! - **Degraded Mode**: when the store cannot be written the queue keeps working
//!   in memory and recovers on the next successful write
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attendance_sync::client::local_db::LocalDatabase;
//! use attendance_sync::client::offline::QueueStore;
//! use attendance_sync::shared::{ActionEnvelope, ActionPayload, AttendanceRecord};
//!
//! # async fn example() -> attendance_sync::client::local_db::Result<()> {
//! let db = Arc::new(LocalDatabase::open("/tmp/attendance/local.db").await?);
//! let queue = QueueStore::load(db).await;
//!
//! let envelope = ActionEnvelope::new(ActionPayload::AttendanceRecord(AttendanceRecord::now("u1")));
//! queue.append(envelope).await?;
//!
//! for envelope in queue.pending().await {
//!     // replay...
//! }
//! # Ok(())
//! # }
//! ```

use crate::client::local_db::{LocalDatabase, Result, StorageError};
use crate::shared::ActionEnvelope;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Key of the offline queue document
pub const QUEUE_KEY: &str = "offlineQueue";

/// Durable FIFO queue of action envelopes
#[derive(Debug)]
pub struct QueueStore {
    db: Arc<LocalDatabase>,
    key: String,
    state: Mutex<QueueState>,
}

#[derive(Debug, Default)]
struct QueueState {
    entries: Vec<ActionEnvelope>,
    degraded: bool,
}

impl QueueStore {
    /// Load the queue from the default key
    pub async fn load(db: Arc<LocalDatabase>) -> Self {
        Self::load_with_key(db, QUEUE_KEY).await
    }

    /// Load the queue stored under `key`. Unreadable or malformed state
    /// yields an empty queue.
    pub async fn load_with_key(db: Arc<LocalDatabase>, key: impl Into<String>) -> Self {
        let key = key.into();
        let entries = match db.read_json::<Vec<ActionEnvelope>>(&key).await {
            Ok(Some(entries)) => entries,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "offline queue unreadable, starting empty");
                Vec::new()
            }
        };

        tracing::debug!(key = %key, entries = entries.len(), "offline queue loaded");

        Self {
            db,
            key,
            state: Mutex::new(QueueState {
                entries,
                degraded: false,
            }),
        }
    }

    /// Add an envelope at the tail and persist the queue
    pub async fn append(&self, envelope: ActionEnvelope) -> Result<()> {
        let mut state = self.state.lock().await;

        if state.entries.iter().any(|e| e.id == envelope.id) {
            return Err(StorageError::DuplicateEnvelope { id: envelope.id });
        }

        tracing::info!(
            envelope_id = %envelope.id,
            kind = ?envelope.kind(),
            "queued action for later sync"
        );

        let mut next = state.entries.clone();
        next.push(envelope);
        self.commit(&mut state, next).await;
        Ok(())
    }

    /// Every entry in insertion order, synced or not
    pub async fn all(&self) -> Vec<ActionEnvelope> {
        self.state.lock().await.entries.clone()
    }

    /// Entries still waiting for delivery, in insertion order
    pub async fn pending(&self) -> Vec<ActionEnvelope> {
        let state = self.state.lock().await;
        state.entries.iter().filter(|e| !e.synced).cloned().collect()
    }

    /// Look up one entry
    pub async fn get(&self, id: &Uuid) -> Option<ActionEnvelope> {
        let state = self.state.lock().await;
        state.entries.iter().find(|e| e.id == *id).cloned()
    }

    /// Replace the whole queue in one write
    pub async fn replace_with(&self, remaining: Vec<ActionEnvelope>) {
        let mut state = self.state.lock().await;
        self.commit(&mut state, remaining).await;
    }

    /// Flag an entry as delivered. Returns false if it already was.
    pub async fn mark_synced(&self, id: &Uuid) -> Result<bool> {
        let mut state = self.state.lock().await;

        let mut next = state.entries.clone();
        let envelope = next
            .iter_mut()
            .find(|e| e.id == *id)
            .ok_or(StorageError::UnknownEnvelope { id: *id })?;

        if !envelope.mark_synced() {
            return Ok(false);
        }

        self.commit(&mut state, next).await;
        Ok(true)
    }

    /// Remove the given ids from whatever the queue holds now, in one write.
    /// Entries appended since the caller took its snapshot are kept.
    pub async fn drop_confirmed(&self, ids: &HashSet<Uuid>) -> usize {
        if ids.is_empty() {
            return 0;
        }

        let mut state = self.state.lock().await;
        let before = state.entries.len();
        let next: Vec<ActionEnvelope> = state
            .entries
            .iter()
            .filter(|e| !ids.contains(&e.id))
            .cloned()
            .collect();
        let removed = before - next.len();

        self.commit(&mut state, next).await;
        removed
    }

    /// Number of entries, synced included
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of entries waiting for delivery
    pub async fn pending_len(&self) -> usize {
        let state = self.state.lock().await;
        state.entries.iter().filter(|e| !e.synced).count()
    }

    /// Whether the last write failed and the queue only lives in memory
    pub async fn is_degraded(&self) -> bool {
        self.state.lock().await.degraded
    }

    /// Persist `next` and make it the in-memory queue.
    async fn commit(&self, state: &mut QueueState, next: Vec<ActionEnvelope>) {
        match self.db.write_json(&self.key, &next).await {
            Ok(()) => {
                if state.degraded {
                    tracing::info!(key = %self.key, "offline queue persisted again");
                }
                state.degraded = false;
            }
            Err(e) => {
                tracing::error!(
                    key = %self.key,
                    error = %e,
                    "could not persist offline queue, keeping it in memory"
                );
                state.degraded = true;
            }
        }
        state.entries = next;
    }
}
