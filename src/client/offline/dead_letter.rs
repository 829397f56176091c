//! Rejected envelopes
//!
//! Envelopes the server refused during replay. Retrying them cannot succeed,
//! so they leave the offline queue and are kept here for the user to inspect,
//! and to put back once the cause is fixed.

use super::queue::QueueStore;
use crate::client::local_db::{LocalDatabase, Result};
use crate::shared::ActionEnvelope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Key of the rejected-envelope document
pub const REJECTED_KEY: &str = "rejectedQueue";

/// An envelope together with the server's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedEnvelope {
    pub envelope: ActionEnvelope,
    /// HTTP status, absent when the envelope could not be replayed at all
    pub status: Option<u16>,
    pub body: Value,
    pub rejected_at: DateTime<Utc>,
}

impl RejectedEnvelope {
    pub fn new(envelope: ActionEnvelope, status: Option<u16>, body: Value) -> Self {
        Self {
            envelope,
            status,
            body,
            rejected_at: Utc::now(),
        }
    }
}

/// Persistent list of rejected envelopes
#[derive(Debug)]
pub struct DeadLetterStore {
    db: Arc<LocalDatabase>,
    entries: Mutex<Vec<RejectedEnvelope>>,
}

impl DeadLetterStore {
    pub async fn load(db: Arc<LocalDatabase>) -> Self {
        let entries = match db.read_json::<Vec<RejectedEnvelope>>(REJECTED_KEY).await {
            Ok(entries) => entries.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "rejected queue unreadable, starting empty");
                Vec::new()
            }
        };

        Self {
            db,
            entries: Mutex::new(entries),
        }
    }

    /// Append rejected envelopes
    pub async fn record(&self, rejected: Vec<RejectedEnvelope>) {
        if rejected.is_empty() {
            return;
        }

        let mut entries = self.entries.lock().await;
        entries.extend(rejected);

        if let Err(e) = self.db.write_json(REJECTED_KEY, &*entries).await {
            tracing::error!(error = %e, "could not persist rejected queue, keeping it in memory");
        }
    }

    pub async fn all(&self) -> Vec<RejectedEnvelope> {
        self.entries.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Move a rejected envelope back to the tail of `queue` under its original
    /// id. Returns false when no rejected envelope has that id.
    pub async fn requeue(&self, id: &Uuid, queue: &QueueStore) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let Some(position) = entries.iter().position(|r| r.envelope.id == *id) else {
            return Ok(false);
        };

        let mut envelope = entries[position].envelope.clone();
        envelope.synced = false;
        queue.append(envelope).await?;

        entries.remove(position);
        if let Err(e) = self.db.write_json(REJECTED_KEY, &*entries).await {
            tracing::error!(error = %e, "could not persist rejected queue, keeping it in memory");
        }
        tracing::info!(envelope_id = %id, "rejected envelope requeued");
        Ok(true)
    }

    /// Forget every rejected envelope
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();

        if let Err(e) = self.db.delete_value(REJECTED_KEY).await {
            tracing::error!(error = %e, "could not clear rejected queue");
        }
    }
}
