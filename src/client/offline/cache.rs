//! # Cache-Backed Read Path
//!
//! Last-known-good snapshots for read keys. A live read refreshes the
//! snapshot; a read that cannot run serves it instead. "No data yet" is a
//! normal offline state and is represented as `Snapshot::Empty`, never as an
//! error.

use crate::client::local_db::{LocalDatabase, Result};
use crate::client::offline::gateway::{GatewayError, GatewayOutcome};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

/// What a read-through produced
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot<T> {
    /// Fetched just now; the cache was refreshed
    Fresh(T),
    /// The live read did not run; last known value
    Cached(T),
    /// The live read did not run and nothing is cached
    Empty,
}

impl<T> Snapshot<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Snapshot::Fresh(value) | Snapshot::Cached(value) => Some(value),
            Snapshot::Empty => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Snapshot::Fresh(_))
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.into_option().unwrap_or_default()
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSnapshot<T> {
    value: T,
    updated_at: DateTime<Utc>,
}

/// Snapshot storage keyed by logical resource
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    db: Arc<LocalDatabase>,
}

impl SnapshotCache {
    pub fn new(db: Arc<LocalDatabase>) -> Self {
        Self { db }
    }

    /// Cached value for `key`. Missing or unreadable snapshots yield `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.db.read_json::<StoredSnapshot<T>>(key).await {
            Ok(stored) => stored.map(|s| s.value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "cached snapshot unreadable");
                None
            }
        }
    }

    /// When `key` was last refreshed
    pub async fn updated_at(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.db.read_json::<StoredSnapshot<serde_json::Value>>(key).await {
            Ok(stored) => stored.map(|s| s.updated_at),
            Err(_) => None,
        }
    }

    /// Overwrite the snapshot for `key`
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let stored = StoredSnapshot {
            value,
            updated_at: Utc::now(),
        };
        self.db.write_json(key, &stored).await
    }

    /// Run `fetcher`; refresh and return its value on success, otherwise serve
    /// the cached snapshot.
    pub async fn read_through<T, F, Fut>(&self, key: &str, fetcher: F) -> Snapshot<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<GatewayOutcome<T>, GatewayError>>,
    {
        match fetcher().await {
            Ok(GatewayOutcome::Completed(value)) => {
                if let Err(e) = self.put(key, &value).await {
                    tracing::warn!(key = %key, error = %e, "could not refresh cached snapshot");
                }
                Snapshot::Fresh(value)
            }
            Ok(GatewayOutcome::Deferred(_)) | Ok(GatewayOutcome::Unavailable(_)) => {
                self.cached(key).await
            }
            Err(e) => {
                tracing::info!(key = %key, error = %e, "live read failed, serving cached snapshot");
                self.cached(key).await
            }
        }
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Snapshot<T> {
        match self.get(key).await {
            Some(value) => Snapshot::Cached(value),
            None => Snapshot::Empty,
        }
    }
}
