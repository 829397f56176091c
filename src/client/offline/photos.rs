//! # Photo Store
//!
//! Captured photos waiting for upload, stored base64-encoded and keyed by a
//! generated filename.
//!
//! Saving moves the blob into the store: encoding runs on the blocking pool,
//! the encoded text is written, and only then is the in-memory blob dropped.
//! If the write fails the blob is kept in memory under the same filename, so
//! a photo is never lost between the two owners.

use crate::client::local_db::{LocalDatabase, Result, StorageError};
use crate::shared::PhotoBlob;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Persistent photo blobs
#[derive(Debug)]
pub struct PhotoStore {
    db: Arc<LocalDatabase>,
    /// Blobs whose write failed
    fallback: Mutex<HashMap<String, PhotoBlob>>,
}

impl PhotoStore {
    pub fn new(db: Arc<LocalDatabase>) -> Self {
        Self {
            db,
            fallback: Mutex::new(HashMap::new()),
        }
    }

    /// `photo_<UTC timestamp>_<8 hex>.jpg`
    pub fn generate_filename() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!(
            "photo_{}_{}.jpg",
            Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ"),
            &id[..8]
        )
    }

    /// Encode and store `blob` under `filename`, taking ownership of it.
    pub async fn save(&self, filename: String, blob: PhotoBlob) -> Result<String> {
        let (encoded, blob) = tokio::task::spawn_blocking(move || {
            let encoded = STANDARD.encode(&blob.bytes);
            (encoded, blob)
        })
        .await
        .map_err(|e| StorageError::task(e.to_string()))?;

        match self
            .db
            .insert_photo(&filename, &blob.content_type, &encoded)
            .await
        {
            Ok(()) => {
                tracing::debug!(filename = %filename, bytes = blob.len(), "photo stored");
                self.fallback.lock().await.remove(&filename);
            }
            Err(e) => {
                tracing::error!(
                    filename = %filename,
                    error = %e,
                    "could not persist photo, keeping it in memory"
                );
                self.fallback.lock().await.insert(filename.clone(), blob);
            }
        }

        Ok(filename)
    }

    /// Decode the photo stored under `filename`. Missing or corrupt photos
    /// yield `None`.
    pub async fn get(&self, filename: &str) -> Option<PhotoBlob> {
        if let Some(blob) = self.fallback.lock().await.get(filename) {
            return Some(blob.clone());
        }

        let row = match self.db.get_photo(filename).await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "photo unreadable");
                return None;
            }
        };

        let decoded = tokio::task::spawn_blocking(move || {
            STANDARD
                .decode(row.data.as_bytes())
                .map(|bytes| PhotoBlob::new(bytes, row.content_type))
                .map_err(|e| StorageError::encoding(e.to_string()))
        })
        .await;

        match decoded {
            Ok(Ok(blob)) => Some(blob),
            Ok(Err(e)) => {
                tracing::warn!(filename = %filename, error = %e, "stored photo is corrupt");
                None
            }
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "photo decode task failed");
                None
            }
        }
    }

    /// Delete a photo after its upload was confirmed
    pub async fn remove(&self, filename: &str) {
        self.fallback.lock().await.remove(filename);

        if let Err(e) = self.db.delete_photo(filename).await {
            tracing::warn!(filename = %filename, error = %e, "could not delete stored photo");
        }
    }

    /// Filenames of every stored photo
    pub async fn filenames(&self) -> Vec<String> {
        let mut names = match self.db.photo_filenames().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list stored photos");
                Vec::new()
            }
        };
        for name in self.fallback.lock().await.keys() {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
