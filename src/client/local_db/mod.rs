//! # Local Database Module
//!
//! Local SQLite storage backing the offline-first client.
//!
//! ## Architecture
//!
//! Two independent collections live in the file:
//! - **`local_store`**: key/value documents (the offline queue, the rejected
//!   queue, cached snapshots), one JSON value per key
//! - **`offline_photos`**: base64 photo blobs keyed by generated filename
//!
//! Each key is read and written on its own, so a corrupt value only affects
//! that key.
//!
//! ## Key Components
//!
//! - `LocalDatabase`: connection pool and schema management
//! - `schema.rs`: schema version constants
//! - `store.rs`: key/value document operations
//! - `photos.rs`: photo row operations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use attendance_sync::client::local_db::LocalDatabase;
//!
//! # async fn example() -> attendance_sync::client::local_db::Result<()> {
//! let db = LocalDatabase::open("/tmp/attendance/local.db").await?;
//! db.put_value("offline_users", "[]").await?;
//! let users = db.get_value("offline_users").await?;
//! # Ok(())
//! # }
//! ```

pub mod photos;
pub mod schema;
pub mod store;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use photos::PhotoRow;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Local persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while preparing the database file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blob encoding/decoding error
    #[error("Encoding error: {message}")]
    Encoding {
        /// Human-readable error message
        message: String,
    },

    /// Background task failed
    #[error("Background task failed: {message}")]
    Task {
        /// Human-readable error message
        message: String,
    },

    /// An envelope with this id is already queued
    #[error("Envelope {id} is already queued")]
    DuplicateEnvelope { id: Uuid },

    /// No queued envelope has this id
    #[error("Envelope {id} is not queued")]
    UnknownEnvelope { id: Uuid },
}

impl StorageError {
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

/// Local database connection manager
#[derive(Debug, Clone)]
pub struct LocalDatabase {
    pool: SqlitePool,
}

impl LocalDatabase {
    /// Open or create the database file at `path`
    ///
    /// Creates parent directories and the file when missing, and uses WAL mode.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %path.display(), "opened local database");

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Private in-memory database; lives as long as this value (and its clones)
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        // A memory database exists per connection, so pin exactly one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize database schema
    ///
    /// Creates all necessary tables and runs any pending migrations.
    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("schema.sql"))
            .execute(&self.pool)
            .await?;

        self.run_migrations().await?;

        Ok(())
    }

    /// Run database migrations
    async fn run_migrations(&self) -> Result<()> {
        let current_version: (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        for version in schema::get_pending_migrations(current_version.0) {
            sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
                .bind(version)
                .bind(chrono::Utc::now().to_rfc3339())
                .execute(&self.pool)
                .await?;
            tracing::info!(version, "applied local schema migration");
        }

        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every connection. Later operations fail with `PoolClosed`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
