//! Photo rows
//!
//! Raw row access for the `offline_photos` table. Encoding lives in
//! `offline::photos`.

use crate::client::local_db::{LocalDatabase, Result};
use sqlx::Row;

/// A stored photo as it sits in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRow {
    pub filename: String,
    pub content_type: String,
    /// Base64 (standard alphabet, padded)
    pub data: String,
    pub created_at: String,
}

impl LocalDatabase {
    /// Insert or replace a photo row
    pub async fn insert_photo(&self, filename: &str, content_type: &str, data: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO offline_photos (filename, content_type, data, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(filename)
        .bind(content_type)
        .bind(data)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a photo row by filename
    pub async fn get_photo(&self, filename: &str) -> Result<Option<PhotoRow>> {
        let row = sqlx::query(
            "SELECT filename, content_type, data, created_at FROM offline_photos WHERE filename = ?",
        )
        .bind(filename)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(PhotoRow {
                filename: row.try_get("filename")?,
                content_type: row.try_get("content_type")?,
                data: row.try_get("data")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    /// Delete a photo row. Returns whether it existed.
    pub async fn delete_photo(&self, filename: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM offline_photos WHERE filename = ?")
            .bind(filename)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Filenames of every stored photo, oldest first
    pub async fn photo_filenames(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT filename FROM offline_photos ORDER BY created_at ASC, filename ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(filename,)| filename).collect())
    }
}
