//! Postgres blob store
//!
//! Keeps blobs in a single `blobs` table so instances that already share a
//! database can share run logs without extra infrastructure.

use async_trait::async_trait;
use sqlx::PgPool;

use super::blob::{BlobMeta, BlobStore, StoreError};

pub struct PgBlobStore {
    pool: PgPool,
}

impl PgBlobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlobStore for PgBlobStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as("SELECT content FROM blobs WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|(content,)| content)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        let size = bytes.len() as i64;

        sqlx::query(
            r#"
            INSERT INTO blobs (key, content, content_type, size, uploaded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (key) DO UPDATE
            SET content = EXCLUDED.content,
                content_type = EXCLUDED.content_type,
                size = EXCLUDED.size,
                uploaded_at = EXCLUDED.uploaded_at
            "#,
        )
        .bind(key)
        .bind(bytes)
        .bind(content_type)
        .bind(size)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobMeta>, StoreError> {
        let rows = sqlx::query_as::<_, BlobRow>(
            r#"
            SELECT key, size, uploaded_at
            FROM blobs
            WHERE left(key, length($1)) = $1
            ORDER BY key ASC
            "#,
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM blobs WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct BlobRow {
    key: String,
    size: i64,
    uploaded_at: chrono::DateTime<chrono::Utc>,
}

impl From<BlobRow> for BlobMeta {
    fn from(row: BlobRow) -> Self {
        BlobMeta {
            url: format!("postgres://blobs/{}", row.key),
            path: row.key,
            size: row.size.max(0) as u64,
            uploaded_at: row.uploaded_at,
        }
    }
}
