use async_trait::async_trait;
use sqlx::PgPool;

use crate::request::UploadedFile;
use crate::store::{FileRecord, FileStore, StoreError};

/// Uploaded bytes and metadata in the `system_files` table
#[derive(Debug, Clone)]
pub struct PgFileStore {
    pool: PgPool,
}

impl PgFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn create(&self, upload: &UploadedFile, is_public: bool) -> Result<FileRecord, StoreError> {
        let record = FileRecord::from_upload(upload, is_public);
        sqlx::query(
            "INSERT INTO system_files (id, file_name, content_type, file_size, is_public, created_at, content) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(record.id)
        .bind(&record.file_name)
        .bind(&record.content_type)
        .bind(record.file_size as i64)
        .bind(record.is_public)
        .bind(record.created_at)
        .bind(&upload.bytes)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored file {} ({} bytes)", record.id, record.file_size);
        Ok(record)
    }

    async fn delete(&self, file: &FileRecord) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM system_files WHERE id = $1")
            .bind(file.id)
            .execute(&self.pool)
            .await?;
        tracing::debug!("Deleted file {}", file.id);
        Ok(())
    }
}
