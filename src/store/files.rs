use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::StoreError;
use crate::request::UploadedFile;

/// Stored file metadata; the bytes live with the file store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub content_type: Option<String>,
    pub file_size: usize,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn from_upload(upload: &UploadedFile, is_public: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: upload.file_name.clone(),
            content_type: upload.content_type.clone(),
            file_size: upload.bytes.len(),
            is_public,
            created_at: Utc::now(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// File storage: create from uploaded bytes, delete permanently
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create(&self, upload: &UploadedFile, is_public: bool) -> Result<FileRecord, StoreError>;

    async fn delete(&self, file: &FileRecord) -> Result<(), StoreError>;
}
