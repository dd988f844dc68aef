use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::request::UploadedFile;
use crate::store::{FileRecord, FileStore, StoreError};

#[derive(Debug, Clone, Default)]
pub struct MemoryFileStore {
    files: Arc<RwLock<HashMap<Uuid, (FileRecord, Vec<u8>)>>>,
    deleted: Arc<RwLock<Vec<Uuid>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files currently stored
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn bytes(&self, id: Uuid) -> Option<Vec<u8>> {
        self.files.read().await.get(&id).map(|(_, bytes)| bytes.clone())
    }

    pub async fn was_deleted(&self, id: Uuid) -> bool {
        self.deleted.read().await.contains(&id)
    }

    pub async fn deleted_count(&self) -> usize {
        self.deleted.read().await.len()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create(&self, upload: &UploadedFile, is_public: bool) -> Result<FileRecord, StoreError> {
        let record = FileRecord::from_upload(upload, is_public);
        self.files
            .write()
            .await
            .insert(record.id, (record.clone(), upload.bytes.clone()));
        Ok(record)
    }

    async fn delete(&self, file: &FileRecord) -> Result<(), StoreError> {
        if self.files.write().await.remove(&file.id).is_some() {
            self.deleted.write().await.push(file.id);
        }
        Ok(())
    }
}
