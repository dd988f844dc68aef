use super::declaration::{AttachmentDeclaration, AttachmentKind, ClearPolicy};
use crate::request::{is_falsy, ResourceRequest, UploadedFile};
use crate::store::{Entity, EntityStore, FileStore, StoreError};

/// Reconciles declared file relations of a saved entity with the request's
/// uploads. File deletion is permanent.
pub struct AttachmentSynchronizer<'a> {
    entities: &'a dyn EntityStore,
    files: &'a dyn FileStore,
    policy: ClearPolicy,
}

impl<'a> AttachmentSynchronizer<'a> {
    pub fn new(entities: &'a dyn EntityStore, files: &'a dyn FileStore, policy: ClearPolicy) -> Self {
        Self {
            entities,
            files,
            policy,
        }
    }

    /// Sync every declared field the store knows as a relation.
    ///
    /// Returns true when any field is declared, meaning the caller must save
    /// the entity again.
    pub async fn sync(
        &self,
        entity: &mut Entity,
        request: &ResourceRequest,
        declaration: &AttachmentDeclaration,
    ) -> Result<bool, StoreError> {
        for (field, kind) in declaration.fields() {
            if !self.entities.has_relation(field) {
                tracing::debug!("Skipping attachment field '{}': not a relation", field);
                continue;
            }
            self.entities.load_relation(entity, field).await?;

            if request.has_file(field) {
                let uploads: Vec<&UploadedFile> = match kind {
                    AttachmentKind::Single => request.file(field).into_iter().collect(),
                    AttachmentKind::Multiple => request.files(field).iter().collect(),
                };
                let valid: Vec<&UploadedFile> = uploads.into_iter().filter(|u| u.is_valid()).collect();
                if valid.is_empty() {
                    tracing::warn!("Ignoring invalid upload for '{}'", field);
                    continue;
                }
                self.clear(entity, field).await?;
                for upload in valid {
                    let record = self.files.create(upload, true).await?;
                    tracing::debug!("Attached file {} to '{}'", record.id, field);
                    self.entities.attach(entity, field, record).await?;
                }
                self.entities.load_relation(entity, field).await?;
            } else if self.should_clear(request, field) {
                self.clear(entity, field).await?;
            }
        }

        Ok(!declaration.is_empty())
    }

    fn should_clear(&self, request: &ResourceRequest, field: &str) -> bool {
        let value = request.input(field);
        match self.policy {
            ClearPolicy::OnMissing => is_falsy(value),
            ClearPolicy::Explicit => value.is_some() && is_falsy(value),
        }
    }

    async fn clear(&self, entity: &mut Entity, field: &str) -> Result<(), StoreError> {
        let existing = entity.relation(field).to_vec();
        if existing.is_empty() {
            return Ok(());
        }
        for file in &existing {
            self.files.delete(file).await?;
            self.entities.detach(entity, field, file).await?;
        }
        tracing::debug!("Cleared {} file(s) from '{}'", existing.len(), field);
        entity.set_relation(field, Vec::new());
        Ok(())
    }
}
