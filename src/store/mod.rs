//! Collaborator interfaces the resource controllers depend on.
//!
//! Persistence, file storage, user lookup and validation are provided by the
//! environment. `crate::memory` and `crate::database` ship implementations.

pub mod collection;
pub mod entity;
pub mod error;
pub mod files;
pub mod users;
pub mod validation;

pub use collection::{page_offset, Collection, Page};
pub use entity::{Entity, EntityStore, ID_FIELD};
pub use error::StoreError;
pub use files::{FileRecord, FileStore};
pub use users::{Group, User, UserDirectory};
pub use validation::{AcceptAll, FieldRules, ValidationErrors, Validator};
