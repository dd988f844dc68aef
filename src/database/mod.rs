//! PostgreSQL implementations of the store collaborators.
//!
//! Expected tables besides the resource tables themselves:
//! `system_files`, `system_file_attachments`, `users`, `groups` and
//! `user_groups` (see `migrations/schema.sql`).

pub mod bind;
pub mod collection;
pub mod entities;
pub mod files;
pub mod manager;
pub mod resource;
pub mod users;

pub use collection::PgCollection;
pub use entities::PgEntityStore;
pub use files::PgFileStore;
pub use manager::{DatabaseError, DatabaseManager};
pub use resource::PgResource;
pub use users::PgUserDirectory;
