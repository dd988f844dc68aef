//! In-memory collaborators used by the demo server and the test suites.

pub mod collection;
pub mod entities;
pub mod files;
pub mod resource;
pub mod users;

pub use collection::MemoryCollection;
pub use entities::MemoryEntityStore;
pub use files::MemoryFileStore;
pub use resource::MemoryResource;
pub use users::MemoryUserDirectory;
