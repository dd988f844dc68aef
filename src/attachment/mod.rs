//! File-relation fields on resources and their reconciliation with uploads.

pub mod declaration;
pub mod sync;

pub use declaration::{AttachmentDeclaration, AttachmentKind, ClearPolicy};
pub use sync::AttachmentSynchronizer;
