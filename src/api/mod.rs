//! Response shapes returned by every controller operation.

pub mod envelope;
pub mod messages;

pub use envelope::{Envelope, Reply};
pub use messages::tr;
