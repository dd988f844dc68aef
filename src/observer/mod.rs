// Notification bus: in-process observers attached to controller extension points

pub mod bus;
pub mod context;
pub mod error;
pub mod traits;

pub use bus::*;
pub use context::*;
pub use error::*;
pub use traits::*;
