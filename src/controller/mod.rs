//! Generic resource controllers.
//!
//! A [`ResourceController`] declares what a resource is (store, collection,
//! filters, attachments, shaping). [`ResourceHandler`] runs one request
//! against it with the shared [`Services`].

pub mod handler;
pub mod resource;
pub mod services;
pub mod session;

pub use handler::ResourceHandler;
pub use resource::ResourceController;
pub use services::Services;
