//! Generic REST resource controllers: CRUD orchestration, declarative
//! filtering and sorting, attachment sync, current-user resolution and an
//! in-process notification bus, served over axum.

pub mod api;
pub mod attachment;
pub mod auth;
pub mod components;
pub mod config;
pub mod controller;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod memory;
pub mod observer;
pub mod request;
pub mod store;
pub mod types;

pub use controller::{ResourceController, ResourceHandler, Services};
pub use error::ApiError;
pub use handlers::ApiRouter;
