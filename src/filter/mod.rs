//! Sort/filter resolution and application.
//!
//! `resolve` turns raw query parameters into a [`FilterSortSpec`], `apply`
//! runs that spec against a [`crate::store::Collection`], and `registry`
//! holds the per-field filter functions a controller declares. `query`,
//! `filter_where` and `filter_order` render filter mappings as SQL for the
//! Postgres collection.

pub mod apply;
pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod query;
pub mod registry;
pub mod resolve;
pub mod types;

pub use apply::{apply_spec, page_number, page_size, sort_target};
pub use query::FilterQuery;
pub use registry::{FilterFuture, FilterOutcome, FilterRegistry};
pub use resolve::{resolve_spec, FilterHooks, NoHooks};
pub use types::*;
