//! famelist-core - shared library for the famelist catalog.
//!
//! Catalog models, the HTTP client for the static data resource, the
//! file-backed cache and the `DataSync` engine that ties them together.

pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod sync;
pub mod utils;

pub use api::{ApiClient, ApiError, RemoteSource};
pub use cache::{CacheInfo, CacheManager};
pub use config::Config;
pub use models::{Category, CategoryFilter, Dataset, Person, Stats};
pub use sync::{
    DataSync, ExportError, ExportFormat, Subscription, SyncError, SyncEvent, SyncOptions,
    ValidationError,
};
