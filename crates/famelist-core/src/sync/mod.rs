//! Sync engine for the famelist catalog.
//!
//! - `DataSync`: load/cache/validate/notify service with periodic resync
//! - `strategy`: the ordered fallback plan (fresh cache, network, any cache, demo)
//! - `listeners`: observer registry and `SyncEvent`
//! - `validate`, `export`: dataset checks and serialization
//! - `demo`: fallback catalog

pub mod data_sync;
pub mod demo;
pub mod error;
pub mod export;
pub mod listeners;
pub mod strategy;
pub mod validate;

pub use data_sync::{DataSync, SyncOptions, DEFAULT_SYNC_INTERVAL, DEFAULT_WATCH_INTERVAL};
pub use demo::demo_people;
pub use error::{ExportError, SyncError, ValidationError};
pub use export::{export, ExportFormat};
pub use listeners::{Listeners, Subscription, SyncEvent};
pub use strategy::{plan, Source};
pub use validate::{parse_dataset, validate_data, validate_people, REQUIRED_FIELDS};
