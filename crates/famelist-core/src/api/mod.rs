//! HTTP client module for the famelist data resource.
//!
//! The catalog is a static JSON array served next to the web front end at
//! `data/personalities.json`. `ApiClient` fetches and decodes it; the
//! `RemoteSource` trait is the seam the sync engine depends on.

pub mod client;
pub mod error;

pub use client::{ApiClient, RemoteSource, DATA_PATH};
pub use error::ApiError;
