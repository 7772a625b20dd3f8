//! Local caching module for offline data access.
//!
//! This module provides the `CacheManager` for storing and retrieving the
//! catalog locally. Two entries are kept: the serialized catalog
//! (`personalities_data`) and its fetch time in epoch milliseconds
//! (`data_cache_time`). The catalog is considered fresh for 5 minutes.

pub mod manager;

pub use manager::{is_fresh, CacheInfo, CacheManager, CachedData, CACHE_FRESH_MINUTES, DATA_KEY, TIME_KEY};
