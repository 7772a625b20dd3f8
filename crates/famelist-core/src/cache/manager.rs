use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

use crate::models::Person;
use crate::utils::format_age;

/// Entry holding the serialized catalog.
pub const DATA_KEY: &str = "personalities_data";

/// Entry holding the fetch time as epoch milliseconds.
pub const TIME_KEY: &str = "data_cache_time";

/// Cached catalog is fresh for 5 minutes.
pub const CACHE_FRESH_MINUTES: i64 = 5;

/// A cached value together with the moment it was fetched.
#[derive(Debug, Clone, Serialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }

    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        is_fresh(self.cached_at, now)
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// `now - cached_at < 5 minutes`
pub fn is_fresh(cached_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - cached_at < Duration::minutes(CACHE_FRESH_MINUTES)
}

/// Snapshot of the persistent cache state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<DateTime<Utc>>,
    /// Byte size of the serialized catalog entry.
    pub size: u64,
    #[serde(rename = "isExpired")]
    pub is_expired: bool,
}

impl CacheInfo {
    pub fn age_display(&self) -> String {
        match self.last_update {
            Some(ts) => format_age((Utc::now() - ts).num_minutes()),
            None => "never".to_string(),
        }
    }
}

/// File-backed key-value cache for the catalog.
///
/// Each key is one file in the cache directory. Reads go through an
/// in-memory memo that is dropped on `clear` and `invalidate`.
pub struct CacheManager {
    cache_dir: PathBuf,
    memo: RwLock<HashMap<String, String>>,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            memo: RwLock::new(HashMap::new()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(key)
    }

    fn read_from_disk(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache entry: {}", key))?;
        Ok(Some(contents))
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>> {
        if let Some(value) = self
            .memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
        {
            return Ok(Some(value.clone()));
        }

        let value = self.read_from_disk(key)?;
        if let Some(ref v) = value {
            self.memo
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.to_string(), v.clone());
        }
        Ok(value)
    }

    fn write_entry(&self, key: &str, value: String) -> Result<()> {
        std::fs::write(self.entry_path(key), &value)
            .with_context(|| format!("Failed to write cache entry: {}", key))?;
        self.memo
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
        Ok(())
    }

    fn remove_entry(&self, key: &str) -> Result<()> {
        self.memo
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        let path = self.entry_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache entry: {}", key))?;
        }
        Ok(())
    }

    fn parse_stamp(raw: &str) -> Option<DateTime<Utc>> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    // ===== Catalog =====

    /// Load the cached catalog. A missing timestamp counts as infinitely old.
    pub fn load_people(&self) -> Result<Option<CachedData<Vec<Person>>>> {
        let Some(contents) = self.read_entry(DATA_KEY)? else {
            return Ok(None);
        };

        let people: Vec<Person> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache entry: {}", DATA_KEY))?;

        let cached_at = self.cached_at()?.unwrap_or_default();

        Ok(Some(CachedData {
            data: people,
            cached_at,
        }))
    }

    /// Persist the catalog stamped with the current time.
    pub fn save_people(&self, people: &[Person]) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        self.save_people_at(people, now)?;
        Ok(now)
    }

    pub fn save_people_at(&self, people: &[Person], cached_at: DateTime<Utc>) -> Result<()> {
        let contents = serde_json::to_string(people)?;
        self.write_entry(DATA_KEY, contents)?;
        self.write_entry(TIME_KEY, cached_at.timestamp_millis().to_string())?;
        debug!(count = people.len(), "Catalog cached");
        Ok(())
    }

    pub fn cached_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .read_entry(TIME_KEY)?
            .as_deref()
            .and_then(Self::parse_stamp))
    }

    /// Raw timestamp entry straight from disk, bypassing the memo.
    /// Used to notice writes made by other processes sharing the directory.
    pub fn disk_stamp(&self) -> Result<Option<String>> {
        self.read_from_disk(TIME_KEY)
    }

    /// Forget memoized entries so the next read goes to disk.
    pub fn invalidate(&self) {
        self.memo
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Remove the catalog, its timestamp and the memo.
    pub fn clear(&self) -> Result<()> {
        self.remove_entry(DATA_KEY)?;
        self.remove_entry(TIME_KEY)?;
        self.invalidate();
        Ok(())
    }

    // ===== Cache Information =====

    pub fn info(&self) -> CacheInfo {
        let last_update = match self.cached_at() {
            Ok(ts) => ts,
            Err(e) => {
                debug!(error = %e, "Failed to read cache timestamp");
                None
            }
        };

        let size = match self.read_entry(DATA_KEY) {
            Ok(Some(contents)) => contents.len() as u64,
            Ok(None) => 0,
            Err(e) => {
                debug!(error = %e, "Failed to read cache entry for size");
                0
            }
        };

        CacheInfo {
            last_update,
            size,
            is_expired: last_update.map_or(true, |ts| !is_fresh(ts, Utc::now())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use tempfile::TempDir;

    fn sample() -> Vec<Person> {
        vec![
            Person::new(1, "One", Category::Media),
            Person::new(2, "Two", Category::Coder),
        ]
    }

    #[test]
    fn test_cached_data_freshness_window() {
        let fresh = CachedData::new(vec![1]);
        assert!(fresh.is_fresh());
        assert_eq!(fresh.age_display(), "just now");

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(CACHE_FRESH_MINUTES);
        assert!(!old.is_fresh());

        let now = Utc::now();
        assert!(is_fresh(now - Duration::seconds(299), now));
        assert!(!is_fresh(now - Duration::seconds(300), now));
    }

    #[test]
    fn test_save_and_load_people() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_people().unwrap().is_none());

        let saved_at = cache.save_people(&sample()).unwrap();
        let loaded = cache.load_people().unwrap().unwrap();
        assert_eq!(loaded.data, sample());
        assert_eq!(loaded.cached_at.timestamp_millis(), saved_at.timestamp_millis());
        assert!(loaded.is_fresh());

        // Entries use the documented key names
        assert!(dir.path().join(DATA_KEY).exists());
        let stamp = std::fs::read_to_string(dir.path().join(TIME_KEY)).unwrap();
        assert_eq!(stamp, saved_at.timestamp_millis().to_string());
    }

    #[test]
    fn test_missing_stamp_counts_as_stale() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(DATA_KEY),
            serde_json::to_string(&sample()).unwrap(),
        )
        .unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();

        let loaded = cache.load_people().unwrap().unwrap();
        assert!(!loaded.is_fresh());
        assert!(cache.info().is_expired);
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(DATA_KEY), "{not json").unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_people().is_err());
    }

    #[test]
    fn test_info_is_stable_between_calls() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_people(&sample()).unwrap();

        let first = cache.info();
        let second = cache.info();
        assert_eq!(first, second);
        assert!(!first.is_expired);
        assert_eq!(
            first.size,
            serde_json::to_string(&sample()).unwrap().len() as u64
        );
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_people(&sample()).unwrap();

        cache.clear().unwrap();
        let info = cache.info();
        assert!(info.is_expired);
        assert_eq!(info.size, 0);
        assert_eq!(info.last_update, None);
        assert!(!dir.path().join(DATA_KEY).exists());
        assert!(!dir.path().join(TIME_KEY).exists());
        assert_eq!(info.age_display(), "never");
    }

    #[test]
    fn test_invalidate_picks_up_external_writes() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_people(&sample()).unwrap();

        // Another process rewrites the shared directory
        let other = CacheManager::new(dir.path().to_path_buf()).unwrap();
        other
            .save_people(&[Person::new(9, "Nine", Category::Other)])
            .unwrap();

        assert_eq!(cache.load_people().unwrap().unwrap().data.len(), 2);
        cache.invalidate();
        assert_eq!(cache.load_people().unwrap().unwrap().data.len(), 1);
        assert_eq!(cache.disk_stamp().unwrap(), other.disk_stamp().unwrap());
    }
}
