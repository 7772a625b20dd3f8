//! The sync engine: owns the held catalog and keeps it in step with the
//! remote resource and the shared cache.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::RemoteSource;
use crate::cache::{CacheInfo, CacheManager};
use crate::models::{CategoryFilter, Dataset, Person, Stats};

use super::demo::demo_people;
use super::export::{export, ExportFormat};
use super::listeners::{Listeners, Subscription, SyncEvent};
use super::strategy::{plan, Attempt, Resolved, Source};
use super::validate::{parse_dataset, validate_people};
use super::{ExportError, SyncError, ValidationError};

/// Default period of the background resync.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default poll period of the shared cache watcher.
pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(2);

/// Timing knobs for the background tasks started by `init`.
/// A zero duration disables the corresponding task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub sync_interval: Duration,
    pub watch_interval: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            watch_interval: DEFAULT_WATCH_INTERVAL,
        }
    }
}

#[derive(Default)]
struct State {
    data: Option<Dataset>,
    last_update: Option<DateTime<Utc>>,
}

struct Inner {
    cache: CacheManager,
    remote: Option<Arc<dyn RemoteSource>>,
    options: SyncOptions,
    state: RwLock<State>,
    listeners: Arc<Listeners>,
    online: AtomicBool,
    auto_sync: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    /// Last timestamp entry this instance wrote, so the watcher can skip it.
    own_stamp: Mutex<Option<String>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for slot in [&mut self.auto_sync, &mut self.watcher] {
            if let Some(handle) = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
                handle.abort();
            }
        }
    }
}

/// Outcome of one pass through the strategy plan.
struct Resolution {
    dataset: Dataset,
    /// First failure hit along the way, if any.
    failure: Option<Arc<SyncError>>,
}

/// Data synchronization service.
///
/// Cheap to clone; all clones share one held dataset, listener registry and
/// set of background tasks. Background tasks only hold weak references, so
/// dropping the last clone stops them.
#[derive(Clone)]
pub struct DataSync {
    inner: Arc<Inner>,
}

impl DataSync {
    /// Build the service. `remote` is `None` in a restricted context with
    /// no network access; only the cache and demo data are used then.
    pub fn new(
        cache: CacheManager,
        remote: Option<Arc<dyn RemoteSource>>,
        options: SyncOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                cache,
                remote,
                options,
                state: RwLock::new(State::default()),
                listeners: Listeners::new(),
                online: AtomicBool::new(true),
                auto_sync: Mutex::new(None),
                watcher: Mutex::new(None),
                own_stamp: Mutex::new(None),
            }),
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.inner.remote.is_none()
    }

    // ===== Lifecycle =====

    /// Initial load, then start the cache watcher and the periodic resync.
    /// Must be called from within a tokio runtime.
    pub async fn init(&self) {
        match self.inner.remote {
            Some(ref remote) => info!(url = remote.location(), "Initializing data sync"),
            None => info!("Initializing data sync in restricted mode (cache and demo data only)"),
        }
        self.load_data(false).await;
        self.start_cache_watcher();
        self.start_auto_sync(self.inner.options.sync_interval);
    }

    /// Stop the background tasks. Safe to call more than once.
    pub fn shutdown(&self) {
        self.stop_auto_sync();
        if let Some(handle) = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            debug!("Cache watcher stopped");
        }
    }

    // ===== Loading =====

    /// Resolve a dataset through the fallback chain. Never fails: the demo
    /// catalog is the last resort.
    pub async fn load_data(&self, force: bool) -> Dataset {
        self.resolve(force, false).await.dataset
    }

    async fn resolve(&self, force: bool, validate: bool) -> Resolution {
        let mut failure = None;

        for &source in plan(force, self.inner.remote.is_some()) {
            match self.attempt(source, validate).await {
                Attempt::Loaded(resolved) => {
                    return Resolution {
                        dataset: self.apply(resolved),
                        failure,
                    };
                }
                Attempt::Skipped => {}
                Attempt::Failed(err) => {
                    if err.is_transient() {
                        warn!(source = %source, error = %err, "Failed to load data");
                    } else {
                        error!(source = %source, error = %err, "Failed to load data");
                    }
                    let err = Arc::new(err);
                    self.notify(&SyncEvent::LoadFailed(Arc::clone(&err)));
                    failure.get_or_insert(err);
                }
                Attempt::Rejected(err) => {
                    warn!(source = %source, error = %err, "Rejected invalid data");
                    let err = Arc::new(SyncError::from(err));
                    // Held data and cache stay as they are
                    if let Some(dataset) = self.current() {
                        return Resolution {
                            dataset,
                            failure: Some(err),
                        };
                    }
                    failure.get_or_insert(err);
                }
            }
        }

        warn!("No data from network or cache, using demo data");
        let dataset = self.apply(Resolved {
            people: demo_people(),
            cached_at: Utc::now(),
            source: Source::Demo,
        });
        Resolution { dataset, failure }
    }

    async fn attempt(&self, source: Source, validate: bool) -> Attempt {
        match source {
            Source::FreshCache | Source::AnyCache => {
                let cached = match self.inner.cache.load_people() {
                    Ok(Some(cached)) => cached,
                    Ok(None) => {
                        debug!(source = %source, "No cached data");
                        return Attempt::Skipped;
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring unreadable cache entry");
                        return Attempt::Skipped;
                    }
                };
                if source == Source::FreshCache && !cached.is_fresh() {
                    debug!(age = %cached.age_display(), "Cached data is stale");
                    return Attempt::Skipped;
                }
                Attempt::Loaded(Resolved {
                    people: cached.data,
                    cached_at: cached.cached_at,
                    source,
                })
            }
            Source::Network => {
                let Some(ref remote) = self.inner.remote else {
                    return Attempt::Skipped;
                };
                let people = match remote.fetch_people().await {
                    Ok(people) => people,
                    Err(e) => return Attempt::Failed(e.into()),
                };
                if validate {
                    if let Err(e) = validate_people(&people) {
                        return Attempt::Rejected(e);
                    }
                }
                Attempt::Loaded(Resolved {
                    people,
                    cached_at: Utc::now(),
                    source,
                })
            }
            Source::Demo | Source::Import => Attempt::Skipped,
        }
    }

    /// Make a resolved dataset current, persist it if new, and notify.
    fn apply(&self, resolved: Resolved) -> Dataset {
        let persist = resolved.needs_persist();
        let Resolved {
            people,
            cached_at,
            source,
        } = resolved;
        let dataset: Dataset = Arc::new(people);

        if persist {
            *self
                .inner
                .own_stamp
                .lock()
                .unwrap_or_else(PoisonError::into_inner) =
                Some(cached_at.timestamp_millis().to_string());
            if let Err(e) = self.inner.cache.save_people_at(&dataset, cached_at) {
                warn!(error = %e, "Failed to cache data");
            }
        }

        {
            let mut state = self
                .inner
                .state
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            state.data = Some(Arc::clone(&dataset));
            state.last_update = Some(cached_at);
        }

        info!(source = %source, count = dataset.len(), "Data loaded");
        let event = match source {
            Source::AnyCache => SyncEvent::LoadedFromCache(Arc::clone(&dataset)),
            _ => SyncEvent::Loaded(Arc::clone(&dataset)),
        };
        self.notify(&event);
        dataset
    }

    // ===== Sync =====

    /// Forced reload that reports `dataSynced` or `syncError`.
    ///
    /// Does nothing while offline. A network payload that fails validation
    /// is rejected: only `syncError` is reported and the held dataset and
    /// cache are left untouched. With nothing held yet the fallback chain
    /// continues so a dataset is still produced.
    pub async fn sync_data(&self) {
        if !self.is_online() {
            debug!("Offline, skipping sync");
            return;
        }

        let resolution = self.resolve(true, true).await;
        match resolution.failure {
            None => {
                info!(count = resolution.dataset.len(), "Data synced");
                self.notify(&SyncEvent::Synced(resolution.dataset));
            }
            Some(err) => {
                error!(error = %err, "Sync failed");
                self.notify(&SyncEvent::SyncFailed(err));
            }
        }
    }

    /// Validate a raw JSON dataset.
    pub fn validate(&self, value: &serde_json::Value) -> Result<(), ValidationError> {
        super::validate::validate_data(value)
    }

    // ===== Queries =====

    /// The held dataset, if any.
    pub fn current(&self) -> Option<Dataset> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .data
            .clone()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_update
    }

    /// The held dataset, loading (not forced) when nothing is held yet.
    pub async fn get_data(&self) -> Dataset {
        match self.current() {
            Some(data) => data,
            None => self.load_data(false).await,
        }
    }

    /// Records in `filter` whose name or info contains `query`, ignoring
    /// case. An empty query matches everything. Order is preserved.
    pub fn search_data(&self, query: &str, filter: &CategoryFilter) -> Vec<Person> {
        let Some(data) = self.current() else {
            return Vec::new();
        };
        let query = query.to_lowercase();
        data.iter()
            .filter(|p| filter.matches(&p.category))
            .filter(|p| query.is_empty() || p.matches_query(&query))
            .cloned()
            .collect()
    }

    pub fn get_stats(&self) -> Option<Stats> {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        state
            .data
            .as_ref()
            .map(|data| Stats::from_people(data, state.last_update))
    }

    // ===== Listeners =====

    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.listeners.add(callback)
    }

    fn notify(&self, event: &SyncEvent) {
        self.inner.listeners.notify(event);
    }

    // ===== Online State =====

    /// Record connectivity. Coming back online triggers a sync.
    pub async fn set_online(&self, online: bool) {
        let was_online = self.inner.online.swap(online, Ordering::SeqCst);
        if online && !was_online {
            info!("Back online, syncing");
            self.sync_data().await;
        } else if !online && was_online {
            info!("Offline mode");
        }
    }

    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::SeqCst)
    }

    // ===== Background Tasks =====

    /// Run `sync_data` every `period`, first one period from now. Replaces
    /// any running timer. A zero period only stops the current one.
    pub fn start_auto_sync(&self, period: Duration) {
        if period.is_zero() {
            self.stop_auto_sync();
            return;
        }

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(sync) = Self::upgrade(&weak) else {
                    break;
                };
                debug!("Periodic sync");
                sync.sync_data().await;
            }
        });

        let previous = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(period_secs = period.as_secs(), "Auto sync started");
    }

    pub fn stop_auto_sync(&self) {
        if let Some(handle) = self
            .inner
            .auto_sync
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
            debug!("Auto sync stopped");
        }
    }

    /// Another process changed the shared cache: drop memoized entries and
    /// reload.
    pub async fn on_storage_changed(&self) {
        info!("Cache changed by another process, reloading");
        self.inner.cache.invalidate();
        self.load_data(true).await;
    }

    fn start_cache_watcher(&self) {
        let period = self.inner.options.watch_interval;
        if period.is_zero() {
            return;
        }

        let mut last_seen = self.disk_stamp();
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(sync) = Self::upgrade(&weak) else {
                    break;
                };
                let current = sync.disk_stamp();
                if current == last_seen {
                    continue;
                }
                last_seen = current;
                if sync.is_own_stamp(last_seen.as_deref()) {
                    continue;
                }
                sync.on_storage_changed().await;
            }
        });

        let previous = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    fn disk_stamp(&self) -> Option<String> {
        match self.inner.cache.disk_stamp() {
            Ok(stamp) => stamp,
            Err(e) => {
                debug!(error = %e, "Failed to read cache timestamp");
                None
            }
        }
    }

    fn is_own_stamp(&self, stamp: Option<&str>) -> bool {
        self.inner
            .own_stamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_deref()
            == stamp
    }

    // ===== Import / Export =====

    /// Serialize the held dataset. `Ok(None)` when nothing is held.
    pub fn export_data(&self, format: &str) -> Result<Option<String>, ExportError> {
        let format: ExportFormat = format.parse()?;
        let Some(data) = self.current() else {
            return Ok(None);
        };
        export(&data, format).map(Some)
    }

    /// Replace the held dataset with a validated raw JSON catalog.
    pub fn import_data(&self, json: &str) -> Result<Dataset, ValidationError> {
        let people = parse_dataset(json)?;
        Ok(self.apply(Resolved {
            people,
            cached_at: Utc::now(),
            source: Source::Import,
        }))
    }

    // ===== Cache Management =====

    /// Remove the cached dataset and timestamp. The held dataset stays.
    pub fn clear_cache(&self) -> anyhow::Result<()> {
        *self
            .inner
            .own_stamp
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.cache.clear()?;
        info!("Cache cleared");
        Ok(())
    }

    pub fn get_cache_info(&self) -> CacheInfo {
        self.inner.cache.info()
    }
}

// ============================================================================
// Tests
// ============================================================================
