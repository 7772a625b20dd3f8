//! Observer registry for sync notifications.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tracing::{debug, error};

use crate::models::Dataset;

use super::SyncError;

/// A notable transition of the sync engine.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Fresh cache, network or demo data became current (`dataLoaded`)
    Loaded(Dataset),
    /// Stale cache became current after the network was unavailable (`dataLoadedFromCache`)
    LoadedFromCache(Dataset),
    /// The network fetch failed; a fallback follows (`dataError`)
    LoadFailed(Arc<SyncError>),
    /// An explicit resync completed and validated (`dataSynced`)
    Synced(Dataset),
    /// An explicit resync failed (`syncError`)
    SyncFailed(Arc<SyncError>),
}

impl SyncEvent {
    /// Event name as seen by the web front end.
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::Loaded(_) => "dataLoaded",
            SyncEvent::LoadedFromCache(_) => "dataLoadedFromCache",
            SyncEvent::LoadFailed(_) => "dataError",
            SyncEvent::Synced(_) => "dataSynced",
            SyncEvent::SyncFailed(_) => "syncError",
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            SyncEvent::Loaded(d) | SyncEvent::LoadedFromCache(d) | SyncEvent::Synced(d) => Some(d),
            SyncEvent::LoadFailed(_) | SyncEvent::SyncFailed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SyncError> {
        match self {
            SyncEvent::LoadFailed(e) | SyncEvent::SyncFailed(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

type Callback = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Registered callbacks, notified in registration order.
#[derive(Default)]
pub struct Listeners {
    next_id: AtomicU64,
    entries: Mutex<Vec<(u64, Callback)>>,
}

impl Listeners {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every listener. A panicking listener is logged and
    /// skipped; the rest still receive the event.
    pub fn notify(&self, event: &SyncEvent) {
        // Snapshot so callbacks may (un)subscribe without deadlocking
        let snapshot: Vec<Callback> = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        debug!(event = event.name(), listeners = snapshot.len(), "Notifying listeners");

        for callback in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                error!(
                    event = event.name(),
                    panic = %panic_message(panic.as_ref()),
                    "Listener panicked"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle returned by `add_listener`.
///
/// Dropping it keeps the listener registered; call `unsubscribe` to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Listeners>,
}

impl Subscription {
    /// Remove the listener. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.remove(self.id),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Person};
    use std::sync::Mutex;

    fn loaded() -> SyncEvent {
        SyncEvent::Loaded(Arc::new(vec![Person::new(1, "A", Category::Media)]))
    }

    #[test]
    fn test_event_names() {
        assert_eq!(loaded().name(), "dataLoaded");
        assert_eq!(SyncEvent::Synced(Arc::new(vec![])).name(), "dataSynced");
        assert!(loaded().dataset().is_some());
        assert!(loaded().error().is_none());
    }

    #[test]
    fn test_notify_in_registration_order() {
        let listeners = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let seen = Arc::clone(&seen);
            let _ = listeners.add(move |event| {
                seen.lock().unwrap().push(format!("{}:{}", tag, event.name()));
            });
        }

        listeners.notify(&loaded());
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:dataLoaded", "second:dataLoaded", "third:dataLoaded"]
        );
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let listeners = Listeners::new();
        let count = Arc::new(AtomicU64::new(0));

        let _ = listeners.add(|_| panic!("listener blew up"));
        let counter = Arc::clone(&count);
        let _ = listeners.add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        listeners.notify(&loaded());
        listeners.notify(&loaded());
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let listeners = Listeners::new();
        let count = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&count);
        let sub = listeners.add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(listeners.len(), 1);

        listeners.notify(&loaded());
        assert!(sub.unsubscribe());
        listeners.notify(&loaded());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let listeners = Listeners::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicU64::new(0));

        let slot_in = Arc::clone(&slot);
        let counter = Arc::clone(&count);
        let sub = listeners.add(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = slot_in.lock().unwrap().take() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        listeners.notify(&loaded());
        listeners.notify(&loaded());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
