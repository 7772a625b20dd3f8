//! Ordered data-source strategies for a load.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::models::Person;

use super::{SyncError, ValidationError};

/// Where a dataset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Cache entry younger than the freshness window
    FreshCache,
    /// The remote JSON resource
    Network,
    /// Cache entry of any age
    AnyCache,
    /// Built-in demo catalog
    Demo,
    /// Dataset handed in through `import_data`
    Import,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::FreshCache => "fresh cache",
            Source::Network => "network",
            Source::AnyCache => "stale cache",
            Source::Demo => "demo data",
            Source::Import => "import",
        };
        f.write_str(name)
    }
}

/// Strategies tried in order before falling back to demo data.
///
/// | remote | force | plan                              |
/// |--------|-------|-----------------------------------|
/// | yes    | no    | fresh cache, network, any cache   |
/// | yes    | yes   | network, any cache                |
/// | no     | no    | fresh cache, any cache            |
/// | no     | yes   | any cache                         |
pub fn plan(force: bool, has_remote: bool) -> &'static [Source] {
    match (has_remote, force) {
        (true, false) => &[Source::FreshCache, Source::Network, Source::AnyCache],
        (true, true) => &[Source::Network, Source::AnyCache],
        (false, false) => &[Source::FreshCache, Source::AnyCache],
        (false, true) => &[Source::AnyCache],
    }
}

/// A dataset some strategy produced, not yet made current.
#[derive(Debug)]
pub(crate) struct Resolved {
    pub people: Vec<Person>,
    pub cached_at: DateTime<Utc>,
    pub source: Source,
}

impl Resolved {
    /// Data that did not come out of the cache gets written back to it.
    pub fn needs_persist(&self) -> bool {
        matches!(self.source, Source::Network | Source::Demo | Source::Import)
    }
}

/// Outcome of trying one strategy.
#[derive(Debug)]
pub(crate) enum Attempt {
    Loaded(Resolved),
    Skipped,
    /// The source could not be reached; the next strategy runs
    Failed(SyncError),
    /// The source answered with data that failed validation; held data is kept
    Rejected(ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_with_remote() {
        assert_eq!(
            plan(false, true),
            &[Source::FreshCache, Source::Network, Source::AnyCache]
        );
        assert_eq!(plan(true, true), &[Source::Network, Source::AnyCache]);
    }

    #[test]
    fn test_plan_restricted_never_touches_network() {
        assert!(!plan(false, false).contains(&Source::Network));
        assert!(!plan(true, false).contains(&Source::Network));
        assert_eq!(plan(true, false), &[Source::AnyCache]);
    }

    #[test]
    fn test_only_new_data_is_persisted() {
        let resolved = |source| Resolved {
            people: vec![],
            cached_at: Utc::now(),
            source,
        };
        assert!(resolved(Source::Network).needs_persist());
        assert!(resolved(Source::Demo).needs_persist());
        assert!(!resolved(Source::FreshCache).needs_persist());
        assert!(!resolved(Source::AnyCache).needs_persist());
    }
}
