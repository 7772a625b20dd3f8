use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Person;

/// Summary of the dataset currently held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Stats {
    pub total: usize,
    /// Category tag to number of records.
    pub categories: BTreeMap<String, usize>,
    #[serde(rename = "lastUpdate")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Stats {
    pub fn from_people(people: &[Person], last_update: Option<DateTime<Utc>>) -> Self {
        let mut categories = BTreeMap::new();
        for person in people {
            *categories
                .entry(person.category.as_str().to_string())
                .or_insert(0) += 1;
        }
        Self {
            total: people.len(),
            categories,
            last_update,
        }
    }

    pub fn count(&self, tag: &str) -> usize {
        self.categories.get(tag).copied().unwrap_or(0)
    }
}
