//! Data models for the famelist catalog.
//!
//! - `Person`: one catalog entry with contact and pricing metadata
//! - `Category`, `CategoryFilter`: closed category set plus search restriction
//! - `Stats`: per-category summary of a dataset

pub mod person;
pub mod stats;

use std::sync::Arc;

pub use person::{Category, CategoryFilter, Person};
pub use stats::Stats;

/// The full ordered catalog. Shared immutably and replaced wholesale.
pub type Dataset = Arc<Vec<Person>>;
