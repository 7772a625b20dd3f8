//! Utility functions for string formatting and matching.

pub mod format;

pub use format::{contains_ignore_case, format_age, format_timestamp, truncate_string};
