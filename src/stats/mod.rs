//! Persisted statistics.

pub mod store;
