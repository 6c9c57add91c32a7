//! Schedule interpretation engine.

pub mod engine;
pub mod error;
pub mod resolver;
pub mod stats;
pub mod store;
pub mod types;
