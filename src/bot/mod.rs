//! Chat-facing layer on top of the schedule engine.

pub mod commands;
pub mod dispatcher;
pub mod render;
