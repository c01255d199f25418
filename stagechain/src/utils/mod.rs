//! Utility helpers shared across the engine.

pub mod timestamps;

pub use timestamps::{human_timestamp, now_utc, Timestamp};
