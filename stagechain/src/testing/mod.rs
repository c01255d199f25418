//! Testing utilities for stage chains.
//!
//! This module provides:
//! - Mock stages that record, fail or write chosen keys
//! - A registry helper that fills every roster entry with recording stages

mod mocks;

pub use mocks::{full_registry, CallLog, FailingStage, ProducingStage, RecordingStage};
