//! Mock stages for testing.

use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::stages::{Stage, StageId, StageRegistry, StageRun};

/// Shared, ordered record of stage invocations.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates a new empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a call.
    pub fn push(&self, stage: impl Into<String>) {
        self.calls.lock().push(stage.into());
    }

    /// Returns the recorded calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Returns the number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }
}

/// A stage that records each call and writes its roster outputs.
#[derive(Debug, Clone)]
pub struct RecordingStage {
    id: StageId,
    log: CallLog,
    seen_keys: Arc<Mutex<Vec<Vec<String>>>>,
    reruns: Arc<Mutex<Vec<bool>>>,
}

impl RecordingStage {
    /// Creates a recording stage for `id` writing into `log`.
    #[must_use]
    pub fn new(id: StageId, log: CallLog) -> Self {
        Self {
            id,
            log,
            seen_keys: Arc::new(Mutex::new(Vec::new())),
            reruns: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the context keys visible at the start of each call.
    #[must_use]
    pub fn seen_keys(&self) -> Vec<Vec<String>> {
        self.seen_keys.lock().clone()
    }

    /// Returns the rerun flag passed to each call.
    #[must_use]
    pub fn reruns(&self) -> Vec<bool> {
        self.reruns.lock().clone()
    }
}

impl Stage for RecordingStage {
    fn process(&self, ctx: &mut ExecutionContext, run: &StageRun<'_>) -> anyhow::Result<()> {
        self.log.push(run.name());
        self.seen_keys.lock().push(ctx.keys());
        self.reruns.lock().push(run.rerun());

        run.progress().update(50.0);
        for key in self.id.produces() {
            ctx.set_value(*key, json!({ "stage": run.name() }));
        }
        Ok(())
    }
}

/// A stage that records its call and then fails.
#[derive(Debug, Clone)]
pub struct FailingStage {
    log: CallLog,
    message: String,
}

impl FailingStage {
    /// Creates a failing stage with the given message.
    #[must_use]
    pub fn new(log: CallLog, message: impl Into<String>) -> Self {
        Self {
            log,
            message: message.into(),
        }
    }
}

impl Stage for FailingStage {
    fn process(&self, _ctx: &mut ExecutionContext, run: &StageRun<'_>) -> anyhow::Result<()> {
        self.log.push(run.name());
        anyhow::bail!("{}", self.message)
    }
}

/// A stage that writes a fixed set of key-value pairs.
#[derive(Debug, Clone, Default)]
pub struct ProducingStage {
    values: Vec<(String, serde_json::Value)>,
}

impl ProducingStage {
    /// Creates a stage that writes nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key-value pair to write.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.push((key.into(), value));
        self
    }
}

impl Stage for ProducingStage {
    fn process(&self, ctx: &mut ExecutionContext, _run: &StageRun<'_>) -> anyhow::Result<()> {
        for (key, value) in &self.values {
            ctx.set_value(key.clone(), value.clone());
        }
        Ok(())
    }
}

/// Returns a registry with a [`RecordingStage`] for every roster entry, all
/// writing into `log`.
#[must_use]
pub fn full_registry(log: &CallLog) -> StageRegistry {
    StageId::ALL.into_iter().fold(StageRegistry::new(), |registry, id| {
        registry.with(id, Arc::new(RecordingStage::new(id, log.clone())))
    })
}
