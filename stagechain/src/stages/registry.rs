//! Registry mapping roster entries to stage implementations.

use super::{DryRunStage, Stage, StageId};
use std::collections::HashMap;
use std::sync::Arc;

/// Implementations for the stages of the standard chain.
#[derive(Debug, Clone, Default)]
pub struct StageRegistry {
    stages: HashMap<StageId, Arc<dyn Stage>>,
}

impl StageRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with a [`DryRunStage`] for every roster entry.
    #[must_use]
    pub fn dry_run() -> Self {
        StageId::ALL
            .into_iter()
            .fold(Self::new(), |registry, id| registry.with(id, Arc::new(DryRunStage::new(id))))
    }

    /// Registers an implementation, replacing any previous one.
    pub fn register(&mut self, id: StageId, stage: Arc<dyn Stage>) -> &mut Self {
        self.stages.insert(id, stage);
        self
    }

    /// Registers an implementation and returns the registry.
    #[must_use]
    pub fn with(mut self, id: StageId, stage: Arc<dyn Stage>) -> Self {
        self.register(id, stage);
        self
    }

    /// Gets the implementation for a stage.
    #[must_use]
    pub fn get(&self, id: StageId) -> Option<Arc<dyn Stage>> {
        self.stages.get(&id).cloned()
    }

    /// Checks if a stage has an implementation.
    #[must_use]
    pub fn contains(&self, id: StageId) -> bool {
        self.stages.contains_key(&id)
    }

    /// Returns roster entries without an implementation, in roster order.
    #[must_use]
    pub fn missing(&self) -> Vec<StageId> {
        StageId::ALL.into_iter().filter(|id| !self.contains(*id)).collect()
    }

    /// Returns the number of registered stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}
