//! Stage nodes held by a chain.

use crate::options::RunOptions;
use crate::stages::{Stage, StageId, StageParams};
use std::sync::Arc;

/// Handle to a stage inside a [`ChainBuilder`](super::ChainBuilder) or
/// [`Chain`](super::Chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageRef(pub(crate) usize);

impl StageRef {
    /// Returns the position of the stage in instantiation order.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A named stage with its weight, parameters, key contract and links.
#[derive(Debug, Clone)]
pub struct StageNode {
    name: String,
    progress: f64,
    runner: Arc<dyn Stage>,
    params: StageParams,
    requires: Vec<String>,
    produces: Vec<String>,
    pub(crate) successor: Option<StageRef>,
    pub(crate) predecessor: Option<StageRef>,
}

impl StageNode {
    /// Creates a node with no parameters and an empty key contract.
    #[must_use]
    pub fn new(name: impl Into<String>, progress: f64, runner: Arc<dyn Stage>) -> Self {
        Self {
            name: name.into(),
            progress,
            runner,
            params: StageParams::new(),
            requires: Vec::new(),
            produces: Vec::new(),
            successor: None,
            predecessor: None,
        }
    }

    /// Creates the node for a roster entry, with its standard weight,
    /// parameters and key contract.
    #[must_use]
    pub fn from_roster(id: StageId, runner: Arc<dyn Stage>, options: &RunOptions) -> Self {
        Self::new(id.name(), id.progress(), runner)
            .with_params(StageParams::for_stage(id, options))
            .with_requires(id.requires().iter().copied())
            .with_produces(id.produces().iter().copied())
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_params(mut self, params: StageParams) -> Self {
        self.params = params;
        self
    }

    /// Sets the keys the stage reads.
    #[must_use]
    pub fn with_requires(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.requires = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the keys the stage writes.
    #[must_use]
    pub fn with_produces(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.produces = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cumulative percent complete once this stage finishes.
    #[must_use]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Returns the stage implementation.
    #[must_use]
    pub fn runner(&self) -> &Arc<dyn Stage> {
        &self.runner
    }

    /// Returns the stage parameters.
    #[must_use]
    pub fn params(&self) -> &StageParams {
        &self.params
    }

    /// Keys the stage reads.
    #[must_use]
    pub fn requires(&self) -> &[String] {
        &self.requires
    }

    /// Keys the stage writes.
    #[must_use]
    pub fn produces(&self) -> &[String] {
        &self.produces
    }

    /// Returns the successor, if linked.
    #[must_use]
    pub fn successor(&self) -> Option<StageRef> {
        self.successor
    }

    /// Returns the predecessor, if linked.
    #[must_use]
    pub fn predecessor(&self) -> Option<StageRef> {
        self.predecessor
    }
}
