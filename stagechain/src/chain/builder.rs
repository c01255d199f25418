//! Chain builder with validation.

use super::{Chain, StageNode, StageRef};
use crate::context::keys;
use crate::errors::{codes, AlreadyConnectedError, ChainError, ChainValidationError, ContractErrorInfo};
use crate::options::RunOptions;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Assembles stages into a single linked path.
///
/// Stages are added first, then linked with [`connect`](Self::connect) or a
/// fluent [`Link`]. Every stage has at most one successor and at most one
/// predecessor, and both are write-once.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    name: String,
    nodes: Vec<StageNode>,
    index: HashMap<String, StageRef>,
    entry: Option<StageRef>,
    options: Arc<RunOptions>,
}

impl ChainBuilder {
    /// Creates a new chain builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            index: HashMap::new(),
            entry: None,
            options: Arc::new(RunOptions::default()),
        }
    }

    /// Sets the run options shared by every stage.
    #[must_use]
    pub fn with_options(mut self, options: Arc<RunOptions>) -> Self {
        self.options = options;
        self
    }

    /// Adds a stage.
    ///
    /// # Errors
    ///
    /// Returns an error if a stage with the same name was already added.
    pub fn add_stage(&mut self, node: StageNode) -> Result<StageRef, ChainValidationError> {
        if self.index.contains_key(node.name()) {
            return Err(ChainValidationError::new(format!("Stage '{}' added twice", node.name()))
                .with_stages(vec![node.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(codes::DUPLICATE_STAGE, "Stage names must be unique")
                        .with_fix_hint("Rename one of the stages."),
                ));
        }

        let stage = StageRef(self.nodes.len());
        self.index.insert(node.name().to_string(), stage);
        self.nodes.push(node);
        Ok(stage)
    }

    /// Looks a stage up by name.
    #[must_use]
    pub fn stage(&self, name: &str) -> Option<StageRef> {
        self.index.get(name).copied()
    }

    /// Returns the node behind a handle, or `None` if the handle was not
    /// issued by this builder.
    #[must_use]
    pub fn node(&self, stage: StageRef) -> Option<&StageNode> {
        self.nodes.get(stage.0)
    }

    /// Indexes a handle already checked by [`check`](Self::check).
    fn at(&self, stage: StageRef) -> &StageNode {
        &self.nodes[stage.0]
    }

    fn check(&self, stage: StageRef) -> Result<(), ChainValidationError> {
        if stage.0 < self.nodes.len() {
            return Ok(());
        }
        Err(ChainValidationError::new(format!(
            "Stage handle #{} does not belong to chain '{}'",
            stage.0, self.name
        ))
        .with_error_info(
            ContractErrorInfo::new(codes::UNKNOWN_STAGE, "Unknown stage handle")
                .with_context_entry("index", stage.0.to_string())
                .with_fix_hint("Use handles returned by this builder's add_stage."),
        ))
    }

    /// Sets the entry stage. Defaults to the first stage added.
    pub fn set_entry(&mut self, stage: StageRef) -> &mut Self {
        self.entry = Some(stage);
        self
    }

    /// Makes `to` the successor of `from` and returns `to`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::AlreadyConnected`] if `from` already has a
    /// successor or `to` already has a predecessor, and a validation error if
    /// either handle was issued by another builder or `from` and `to` are the
    /// same stage.
    pub fn connect(&mut self, from: StageRef, to: StageRef) -> Result<StageRef, ChainError> {
        self.check(from)?;
        self.check(to)?;

        if from == to {
            let name = self.at(from).name().to_string();
            return Err(ChainValidationError::new(format!("Stage '{name}' cannot be its own successor"))
                .with_stages(vec![name])
                .with_error_info(ContractErrorInfo::new(codes::CYCLE, "Self-loop"))
                .into());
        }

        if let Some(existing) = self.at(from).successor {
            return Err(AlreadyConnectedError::new(
                self.at(from).name(),
                self.at(to).name(),
                format!("{} -> {}", self.at(from).name(), self.at(existing).name()),
            )
            .into());
        }

        if let Some(existing) = self.at(to).predecessor {
            return Err(AlreadyConnectedError::new(
                self.at(from).name(),
                self.at(to).name(),
                format!("{} -> {}", self.at(existing).name(), self.at(to).name()),
            )
            .into());
        }

        self.nodes[from.0].successor = Some(to);
        self.nodes[to.0].predecessor = Some(from);
        Ok(to)
    }

    /// Starts a fluent link at `from`.
    pub fn link(&mut self, from: StageRef) -> Link<'_> {
        Link {
            builder: self,
            current: from,
        }
    }

    /// Returns the chain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of stages added.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.nodes.len()
    }

    /// Validates the links and the key contracts, then builds the chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain is empty, the entry has a predecessor,
    /// the links loop, a stage requires a key no earlier stage produces, or
    /// the run options name a stage that is not reachable.
    pub fn build(self) -> Result<Chain, ChainError> {
        if self.nodes.is_empty() {
            return Err(ChainValidationError::new("Chain has no stages")
                .with_error_info(
                    ContractErrorInfo::new(codes::EMPTY, "Cannot build an empty chain")
                        .with_fix_hint("Add at least one stage before building."),
                )
                .into());
        }

        let entry = self.entry.unwrap_or(StageRef(0));
        self.check(entry)?;
        if let Some(predecessor) = self.at(entry).predecessor {
            return Err(ChainValidationError::new(format!(
                "Entry stage '{}' follows '{}'",
                self.at(entry).name(),
                self.at(predecessor).name()
            ))
            .with_stages(vec![self.at(entry).name().to_string()])
            .with_error_info(ContractErrorInfo::new(
                codes::ENTRY_NOT_HEAD,
                "The entry stage must be the head of the chain",
            ))
            .into());
        }

        let order = self.walk(entry)?;
        self.validate_contracts(&order)?;

        Chain::new(self.name, self.nodes, entry, order, self.options).map_err(ChainError::from)
    }

    fn walk(&self, entry: StageRef) -> Result<Vec<StageRef>, ChainValidationError> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut current = Some(entry);

        while let Some(stage) = current {
            if !visited.insert(stage) {
                let mut path: Vec<String> = order.iter().map(|s: &StageRef| self.at(*s).name().to_string()).collect();
                path.push(self.at(stage).name().to_string());
                return Err(ChainValidationError::new(format!("Cycle detected in chain: {}", path.join(" -> ")))
                    .with_stages(path)
                    .with_error_info(ContractErrorInfo::new(codes::CYCLE, "Successor links loop")));
            }
            order.push(stage);
            current = self.at(stage).successor;
        }

        Ok(order)
    }

    fn validate_contracts(&self, order: &[StageRef]) -> Result<(), ChainValidationError> {
        let mut available: HashSet<&str> = keys::SEEDED.into_iter().collect();

        for stage in order {
            let node = self.at(*stage);
            if let Some(key) = node.requires().iter().find(|key| !available.contains(key.as_str())) {
                return Err(ChainValidationError::new(format!(
                    "Stage '{}' requires '{}' but no earlier stage produces it",
                    node.name(),
                    key
                ))
                .with_stages(vec![node.name().to_string()])
                .with_error_info(
                    ContractErrorInfo::new(codes::UNSATISFIED_KEY, format!("Unsatisfied key '{key}'"))
                        .with_context_entry("key", key.as_str())
                        .with_fix_hint("Link a stage that produces the key before this one."),
                ));
            }
            available.extend(node.produces().iter().map(String::as_str));
        }

        Ok(())
    }
}

/// Fluent linking cursor returned by [`ChainBuilder::link`].
#[derive(Debug)]
pub struct Link<'a> {
    builder: &'a mut ChainBuilder,
    current: StageRef,
}

impl<'a> Link<'a> {
    /// Connects the current stage to `next` and moves the cursor to `next`.
    ///
    /// # Errors
    ///
    /// See [`ChainBuilder::connect`].
    pub fn connect(self, next: StageRef) -> Result<Link<'a>, ChainError> {
        let current = self.builder.connect(self.current, next)?;
        Ok(Link {
            builder: self.builder,
            current,
        })
    }

    /// Returns the stage under the cursor.
    #[must_use]
    pub fn stage(&self) -> StageRef {
        self.current
    }
}
