//! Linked stage chain and its sequential execution.

use super::{StageNode, StageRef};
use crate::benchmark::BenchmarkLog;
use crate::context::{keys, ExecutionContext, ProjectTree};
use crate::errors::{ChainError, ChainValidationError};
use crate::options::RunOptions;
use crate::progress::{ProgressSink, StageProgress};
use crate::stages::StageRun;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span};

/// A built chain: every stage that was instantiated, and the single path
/// through them that a run follows.
#[derive(Debug, Clone)]
pub struct Chain {
    name: String,
    nodes: Vec<StageNode>,
    entry: StageRef,
    order: Vec<StageRef>,
    stop_after: Option<StageRef>,
    rerun: HashSet<StageRef>,
    options: Arc<RunOptions>,
}

impl Chain {
    /// Creates a chain from validated links and resolves the run policy
    /// (`end_with`, `rerun`, `rerun_all`, `rerun_from`) against the path.
    pub(crate) fn new(
        name: String,
        nodes: Vec<StageNode>,
        entry: StageRef,
        order: Vec<StageRef>,
        options: Arc<RunOptions>,
    ) -> Result<Self, ChainValidationError> {
        let position = |option: &str, stage: &str| {
            order
                .iter()
                .position(|s| nodes[s.0].name() == stage)
                .ok_or_else(|| ChainValidationError::unknown_stage(option, stage))
        };

        let end_with = options.end_with.as_deref().map(|s| position("end_with", s)).transpose()?;
        let rerun_only = options.rerun.as_deref().map(|s| position("rerun", s)).transpose()?;
        let rerun_from = options.rerun_from.as_deref().map(|s| position("rerun_from", s)).transpose()?;

        let stop_after = match (end_with, rerun_only) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
        .map(|i| order[i]);

        let rerun: HashSet<StageRef> = if options.rerun_all {
            order.iter().copied().collect()
        } else if let Some(from) = rerun_from {
            order[from..].iter().copied().collect()
        } else {
            rerun_only.map(|i| order[i]).into_iter().collect()
        };

        Ok(Self {
            name,
            nodes,
            entry,
            order,
            stop_after,
            rerun,
            options,
        })
    }

    /// Returns the chain name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the run options.
    #[must_use]
    pub fn options(&self) -> &Arc<RunOptions> {
        &self.options
    }

    /// Returns the number of instantiated stages, reachable or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the entry stage.
    #[must_use]
    pub fn entry(&self) -> &StageNode {
        &self.nodes[self.entry.0]
    }

    /// Follows successor links from the entry to the terminal stage.
    #[must_use]
    pub fn last_stage(&self) -> &StageNode {
        let mut node = self.entry();
        while let Some(next) = node.successor() {
            node = &self.nodes[next.0];
        }
        node
    }

    /// Names of the reachable stages, in execution order.
    #[must_use]
    pub fn sequence(&self) -> Vec<&str> {
        self.order.iter().map(|s| self.nodes[s.0].name()).collect()
    }

    /// Names of the stages a run will execute, honoring `end_with` and `rerun`.
    #[must_use]
    pub fn planned(&self) -> Vec<&str> {
        let end = self
            .stop_after
            .and_then(|stop| self.order.iter().position(|s| *s == stop))
            .map_or(self.order.len(), |i| i + 1);
        self.order[..end].iter().map(|s| self.nodes[s.0].name()).collect()
    }

    /// Names of instantiated stages that are not reachable from the entry.
    #[must_use]
    pub fn skipped(&self) -> Vec<&str> {
        let reachable: HashSet<StageRef> = self.order.iter().copied().collect();
        (0..self.nodes.len())
            .map(StageRef)
            .filter(|s| !reachable.contains(s))
            .map(|s| self.nodes[s.0].name())
            .collect()
    }

    /// Looks a stage up by name.
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&StageNode> {
        self.nodes.iter().find(|n| n.name() == name)
    }

    /// Returns true if `name` is reachable from the entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.order.iter().any(|s| self.nodes[s.0].name() == name)
    }

    /// Returns the name of the successor of `name`.
    #[must_use]
    pub fn successor_of(&self, name: &str) -> Option<&str> {
        self.node(name)
            .and_then(StageNode::successor)
            .map(|s| self.nodes[s.0].name())
    }

    /// Returns the name of the predecessor of `name`.
    #[must_use]
    pub fn predecessor_of(&self, name: &str) -> Option<&str> {
        self.node(name)
            .and_then(StageNode::predecessor)
            .map(|s| self.nodes[s.0].name())
    }

    /// Returns true if `name` is marked for rerun.
    #[must_use]
    pub fn is_rerun(&self, name: &str) -> bool {
        self.rerun.iter().any(|s| self.nodes[s.0].name() == name)
    }

    /// Returns the stage after which the run stops early, if any.
    #[must_use]
    pub fn stops_after(&self) -> Option<&str> {
        self.stop_after.map(|s| self.nodes[s.0].name())
    }

    /// Runs the entry stage, which runs its successor, and so on until the
    /// terminal stage or the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError::ContextNotSeeded`] if `start_time` or `tree` is
    /// missing, a serialization error if `tree` cannot be decoded, and
    /// otherwise the first stage failure, unchanged.
    pub fn run(&self, ctx: &mut ExecutionContext, sink: &dyn ProgressSink) -> Result<(), ChainError> {
        if !ctx.contains_key(keys::START_TIME) {
            return Err(ChainError::ContextNotSeeded {
                key: keys::START_TIME.to_string(),
            });
        }
        let tree: ProjectTree = ctx.get_as(keys::TREE)?.ok_or_else(|| ChainError::ContextNotSeeded {
            key: keys::TREE.to_string(),
        })?;

        let benchmark = self.options.benchmarking.then(|| BenchmarkLog::new(tree.benchmarking));
        self.run_stage(self.entry, ctx, sink, benchmark.as_ref())
    }

    fn run_stage(
        &self,
        stage: StageRef,
        ctx: &mut ExecutionContext,
        sink: &dyn ProgressSink,
        benchmark: Option<&BenchmarkLog>,
    ) -> Result<(), ChainError> {
        self.execute_stage(stage, ctx, sink, benchmark)?;

        let node = &self.nodes[stage.0];
        if self.stop_after == Some(stage) {
            info!(stage = %node.name(), "No more stages to run");
            return Ok(());
        }

        match node.successor() {
            Some(next) => self.run_stage(next, ctx, sink, benchmark),
            None => Ok(()),
        }
    }

    fn execute_stage(
        &self,
        stage: StageRef,
        ctx: &mut ExecutionContext,
        sink: &dyn ProgressSink,
        benchmark: Option<&BenchmarkLog>,
    ) -> Result<(), ChainError> {
        let node = &self.nodes[stage.0];
        let span = info_span!("stage", stage = %node.name());
        let _guard = span.enter();

        let previous = node.predecessor().map(|p| self.nodes[p.0].progress());
        let run = StageRun::new(
            node.name(),
            node.params(),
            &self.options,
            self.rerun.contains(&stage),
            StageProgress::new(node.name(), sink, node.progress(), previous),
        );

        info!("Running {} stage", node.name());
        let started = Instant::now();

        ctx.enter_stage(node.name());
        let result = node.runner().process(ctx, &run);
        ctx.leave_stage();
        result.map_err(|source| ChainError::stage_failed(node.name(), source))?;

        self.check_outputs(node, ctx)?;

        let elapsed = started.elapsed();
        if let Some(log) = benchmark {
            log.record(node.name(), elapsed)?;
        }

        info!(elapsed_secs = elapsed.as_secs_f64(), "Finished {} stage", node.name());
        run.progress().finish();
        Ok(())
    }

    fn check_outputs(&self, node: &StageNode, ctx: &ExecutionContext) -> Result<(), ChainError> {
        let missing = std::iter::once(keys::TREE)
            .chain(node.produces().iter().map(String::as_str))
            .find(|key| !ctx.contains_key(key));

        if let Some(key) = missing {
            return Err(ChainError::MissingOutput {
                stage: node.name().to_string(),
                key: key.to_string(),
            });
        }

        ctx.get_as::<ProjectTree>(keys::TREE)
            .map(|_| ())
            .map_err(|err| match err {
                ChainError::Serialization(source) => ChainError::InvalidOutput {
                    stage: node.name().to_string(),
                    key: keys::TREE.to_string(),
                    source,
                },
                other => other,
            })
    }
}
