//! Top-level driver: seeds the context, prepares the environment and runs the chain.

use crate::benchmark::{hardware_concurrency, BenchmarkLog};
use crate::chain::{build_chain, Chain};
use crate::context::{keys, ExecutionContext, ProjectTree};
use crate::errors::ChainError;
use crate::options::RunOptions;
use crate::progress::{NoOpProgressSink, ProgressSink};
use crate::stages::StageRegistry;
use crate::utils::now_utc;
use std::sync::Arc;
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Runs one project through a built chain.
#[derive(Clone)]
pub struct PipelineDriver {
    chain: Chain,
    progress: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for PipelineDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineDriver")
            .field("chain", &self.chain.name())
            .field("stages", &self.chain.sequence())
            .finish_non_exhaustive()
    }
}

impl PipelineDriver {
    /// Builds the standard chain for `options` and wraps it in a driver.
    ///
    /// # Errors
    ///
    /// Returns any construction error raised by [`build_chain`].
    pub fn new(options: RunOptions, registry: &StageRegistry) -> Result<Self, ChainError> {
        Ok(Self::from_chain(build_chain(options, registry)?))
    }

    /// Wraps an already built chain.
    #[must_use]
    pub fn from_chain(chain: Chain) -> Self {
        Self {
            chain,
            progress: Arc::new(NoOpProgressSink),
        }
    }

    /// Sets the progress sink.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    /// Returns the chain.
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Creates the seeded context for a run.
    ///
    /// Records the start time and a run id, resolves the project tree and,
    /// when benchmarking, replaces any previous log with a fresh header.
    ///
    /// # Errors
    ///
    /// Returns an environment error if the project path is unusable or the
    /// benchmarking log cannot be reset.
    pub fn prepare(&self) -> Result<ExecutionContext, ChainError> {
        let options = self.chain.options();
        let mut ctx = ExecutionContext::new();

        let start_time = now_utc();
        ctx.set(keys::START_TIME, &start_time)?;
        ctx.set(keys::RUN_ID, &Uuid::new_v4())?;

        let tree = ProjectTree::resolve(&options.project_path, options.gcp.as_deref(), options.geo.as_deref())?;
        debug!(root = %tree.root.display(), "Resolved project tree");

        if options.benchmarking {
            let log = BenchmarkLog::new(tree.benchmarking.clone());
            let removed = log.reset(&start_time, hardware_concurrency())?;
            info!(path = %log.path().display(), replaced = removed, "Benchmarking log reset");
        }

        ctx.set(keys::TREE, &tree)?;
        Ok(ctx)
    }

    /// Runs the chain against a context produced by [`prepare`](Self::prepare).
    ///
    /// # Errors
    ///
    /// Returns the first stage failure, unchanged. Keys written before the
    /// failure remain in `ctx`.
    pub fn run_prepared(&self, ctx: &mut ExecutionContext) -> Result<(), ChainError> {
        let run_id = ctx
            .get(keys::RUN_ID)
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string();
        let span = info_span!("run", run_id = %run_id, chain = %self.chain.name());
        let _guard = span.enter();

        info!(stages = ?self.chain.planned(), "Starting run");
        self.chain.run(ctx, self.progress.as_ref())?;
        info!("Run finished");
        Ok(())
    }

    /// Prepares a context, runs the chain and returns the final context.
    ///
    /// # Errors
    ///
    /// See [`prepare`](Self::prepare) and [`run_prepared`](Self::run_prepared).
    pub fn execute(&self) -> Result<ExecutionContext, ChainError> {
        let mut ctx = self.prepare()?;
        self.run_prepared(&mut ctx)?;
        Ok(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{full_registry, CallLog};
    use tempfile::TempDir;

    #[test]
    fn test_prepare_seeds_context() {
        let dir = TempDir::new().unwrap();
        let driver = PipelineDriver::new(RunOptions::new(dir.path()), &StageRegistry::dry_run()).unwrap();

        let ctx = driver.prepare().unwrap();

        assert!(ctx.start_time().is_some());
        assert_eq!(ctx.tree().unwrap().root, dir.path());
        assert!(ctx.get_as::<Uuid>(keys::RUN_ID).unwrap().is_some());
        assert_eq!(ctx.owner(keys::TREE), Some("driver"));
        assert!(!dir.path().join("benchmark.txt").exists());
    }

    #[test]
    fn test_prepare_rejects_missing_project() {
        let dir = TempDir::new().unwrap();
        let driver =
            PipelineDriver::new(RunOptions::new(dir.path().join("absent")), &StageRegistry::dry_run()).unwrap();

        let err = driver.prepare().unwrap_err();
        assert!(matches!(err, ChainError::Environment { .. }));
    }

    #[test]
    fn test_execute_returns_final_context() {
        let dir = TempDir::new().unwrap();
        let log = CallLog::new();
        let driver = PipelineDriver::new(RunOptions::new(dir.path()), &full_registry(&log)).unwrap();

        let ctx = driver.execute().unwrap();

        assert_eq!(log.len(), 13);
        assert!(ctx.contains_key(keys::REPORT));
        assert_eq!(ctx.owner(keys::REPORT), Some("odm_report"));
    }

    #[test]
    fn test_debug_lists_stages() {
        let driver = PipelineDriver::new(
            RunOptions::new("/data/p").with_fast_orthophoto(true),
            &StageRegistry::dry_run(),
        )
        .unwrap();
        assert!(format!("{driver:?}").contains("odm_filterpoints"));
    }
}
