//! Stage trait and implementations.
//!
//! A stage is a unit of work the chain runs against the shared
//! [`ExecutionContext`]. Its implementation is an external collaborator: the
//! chain only cares that it returns normally or fails.

mod dry_run;
mod id;
mod params;
mod registry;

pub use dry_run::DryRunStage;
pub use id::StageId;
pub use params::StageParams;
pub use registry::StageRegistry;

use crate::context::ExecutionContext;
use crate::options::RunOptions;
use crate::progress::StageProgress;
use std::fmt::Debug;

/// Trait for stage implementations.
pub trait Stage: Send + Sync + Debug {
    /// Executes the stage.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The shared execution context; produced artifacts are written back here
    /// * `run` - Name, parameters, options and progress handle of this execution
    fn process(&self, ctx: &mut ExecutionContext, run: &StageRun<'_>) -> anyhow::Result<()>;
}

/// Everything a stage gets to know about its own execution.
#[derive(Debug)]
pub struct StageRun<'a> {
    name: &'a str,
    params: &'a StageParams,
    options: &'a RunOptions,
    rerun: bool,
    progress: StageProgress<'a>,
}

impl<'a> StageRun<'a> {
    /// Creates a new stage run.
    #[must_use]
    pub fn new(
        name: &'a str,
        params: &'a StageParams,
        options: &'a RunOptions,
        rerun: bool,
        progress: StageProgress<'a>,
    ) -> Self {
        Self {
            name,
            params,
            options,
            rerun,
            progress,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the stage parameters.
    #[must_use]
    pub fn params(&self) -> &StageParams {
        self.params
    }

    /// Returns the run options.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        self.options
    }

    /// Returns true if the stage should discard previous results and redo its work.
    #[must_use]
    pub fn rerun(&self) -> bool {
        self.rerun
    }

    /// Returns the progress handle.
    #[must_use]
    pub fn progress(&self) -> &StageProgress<'a> {
        &self.progress
    }
}

/// A simple function-based stage.
pub struct FnStage<F>
where
    F: Fn(&mut ExecutionContext, &StageRun<'_>) -> anyhow::Result<()> + Send + Sync,
{
    name: String,
    func: F,
}

impl<F> FnStage<F>
where
    F: Fn(&mut ExecutionContext, &StageRun<'_>) -> anyhow::Result<()> + Send + Sync,
{
    /// Creates a new function-based stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for FnStage<F>
where
    F: Fn(&mut ExecutionContext, &StageRun<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

impl<F> Stage for FnStage<F>
where
    F: Fn(&mut ExecutionContext, &StageRun<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn process(&self, ctx: &mut ExecutionContext, run: &StageRun<'_>) -> anyhow::Result<()> {
        (self.func)(ctx, run)
    }
}

/// A stage that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpStage;

impl Stage for NoOpStage {
    fn process(&self, _ctx: &mut ExecutionContext, _run: &StageRun<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}
