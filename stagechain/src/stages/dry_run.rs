//! Placeholder stage used for dry runs.

use super::{Stage, StageId, StageRun};
use crate::context::{keys, ExecutionContext, ProjectTree};
use serde_json::json;
use tracing::info;

/// A stage that performs no work and writes a marker under every key its
/// roster entry declares as produced.
///
/// Markers carry the stage's working directory and the artifact path the key
/// maps to in the project tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryRunStage {
    id: StageId,
}

impl DryRunStage {
    /// Creates a dry-run stand-in for `id`.
    #[must_use]
    pub fn new(id: StageId) -> Self {
        Self { id }
    }
}

impl Stage for DryRunStage {
    fn process(&self, ctx: &mut ExecutionContext, run: &StageRun<'_>) -> anyhow::Result<()> {
        let tree: Option<ProjectTree> = ctx.get_as(keys::TREE)?;
        let workdir = tree.as_ref().map(|tree| tree.stage_dir(self.id).display().to_string());
        info!(stage = %run.name(), rerun = run.rerun(), params = run.params().len(), "Dry run");

        for key in self.id.produces() {
            let path = tree
                .as_ref()
                .and_then(|tree| tree.artifact(key))
                .map(|path| path.display().to_string());
            ctx.set_value(
                *key,
                json!({ "dry_run": true, "stage": run.name(), "workdir": workdir, "path": path }),
            );
        }
        Ok(())
    }
}
