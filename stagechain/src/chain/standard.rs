//! The standard processing chain.

use super::{Chain, ChainBuilder, StageNode, StageRef};
use crate::errors::{codes, ChainError, ChainValidationError, ContractErrorInfo};
use crate::options::RunOptions;
use crate::stages::{StageId, StageRegistry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Name given to the standard chain.
pub const STANDARD_CHAIN: &str = "odm";

/// Stages before the reconstruction fork.
const PREFIX: [StageId; 5] = [
    StageId::Multispectral,
    StageId::Dataset,
    StageId::Split,
    StageId::Merge,
    StageId::Reconstruction,
];

/// Stages after the reconstruction fork.
const SUFFIX: [StageId; 7] = [
    StageId::FilterPoints,
    StageId::Meshing,
    StageId::Texturing,
    StageId::Georeferencing,
    StageId::Dem,
    StageId::Orthophoto,
    StageId::Report,
];

/// How sparse reconstruction reaches point filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionPath {
    /// Straight from the sparse model. Chosen by `fast_orthophoto`.
    Sparse,
    /// Through dense reconstruction.
    Dense,
}

impl ReconstructionPath {
    /// Picks the path for the given options.
    #[must_use]
    pub fn from_options(options: &RunOptions) -> Self {
        if options.fast_orthophoto {
            Self::Sparse
        } else {
            Self::Dense
        }
    }

    /// Stages between reconstruction and point filtering.
    #[must_use]
    pub fn stages(self) -> &'static [StageId] {
        match self {
            Self::Sparse => &[],
            Self::Dense => &[StageId::DenseReconstruction],
        }
    }
}

/// Returns the reachable stages for `path`, in execution order.
#[must_use]
pub fn standard_sequence(path: ReconstructionPath) -> Vec<StageId> {
    PREFIX
        .iter()
        .chain(path.stages())
        .chain(SUFFIX.iter())
        .copied()
        .collect()
}

/// Builds the standard chain.
///
/// Every roster stage is instantiated; the fork on `fast_orthophoto` only
/// decides which of them are linked.
///
/// # Errors
///
/// Returns an error if the options are invalid, the registry lacks an
/// implementation, or the run options name an unreachable stage.
pub fn build_chain(options: RunOptions, registry: &StageRegistry) -> Result<Chain, ChainError> {
    options.validate()?;

    let missing = registry.missing();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|id| id.name().to_string()).collect();
        return Err(ChainValidationError::new(format!(
            "No implementation registered for: {}",
            names.join(", ")
        ))
        .with_stages(names)
        .with_error_info(
            ContractErrorInfo::new(codes::MISSING_STAGE, "Every roster stage needs an implementation")
                .with_fix_hint("Register the stage, or start from StageRegistry::dry_run()."),
        )
        .into());
    }

    let path = ReconstructionPath::from_options(&options);
    let options = Arc::new(options);
    let mut builder = ChainBuilder::new(STANDARD_CHAIN).with_options(Arc::clone(&options));

    let mut refs = HashMap::new();
    for id in StageId::ALL {
        let runner = registry.get(id).ok_or_else(|| {
            ChainValidationError::new(format!("No implementation registered for: {id}"))
        })?;
        let stage = builder.add_stage(StageNode::from_roster(id, runner, &options))?;
        debug!(stage = %id, "Instantiated stage");
        refs.insert(id, stage);
    }
    let stage = |id: StageId| -> StageRef { refs[&id] };

    builder.set_entry(stage(StageId::Multispectral));

    standard_sequence(path)
        .into_iter()
        .skip(1)
        .try_fold(builder.link(stage(StageId::Multispectral)), |link, id| link.connect(stage(id)))?;

    let chain = builder.build()?;
    info!(
        path = ?path,
        stages = chain.sequence().len(),
        skipped = ?chain.skipped(),
        "Built {} chain",
        chain.name()
    );
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(path: ReconstructionPath) -> Vec<&'static str> {
        standard_sequence(path).into_iter().map(StageId::name).collect()
    }

    #[test]
    fn test_path_from_options() {
        let options = RunOptions::new("/data/p");
        assert_eq!(ReconstructionPath::from_options(&options), ReconstructionPath::Dense);
        assert_eq!(
            ReconstructionPath::from_options(&options.with_fast_orthophoto(true)),
            ReconstructionPath::Sparse
        );
    }

    #[test]
    fn test_sparse_sequence_skips_dense() {
        assert_eq!(
            names(ReconstructionPath::Sparse),
            vec![
                "multispectral",
                "dataset",
                "split",
                "merge",
                "opensfm",
                "odm_filterpoints",
                "odm_meshing",
                "mvs_texturing",
                "odm_georeferencing",
                "odm_dem",
                "odm_orthophoto",
                "odm_report",
            ]
        );
    }

    #[test]
    fn test_dense_sequence_is_full_roster() {
        assert_eq!(standard_sequence(ReconstructionPath::Dense), StageId::ALL.to_vec());
    }

    #[test]
    fn test_build_chain_fast_orthophoto() {
        let options = RunOptions::new("/data/p").with_fast_orthophoto(true);
        let chain = build_chain(options, &StageRegistry::dry_run()).unwrap();

        assert_eq!(chain.len(), 13);
        assert_eq!(chain.sequence(), names(ReconstructionPath::Sparse));
        assert_eq!(chain.skipped(), vec!["openmvs"]);
        assert_eq!(chain.successor_of("opensfm"), Some("odm_filterpoints"));
        assert!(chain.node("openmvs").is_some());
    }

    #[test]
    fn test_build_chain_dense() {
        let chain = build_chain(RunOptions::new("/data/p"), &StageRegistry::dry_run()).unwrap();

        assert_eq!(chain.entry().name(), "multispectral");
        assert_eq!(chain.last_stage().name(), "odm_report");
        assert_eq!(chain.successor_of("opensfm"), Some("openmvs"));
        assert_eq!(chain.successor_of("openmvs"), Some("odm_filterpoints"));
        assert!(chain.skipped().is_empty());
    }

    #[test]
    fn test_build_chain_missing_stage() {
        let registry = StageRegistry::dry_run();
        let mut partial = StageRegistry::new();
        for id in StageId::ALL.into_iter().filter(|id| *id != StageId::Meshing) {
            partial.register(id, registry.get(id).unwrap());
        }

        let err = build_chain(RunOptions::new("/data/p"), &partial).unwrap_err();
        match err {
            ChainError::Validation(err) => {
                assert_eq!(err.code(), Some(codes::MISSING_STAGE));
                assert_eq!(err.stages, vec!["odm_meshing".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_chain_rejects_skipped_end_with() {
        let options = RunOptions::new("/data/p")
            .with_fast_orthophoto(true)
            .with_end_with("openmvs");

        let err = build_chain(options, &StageRegistry::dry_run()).unwrap_err();
        match err {
            ChainError::Validation(err) => assert_eq!(err.code(), Some(codes::UNKNOWN_STAGE)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_chain_rejects_invalid_options() {
        let mut options = RunOptions::new("/data/p");
        options.mesh_octree_depth = 0;

        let err = build_chain(options, &StageRegistry::dry_run()).unwrap_err();
        assert!(err.is_construction_error());
    }
}
