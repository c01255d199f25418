//! Per-stage parameters derived from the run options.

use super::StageId;
use crate::options::RunOptions;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameters handed to a single stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StageParams(Map<String, Value>);

impl StageParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the parameters the standard chain hands to `stage`.
    #[must_use]
    pub fn for_stage(stage: StageId, options: &RunOptions) -> Self {
        let params = Self::new();
        match stage {
            StageId::Dataset => params.with("verbose", options.verbose),
            StageId::Meshing => params
                .with("max_vertex", options.mesh_size)
                .with("oct_tree", options.mesh_octree_depth)
                .with("samples", 1.0)
                .with("point_weight", 4.0)
                .with("max_concurrency", options.max_concurrency)
                .with("verbose", options.verbose),
            StageId::Texturing => params
                .with("data_term", options.texturing_data_term.to_string())
                .with("outlier_rem_type", options.texturing_outlier_removal_type.to_string())
                .with("skip_glob_seam_leveling", options.texturing_skip_global_seam_leveling)
                .with("skip_loc_seam_leveling", options.texturing_skip_local_seam_leveling)
                .with("tone_mapping", options.texturing_tone_mapping.to_string()),
            StageId::Georeferencing => params
                .with(
                    "gcp_file",
                    options.gcp.as_ref().map(|p| p.display().to_string()),
                )
                .with("verbose", options.verbose),
            StageId::Dem => params
                .with("max_concurrency", options.max_concurrency)
                .with("verbose", options.verbose),
            _ => params,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Gets a raw parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Gets a numeric parameter.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    /// Gets an unsigned integer parameter.
    #[must_use]
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.0.get(key).and_then(Value::as_u64)
    }

    /// Gets a boolean parameter.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Gets a string parameter.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
