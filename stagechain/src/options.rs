//! Run options consumed by the chain builder and the driver.

use crate::errors::{ChainError, ChainValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Largest accepted meshing octree depth.
pub const MAX_OCTREE_DEPTH: u32 = 14;

/// Data term used to score views during texturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TexturingDataTerm {
    /// Gradient magnitude.
    #[default]
    Gmi,
    /// Projected area.
    Area,
}

/// Photometric outlier removal applied during texturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierRemoval {
    /// No outlier removal.
    None,
    /// Gaussian clamping.
    #[default]
    GaussClamping,
    /// Gaussian damping.
    GaussDamping,
}

/// Tone mapping applied during texturing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    /// No tone mapping.
    #[default]
    None,
    /// Gamma correction.
    Gamma,
}

macro_rules! option_display {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($name),)+
                }
            }
        }
    };
}

option_display!(TexturingDataTerm { Gmi => "gmi", Area => "area" });
option_display!(OutlierRemoval { None => "none", GaussClamping => "gauss_clamping", GaussDamping => "gauss_damping" });
option_display!(ToneMapping { None => "none", Gamma => "gamma" });

/// Configuration bundle for one processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Project directory.
    #[serde(default)]
    pub project_path: PathBuf,
    /// Ground control point file.
    #[serde(default)]
    pub gcp: Option<PathBuf>,
    /// Image geolocation file.
    #[serde(default)]
    pub geo: Option<PathBuf>,
    /// Skip dense reconstruction and build the orthophoto from the sparse model.
    #[serde(default)]
    pub fast_orthophoto: bool,
    /// Reset the benchmarking log and record per-stage runtimes.
    #[serde(default, alias = "time")]
    pub benchmarking: bool,
    /// Verbose stage output.
    #[serde(default)]
    pub verbose: bool,
    /// Debug logging.
    #[serde(default)]
    pub debug: bool,
    /// Maximum concurrency handed to stages.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Maximum vertex count of the output mesh.
    #[serde(default = "default_mesh_size")]
    pub mesh_size: u64,
    /// Octree depth used by the meshing stage.
    #[serde(default = "default_mesh_octree_depth")]
    pub mesh_octree_depth: u32,
    /// Texturing data term.
    #[serde(default)]
    pub texturing_data_term: TexturingDataTerm,
    /// Texturing outlier removal.
    #[serde(default)]
    pub texturing_outlier_removal_type: OutlierRemoval,
    /// Skip global seam leveling.
    #[serde(default)]
    pub texturing_skip_global_seam_leveling: bool,
    /// Skip local seam leveling.
    #[serde(default)]
    pub texturing_skip_local_seam_leveling: bool,
    /// Texturing tone mapping.
    #[serde(default)]
    pub texturing_tone_mapping: ToneMapping,
    /// Stop after this stage.
    #[serde(default)]
    pub end_with: Option<String>,
    /// Rerun only this stage, then stop.
    #[serde(default)]
    pub rerun: Option<String>,
    /// Rerun every stage.
    #[serde(default)]
    pub rerun_all: bool,
    /// Rerun this stage and every later one.
    #[serde(default)]
    pub rerun_from: Option<String>,
}

fn default_max_concurrency() -> usize {
    crate::benchmark::hardware_concurrency()
}

fn default_mesh_size() -> u64 {
    200_000
}

fn default_mesh_octree_depth() -> u32 {
    11
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            project_path: PathBuf::new(),
            gcp: None,
            geo: None,
            fast_orthophoto: false,
            benchmarking: false,
            verbose: false,
            debug: false,
            max_concurrency: default_max_concurrency(),
            mesh_size: default_mesh_size(),
            mesh_octree_depth: default_mesh_octree_depth(),
            texturing_data_term: TexturingDataTerm::default(),
            texturing_outlier_removal_type: OutlierRemoval::default(),
            texturing_skip_global_seam_leveling: false,
            texturing_skip_local_seam_leveling: false,
            texturing_tone_mapping: ToneMapping::default(),
            end_with: None,
            rerun: None,
            rerun_all: false,
            rerun_from: None,
        }
    }
}

impl RunOptions {
    /// Creates options for the project at `project_path` with defaults.
    #[must_use]
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            ..Self::default()
        }
    }

    /// Loads options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ChainError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ChainError::environment(path, e))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Sets the fast orthophoto flag.
    #[must_use]
    pub fn with_fast_orthophoto(mut self, enabled: bool) -> Self {
        self.fast_orthophoto = enabled;
        self
    }

    /// Sets the benchmarking flag.
    #[must_use]
    pub fn with_benchmarking(mut self, enabled: bool) -> Self {
        self.benchmarking = enabled;
        self
    }

    /// Sets the ground control point file.
    #[must_use]
    pub fn with_gcp(mut self, path: impl Into<PathBuf>) -> Self {
        self.gcp = Some(path.into());
        self
    }

    /// Sets the stage to stop after.
    #[must_use]
    pub fn with_end_with(mut self, stage: impl Into<String>) -> Self {
        self.end_with = Some(stage.into());
        self
    }

    /// Sets the single stage to rerun.
    #[must_use]
    pub fn with_rerun(mut self, stage: impl Into<String>) -> Self {
        self.rerun = Some(stage.into());
        self
    }

    /// Sets the stage to rerun from.
    #[must_use]
    pub fn with_rerun_from(mut self, stage: impl Into<String>) -> Self {
        self.rerun_from = Some(stage.into());
        self
    }

    /// Validates values that do not depend on the chain layout.
    ///
    /// Stage names in `end_with`, `rerun` and `rerun_from` are checked by the
    /// chain builder against the stages actually reachable.
    pub fn validate(&self) -> Result<(), ChainValidationError> {
        if self.project_path.as_os_str().is_empty() {
            return Err(ChainValidationError::invalid_option("project_path", "must not be empty"));
        }
        if self.max_concurrency == 0 {
            return Err(ChainValidationError::invalid_option(
                "max_concurrency",
                "must be at least 1",
            ));
        }
        if self.mesh_size == 0 {
            return Err(ChainValidationError::invalid_option("mesh_size", "must be greater than zero"));
        }
        if !(1..=MAX_OCTREE_DEPTH).contains(&self.mesh_octree_depth) {
            return Err(ChainValidationError::invalid_option(
                "mesh_octree_depth",
                format!("must be between 1 and {MAX_OCTREE_DEPTH}"),
            ));
        }
        if self.rerun.is_some() && (self.rerun_all || self.rerun_from.is_some()) {
            return Err(ChainValidationError::invalid_option(
                "rerun",
                "cannot be combined with rerun_all or rerun_from",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::codes;

    #[test]
    fn test_defaults() {
        let options = RunOptions::new("/tmp/project");
        assert_eq!(options.mesh_size, 200_000);
        assert_eq!(options.mesh_octree_depth, 11);
        assert!(options.max_concurrency >= 1);
        assert_eq!(options.texturing_outlier_removal_type, OutlierRemoval::GaussClamping);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial_json() {
        let options: RunOptions = serde_json::from_str(
            r#"{"project_path": "/data/p", "fast_orthophoto": true, "time": true, "texturing_data_term": "area"}"#,
        )
        .unwrap();

        assert!(options.fast_orthophoto);
        assert!(options.benchmarking);
        assert_eq!(options.texturing_data_term, TexturingDataTerm::Area);
        assert_eq!(options.mesh_size, 200_000);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        std::fs::write(&path, r#"{"project_path": "/data/p", "mesh_size": 50000}"#).unwrap();

        let options = RunOptions::from_json_file(&path).unwrap();
        assert_eq!(options.mesh_size, 50_000);

        let missing = RunOptions::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(ChainError::Environment { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut options = RunOptions::new("/tmp/project");
        options.max_concurrency = 0;
        assert_eq!(options.validate().unwrap_err().code(), Some(codes::INVALID_OPTION));

        let mut options = RunOptions::new("/tmp/project");
        options.mesh_octree_depth = 15;
        assert!(options.validate().is_err());

        let options = RunOptions::default();
        assert!(options.validate().is_err());

        let options = RunOptions::new("/tmp/project").with_rerun("opensfm").with_rerun_from("odm_dem");
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_enum_display() {
        assert_eq!(OutlierRemoval::GaussDamping.to_string(), "gauss_damping");
        assert_eq!(ToneMapping::Gamma.to_string(), "gamma");
        assert_eq!(TexturingDataTerm::Gmi.to_string(), "gmi");
    }
}
