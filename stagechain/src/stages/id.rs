//! The fixed roster of processing stages.

use crate::context::keys;
use crate::errors::ChainValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier of a stage in the standard processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Multispectral band alignment. Entry of the chain.
    Multispectral,
    /// Dataset loading.
    Dataset,
    /// Split of large datasets into submodels.
    Split,
    /// Merge of submodel results.
    Merge,
    /// Structure-from-motion reconstruction.
    #[serde(rename = "opensfm")]
    Reconstruction,
    /// Dense reconstruction.
    #[serde(rename = "openmvs")]
    DenseReconstruction,
    /// Point cloud filtering.
    #[serde(rename = "odm_filterpoints")]
    FilterPoints,
    /// Meshing.
    #[serde(rename = "odm_meshing")]
    Meshing,
    /// Mesh texturing.
    #[serde(rename = "mvs_texturing")]
    Texturing,
    /// Georeferencing.
    #[serde(rename = "odm_georeferencing")]
    Georeferencing,
    /// Elevation model generation.
    #[serde(rename = "odm_dem")]
    Dem,
    /// Orthophoto rendering.
    #[serde(rename = "odm_orthophoto")]
    Orthophoto,
    /// Report generation.
    #[serde(rename = "odm_report")]
    Report,
}

impl StageId {
    /// Every stage, in roster order.
    pub const ALL: [Self; 13] = [
        Self::Multispectral,
        Self::Dataset,
        Self::Split,
        Self::Merge,
        Self::Reconstruction,
        Self::DenseReconstruction,
        Self::FilterPoints,
        Self::Meshing,
        Self::Texturing,
        Self::Georeferencing,
        Self::Dem,
        Self::Orthophoto,
        Self::Report,
    ];

    /// Returns the stage name used in logs, options and the context.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Multispectral => "multispectral",
            Self::Dataset => "dataset",
            Self::Split => "split",
            Self::Merge => "merge",
            Self::Reconstruction => "opensfm",
            Self::DenseReconstruction => "openmvs",
            Self::FilterPoints => "odm_filterpoints",
            Self::Meshing => "odm_meshing",
            Self::Texturing => "mvs_texturing",
            Self::Georeferencing => "odm_georeferencing",
            Self::Dem => "odm_dem",
            Self::Orthophoto => "odm_orthophoto",
            Self::Report => "odm_report",
        }
    }

    /// Cumulative percent complete once this stage finishes.
    #[must_use]
    pub fn progress(self) -> f64 {
        match self {
            Self::Multispectral => 5.0,
            Self::Dataset => 15.0,
            Self::Split => 75.0,
            Self::Merge => 100.0,
            Self::Reconstruction => 25.0,
            Self::DenseReconstruction => 50.0,
            Self::FilterPoints => 52.0,
            Self::Meshing => 60.0,
            Self::Texturing => 70.0,
            Self::Georeferencing => 80.0,
            Self::Dem => 90.0,
            Self::Orthophoto => 98.0,
            Self::Report => 100.0,
        }
    }

    /// Context keys the stage reads.
    #[must_use]
    pub const fn requires(self) -> &'static [&'static str] {
        match self {
            Self::Multispectral | Self::Dataset => &[],
            Self::Split => &[keys::PHOTOS, keys::RECONSTRUCTION],
            Self::Merge => &[keys::LARGE],
            Self::Reconstruction => &[keys::RECONSTRUCTION],
            Self::DenseReconstruction | Self::FilterPoints => &[keys::SFM_MODEL],
            Self::Meshing => &[keys::FILTERED_POINT_CLOUD],
            Self::Texturing => &[keys::MESH, keys::RECONSTRUCTION],
            Self::Georeferencing | Self::Orthophoto => &[keys::TEXTURED_MODEL],
            Self::Dem => &[keys::GEOREFERENCED_MODEL],
            Self::Report => &[keys::RECONSTRUCTION],
        }
    }

    /// Context keys the stage writes.
    #[must_use]
    pub const fn produces(self) -> &'static [&'static str] {
        match self {
            Self::Multispectral | Self::Merge => &[],
            Self::Dataset => &[keys::PHOTOS, keys::RECONSTRUCTION],
            Self::Split => &[keys::LARGE],
            Self::Reconstruction => &[keys::SFM_MODEL],
            Self::DenseReconstruction => &[keys::DENSE_POINT_CLOUD],
            Self::FilterPoints => &[keys::FILTERED_POINT_CLOUD],
            Self::Meshing => &[keys::MESH],
            Self::Texturing => &[keys::TEXTURED_MODEL],
            Self::Georeferencing => &[keys::GEOREFERENCED_MODEL],
            Self::Dem => &[keys::DEM],
            Self::Orthophoto => &[keys::ORTHOPHOTO],
            Self::Report => &[keys::REPORT],
        }
    }

    /// Looks a stage up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StageId {
    type Err = ChainValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ChainValidationError::unknown_stage("stage", s))
    }
}
