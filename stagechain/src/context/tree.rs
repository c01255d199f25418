//! Project directory layout.

use super::keys;
use crate::errors::ChainError;
use crate::stages::StageId;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// File names looked up in the project root when no explicit path is given.
const DEFAULT_GCP_FILE: &str = "gcp_list.txt";
const DEFAULT_GEO_FILE: &str = "geo.txt";

/// Paths for the inputs, intermediate artifacts and outputs of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectTree {
    /// Project root.
    pub root: PathBuf,
    /// Input images.
    pub images: PathBuf,
    /// Image list written by the dataset stage.
    pub dataset_list: PathBuf,
    /// Submodels produced by the split stage.
    pub submodels: PathBuf,
    /// Structure-from-motion workspace.
    pub opensfm: PathBuf,
    /// Dense reconstruction workspace.
    pub openmvs: PathBuf,
    /// Filtered point cloud directory.
    pub filterpoints: PathBuf,
    /// Meshing directory.
    pub meshing: PathBuf,
    /// Texturing directory.
    pub texturing: PathBuf,
    /// Georeferencing directory.
    pub georeferencing: PathBuf,
    /// Elevation model directory.
    pub dem: PathBuf,
    /// Orthophoto directory.
    pub orthophoto: PathBuf,
    /// Report directory.
    pub report: PathBuf,
    /// Benchmarking log.
    pub benchmarking: PathBuf,
    /// Ground control point file.
    pub gcp: Option<PathBuf>,
    /// Image geolocation file.
    pub geo: Option<PathBuf>,
}

impl ProjectTree {
    /// Resolves the layout of the project at `project_path`.
    ///
    /// When `gcp` or `geo` is `None`, a `gcp_list.txt` or `geo.txt` in the
    /// project root is picked up if present.
    ///
    /// # Errors
    ///
    /// Returns an environment error if the project path is not a directory.
    pub fn resolve(project_path: &Path, gcp: Option<&Path>, geo: Option<&Path>) -> Result<Self, ChainError> {
        if !project_path.is_dir() {
            return Err(ChainError::environment(
                project_path,
                io::Error::new(io::ErrorKind::NotFound, "project path is not a directory"),
            ));
        }

        let root = project_path.to_path_buf();
        let opensfm = root.join("opensfm");

        Ok(Self {
            images: root.join("images"),
            dataset_list: root.join("img_list.txt"),
            submodels: root.join("submodels"),
            openmvs: opensfm.join("undistorted").join("openmvs"),
            opensfm,
            filterpoints: root.join("odm_filterpoints"),
            meshing: root.join("odm_meshing"),
            texturing: root.join("odm_texturing"),
            georeferencing: root.join("odm_georeferencing"),
            dem: root.join("odm_dem"),
            orthophoto: root.join("odm_orthophoto"),
            report: root.join("odm_report"),
            benchmarking: root.join("benchmark.txt"),
            gcp: locate(&root, gcp, DEFAULT_GCP_FILE),
            geo: locate(&root, geo, DEFAULT_GEO_FILE),
            root,
        })
    }

    /// Returns the working directory of a stage.
    #[must_use]
    pub fn stage_dir(&self, stage: StageId) -> &Path {
        match stage {
            StageId::Multispectral | StageId::Dataset => &self.images,
            StageId::Split | StageId::Merge => &self.submodels,
            StageId::Reconstruction => &self.opensfm,
            StageId::DenseReconstruction => &self.openmvs,
            StageId::FilterPoints => &self.filterpoints,
            StageId::Meshing => &self.meshing,
            StageId::Texturing => &self.texturing,
            StageId::Georeferencing => &self.georeferencing,
            StageId::Dem => &self.dem,
            StageId::Orthophoto => &self.orthophoto,
            StageId::Report => &self.report,
        }
    }

    /// File or directory where the artifact stored under context `key` lives.
    #[must_use]
    pub fn artifact(&self, key: &str) -> Option<PathBuf> {
        let path = match key {
            keys::PHOTOS => self.images.clone(),
            keys::RECONSTRUCTION | keys::SFM_MODEL => self.opensfm.join("reconstruction.json"),
            keys::LARGE => self.submodels.clone(),
            keys::DENSE_POINT_CLOUD => self.openmvs.join("scene_dense_dense_filtered.ply"),
            keys::FILTERED_POINT_CLOUD => self.filterpoints.join("point_cloud.ply"),
            keys::MESH => self.meshing.join("odm_mesh.ply"),
            keys::TEXTURED_MODEL => self.texturing.join("odm_textured_model_geo.obj"),
            keys::GEOREFERENCED_MODEL => self.georeferencing.join("odm_georeferenced_model.laz"),
            keys::DEM => self.dem.join("dsm.tif"),
            keys::ORTHOPHOTO => self.orthophoto.join("odm_orthophoto.tif"),
            keys::REPORT => self.report.join("report.pdf"),
            _ => return None,
        };
        Some(path)
    }
}

fn locate(root: &Path, explicit: Option<&Path>, default_name: &str) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = root.join(default_name);
            candidate.is_file().then_some(candidate)
        }
    }
}
