//! Shared run state passed between stages.
//!
//! This module provides:
//! - The string-keyed execution context every stage reads and writes
//! - The resolved project directory layout stored under [`keys::TREE`]
//! - The well-known context keys

mod execution;
mod tree;

pub use execution::ExecutionContext;
pub use tree::ProjectTree;

/// Well-known context keys.
pub mod keys {
    /// Wall-clock start of the run. Seeded by the driver.
    pub const START_TIME: &str = "start_time";
    /// Resolved project layout. Seeded by the driver.
    pub const TREE: &str = "tree";
    /// Identifier of the run. Seeded by the driver.
    pub const RUN_ID: &str = "run_id";

    /// Loaded photo list.
    pub const PHOTOS: &str = "photos";
    /// Reconstruction descriptor built from the dataset.
    pub const RECONSTRUCTION: &str = "reconstruction";
    /// Split marker for large datasets.
    pub const LARGE: &str = "large";
    /// Structure-from-motion model.
    pub const SFM_MODEL: &str = "opensfm_model";
    /// Dense point cloud.
    pub const DENSE_POINT_CLOUD: &str = "dense_point_cloud";
    /// Filtered point cloud.
    pub const FILTERED_POINT_CLOUD: &str = "filtered_point_cloud";
    /// Mesh.
    pub const MESH: &str = "mesh";
    /// Textured model.
    pub const TEXTURED_MODEL: &str = "textured_model";
    /// Georeferenced model.
    pub const GEOREFERENCED_MODEL: &str = "georeferenced_model";
    /// Elevation models.
    pub const DEM: &str = "dem";
    /// Orthophoto.
    pub const ORTHOPHOTO: &str = "orthophoto";
    /// Report.
    pub const REPORT: &str = "report";

    /// Keys the driver seeds before the entry stage runs.
    pub const SEEDED: [&str; 3] = [START_TIME, TREE, RUN_ID];
}
