//! Photon: the CPU stage of a clustered forward renderer.
//!
//! Each frame the GPU cluster-key pass marks which depth slices of each
//! screen tile hold geometry. [`LightCuller`] tests the point lights against
//! every marked cluster and produces the light index list and the packed
//! cluster map the shading pass reads.
//!
//! ```no_run
//! use photon::prelude::*;
//!
//! # fn main() -> photon::Result<()> {
//! let config = ClusterConfig::default();
//! let grid = config.grid();
//! let camera = Camera::default();
//! let lights = LightSet::grid_layout();
//!
//! let mut culler = LightCuller::new(config)?;
//! let mut pass = SoftwareClusterKeyPass::for_camera(grid, &camera)?;
//! let mut reader = ClusterKeyReader::new(&grid, ReadbackMode::Blocking);
//! let mut upload = RecordingUpload::default();
//!
//! let keys = reader.read(&mut pass)?;
//! let stats = culler.run_frame(&camera, &lights, keys, &mut upload)?;
//! println!("{} light indices written", stats.lights_written);
//! # Ok(())
//! # }
//! ```

pub use photon_core::{
    Camera, ClusterConfig, ClusterGrid, CullStrategy, Frustum, OverflowPolicy, PhotonError, ProjectionParams,
    ReadbackMode, Result,
};
pub use photon_culling::{
    ClusterKeyImage, ClusterKeyReader, ClusterKeySource, ClusterMap, CullStats, FrameState, FrameUpload,
    LightCuller, LightIndexList, RecordingUpload, SoftwareClusterKeyPass, UploadTarget,
};
pub use photon_lighting::{LightHandle, LightSet, LightUniform, PointLight};

pub mod prelude {
    pub use crate::{
        Camera, ClusterConfig, ClusterGrid, ClusterKeyImage, ClusterKeyReader, ClusterKeySource, CullStats,
        CullStrategy, LightCuller, LightSet, OverflowPolicy, PointLight, ReadbackMode, RecordingUpload,
        SoftwareClusterKeyPass, UploadTarget,
    };
}
