//! Cluster assignment and light culling
//!
//! Consumes the per-tile cluster keys produced by the GPU (or by
//! [`SoftwareClusterKeyPass`]), culls point lights per occupied cluster and
//! produces the light index list and the packed cluster map the shading pass
//! reads.

pub mod cluster_key;
pub mod cluster_map;
pub mod culler;
pub mod light_list;
pub mod software_pass;
pub mod tile_frustum;
pub mod upload;

pub use cluster_key::*;
pub use cluster_map::{decode, encode, encode_clamped, ClusterMap, MAX_CLUSTER_LIGHTS, MAX_LIST_OFFSET};
pub use culler::*;
pub use light_list::*;
pub use software_pass::*;
pub use tile_frustum::*;
pub use upload::*;
