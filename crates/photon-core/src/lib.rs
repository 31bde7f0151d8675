pub mod camera;
pub mod config;
pub mod depth;
pub mod error;
pub mod frustum;
pub mod grid;
pub mod plane;

pub use camera::*;
pub use config::*;
pub use depth::*;
pub use error::*;
pub use frustum::Frustum;
pub use grid::*;
pub use plane::*;
