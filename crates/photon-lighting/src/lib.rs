pub mod light_set;
pub mod lights;

pub use light_set::*;
pub use lights::*;
