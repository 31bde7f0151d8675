use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotonError {
    #[error("Degenerate planes: determinant {determinant} is too close to zero")]
    DegeneratePlanes { determinant: f32 },

    #[error("Light index list overflow: {requested} entries requested, capacity is {capacity}")]
    LightListOverflow { capacity: usize, requested: usize },

    #[error("Cluster word overflow: offset {offset} / count {count} do not fit in 24 / 8 bits")]
    EncodingOverflow { offset: usize, count: usize },

    #[error("Inconsistent depth parameters: {0}")]
    InconsistentDepthParameters(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Cluster key readback failed: {0}")]
    Readback(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Frame stage out of order: {0}")]
    FrameOrder(String),
}

pub type Result<T> = std::result::Result<T, PhotonError>;
