use glam::UVec3;
use photon_core::{PhotonError, Result};

/// Data handed to the renderer once per frame.
///
/// `light_indices` holds only the written prefix of the list; the cluster map
/// is the full `[slice][y][x]` texture.
#[derive(Debug, Clone, Copy)]
pub struct FrameUpload<'a> {
    pub light_indices: &'a [u8],
    pub light_index_count: usize,
    pub cluster_map: &'a [u8],
    pub dimensions: UVec3,
}

/// Where the culler's outputs go: a GPU buffer/texture pair in a renderer, or
/// a [`RecordingUpload`] in tests.
pub trait UploadTarget {
    fn upload(&mut self, frame: &FrameUpload<'_>) -> Result<()>;
}

/// Keeps a decoded copy of the last upload.
#[derive(Debug, Clone, Default)]
pub struct RecordingUpload {
    pub light_indices: Vec<u16>,
    pub cluster_map: Vec<u32>,
    pub dimensions: UVec3,
    pub uploads: usize,
}

impl UploadTarget for RecordingUpload {
    fn upload(&mut self, frame: &FrameUpload<'_>) -> Result<()> {
        if frame.light_indices.len() != frame.light_index_count * 2 {
            return Err(PhotonError::Upload(format!(
                "{} bytes for {} light indices",
                frame.light_indices.len(),
                frame.light_index_count
            )));
        }
        let cells = frame.dimensions.x as usize * frame.dimensions.y as usize * frame.dimensions.z as usize;
        if frame.cluster_map.len() != cells * 4 {
            return Err(PhotonError::Upload(format!(
                "{} bytes for a {}x{}x{} cluster map",
                frame.cluster_map.len(),
                frame.dimensions.x,
                frame.dimensions.y,
                frame.dimensions.z
            )));
        }

        self.light_indices = bytemuck::pod_collect_to_vec(frame.light_indices);
        self.cluster_map = bytemuck::pod_collect_to_vec(frame.cluster_map);
        self.dimensions = frame.dimensions;
        self.uploads += 1;
        Ok(())
    }
}
