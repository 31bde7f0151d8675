//! Cluster keys
//!
//! A cluster key is one `u16` per screen tile; bit `s` is set when at least
//! one visible pixel of the tile falls into depth slice `s`. The GPU pass
//! writes them with an OR blend into a cleared `tiles_x * tiles_y` target and
//! the CPU reads that target back each frame.

use glam::UVec2;
use photon_core::{ClusterGrid, PhotonError, ProjectionParams, ReadbackMode, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterKeyImage {
    width: u32,
    height: u32,
    texels: Vec<u16>,
    produced_with: Option<ProjectionParams>,
}

impl ClusterKeyImage {
    /// Cleared image covering the tiles of `grid`.
    pub fn new(grid: &ClusterGrid) -> Self {
        Self {
            width: grid.tiles_x,
            height: grid.tiles_y,
            texels: vec![0; grid.tile_count()],
            produced_with: None,
        }
    }

    pub fn from_texels(width: u32, height: u32, texels: Vec<u16>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(PhotonError::Readback(format!(
                "{} texels supplied for a {}x{} key image",
                texels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            texels,
            produced_with: None,
        })
    }

    /// Decode a tightly packed little-endian `R16Uint` readback.
    pub fn from_bytes(width: u32, height: u32, bytes: &[u8]) -> Result<Self> {
        let mut image = Self::from_texels(width, height, vec![0; width as usize * height as usize])?;
        image.copy_from_bytes(bytes)?;
        Ok(image)
    }

    /// Overwrite all texels from a tightly packed little-endian readback.
    pub fn copy_from_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() != self.texels.len() * 2 {
            return Err(PhotonError::Readback(format!(
                "expected {} bytes for a {}x{} key image, got {}",
                self.texels.len() * 2,
                self.width,
                self.height,
                bytes.len()
            )));
        }
        for (texel, chunk) in self.texels.iter_mut().zip(bytes.chunks_exact(2)) {
            *texel = u16::from_le_bytes([chunk[0], chunk[1]]);
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Whether the image has the tile layout of `grid`.
    pub fn matches(&self, grid: &ClusterGrid) -> bool {
        self.width == grid.tiles_x && self.height == grid.tiles_y
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Occupied-slice mask of tile `(x, y)`.
    #[inline]
    pub fn occupied_slices(&self, x: u32, y: u32) -> u16 {
        self.texels[self.offset(x, y)]
    }

    pub fn mark(&mut self, x: u32, y: u32, slice: u32) {
        debug_assert!(slice < 16);
        self.or_mask(x, y, 1 << slice);
    }

    /// OR `mask` into tile `(x, y)`, the blend the key pass uses.
    pub fn or_mask(&mut self, x: u32, y: u32, mask: u16) {
        let offset = self.offset(x, y);
        self.texels[offset] |= mask;
    }

    pub fn clear_tile(&mut self, x: u32, y: u32) {
        let offset = self.offset(x, y);
        self.texels[offset] = 0;
    }

    pub fn clear_all(&mut self) {
        self.texels.fill(0);
        self.produced_with = None;
    }

    pub fn is_clear(&self) -> bool {
        self.texels.iter().all(|&t| t == 0)
    }

    /// Tiles with a non-zero key, row by row from the bottom.
    pub fn occupied_tiles(&self) -> impl Iterator<Item = (u32, u32, u16)> + '_ {
        let width = self.width.max(1);
        self.texels
            .iter()
            .enumerate()
            .filter(|(_, mask)| **mask != 0)
            .map(move |(i, &mask)| (i as u32 % width, i as u32 / width, mask))
    }

    /// Total number of set bits over all tiles.
    pub fn occupied_cluster_count(&self) -> usize {
        self.texels.iter().map(|t| t.count_ones() as usize).sum()
    }

    pub fn texels(&self) -> &[u16] {
        &self.texels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Slice parameters the producing pass used, when known.
    pub fn produced_with(&self) -> Option<&ProjectionParams> {
        self.produced_with.as_ref()
    }

    pub fn set_produced_with(&mut self, params: Option<ProjectionParams>) {
        self.produced_with = params;
    }

    fn restore_from(&mut self, texels: &[u16], params: Option<ProjectionParams>) {
        self.texels.copy_from_slice(texels);
        self.produced_with = params;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadbackStatus {
    /// The image holds this frame's keys.
    Ready,
    /// The GPU has not finished; the image was left untouched.
    Pending,
}

/// Anything that can fill a [`ClusterKeyImage`] for the current frame: a GPU
/// readback, or the software pass used by tests and the demos.
pub trait ClusterKeySource {
    /// With [`ReadbackMode::Blocking`] an implementation must wait for the
    /// result and never return [`ReadbackStatus::Pending`].
    fn read_into(&mut self, image: &mut ClusterKeyImage, mode: ReadbackMode) -> Result<ReadbackStatus>;
}

/// Owns the CPU copy of the key image and applies the readback mode.
///
/// In fenced mode a pending readback reuses the last complete keys, for at
/// most `max_frames_in_flight` consecutive frames.
pub struct ClusterKeyReader {
    image: ClusterKeyImage,
    last_complete: Vec<u16>,
    last_params: Option<ProjectionParams>,
    mode: ReadbackMode,
    frames_pending: u32,
}

impl ClusterKeyReader {
    pub fn new(grid: &ClusterGrid, mode: ReadbackMode) -> Self {
        let image = ClusterKeyImage::new(grid);
        let last_complete = image.texels().to_vec();
        Self {
            image,
            last_complete,
            last_params: None,
            mode,
            frames_pending: 0,
        }
    }

    pub fn mode(&self) -> ReadbackMode {
        self.mode
    }

    /// Consecutive frames that fell back to the last complete keys.
    pub fn frames_pending(&self) -> u32 {
        self.frames_pending
    }

    pub fn image(&self) -> &ClusterKeyImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut ClusterKeyImage {
        &mut self.image
    }

    /// Fetch this frame's keys from `source`.
    pub fn read(&mut self, source: &mut dyn ClusterKeySource) -> Result<&mut ClusterKeyImage> {
        match source.read_into(&mut self.image, self.mode)? {
            ReadbackStatus::Ready => {
                self.frames_pending = 0;
                self.last_complete.copy_from_slice(self.image.texels());
                self.last_params = self.image.produced_with().copied();
            }
            ReadbackStatus::Pending => match self.mode {
                ReadbackMode::Blocking => {
                    return Err(PhotonError::Readback(
                        "blocking readback returned without data".into(),
                    ));
                }
                ReadbackMode::Fenced { max_frames_in_flight } => {
                    self.frames_pending += 1;
                    if self.frames_pending > max_frames_in_flight {
                        return Err(PhotonError::Readback(format!(
                            "cluster keys still pending after {} frames",
                            self.frames_pending
                        )));
                    }
                    log::debug!(
                        "Cluster key readback pending ({} of {} frames), reusing last keys",
                        self.frames_pending,
                        max_frames_in_flight
                    );
                    self.image.restore_from(&self.last_complete, self.last_params);
                }
            },
        }
        Ok(&mut self.image)
    }
}
