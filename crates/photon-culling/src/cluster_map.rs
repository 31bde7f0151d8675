//! Cluster map encoding
//!
//! Each cluster stores one `u32`: the number of lights in the top 8 bits and
//! the offset of its run in the light index list in the low 24 bits. An empty
//! cluster is `0`.

use photon_core::{ClusterGrid, PhotonError, Result};

pub const COUNT_BITS: u32 = 8;
pub const OFFSET_BITS: u32 = 24;
pub const MAX_CLUSTER_LIGHTS: usize = (1 << COUNT_BITS) - 1;
pub const MAX_LIST_OFFSET: usize = (1 << OFFSET_BITS) - 1;

pub fn encode(offset: usize, count: usize) -> Result<u32> {
    if offset > MAX_LIST_OFFSET || count > MAX_CLUSTER_LIGHTS {
        return Err(PhotonError::EncodingOverflow { offset, count });
    }
    Ok(((count as u32) << OFFSET_BITS) | offset as u32)
}

/// `(offset, count)` of an encoded word.
#[inline]
pub fn decode(word: u32) -> (u32, u32) {
    (word & MAX_LIST_OFFSET as u32, word >> OFFSET_BITS)
}

/// Like [`encode`], but never fails: a count above 255 is clamped (the
/// shader sees only the first 255 lights) and an unrepresentable offset
/// leaves the cluster empty. Both cases are logged.
pub fn encode_clamped(offset: usize, count: usize) -> u32 {
    match encode(offset, count) {
        Ok(word) => word,
        Err(_) if offset > MAX_LIST_OFFSET => {
            log::warn!("Light list offset {} exceeds 24 bits, cluster left empty", offset);
            0
        }
        Err(_) => {
            log::warn!(
                "Cluster has {} lights, clamped to {}",
                count,
                MAX_CLUSTER_LIGHTS
            );
            ((MAX_CLUSTER_LIGHTS as u32) << OFFSET_BITS) | offset as u32
        }
    }
}

/// CPU side of the `tiles_x * tiles_y * depth_slices` `R32Uint` texture.
#[derive(Debug, Clone)]
pub struct ClusterMap {
    grid: ClusterGrid,
    words: Vec<u32>,
}

impl ClusterMap {
    pub fn new(grid: ClusterGrid) -> Self {
        Self {
            grid,
            words: vec![0; grid.cluster_count()],
        }
    }

    pub fn grid(&self) -> ClusterGrid {
        self.grid
    }

    pub fn get(&self, x: u32, y: u32, slice: u32) -> u32 {
        self.words[self.grid.index(x, y, slice)]
    }

    /// Decoded `(offset, count)` of a cluster.
    pub fn entry(&self, x: u32, y: u32, slice: u32) -> (u32, u32) {
        decode(self.get(x, y, slice))
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> u32 {
        self.words[index]
    }

    #[inline]
    pub fn set_index(&mut self, index: usize, word: u32) {
        self.words[index] = word;
    }

    #[inline]
    pub fn clear_index(&mut self, index: usize) {
        self.words[index] = 0;
    }

    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    pub fn is_zeroed(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Texture upload bytes, `[slice][y][x]` order.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.words)
    }
}
