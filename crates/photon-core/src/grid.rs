use glam::{UVec2, UVec3, Vec2};

/// Fixed `tiles_x * tiles_y * depth_slices` partition of the view frustum.
///
/// Cells are addressed in the `[slice][y][x]` order of the 3D cluster map
/// texture; tile `y = 0` is the bottom row of the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClusterGrid {
    pub tiles_x: u32,
    pub tiles_y: u32,
    pub depth_slices: u32,
}

impl ClusterGrid {
    pub const fn new(tiles_x: u32, tiles_y: u32, depth_slices: u32) -> Self {
        Self {
            tiles_x,
            tiles_y,
            depth_slices,
        }
    }

    pub fn dimensions(&self) -> UVec3 {
        UVec3::new(self.tiles_x, self.tiles_y, self.depth_slices)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    pub fn cluster_count(&self) -> usize {
        self.tile_count() * self.depth_slices as usize
    }

    #[inline]
    pub fn tile_index(&self, x: u32, y: u32) -> usize {
        y as usize * self.tiles_x as usize + x as usize
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32, slice: u32) -> usize {
        slice as usize * self.tile_count() + self.tile_index(x, y)
    }

    pub fn coords(&self, index: usize) -> UVec3 {
        let tiles = self.tile_count();
        let slice = index / tiles;
        let rem = index % tiles;
        UVec3::new(
            (rem % self.tiles_x as usize) as u32,
            (rem / self.tiles_x as usize) as u32,
            slice as u32,
        )
    }

    /// Size of one tile in pixels.
    pub fn tile_size_pixels(&self, viewport: UVec2) -> Vec2 {
        viewport.as_vec2() / Vec2::new(self.tiles_x as f32, self.tiles_y as f32)
    }

    /// Tile containing the pixel position `(px, py)` (origin bottom-left).
    /// Positions outside the viewport are clamped to the border tiles.
    pub fn tile_of_pixel(&self, px: f32, py: f32, viewport: UVec2) -> UVec2 {
        let size = self.tile_size_pixels(viewport);
        let x = (px / size.x).floor().clamp(0.0, (self.tiles_x - 1) as f32) as u32;
        let y = (py / size.y).floor().clamp(0.0, (self.tiles_y - 1) as f32) as u32;
        UVec2::new(x, y)
    }
}

impl Default for ClusterGrid {
    fn default() -> Self {
        Self::new(8, 8, 16)
    }
}
