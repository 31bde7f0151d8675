use crate::error::{PhotonError, Result};
use crate::grid::ClusterGrid;
use serde::{Deserialize, Serialize};

/// Largest number of depth slices a `u16` cluster key can describe.
pub const MAX_DEPTH_SLICES: u32 = 16;

/// What to do when the light index list would exceed its capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Double the capacity and keep writing.
    Grow,
    /// Stop writing for the rest of the frame and log a warning.
    DropAndLog,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::Grow
    }
}

/// How the CPU waits for the cluster-key readback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadbackMode {
    /// Stall until the GPU result is available.
    Blocking,
    /// Poll a fence; reuse the last complete mask while the result is pending,
    /// for at most `max_frames_in_flight` consecutive frames.
    Fenced { max_frames_in_flight: u32 },
}

impl Default for ReadbackMode {
    fn default() -> Self {
        ReadbackMode::Blocking
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CullStrategy {
    /// Single-threaded loop with a running write cursor.
    Serial,
    /// Count, prefix-sum, then write all cluster runs in parallel.
    Parallel,
}

impl Default for CullStrategy {
    fn default() -> Self {
        CullStrategy::Serial
    }
}

/// Configuration for the cluster assignment and light culling stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub tiles_x: u32,
    pub tiles_y: u32,
    /// Number of logarithmic depth slices (at most 16).
    pub depth_slices: u32,
    /// Light index list capacity = light slots * multiplier.
    pub light_list_multiplier: u32,
    pub overflow_policy: OverflowPolicy,
    pub readback: ReadbackMode,
    pub strategy: CullStrategy,
    /// Upper bound on sphere-vs-cluster tests per frame. Clusters past the
    /// budget are left empty.
    pub test_budget: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            tiles_x: 8,
            tiles_y: 8,
            depth_slices: 16,
            light_list_multiplier: 64,
            overflow_policy: OverflowPolicy::Grow,
            readback: ReadbackMode::Blocking,
            strategy: CullStrategy::Serial,
            test_budget: None,
        }
    }
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, tiles_x: u32, tiles_y: u32, depth_slices: u32) -> Self {
        self.tiles_x = tiles_x;
        self.tiles_y = tiles_y;
        self.depth_slices = depth_slices;
        self
    }

    pub fn with_light_list_multiplier(mut self, multiplier: u32) -> Self {
        self.light_list_multiplier = multiplier;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn with_readback(mut self, readback: ReadbackMode) -> Self {
        self.readback = readback;
        self
    }

    pub fn with_strategy(mut self, strategy: CullStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_test_budget(mut self, budget: Option<u64>) -> Self {
        self.test_budget = budget;
        self
    }

    pub fn grid(&self) -> ClusterGrid {
        ClusterGrid::new(self.tiles_x, self.tiles_y, self.depth_slices)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tiles_x == 0 || self.tiles_y == 0 || self.depth_slices == 0 {
            return Err(PhotonError::InvalidConfiguration(format!(
                "cluster grid dimensions must be non-zero, got {}x{}x{}",
                self.tiles_x, self.tiles_y, self.depth_slices
            )));
        }
        if self.depth_slices > MAX_DEPTH_SLICES {
            return Err(PhotonError::InvalidConfiguration(format!(
                "at most {} depth slices fit in a cluster key, got {}",
                MAX_DEPTH_SLICES, self.depth_slices
            )));
        }
        if self.grid().cluster_count() > (1 << 24) {
            return Err(PhotonError::InvalidConfiguration(format!(
                "{} clusters exceed the 24-bit cluster map range",
                self.grid().cluster_count()
            )));
        }
        if self.light_list_multiplier == 0 {
            return Err(PhotonError::InvalidConfiguration(
                "light list multiplier must be at least 1".into(),
            ));
        }
        if let ReadbackMode::Fenced { max_frames_in_flight: 0 } = self.readback {
            return Err(PhotonError::InvalidConfiguration(
                "fenced readback needs at least one frame in flight".into(),
            ));
        }
        Ok(())
    }
}
