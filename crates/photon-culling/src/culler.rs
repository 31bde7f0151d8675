//! Per-frame light culling
//!
//! A frame runs `FrustumCull -> PerClusterCull -> Encode` in
//! [`LightCuller::begin_frame`], hands the buffers over in
//! [`LightCuller::upload`] and clears what it wrote in
//! [`LightCuller::end_frame`].
//!
//! Within a cluster, light indices follow candidate order, which is ascending
//! light index. Runs are laid out in tile order (`x`, then `y`, then slice),
//! so the serial and parallel strategies produce identical buffers.

use crate::cluster_key::ClusterKeyImage;
use crate::cluster_map::{self, ClusterMap};
use crate::light_list::LightIndexList;
use crate::tile_frustum::TileFrustumBuilder;
use crate::upload::{FrameUpload, UploadTarget};
use glam::Vec4;
use photon_core::{
    check_consistency, Camera, ClusterConfig, ClusterGrid, CullStrategy, OverflowPolicy, PhotonError,
    ProjectionParams, Result,
};
use photon_lighting::LightSet;
use rayon::prelude::*;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    FrustumCull,
    PerClusterCull,
    Encode,
    Uploaded,
    Reset,
}

/// Light that survived the camera frustum test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: u16,
    /// Center in `xyz`, radius in `w`.
    pub sphere: Vec4,
}

/// Light list run written for one occupied cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterRun {
    /// Linear cluster index, see [`ClusterGrid::index`].
    pub cluster: u32,
    pub offset: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullStats {
    pub candidates: usize,
    pub occupied_clusters: usize,
    pub lit_clusters: usize,
    /// Sphere tests charged against the test budget, `candidates` per
    /// evaluated cluster.
    pub sphere_tests: u64,
    pub lights_written: usize,
    pub skipped_clusters: usize,
    pub overflowed: bool,
    pub elapsed: Duration,
}

pub struct LightCuller {
    config: ClusterConfig,
    grid: ClusterGrid,
    light_list: LightIndexList,
    cluster_map: ClusterMap,
    candidates: Vec<Candidate>,
    runs: Vec<ClusterRun>,
    params: Option<ProjectionParams>,
    state: FrameState,
    stats: CullStats,
}

impl LightCuller {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        let grid = config.grid();
        log::info!(
            "Light culler: {}x{}x{} clusters, {:?} strategy, {:?} on overflow",
            grid.tiles_x,
            grid.tiles_y,
            grid.depth_slices,
            config.strategy,
            config.overflow_policy
        );
        Ok(Self {
            light_list: LightIndexList::new(0, config.overflow_policy),
            cluster_map: ClusterMap::new(grid),
            candidates: Vec::new(),
            runs: Vec::new(),
            params: None,
            state: FrameState::Idle,
            stats: CullStats::default(),
            grid,
            config,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn grid(&self) -> ClusterGrid {
        self.grid
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn light_list(&self) -> &LightIndexList {
        &self.light_list
    }

    pub fn cluster_map(&self) -> &ClusterMap {
        &self.cluster_map
    }

    /// Runs written this frame, including empty ones.
    pub fn runs(&self) -> &[ClusterRun] {
        &self.runs
    }

    /// Slice parameters used by the current frame.
    pub fn projection_params(&self) -> Option<&ProjectionParams> {
        self.params.as_ref()
    }

    pub fn last_stats(&self) -> &CullStats {
        &self.stats
    }

    /// Light indices the shading pass will see for cluster `(x, y, slice)`.
    pub fn cluster_lights(&self, x: u32, y: u32, slice: u32) -> &[u16] {
        let (offset, count) = self.cluster_map.entry(x, y, slice);
        let start = offset as usize;
        self.light_list
            .as_slice()
            .get(start..start + count as usize)
            .unwrap_or(&[])
    }

    /// Cull `lights` against every cluster marked in `keys` and encode the
    /// cluster map.
    pub fn begin_frame(&mut self, camera: &Camera, lights: &LightSet, keys: &ClusterKeyImage) -> Result<CullStats> {
        let start = Instant::now();

        if !keys.matches(&self.grid) {
            return Err(PhotonError::InvalidConfiguration(format!(
                "cluster key image is {}x{}, grid has {}x{} tiles",
                keys.width(),
                keys.height(),
                self.grid.tiles_x,
                self.grid.tiles_y
            )));
        }
        if lights.slot_count() > u16::MAX as usize + 1 {
            return Err(PhotonError::InvalidConfiguration(format!(
                "{} light slots do not fit in 16-bit light indices",
                lights.slot_count()
            )));
        }
        let params = ProjectionParams::new(camera.near_plane, camera.far_plane, self.grid.depth_slices)?;
        if let Some(gpu) = keys.produced_with() {
            check_consistency(&params, gpu)?;
        }

        if !matches!(self.state, FrameState::Idle | FrameState::Reset) {
            log::warn!(
                "Frame started while the previous one was in {:?}; clearing its cluster map entries",
                self.state
            );
            self.clear_written();
        }
        self.stats = CullStats::default();
        self.params = Some(params);

        self.state = FrameState::FrustumCull;
        let frustum = camera.frustum();
        self.candidates.clear();
        self.candidates.extend(
            lights
                .iter()
                .filter(|(_, light)| frustum.intersects_sphere(light.position(), light.radius()))
                .map(|(index, light)| Candidate {
                    index: index as u16,
                    sphere: light.position_radius(),
                }),
        );
        self.stats.candidates = self.candidates.len();

        self.state = FrameState::PerClusterCull;
        let capacity = lights.slot_count() * self.config.light_list_multiplier as usize;
        self.light_list.reset(capacity);
        self.runs.clear();
        let builder = TileFrustumBuilder::new(camera, self.grid, &params);
        let pass = ClusterPass {
            builder: &builder,
            keys,
            candidates: &self.candidates,
            budget: self.config.test_budget,
        };
        match self.config.strategy {
            CullStrategy::Serial => pass.run_serial(&mut self.light_list, &mut self.runs, &mut self.stats),
            CullStrategy::Parallel => pass.run_parallel(&mut self.light_list, &mut self.runs, &mut self.stats),
        }
        if self.stats.skipped_clusters > 0 {
            log::warn!(
                "Sphere test budget exhausted, {} of {} occupied clusters left without lights",
                self.stats.skipped_clusters,
                self.stats.occupied_clusters
            );
        }

        self.state = FrameState::Encode;
        for run in &self.runs {
            if run.count == 0 {
                continue;
            }
            let word = cluster_map::encode_clamped(run.offset as usize, run.count as usize);
            self.cluster_map.set_index(run.cluster as usize, word);
            self.stats.lit_clusters += 1;
        }

        self.stats.lights_written = self.light_list.len();
        self.stats.elapsed = start.elapsed();
        log::debug!(
            "Culled {} candidates into {}/{} occupied clusters: {} indices, {} sphere tests in {:?}",
            self.stats.candidates,
            self.stats.lit_clusters,
            self.stats.occupied_clusters,
            self.stats.lights_written,
            self.stats.sphere_tests,
            self.stats.elapsed
        );
        Ok(self.stats.clone())
    }

    /// Hand the written prefix of the light list and the cluster map to
    /// `target`.
    pub fn upload(&mut self, target: &mut dyn UploadTarget) -> Result<()> {
        if !matches!(self.state, FrameState::Encode | FrameState::Uploaded) {
            return Err(PhotonError::FrameOrder(format!("upload requested in state {:?}", self.state)));
        }
        target.upload(&FrameUpload {
            light_indices: self.light_list.upload_bytes(),
            light_index_count: self.light_list.len(),
            cluster_map: self.cluster_map.as_bytes(),
            dimensions: self.grid.dimensions(),
        })?;
        self.state = FrameState::Uploaded;
        Ok(())
    }

    /// Zero the cluster map words written this frame and clear the key image
    /// for the next cluster-key pass.
    pub fn end_frame(&mut self, keys: &mut ClusterKeyImage) {
        if self.state == FrameState::Encode {
            log::debug!("Frame ended without an upload");
        }
        self.clear_written();
        keys.clear_all();
        self.state = FrameState::Reset;
    }

    /// `begin_frame`, `upload` and `end_frame` in one call. The reset runs
    /// even when an earlier stage fails.
    pub fn run_frame(
        &mut self,
        camera: &Camera,
        lights: &LightSet,
        keys: &mut ClusterKeyImage,
        target: &mut dyn UploadTarget,
    ) -> Result<CullStats> {
        let result = self.begin_frame(camera, lights, keys).and_then(|stats| {
            self.upload(target)?;
            Ok(stats)
        });
        self.end_frame(keys);
        result
    }

    fn clear_written(&mut self) {
        for run in self.runs.drain(..) {
            self.cluster_map.clear_index(run.cluster as usize);
        }
        self.light_list.truncate(0);
    }
}

/// Borrowed inputs of the per-cluster stage.
struct ClusterPass<'a> {
    builder: &'a TileFrustumBuilder,
    keys: &'a ClusterKeyImage,
    candidates: &'a [Candidate],
    budget: Option<u64>,
}

impl ClusterPass<'_> {
    fn slice_mask(&self) -> u16 {
        let slices = self.builder.grid().depth_slices;
        if slices >= 16 {
            u16::MAX
        } else {
            (1u16 << slices) - 1
        }
    }

    /// Occupied clusters in write order, with the tile each belongs to.
    fn occupied(&self) -> (Vec<[Vec4; 4]>, Vec<(usize, u32, u32)>) {
        let grid = self.builder.grid();
        let valid = self.slice_mask();
        let mut sides = Vec::new();
        let mut clusters = Vec::new();
        for x in 0..grid.tiles_x {
            for y in 0..grid.tiles_y {
                let mask = self.keys.occupied_slices(x, y) & valid;
                if mask == 0 {
                    continue;
                }
                let tile = sides.len();
                sides.push(self.builder.side_planes(x, y));
                for slice in set_bits(mask) {
                    clusters.push((tile, grid.index(x, y, slice) as u32, slice));
                }
            }
        }
        (sides, clusters)
    }

    /// Number of clusters the budget allows, out of `occupied`.
    fn evaluated(&self, occupied: usize) -> usize {
        let per_cluster = self.candidates.len() as u64;
        match self.budget {
            Some(budget) if per_cluster > 0 => occupied.min((budget / per_cluster) as usize),
            _ => occupied,
        }
    }

    fn run_serial(&self, list: &mut LightIndexList, runs: &mut Vec<ClusterRun>, stats: &mut CullStats) {
        let (sides, clusters) = self.occupied();
        let evaluated = self.evaluated(clusters.len());
        stats.occupied_clusters = clusters.len();
        stats.skipped_clusters = clusters.len() - evaluated;

        let mut halted = false;
        for &(tile, cluster, slice) in &clusters[..evaluated] {
            stats.sphere_tests += self.candidates.len() as u64;
            let offset = list.len();
            if !halted {
                let frustum = self.builder.cluster_frustum(&sides[tile], slice);
                for candidate in self.candidates {
                    if !frustum.intersects_sphere(candidate.sphere.truncate(), candidate.sphere.w) {
                        continue;
                    }
                    if let Err(err) = list.push(candidate.index) {
                        log::warn!("{}; no more lights are written this frame", err);
                        stats.overflowed = true;
                        halted = true;
                        break;
                    }
                }
            }
            let count = list.len() - offset;
            log::trace!("Cluster {}: {} lights at offset {}", cluster, count, offset);
            runs.push(ClusterRun {
                cluster,
                offset: offset as u32,
                count: count as u32,
            });
        }
    }

    fn run_parallel(&self, list: &mut LightIndexList, runs: &mut Vec<ClusterRun>, stats: &mut CullStats) {
        let (sides, clusters) = self.occupied();
        let evaluated = self.evaluated(clusters.len());
        stats.occupied_clusters = clusters.len();
        stats.skipped_clusters = clusters.len() - evaluated;
        stats.sphere_tests = evaluated as u64 * self.candidates.len() as u64;
        let clusters = &clusters[..evaluated];

        let counts: Vec<usize> = clusters
            .par_iter()
            .map(|&(tile, _, slice)| {
                let frustum = self.builder.cluster_frustum(&sides[tile], slice);
                self.candidates
                    .iter()
                    .filter(|c| frustum.intersects_sphere(c.sphere.truncate(), c.sphere.w))
                    .count()
            })
            .collect();

        let total: usize = counts.iter().sum();
        let room = match list.policy() {
            OverflowPolicy::Grow => total,
            OverflowPolicy::DropAndLog => {
                let remaining = list.remaining();
                if total > remaining {
                    log::warn!(
                        "{}; no more lights are written this frame",
                        PhotonError::LightListOverflow {
                            capacity: list.capacity(),
                            requested: list.len() + total,
                        }
                    );
                    stats.overflowed = true;
                }
                total.min(remaining)
            }
        };

        // Exclusive prefix sum, with runs past the room cut short.
        let base = list.len();
        let mut offset = 0;
        runs.reserve(clusters.len());
        for (&(_, cluster, _), &count) in clusters.iter().zip(&counts) {
            let kept = count.min(room - offset);
            runs.push(ClusterRun {
                cluster,
                offset: (base + offset) as u32,
                count: kept as u32,
            });
            offset += kept;
        }

        let written = match list.reserve_run(offset) {
            Ok(written) => written,
            Err(err) => {
                log::warn!("{}; no more lights are written this frame", err);
                stats.overflowed = true;
                for run in runs.iter_mut() {
                    run.count = 0;
                }
                return;
            }
        };

        let mut rest = written;
        let mut slots = Vec::with_capacity(clusters.len());
        for run in runs.iter() {
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(run.count as usize);
            slots.push(head);
            rest = tail;
        }

        clusters
            .par_iter()
            .zip(slots.into_par_iter())
            .for_each(|(&(tile, _, slice), slot)| {
                if slot.is_empty() {
                    return;
                }
                let frustum = self.builder.cluster_frustum(&sides[tile], slice);
                let hits = self
                    .candidates
                    .iter()
                    .filter(|c| frustum.intersects_sphere(c.sphere.truncate(), c.sphere.w));
                for (dst, candidate) in slot.iter_mut().zip(hits) {
                    *dst = candidate.index;
                }
            });
    }
}

/// Indices of the set bits of `mask`, lowest first.
fn set_bits(mut mask: u16) -> impl Iterator<Item = u32> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let bit = mask.trailing_zeros();
        mask &= mask - 1;
        Some(bit)
    })
}
