//! Logarithmic depth slicing
//!
//! Slice `i` of `n` covers linear view depth
//! `[near * (far / near)^(i / n), near * (far / near)^((i + 1) / n))`.
//! The same closed form is evaluated by the cluster-key shader, so the
//! uniform block and the WGSL helper are generated from here rather than
//! written by hand on the GPU side.

use crate::error::{PhotonError, Result};
use bytemuck::{Pod, Zeroable};

/// Boundaries of `slice_count` logarithmic slices between `near` and `far`.
///
/// Returns `slice_count + 1` strictly increasing values; the first and last
/// are exactly `near` and `far`.
pub fn slice_boundaries(near: f32, far: f32, slice_count: u32) -> Vec<f32> {
    let ratio = far / near;
    let mut boundaries: Vec<f32> = (0..=slice_count)
        .map(|i| near * ratio.powf(i as f32 / slice_count as f32))
        .collect();
    if let Some(first) = boundaries.first_mut() {
        *first = near;
    }
    if let Some(last) = boundaries.last_mut() {
        *last = far;
    }
    boundaries
}

/// Precomputed slice mapping: `slice = floor(log2(depth) * scale - offset)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionParams {
    pub near: f32,
    pub far: f32,
    pub slice_count: u32,
    pub scale: f32,
    pub offset: f32,
}

impl ProjectionParams {
    pub fn new(near: f32, far: f32, slice_count: u32) -> Result<Self> {
        if !(near > 0.0 && far > near && near.is_finite() && far.is_finite()) {
            return Err(PhotonError::InvalidConfiguration(format!(
                "depth range must satisfy 0 < near < far, got near={} far={}",
                near, far
            )));
        }
        if slice_count == 0 {
            return Err(PhotonError::InvalidConfiguration(
                "slice count must be at least 1".into(),
            ));
        }

        let lfn = (far / near).log2();
        let scale = slice_count as f32 / lfn;
        let offset = slice_count as f32 * near.log2() / lfn;

        Ok(Self {
            near,
            far,
            slice_count,
            scale,
            offset,
        })
    }

    pub fn boundaries(&self) -> Vec<f32> {
        slice_boundaries(self.near, self.far, self.slice_count)
    }

    /// Slice containing `linear_depth`, or `None` outside `[near, far)`.
    pub fn slice_index(&self, linear_depth: f32) -> Option<u32> {
        if !(linear_depth >= self.near && linear_depth < self.far) {
            return None;
        }
        Some(self.slice_of_clamped(linear_depth))
    }

    /// Slice of `linear_depth` clamped into `[0, slice_count)`.
    pub fn slice_of_clamped(&self, linear_depth: f32) -> u32 {
        let s = (linear_depth.max(f32::MIN_POSITIVE).log2() * self.scale - self.offset).floor();
        s.clamp(0.0, (self.slice_count - 1) as f32) as u32
    }

    pub fn to_uniform(&self) -> DepthSliceUniform {
        DepthSliceUniform {
            near: self.near,
            far: self.far,
            scale: self.scale,
            offset: self.offset,
        }
    }
}

/// GPU layout of the slice parameters (one `vec4<f32>`).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DepthSliceUniform {
    pub near: f32,
    pub far: f32,
    pub scale: f32,
    pub offset: f32,
}

/// Compare the parameters the CPU culler uses against the ones that were
/// handed to the GPU cluster-key pass.
pub fn check_consistency(cpu: &ProjectionParams, gpu: &ProjectionParams) -> Result<()> {
    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-5 * a.abs().max(b.abs()).max(1.0)
    }

    if cpu.slice_count != gpu.slice_count {
        return Err(PhotonError::InconsistentDepthParameters(format!(
            "slice count {} (cpu) vs {} (gpu)",
            cpu.slice_count, gpu.slice_count
        )));
    }
    if !close(cpu.near, gpu.near) || !close(cpu.far, gpu.far) {
        return Err(PhotonError::InconsistentDepthParameters(format!(
            "depth range [{}, {}] (cpu) vs [{}, {}] (gpu)",
            cpu.near, cpu.far, gpu.near, gpu.far
        )));
    }
    if !close(cpu.scale, gpu.scale) || !close(cpu.offset, gpu.offset) {
        return Err(PhotonError::InconsistentDepthParameters(format!(
            "slice mapping scale/offset {}/{} (cpu) vs {}/{} (gpu)",
            cpu.scale, cpu.offset, gpu.scale, gpu.offset
        )));
    }
    Ok(())
}

/// WGSL source of the slice mapping, to be prepended to the cluster-key and
/// shading shaders.
pub fn wgsl_slice_function(slice_count: u32) -> String {
    format!(
        "const DEPTH_SLICES: u32 = {slice_count}u;\n\
         \n\
         struct DepthSliceParams {{\n\
         \x20   near: f32,\n\
         \x20   far: f32,\n\
         \x20   scale: f32,\n\
         \x20   offset: f32,\n\
         }};\n\
         \n\
         fn depth_slice(params: DepthSliceParams, linear_depth: f32) -> u32 {{\n\
         \x20   let s = floor(log2(linear_depth) * params.scale - params.offset);\n\
         \x20   return u32(clamp(s, 0.0, f32(DEPTH_SLICES - 1u)));\n\
         }}\n"
    )
}
