#![allow(dead_code)]

use glam::{Mat4, UVec2, Vec3, Vec4};
use photon_core::{Camera, ClusterGrid, Frustum};
use photon_culling::{ClusterKeyImage, SoftwareClusterKeyPass};
use photon_lighting::LightSet;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::Range;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Camera at the origin looking down -z, 45 degree field of view.
pub fn camera() -> Camera {
    Camera::new_perspective(45f32.to_radians(), UVec2::new(256, 256), 0.1, 500.0)
}

/// `count` lights spread over a 100 x 100 x 100 box in front of the camera.
pub fn lights_in_box(seed: u64, count: usize, radius: Range<f32>) -> LightSet {
    let mut rng = StdRng::seed_from_u64(seed);
    LightSet::uniform_random(
        count,
        Vec3::new(-50.0, -50.0, -100.0),
        Vec3::new(50.0, 50.0, 0.0),
        radius,
        &mut rng,
    )
    .unwrap()
}

pub fn full_keys(grid: &ClusterGrid) -> ClusterKeyImage {
    let mut keys = ClusterKeyImage::new(grid);
    for y in 0..grid.tiles_y {
        for x in 0..grid.tiles_x {
            keys.or_mask(x, y, u16::MAX);
        }
    }
    keys
}

/// Floor at `y = -4`, a sphere of radius 6 at `(8, 0, -30)` and a back wall
/// at `z = -120`.
pub fn scene_hit(origin: Vec3, dir: Vec3) -> Option<f32> {
    let mut best: Option<f32> = None;
    let mut consider = |t: f32| {
        if t > 0.0 && best.map_or(true, |b| t < b) {
            best = Some(t);
        }
    };

    if dir.y.abs() > 1e-6 {
        consider((-4.0 - origin.y) / dir.y);
    }
    if dir.z.abs() > 1e-6 {
        consider((-120.0 - origin.z) / dir.z);
    }

    let center = Vec3::new(8.0, 0.0, -30.0);
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - 36.0;
    let disc = b * b - c;
    if disc >= 0.0 {
        consider(-b - disc.sqrt());
    }
    best
}

/// Keys the cluster-key pass produces for [`scene_hit`].
pub fn scene_pass(camera: &Camera, grid: ClusterGrid) -> SoftwareClusterKeyPass {
    let mut pass = SoftwareClusterKeyPass::for_camera(grid, camera).unwrap();
    pass.trace_depth(camera, scene_hit);
    pass
}

pub fn scene_keys(camera: &Camera, grid: ClusterGrid) -> ClusterKeyImage {
    let mut keys = ClusterKeyImage::new(&grid);
    scene_pass(camera, grid).classify(&mut keys).unwrap();
    keys
}

/// Slack on sphere radii when comparing against the reference clusters,
/// absorbing float differences between the two plane constructions.
pub const REFERENCE_SLACK: f32 = 1e-2;

/// Cluster `(x, y, slice)` built from an off-centre OpenGL projection of the
/// tile's near-plane rectangle, clipped at the slice's depth range.
pub fn reference_cluster(camera: &Camera, grid: ClusterGrid, x: u32, y: u32, slice: u32) -> Frustum {
    let ratio = camera.far_plane / camera.near_plane;
    let depth = |i: u32| camera.near_plane * ratio.powf(i as f32 / grid.depth_slices as f32);
    let (n, f) = (depth(slice), depth(slice + 1));

    let tan_y = (0.5 * camera.fov_y).tan();
    let tan_x = tan_y * camera.viewport.x as f32 / camera.viewport.y as f32;
    let edge = |i: u32, count: u32, tan: f32| n * tan * (2.0 * i as f32 / count as f32 - 1.0);
    let (l, r) = (edge(x, grid.tiles_x, tan_x), edge(x + 1, grid.tiles_x, tan_x));
    let (b, t) = (edge(y, grid.tiles_y, tan_y), edge(y + 1, grid.tiles_y, tan_y));

    let projection = Mat4::from_cols(
        Vec4::new(2.0 * n / (r - l), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * n / (t - b), 0.0, 0.0),
        Vec4::new((r + l) / (r - l), (t + b) / (t - b), -(f + n) / (f - n), -1.0),
        Vec4::new(0.0, 0.0, -2.0 * f * n / (f - n), 0.0),
    );
    Frustum::from_matrix(projection * camera.view_matrix()).normalized()
}

/// Lights of cluster `(x, y, slice)` by the reference geometry: those that
/// must be listed and those that may be listed.
pub fn reference_lights(
    camera: &Camera,
    grid: ClusterGrid,
    lights: &LightSet,
    x: u32,
    y: u32,
    slice: u32,
) -> (Vec<u16>, Vec<u16>) {
    let view = camera.frustum();
    let cluster = reference_cluster(camera, grid, x, y, slice);
    let hits = |slack: f32| -> Vec<u16> {
        lights
            .iter()
            .filter(|(_, l)| {
                let radius = l.radius() + slack;
                view.intersects_sphere(l.position(), radius) && cluster.intersects_sphere(l.position(), radius)
            })
            .map(|(i, _)| i as u16)
            .collect()
    };
    (hits(-REFERENCE_SLACK), hits(REFERENCE_SLACK))
}

/// Bounds on the number of (light, cluster) pairs over the occupied clusters
/// of `keys`, testing every light against every reference cluster.
pub fn brute_force_pairs(camera: &Camera, grid: ClusterGrid, lights: &LightSet, keys: &ClusterKeyImage) -> (usize, usize) {
    let (mut sure, mut possible) = (0, 0);
    for (x, y, mask) in keys.occupied_tiles() {
        for slice in 0..grid.depth_slices {
            if mask & (1 << slice) == 0 {
                continue;
            }
            let (must, may) = reference_lights(camera, grid, lights, x, y, slice);
            sure += must.len();
            possible += may.len();
        }
    }
    (sure, possible)
}
