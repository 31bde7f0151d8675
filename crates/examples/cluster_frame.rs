//! Clustered light culling frame loop without a GPU
//!
//! Renders a depth buffer of a floor and a few boxes on the CPU, runs the
//! software cluster-key pass over it and culls the 256-light grid layout
//! against the occupied clusters while the camera orbits the scene.
//!
//! Usage: `cluster_frame [frames] [serial|parallel]`
//! Set `RUST_LOG=debug` for per-frame culler output.

use glam::{UVec2, Vec3};
use photon::prelude::*;
use photon::PhotonError;

struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    fn new(center: Vec3, half_extent: Vec3) -> Self {
        Self {
            min: center - half_extent,
            max: center + half_extent,
        }
    }

    /// Entry distance along the ray, slab method.
    fn hit(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let inv = dir.recip();
        let t0 = (self.min - origin) * inv;
        let t1 = (self.max - origin) * inv;
        let near = t0.min(t1).max_element();
        let far = t0.max(t1).min_element();
        (near <= far && far > 0.0).then_some(near.max(0.0))
    }
}

struct Scene {
    floor_height: f32,
    boxes: Vec<Aabb>,
}

impl Scene {
    fn new() -> Self {
        let mut boxes = Vec::new();
        for i in 0..6 {
            let angle = i as f32 / 6.0 * std::f32::consts::TAU;
            let center = Vec3::new(angle.cos() * 40.0, 8.0, angle.sin() * 40.0);
            boxes.push(Aabb::new(center, Vec3::new(6.0, 8.0, 6.0)));
        }
        boxes.push(Aabb::new(Vec3::new(0.0, 15.0, 0.0), Vec3::new(10.0, 15.0, 10.0)));
        Self {
            floor_height: 0.0,
            boxes,
        }
    }

    fn hit(&self, origin: Vec3, dir: Vec3) -> Option<f32> {
        let floor = if dir.y < -1e-6 {
            Some((self.floor_height - origin.y) / dir.y).filter(|&t| t > 0.0)
        } else {
            None
        };
        self.boxes
            .iter()
            .filter_map(|b| b.hit(origin, dir))
            .chain(floor)
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn parse_strategy(arg: Option<String>) -> photon::Result<CullStrategy> {
    match arg.as_deref() {
        None | Some("serial") => Ok(CullStrategy::Serial),
        Some("parallel") => Ok(CullStrategy::Parallel),
        Some(other) => Err(PhotonError::InvalidConfiguration(format!(
            "unknown strategy '{}', expected serial or parallel",
            other
        ))),
    }
}

fn run() -> photon::Result<()> {
    let mut args = std::env::args().skip(1);
    let frames: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(120);
    let strategy = parse_strategy(args.next())?;

    let config = ClusterConfig::default().with_strategy(strategy);
    let grid = config.grid();
    let scene = Scene::new();
    let lights = LightSet::grid_layout();
    log::info!("Scene: {} boxes, {} lights", scene.boxes.len(), lights.len());

    let mut camera = Camera::new_perspective(45f32.to_radians(), UVec2::new(640, 360), 0.1, 500.0);
    let mut culler = LightCuller::new(config.clone())?;
    let mut pass = SoftwareClusterKeyPass::for_camera(grid, &camera)?;
    let mut reader = ClusterKeyReader::new(&grid, config.readback);
    let mut upload = RecordingUpload::default();

    let mut total = std::time::Duration::ZERO;
    let mut peak = 0;
    for frame in 0..frames {
        let angle = frame as f32 / frames.max(1) as f32 * std::f32::consts::TAU;
        camera.position = Vec3::new(angle.cos() * 110.0, 45.0, angle.sin() * 110.0);
        camera.look_at(Vec3::new(0.0, 10.0, 0.0), Vec3::Y);

        pass.trace_depth(&camera, |origin, dir| scene.hit(origin, dir));
        let keys = reader.read(&mut pass)?;
        let stats = culler.run_frame(&camera, &lights, keys, &mut upload)?;

        total += stats.elapsed;
        peak = peak.max(stats.lights_written);
        if frame % 30 == 0 {
            log::info!(
                "Frame {}: {} candidates, {} occupied / {} lit clusters, {} indices, {:?}",
                frame,
                stats.candidates,
                stats.occupied_clusters,
                stats.lit_clusters,
                stats.lights_written,
                stats.elapsed
            );
        }
    }

    log::info!(
        "{} frames, {} uploads, peak {} light indices, average cull time {:?}",
        frames,
        upload.uploads,
        peak,
        total / frames.max(1)
    );
    Ok(())
}

fn main() {
    env_logger::init();
    log::info!("Starting clustered light culling example");

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
