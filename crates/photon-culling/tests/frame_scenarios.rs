mod common;

use common::*;
use glam::Vec3;
use photon_core::{ClusterConfig, ClusterGrid, CullStrategy, OverflowPolicy};
use photon_culling::{decode, ClusterKeyImage, LightCuller, RecordingUpload};
use photon_lighting::{LightSet, PointLight};

fn culler(config: ClusterConfig) -> LightCuller {
    LightCuller::new(config).unwrap()
}

#[test]
fn test_end_to_end_matches_brute_force() {
    init_logger();
    let camera = camera();
    let grid = ClusterGrid::new(8, 8, 16);
    let lights = lights_in_box(42, 256, 1.0..10.0);
    let mut keys = full_keys(&grid);
    let (sure, possible) = brute_force_pairs(&camera, grid, &lights, &keys);

    let mut culler = culler(ClusterConfig::default().with_light_list_multiplier(256));
    let stats = culler.begin_frame(&camera, &lights, &keys).unwrap();
    assert!(!stats.overflowed);
    assert_eq!(stats.occupied_clusters, grid.cluster_count());

    let written = culler.light_list().len();
    assert_eq!(written, stats.lights_written);
    let mut total = 0;
    for &word in culler.cluster_map().words() {
        let (offset, count) = decode(word);
        assert!((offset + count) as usize <= written);
        total += count as usize;
    }
    assert_eq!(total, written);
    assert!(sure <= written && written <= possible, "{sure} <= {written} <= {possible}");

    for slice in 0..grid.depth_slices {
        for y in 0..grid.tiles_y {
            for x in 0..grid.tiles_x {
                let run = culler.cluster_lights(x, y, slice);
                let (must, may) = reference_lights(&camera, grid, &lights, x, y, slice);
                for index in &must {
                    assert!(run.contains(index), "cluster ({x}, {y}, {slice}) misses light {index}");
                }
                for index in run {
                    assert!(may.contains(index), "cluster ({x}, {y}, {slice}) lists light {index}");
                }
            }
        }
    }

    let mut target = RecordingUpload::default();
    culler.upload(&mut target).unwrap();
    assert_eq!(target.light_indices, culler.light_list().as_slice());
    assert_eq!(target.cluster_map, culler.cluster_map().words());
    culler.end_frame(&mut keys);
    assert!(culler.cluster_map().is_zeroed());
}

#[test]
fn test_runs_reference_intersecting_lights_only() {
    let camera = camera();
    let lights = lights_in_box(3, 64, 2.0..6.0);
    let mut culler = culler(ClusterConfig::default());
    let grid = culler.grid();
    let keys = scene_keys(&camera, grid);
    culler.begin_frame(&camera, &lights, &keys).unwrap();

    let params = *culler.projection_params().unwrap();
    let builder = photon_culling::TileFrustumBuilder::new(&camera, grid, &params);
    for (x, y, mask) in keys.occupied_tiles() {
        for slice in 0..grid.depth_slices {
            if mask & (1 << slice) == 0 {
                continue;
            }
            let frustum = builder.cluster(x, y, slice);
            let run = culler.cluster_lights(x, y, slice);
            assert!(run.windows(2).all(|w| w[0] < w[1]), "run not ascending: {:?}", run);
            for &index in run {
                let light = lights.by_index(index as u32).unwrap();
                assert!(frustum.intersects_sphere(light.position(), light.radius()));
            }
        }
    }
}

#[test]
fn test_empty_scene() {
    let camera = camera();
    let mut culler = culler(ClusterConfig::default());
    let mut keys = full_keys(&culler.grid());
    let mut target = RecordingUpload::default();
    let stats = culler
        .run_frame(&camera, &LightSet::new(), &mut keys, &mut target)
        .unwrap();

    assert_eq!(stats.lights_written, 0);
    assert_eq!(stats.lit_clusters, 0);
    assert!(target.light_indices.is_empty());
    assert!(target.cluster_map.iter().all(|&w| w == 0));
}

#[test]
fn test_single_dominant_light() {
    let camera = camera();
    let mut culler = culler(ClusterConfig::default());
    let grid = culler.grid();
    let keys = scene_keys(&camera, grid);
    assert!(keys.occupied_cluster_count() > 0);
    let lights = LightSet::from_lights([PointLight::new(Vec3::ZERO, 1000.0, Vec3::ONE).unwrap()]);

    let stats = culler.begin_frame(&camera, &lights, &keys).unwrap();
    assert_eq!(stats.lit_clusters, stats.occupied_clusters);
    for (x, y, mask) in keys.occupied_tiles() {
        for slice in 0..grid.depth_slices {
            if mask & (1 << slice) != 0 {
                assert_eq!(culler.cluster_lights(x, y, slice), &[0]);
            } else {
                assert_eq!(culler.cluster_map().get(x, y, slice), 0);
            }
        }
    }
}

#[test]
fn test_serial_and_parallel_agree() {
    let camera = camera();
    let lights = lights_in_box(11, 200, 1.0..12.0);
    let grid = ClusterGrid::default();
    let keys = scene_keys(&camera, grid);

    let mut serial = culler(ClusterConfig::default().with_strategy(CullStrategy::Serial));
    let mut parallel = culler(ClusterConfig::default().with_strategy(CullStrategy::Parallel));
    let a = serial.begin_frame(&camera, &lights, &keys).unwrap();
    let b = parallel.begin_frame(&camera, &lights, &keys).unwrap();

    assert_eq!(serial.light_list().as_slice(), parallel.light_list().as_slice());
    assert_eq!(serial.cluster_map().words(), parallel.cluster_map().words());
    assert_eq!(serial.runs(), parallel.runs());
    assert_eq!(a.lights_written, b.lights_written);
    assert_eq!(a.sphere_tests, b.sphere_tests);
    assert_eq!(a.lit_clusters, b.lit_clusters);
}

#[test]
fn test_overflow_drops_and_recovers() {
    init_logger();
    let camera = camera();
    let grid = ClusterGrid::default();
    let keys = full_keys(&grid);
    let lights = lights_in_box(5, 256, 30.0..40.0);
    assert!(brute_force_pairs(&camera, grid, &lights, &keys).0 > 256);

    for strategy in [CullStrategy::Serial, CullStrategy::Parallel] {
        let config = ClusterConfig::default()
            .with_light_list_multiplier(1)
            .with_overflow_policy(OverflowPolicy::DropAndLog)
            .with_strategy(strategy);
        let mut culler = culler(config);
        let mut keys = keys.clone();

        let stats = culler.begin_frame(&camera, &lights, &keys).unwrap();
        assert!(stats.overflowed);
        assert_eq!(stats.lights_written, 256);
        for &word in culler.cluster_map().words() {
            let (offset, count) = decode(word);
            assert!((offset + count) as usize <= 256);
        }
        culler.end_frame(&mut keys);

        // One light inside the only occupied cluster fits a capacity of one.
        let small = LightSet::from_lights([PointLight::new(Vec3::new(3.0, 3.0, -50.0), 1.0, Vec3::ONE).unwrap()]);
        let slice = culler.projection_params().unwrap().slice_index(50.0).unwrap();
        let mut keys = ClusterKeyImage::new(&grid);
        keys.mark(4, 4, slice);
        let stats = culler.begin_frame(&camera, &small, &keys).unwrap();
        assert!(!stats.overflowed);
        assert_eq!(stats.lights_written, 1);
        assert_eq!(culler.cluster_lights(4, 4, slice), &[0]);
    }
}

#[test]
fn test_serial_and_parallel_agree_on_overflow() {
    let camera = camera();
    let grid = ClusterGrid::default();
    let keys = full_keys(&grid);
    let lights = lights_in_box(5, 256, 30.0..40.0);
    let config = ClusterConfig::default()
        .with_light_list_multiplier(1)
        .with_overflow_policy(OverflowPolicy::DropAndLog);

    let mut serial = culler(config.clone().with_strategy(CullStrategy::Serial));
    let mut parallel = culler(config.with_strategy(CullStrategy::Parallel));
    serial.begin_frame(&camera, &lights, &keys).unwrap();
    parallel.begin_frame(&camera, &lights, &keys).unwrap();
    assert_eq!(serial.light_list().as_slice(), parallel.light_list().as_slice());
    assert_eq!(serial.cluster_map().words(), parallel.cluster_map().words());
}

#[test]
fn test_grow_policy_writes_everything() {
    let camera = camera();
    let grid = ClusterGrid::default();
    let keys = full_keys(&grid);
    let lights = lights_in_box(5, 256, 30.0..40.0);
    let (sure, possible) = brute_force_pairs(&camera, grid, &lights, &keys);

    for strategy in [CullStrategy::Serial, CullStrategy::Parallel] {
        let config = ClusterConfig::default()
            .with_light_list_multiplier(1)
            .with_overflow_policy(OverflowPolicy::Grow)
            .with_strategy(strategy);
        let mut culler = culler(config);
        let stats = culler.begin_frame(&camera, &lights, &keys).unwrap();
        assert!(!stats.overflowed);
        assert!(sure <= stats.lights_written && stats.lights_written <= possible);
        assert!(culler.light_list().capacity() >= stats.lights_written);
    }
}

#[test]
fn test_budget_leaves_trailing_clusters_empty() {
    let camera = camera();
    let grid = ClusterGrid::default();
    let keys = full_keys(&grid);
    let lights = lights_in_box(8, 32, 5.0..10.0);

    let mut unbounded = culler(ClusterConfig::default());
    let candidates = unbounded.begin_frame(&camera, &lights, &keys).unwrap().candidates as u64;
    assert!(candidates > 0);

    for strategy in [CullStrategy::Serial, CullStrategy::Parallel] {
        let config = ClusterConfig::default()
            .with_test_budget(Some(candidates * 100 + candidates / 2))
            .with_strategy(strategy);
        let mut culler = culler(config);
        let stats = culler.begin_frame(&camera, &lights, &keys).unwrap();
        assert_eq!(stats.occupied_clusters, grid.cluster_count());
        assert_eq!(stats.skipped_clusters, grid.cluster_count() - 100);
        assert_eq!(stats.sphere_tests, candidates * 100);
        assert_eq!(&culler.runs()[..], &unbounded.runs()[..100]);
    }
}

#[test]
fn test_consecutive_frames_do_not_leak() {
    let mut camera = camera();
    let lights = LightSet::grid_layout();
    let mut culler = culler(ClusterConfig::default());
    let grid = culler.grid();
    let mut target = RecordingUpload::default();

    let mut keys = ClusterKeyImage::new(&grid);
    for frame in 0..4 {
        camera.position = Vec3::new(frame as f32 * 10.0, 20.0, 60.0);
        camera.look_at(Vec3::ZERO, Vec3::Y);
        scene_pass(&camera, grid).classify(&mut keys).unwrap();
        let occupied = keys.occupied_cluster_count();

        let stats = culler.run_frame(&camera, &lights, &mut keys, &mut target).unwrap();
        assert_eq!(stats.occupied_clusters, occupied);
        assert!(keys.is_clear());
        assert!(culler.cluster_map().is_zeroed());

        // Clusters outside this frame's keys must not carry stale words.
        let (map, indices) = cull_fresh(&camera, &lights, grid);
        assert_eq!(target.cluster_map, map);
        assert_eq!(target.light_indices, indices);
    }
}

fn cull_fresh(camera: &photon_core::Camera, lights: &LightSet, grid: ClusterGrid) -> (Vec<u32>, Vec<u16>) {
    let mut culler = culler(ClusterConfig::default());
    let keys = scene_keys(camera, grid);
    culler.begin_frame(camera, lights, &keys).unwrap();
    (culler.cluster_map().words().to_vec(), culler.light_list().as_slice().to_vec())
}
