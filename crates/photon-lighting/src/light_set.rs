//! Global light table
//!
//! The light index list stores raw slot indices, so a light keeps its slot for
//! as long as it lives. Removing a light vacates its slot without shifting any
//! other light; a later insert may reuse the slot under a new generation, which
//! invalidates stale handles.

use crate::lights::{LightUniform, PointLight};
use glam::Vec3;
use photon_core::Result;
use rand::Rng;
use std::ops::Range;

/// Stable reference to a light in a [`LightSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LightHandle {
    index: u32,
    generation: u32,
}

impl LightHandle {
    /// Slot index, the value written into the light index list.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    light: Option<PointLight>,
}

#[derive(Debug, Clone, Default)]
pub struct LightSet {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl LightSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lights<I: IntoIterator<Item = PointLight>>(lights: I) -> Self {
        let mut set = Self::new();
        for light in lights {
            set.insert(light);
        }
        set
    }

    pub fn insert(&mut self, light: PointLight) -> LightHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.light = Some(light);
            return LightHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            light: Some(light),
        });
        LightHandle {
            index,
            generation: 0,
        }
    }

    pub fn remove(&mut self, handle: LightHandle) -> Option<PointLight> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let light = slot.light.take()?;
        self.free.push(handle.index);
        self.live -= 1;
        Some(light)
    }

    pub fn get(&self, handle: LightHandle) -> Option<&PointLight> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.light.as_ref())
    }

    pub fn get_mut(&mut self, handle: LightHandle) -> Option<&mut PointLight> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.light.as_mut())
    }

    /// Light stored in slot `index`, regardless of generation.
    pub fn by_index(&self, index: u32) -> Option<&PointLight> {
        self.slots.get(index as usize).and_then(|slot| slot.light.as_ref())
    }

    /// Live lights in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &PointLight)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.light.as_ref().map(|light| (i as u32, light)))
    }

    /// Number of live lights.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of slots, live or vacant. Light indices are below this value.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.live = 0;
    }

    /// Replace the whole set, e.g. when the scene is reloaded.
    pub fn reload<I: IntoIterator<Item = PointLight>>(&mut self, lights: I) {
        self.clear();
        for light in lights {
            self.insert(light);
        }
        log::debug!("Light set reloaded with {} lights", self.live);
    }

    /// One uniform per slot; vacant slots upload as zero-radius lights.
    pub fn uniforms(&self) -> Vec<LightUniform> {
        self.slots
            .iter()
            .map(|slot| match &slot.light {
                Some(light) => LightUniform::from(light),
                None => bytemuck::Zeroable::zeroed(),
            })
            .collect()
    }

    /// 16 x 8 x 2 lattice of lights spread over a 160 x 75 x 100 area with
    /// radii cycling through 3, 9 and 15.
    pub fn grid_layout() -> Self {
        let extent = Vec3::new(80.0, 150.0, 50.0);
        let mut set = Self::new();
        for x in 0..16u32 {
            for y in 0..8u32 {
                for z in 0..2u32 {
                    let position = Vec3::new(
                        x as f32 / 4.0 * 2.0 * extent.x - extent.x + 0.25,
                        z as f32 / 4.0 * extent.y,
                        y as f32 / 4.0 * 2.0 * extent.z - extent.z,
                    );
                    let radius = 3.0 * (1 + 2 * ((x + y + z) % 3)) as f32;
                    let color = Vec3::new(x as f32 / 8.0, y as f32 / 8.0, 0.01 + z as f32 / 4.0)
                        .normalize_or_zero();
                    set.insert(PointLight {
                        position,
                        radius,
                        color,
                    });
                }
            }
        }
        set
    }

    /// `count` lights uniformly distributed in the box `[min, max]`.
    pub fn uniform_random<R: Rng + ?Sized>(
        count: usize,
        min: Vec3,
        max: Vec3,
        radius: Range<f32>,
        rng: &mut R,
    ) -> Result<Self> {
        let mut set = Self::new();
        for _ in 0..count {
            let position = Vec3::new(
                rng.gen_range(min.x..=max.x),
                rng.gen_range(min.y..=max.y),
                rng.gen_range(min.z..=max.z),
            );
            let r = if radius.start < radius.end {
                rng.gen_range(radius.clone())
            } else {
                radius.start
            };
            let color = Vec3::new(rng.gen(), rng.gen(), rng.gen());
            set.insert(PointLight::new(position, r, color)?);
        }
        Ok(set)
    }
}
