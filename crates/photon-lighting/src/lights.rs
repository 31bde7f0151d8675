use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};
use photon_core::{PhotonError, Result};

/// Point light bounded by a sphere of influence.
///
/// The radius is always positive and finite; fields change only through the
/// validating setters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub(crate) position: Vec3,
    pub(crate) radius: f32,
    pub(crate) color: Vec3,
}

fn check_radius(radius: f32) -> Result<()> {
    if !(radius > 0.0 && radius.is_finite()) {
        return Err(PhotonError::InvalidConfiguration(format!(
            "point light radius must be positive and finite, got {}",
            radius
        )));
    }
    Ok(())
}

fn check_position(position: Vec3) -> Result<()> {
    if !position.is_finite() {
        return Err(PhotonError::InvalidConfiguration(format!(
            "point light position must be finite, got {:?}",
            position
        )));
    }
    Ok(())
}

impl PointLight {
    pub fn new(position: Vec3, radius: f32, color: Vec3) -> Result<Self> {
        check_radius(radius)?;
        check_position(position)?;
        Ok(Self {
            position,
            radius,
            color,
        })
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_position(&mut self, position: Vec3) -> Result<()> {
        check_position(position)?;
        self.position = position;
        Ok(())
    }

    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        check_radius(radius)?;
        self.radius = radius;
        Ok(())
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    /// Bounding sphere as `(center, radius)`.
    pub fn sphere(&self) -> (Vec3, f32) {
        (self.position, self.radius)
    }

    /// Position in `xyz`, radius in `w`.
    pub fn position_radius(&self) -> Vec4 {
        self.position.extend(self.radius)
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            radius: 10.0,
            color: Vec3::ONE,
        }
    }
}

/// GPU layout of a point light as read by the shading pass.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightUniform {
    pub position_radius: Vec4,
    pub color: Vec4,
}

impl From<&PointLight> for LightUniform {
    fn from(light: &PointLight) -> Self {
        Self {
            position_radius: light.position_radius(),
            color: light.color.extend(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive_radius() {
        assert!(PointLight::new(Vec3::ZERO, 0.0, Vec3::ONE).is_err());
        assert!(PointLight::new(Vec3::ZERO, -1.0, Vec3::ONE).is_err());
        assert!(PointLight::new(Vec3::ZERO, f32::NAN, Vec3::ONE).is_err());
        assert!(PointLight::new(Vec3::splat(f32::INFINITY), 1.0, Vec3::ONE).is_err());
        assert!(PointLight::new(Vec3::ZERO, 0.5, Vec3::ONE).is_ok());
    }

    #[test]
    fn test_setters_keep_radius_valid() {
        let mut light = PointLight::new(Vec3::ZERO, 2.0, Vec3::ONE).unwrap();
        assert!(light.set_radius(-3.0).is_err());
        assert!(light.set_radius(f32::NAN).is_err());
        assert!(light.set_position(Vec3::new(f32::NAN, 0.0, 0.0)).is_err());
        assert_eq!(light.sphere(), (Vec3::ZERO, 2.0));

        light.set_radius(6.0).unwrap();
        light.set_position(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(light.sphere(), (Vec3::new(1.0, 2.0, 3.0), 6.0));
    }

    #[test]
    fn test_uniform_packing() {
        let light = PointLight::new(Vec3::new(1.0, 2.0, 3.0), 4.0, Vec3::new(0.5, 0.25, 1.0)).unwrap();
        let uniform = LightUniform::from(&light);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&uniform));
        assert_eq!(floats, &[1.0, 2.0, 3.0, 4.0, 0.5, 0.25, 1.0, 1.0]);
    }
}
