//! Plane helpers
//!
//! Planes are stored as `Vec4` with the normal in `xyz` and the signed
//! distance term in `w`, so that `plane.dot(p.extend(1.0))` is the signed
//! distance of `p` (positive on the inside).

use crate::error::{PhotonError, Result};
use glam::{Mat3, Vec3, Vec4};

/// Relative determinant threshold below which three planes are treated as
/// having no single common point.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Plane through three points, normal = `(b - a) x (c - a)`.
///
/// The winding decides which side is "inside": callers pass points so that
/// the cross product points into the volume being bounded.
pub fn plane_from_points(a: Vec3, b: Vec3, c: Vec3) -> Vec4 {
    let normal = (b - a).cross(c - a).normalize_or_zero();
    normal.extend(-normal.dot(a))
}

/// Plane through `origin` and two further points.
///
/// Used for the side planes of a tile frustum, which all pass through the
/// eye position.
pub fn plane_equation(origin: Vec3, a: Vec3, b: Vec3) -> Vec4 {
    plane_from_points(origin, a, b)
}

/// Plane with the given normal passing through `point`.
pub fn plane_from_normal_point(normal: Vec3, point: Vec3) -> Vec4 {
    normal.extend(-normal.dot(point))
}

/// Scale a plane so its normal has unit length.
pub fn normalize_plane(plane: Vec4) -> Vec4 {
    let len = plane.truncate().length();
    if len > 0.0 {
        plane / len
    } else {
        log::warn!("Cannot normalize plane {:?} with a zero-length normal", plane);
        plane
    }
}

#[inline]
pub fn signed_distance(plane: Vec4, point: Vec3) -> f32 {
    plane.dot(point.extend(1.0))
}

/// Common point of three planes, solved with Cramer's rule.
///
/// Fails with [`PhotonError::DegeneratePlanes`] when two of the planes are
/// (nearly) parallel.
pub fn intersect_three_planes(p1: Vec4, p2: Vec4, p3: Vec4) -> Result<Vec3> {
    let (n1, n2, n3) = (p1.truncate(), p2.truncate(), p3.truncate());

    // Columns are the per-axis coefficients; the determinant equals the one of
    // the row matrix [n1; n2; n3].
    let xs = Vec3::new(n1.x, n2.x, n3.x);
    let ys = Vec3::new(n1.y, n2.y, n3.y);
    let zs = Vec3::new(n1.z, n2.z, n3.z);
    let rhs = -Vec3::new(p1.w, p2.w, p3.w);

    let det = Mat3::from_cols(xs, ys, zs).determinant();
    let scale = n1.length() * n2.length() * n3.length();
    if !det.is_finite() || det.abs() <= DEGENERATE_EPSILON * scale.max(f32::MIN_POSITIVE) {
        log::debug!("Planes {:?}, {:?}, {:?} have no single common point (det {})", p1, p2, p3, det);
        return Err(PhotonError::DegeneratePlanes { determinant: det });
    }

    let x = Mat3::from_cols(rhs, ys, zs).determinant() / det;
    let y = Mat3::from_cols(xs, rhs, zs).determinant() / det;
    let z = Mat3::from_cols(xs, ys, rhs).determinant() / det;

    Ok(Vec3::new(x, y, z))
}
