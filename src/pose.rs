//! Pose math: homogeneous 4×4 transforms built, composed and applied
//! explicitly.
//!
//! Composition follows matrix order: in `outer * inner` the inner transform
//! acts on the point first.  Angles are degrees, right-handed about the
//! given axis; +Y is up and +Z is the canonical forward direction.

use glam::{Mat4, Vec3};

/// Principal rotation axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Translation by `(dx, dy, dz)`.
pub fn translation(dx: f32, dy: f32, dz: f32) -> Mat4 {
    Mat4::from_translation(Vec3::new(dx, dy, dz))
}

/// Translation by a vector.
pub fn translation_to(offset: Vec3) -> Mat4 {
    Mat4::from_translation(offset)
}

/// Rotation of `angle_degrees` about a principal axis.
pub fn rotation(angle_degrees: f32, axis: Axis) -> Mat4 {
    let radians = angle_degrees.to_radians();
    match axis {
        Axis::X => Mat4::from_rotation_x(radians),
        Axis::Y => Mat4::from_rotation_y(radians),
        Axis::Z => Mat4::from_rotation_z(radians),
    }
}

/// `outer * inner`: apply `inner` first, then `outer`.
pub fn compose(outer: Mat4, inner: Mat4) -> Mat4 {
    outer * inner
}

/// Rotation about an arbitrary point instead of the origin.
pub fn rotation_about(angle_degrees: f32, axis: Axis, pivot: Vec3) -> Mat4 {
    translation_to(pivot) * rotation(angle_degrees, axis) * translation_to(-pivot)
}

/// Transform `vertex` as the homogeneous point `(x, y, z, 1)` and drop `w`.
pub fn apply(matrix: &Mat4, vertex: Vec3) -> Vec3 {
    (*matrix * vertex.extend(1.0)).truncate()
}

/// Transform every vertex of `base` into `out`, replacing its contents.
pub fn apply_all(matrix: &Mat4, base: &[Vec3], out: &mut Vec<Vec3>) {
    out.clear();
    out.extend(base.iter().map(|v| apply(matrix, *v)));
}

/// Heading in degrees about +Y that turns +Z towards `to - from`.
///
/// Only the horizontal component of the motion counts.  Returns `None` when
/// it is zero so callers can keep their previous heading.
pub fn heading_degrees(from: Vec3, to: Vec3) -> Option<f32> {
    let delta = to - from;
    if delta.x.abs() <= f32::EPSILON && delta.z.abs() <= f32::EPSILON {
        return None;
    }
    Some(delta.x.atan2(delta.z).to_degrees())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
