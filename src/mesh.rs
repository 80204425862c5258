//! Flat vertex buffers and the base/working pair every animated part owns.
//!
//! The base copy is captured once and never mutated; the working copy is
//! recomputed from it in full whenever a transform is applied.

use crate::pose;
use glam::{Mat4, Vec3};

// ---------------------------------------------------------------------------
// Mesh
// ---------------------------------------------------------------------------

/// Indexed triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Axis-aligned box with four vertices per face so faces shade flat.
    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        // (normal, u, v) with u × v = normal.
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z),
            (Vec3::NEG_X, Vec3::Z, Vec3::Y),
            (Vec3::Y, Vec3::Z, Vec3::X),
            (Vec3::NEG_Y, Vec3::X, Vec3::Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::Y, Vec3::X),
        ];

        let mut vertices = Vec::with_capacity(24);
        let mut triangles = Vec::with_capacity(12);
        for (normal, u, v) in faces {
            let base = vertices.len() as u32;
            for (su, sv) in [(-1.0_f32, -1.0_f32), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                vertices.push(center + (normal + u * su + v * sv) * half_extents);
            }
            triangles.push([base, base + 1, base + 2]);
            triangles.push([base, base + 2, base + 3]);
        }

        Self::new(vertices, triangles)
    }

    /// Closed cylinder centred on the origin with its axle along X.
    pub fn wheel(radius: f32, half_width: f32, segments: usize) -> Self {
        let n = segments.max(3);
        let mut vertices = Vec::with_capacity(2 * n + 2);

        for side in [-half_width, half_width] {
            for i in 0..n {
                let theta = i as f32 / n as f32 * std::f32::consts::TAU;
                vertices.push(Vec3::new(side, radius * theta.cos(), radius * theta.sin()));
            }
        }
        let left_center = vertices.len() as u32;
        vertices.push(Vec3::new(-half_width, 0.0, 0.0));
        let right_center = vertices.len() as u32;
        vertices.push(Vec3::new(half_width, 0.0, 0.0));

        let n32 = n as u32;
        let mut triangles = Vec::with_capacity(4 * n);
        for i in 0..n32 {
            let next = (i + 1) % n32;
            let (l0, l1) = (i, next);
            let (r0, r1) = (n32 + i, n32 + next);
            triangles.push([l0, l1, r1]);
            triangles.push([l0, r1, r0]);
            triangles.push([right_center, r0, r1]);
            triangles.push([left_center, l1, l0]);
        }

        Self::new(vertices, triangles)
    }
}

/// Recompute per-vertex normals as the normalised sum of incident face
/// normals (area weighted).  Triangles with out-of-range indices are skipped.
pub fn recalculate_normals(vertices: &[Vec3], triangles: &[[u32; 3]], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(vertices.len(), Vec3::ZERO);

    for tri in triangles {
        let [a, b, c] = tri.map(|i| i as usize);
        let (Some(pa), Some(pb), Some(pc)) = (vertices.get(a), vertices.get(b), vertices.get(c))
        else {
            continue;
        };
        let face = (*pb - *pa).cross(*pc - *pa);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    for n in normals.iter_mut() {
        *n = n.normalize_or_zero();
    }
}

// ---------------------------------------------------------------------------
// Deformable mesh
// ---------------------------------------------------------------------------

/// An immutable base mesh plus the working vertices/normals derived from it.
#[derive(Debug, Clone)]
pub struct DeformableMesh {
    base: Mesh,
    working: Vec<Vec3>,
    normals: Vec<Vec3>,
    released: bool,
}

impl DeformableMesh {
    /// Seed the working copy from `base`.
    pub fn new(base: Mesh) -> Self {
        let working = base.vertices.clone();
        let mut normals = Vec::new();
        recalculate_normals(&working, &base.triangles, &mut normals);
        Self {
            base,
            working,
            normals,
            released: false,
        }
    }

    pub fn base(&self) -> &Mesh {
        &self.base
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.working
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.base.triangles
    }

    /// Rebuild every working vertex as `transform * base`, then the normals.
    pub fn apply(&mut self, transform: &Mat4) {
        if self.released {
            return;
        }
        pose::apply_all(transform, &self.base.vertices, &mut self.working);
        recalculate_normals(&self.working, &self.base.triangles, &mut self.normals);
    }

    /// Centroid of the working vertices.
    pub fn centroid(&self) -> Vec3 {
        if self.working.is_empty() {
            return Vec3::ZERO;
        }
        self.working.iter().copied().sum::<Vec3>() / self.working.len() as f32
    }

    /// Free both copies.  Safe to call more than once.
    pub fn release(&mut self) {
        self.base = Mesh::default();
        self.working = Vec::new();
        self.normals = Vec::new();
        self.released = true;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{rotation, translation, Axis};

    #[test]
    fn cuboid_has_flat_outward_normals() {
        let m = DeformableMesh::new(Mesh::cuboid(Vec3::ZERO, Vec3::splat(1.0)));
        assert_eq!(m.vertices().len(), 24);
        assert_eq!(m.triangles().len(), 12);
        for (v, n) in m.vertices().iter().zip(m.normals()) {
            // Each vertex sits on the face its normal points out of.
            assert!((v.dot(*n) - 1.0).abs() < 1e-5, "vertex {v} normal {n}");
        }
    }

    #[test]
    fn wheel_normals_point_away_from_axle() {
        let m = DeformableMesh::new(Mesh::wheel(0.5, 0.2, 12));
        // Ring vertices: radial part of the normal points outwards.
        for (v, n) in m.vertices().iter().zip(m.normals()).take(24) {
            let radial = Vec3::new(0.0, v.y, v.z);
            assert!(radial.dot(*n) > 0.0);
        }
    }

    #[test]
    fn apply_recomputes_from_base_every_time() {
        let mut m = DeformableMesh::new(Mesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)));
        let t = translation(1.0, 0.0, 0.0);
        m.apply(&t);
        m.apply(&t);
        // Not accumulated: still one unit away.
        assert!((m.centroid() - Vec3::X).length() < 1e-5);
        assert_eq!(m.base().vertices[0], Mesh::cuboid(Vec3::ZERO, Vec3::splat(0.5)).vertices[0]);
    }

    #[test]
    fn normals_follow_rotation() {
        let mut m = DeformableMesh::new(Mesh::cuboid(Vec3::ZERO, Vec3::splat(1.0)));
        m.apply(&rotation(90.0, Axis::Y));
        // Face 0 (+X) now faces -Z.
        assert!((m.normals()[0] - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn bad_triangle_indices_are_skipped() {
        let mut normals = Vec::new();
        let verts = [Vec3::ZERO, Vec3::X, Vec3::Z];
        recalculate_normals(&verts, &[[0, 2, 1], [0, 1, 7]], &mut normals);
        assert_eq!(normals.len(), 3);
        assert!((normals[0] - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn release_is_idempotent() {
        let mut m = DeformableMesh::new(Mesh::wheel(0.4, 0.1, 8));
        m.release();
        m.release();
        assert!(m.is_released());
        assert!(m.vertices().is_empty());
        m.apply(&translation(1.0, 1.0, 1.0));
        assert!(m.vertices().is_empty());
    }
}
