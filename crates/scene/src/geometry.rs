use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Interleaved vertex layout shared by every mesh.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Parameters of a (p, q) torus knot tube. `p = 2, q = 3` is the trefoil.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorusKnot {
    pub radius: f32,
    pub tube: f32,
    pub tubular_segments: u32,
    pub radial_segments: u32,
    pub p: u32,
    pub q: u32,
}

impl Default for TorusKnot {
    fn default() -> Self {
        Self {
            radius: 1.0,
            tube: 0.4,
            tubular_segments: 64,
            radial_segments: 8,
            p: 2,
            q: 3,
        }
    }
}

impl TorusKnot {
    /// Point on the knot's centre curve at parameter `u`.
    fn curve(&self, u: f32) -> Vec3 {
        let p = self.p.max(1) as f32;
        let q = self.q as f32;
        let qu_over_p = q / p * u;
        let cs = qu_over_p.cos();
        Vec3::new(
            self.radius * (2.0 + cs) * 0.5 * u.cos(),
            self.radius * (2.0 + cs) * 0.5 * u.sin(),
            self.radius * qu_over_p.sin() * 0.5,
        )
    }

    fn build(&self) -> MeshData {
        let tubular = self.tubular_segments.max(3);
        let radial = self.radial_segments.max(3);
        let p = self.p.max(1) as f32;

        let mut vertices = Vec::with_capacity(((tubular + 1) * (radial + 1)) as usize);
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32 * p * TAU;
            let p1 = self.curve(u);
            let p2 = self.curve(u + 0.01);

            // Frenet-like frame around the curve
            let t = p2 - p1;
            let n = p2 + p1;
            let b = t.cross(n);
            let n = b.cross(t).normalize();
            let b = b.normalize();

            for j in 0..=radial {
                let v = j as f32 / radial as f32 * TAU;
                let cx = -self.tube * v.cos();
                let cy = self.tube * v.sin();
                let position = p1 + n * cx + b * cy;
                let normal = (position - p1).normalize();
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    uv: [i as f32 / tubular as f32, j as f32 / radial as f32],
                });
            }
        }

        let mut indices = Vec::with_capacity((tubular * radial * 6) as usize);
        for j in 1..=tubular {
            for i in 1..=radial {
                let a = (radial + 1) * (j - 1) + (i - 1);
                let b = (radial + 1) * j + (i - 1);
                let c = (radial + 1) * j + i;
                let d = (radial + 1) * (j - 1) + i;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        MeshData { vertices, indices }
    }
}

/// Parametric shapes the experiments are assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    TorusKnot(TorusKnot),
    Sphere {
        radius: f32,
        width_segments: u32,
        height_segments: u32,
    },
    Cuboid { size: Vec3 },
}

impl Shape {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            radius,
            width_segments: 32,
            height_segments: 16,
        }
    }

    pub fn cuboid(x: f32, y: f32, z: f32) -> Self {
        Self::Cuboid {
            size: Vec3::new(x, y, z),
        }
    }

    /// Generate the triangle list for this shape.
    pub fn build(&self) -> MeshData {
        match self {
            Shape::TorusKnot(knot) => knot.build(),
            Shape::Sphere {
                radius,
                width_segments,
                height_segments,
            } => sphere_mesh(*radius, *width_segments, *height_segments),
            Shape::Cuboid { size } => cuboid_mesh(*size),
        }
    }
}

fn sphere_mesh(radius: f32, width_segments: u32, height_segments: u32) -> MeshData {
    let w = width_segments.max(3);
    let h = height_segments.max(2);

    let mut vertices = Vec::with_capacity(((w + 1) * (h + 1)) as usize);
    for iy in 0..=h {
        let v = iy as f32 / h as f32;
        for ix in 0..=w {
            let u = ix as f32 / w as f32;
            let dir = Vec3::new(
                -(u * TAU).cos() * (v * PI).sin(),
                (v * PI).cos(),
                (u * TAU).sin() * (v * PI).sin(),
            );
            vertices.push(Vertex {
                position: (dir * radius).to_array(),
                normal: dir.normalize_or_zero().to_array(),
                uv: [u, 1.0 - v],
            });
        }
    }

    let row = w + 1;
    let mut indices = Vec::with_capacity((6 * w * (h - 1)) as usize);
    for iy in 0..h {
        for ix in 0..w {
            let a = iy * row + ix + 1;
            let b = iy * row + ix;
            let c = (iy + 1) * row + ix;
            let d = (iy + 1) * row + ix + 1;
            // Pole rows collapse to a single triangle
            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != h - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    MeshData { vertices, indices }
}

fn cuboid_mesh(size: Vec3) -> MeshData {
    let h = size * 0.5;
    let (x, y, z) = (h.x, h.y, h.z);
    let uv = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];
    #[rustfmt::skip]
    let faces: [([[f32; 3]; 4], [f32; 3]); 6] = [
        ([[-x, -y,  z], [ x, -y,  z], [ x,  y,  z], [-x,  y,  z]], [0.0, 0.0, 1.0]),
        ([[ x, -y, -z], [-x, -y, -z], [-x,  y, -z], [ x,  y, -z]], [0.0, 0.0, -1.0]),
        ([[ x, -y,  z], [ x, -y, -z], [ x,  y, -z], [ x,  y,  z]], [1.0, 0.0, 0.0]),
        ([[-x, -y, -z], [-x, -y,  z], [-x,  y,  z], [-x,  y, -z]], [-1.0, 0.0, 0.0]),
        ([[-x,  y,  z], [ x,  y,  z], [ x,  y, -z], [-x,  y, -z]], [0.0, 1.0, 0.0]),
        ([[-x, -y, -z], [ x, -y, -z], [ x, -y,  z], [-x, -y,  z]], [0.0, -1.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (corners, normal) in faces {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.into_iter().zip(uv) {
            vertices.push(Vertex {
                position: corner,
                normal,
                uv,
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    MeshData { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_unit_normals(mesh: &MeshData) {
        for v in &mesh.vertices {
            let len = Vec3::from_array(v.normal).length();
            assert!((len - 1.0).abs() < 1e-3, "normal length {len}");
        }
    }

    fn assert_indices_in_range(mesh: &MeshData) {
        let n = mesh.vertices.len() as u32;
        assert!(mesh.indices.iter().all(|&i| i < n));
        assert_eq!(mesh.indices.len() % 3, 0);
    }

    #[test]
    fn torus_knot_counts() {
        let knot = TorusKnot {
            tubular_segments: 100,
            radial_segments: 16,
            ..TorusKnot::default()
        };
        let mesh = Shape::TorusKnot(knot).build();
        assert_eq!(mesh.vertices.len(), 101 * 17);
        assert_eq!(mesh.indices.len(), 100 * 16 * 6);
        assert_unit_normals(&mesh);
        assert_indices_in_range(&mesh);
    }

    #[test]
    fn torus_knot_stays_within_bounds() {
        let knot = TorusKnot::default();
        let mesh = Shape::TorusKnot(knot).build();
        let limit = knot.radius * 1.5 + knot.tube + 1e-3;
        for v in &mesh.vertices {
            assert!(Vec3::from_array(v.position).length() <= limit);
        }
    }

    #[test]
    fn torus_knot_tube_radius() {
        let knot = TorusKnot::default();
        let mesh = Shape::TorusKnot(knot).build();
        // Every ring vertex sits `tube` away from the curve point of its ring
        let ring = (knot.radial_segments + 1) as usize;
        let first = knot.curve(0.0);
        for v in &mesh.vertices[..ring] {
            let d = (Vec3::from_array(v.position) - first).length();
            assert!((d - knot.tube).abs() < 1e-4);
        }
    }

    #[test]
    fn sphere_counts() {
        let mesh = sphere_mesh(1.0, 32, 16);
        assert_eq!(mesh.vertices.len(), 33 * 17);
        assert_eq!(mesh.indices.len(), 6 * 32 * 15);
        assert_unit_normals(&mesh);
        assert_indices_in_range(&mesh);
    }

    #[test]
    fn cuboid_faces_point_outward() {
        let mesh = Shape::cuboid(2.0, 1.0, 0.5).build();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.indices.chunks(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]]
                .map(|i| Vec3::from_array(mesh.vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(face_normal.dot(centroid) > 0.0, "triangle wound inward");
        }
    }
}
