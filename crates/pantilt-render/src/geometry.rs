//! Procedural meshes for the gimbal rig and its surroundings.

use glam::Vec3;

use pantilt_core::Lens;

/// A vertex with position and color, laid out for the GPU.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position: position.to_array(),
            color: color.to_array(),
        }
    }

    /// Vertex buffer layout matching `scene.wgsl`.
    #[must_use]
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

/// How a mesh's indices are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Every three indices form a triangle.
    Triangles,
    /// Every two indices form a line segment.
    Lines,
}

/// Indexed geometry in its own local frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub topology: Topology,
}

impl Mesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self {
            vertices: Vec::new(),
            indices: Vec::new(),
            topology,
        }
    }

    /// Appends another mesh of the same topology, offset by `translation`.
    pub fn append(&mut self, other: &Mesh, translation: Vec3) {
        debug_assert_eq!(self.topology, other.topology);
        let base = u32::try_from(self.vertices.len()).unwrap_or(u32::MAX);
        self.vertices.extend(other.vertices.iter().map(|v| Vertex {
            position: (Vec3::from(v.position) + translation).to_array(),
            color: v.color,
        }));
        self.indices.extend(other.indices.iter().map(|i| i + base));
    }

    /// Scales every vertex position about the origin.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).to_array();
        }
    }

    /// Number of primitives (triangles or segments).
    #[must_use]
    pub fn primitive_count(&self) -> usize {
        match self.topology {
            Topology::Triangles => self.indices.len() / 3,
            Topology::Lines => self.indices.len() / 2,
        }
    }

    /// Axis-aligned bounds, or `None` for an empty mesh.
    #[must_use]
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// An axis-aligned box spanning `min` to `max`.
    #[must_use]
    pub fn cuboid(min: Vec3, max: Vec3, color: Vec3) -> Self {
        let corners = [
            Vec3::new(min.x, min.y, min.z),
            Vec3::new(max.x, min.y, min.z),
            Vec3::new(max.x, max.y, min.z),
            Vec3::new(min.x, max.y, min.z),
            Vec3::new(min.x, min.y, max.z),
            Vec3::new(max.x, min.y, max.z),
            Vec3::new(max.x, max.y, max.z),
            Vec3::new(min.x, max.y, max.z),
        ];
        // Counter-clockwise when viewed from outside.
        let faces: [[usize; 4]; 6] = [
            [4, 5, 6, 7], // +Z
            [1, 0, 3, 2], // -Z
            [5, 1, 2, 6], // +X
            [0, 4, 7, 3], // -X
            [3, 7, 6, 2], // +Y
            [0, 1, 5, 4], // -Y
        ];

        let mut mesh = Self::new(Topology::Triangles);
        for face in faces {
            let base = u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX);
            mesh.vertices
                .extend(face.iter().map(|&i| Vertex::new(corners[i], color)));
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// A box of the given size centered on `center`.
    #[must_use]
    pub fn centered_box(center: Vec3, size: Vec3, color: Vec3) -> Self {
        let half = size * 0.5;
        Self::cuboid(center - half, center + half, color)
    }

    /// A square grid of lines on the XZ plane.
    #[must_use]
    pub fn grid(half_extent: f32, divisions: u32, color: Vec3) -> Self {
        let mut mesh = Self::new(Topology::Lines);
        let divisions = divisions.max(1);
        #[allow(clippy::cast_precision_loss)]
        let step = 2.0 * half_extent / divisions as f32;
        for i in 0..=divisions {
            #[allow(clippy::cast_precision_loss)]
            let offset = -half_extent + step * i as f32;
            let base = u32::try_from(mesh.vertices.len()).unwrap_or(u32::MAX);
            mesh.vertices.extend_from_slice(&[
                Vertex::new(Vec3::new(offset, 0.0, -half_extent), color),
                Vertex::new(Vec3::new(offset, 0.0, half_extent), color),
                Vertex::new(Vec3::new(-half_extent, 0.0, offset), color),
                Vertex::new(Vec3::new(half_extent, 0.0, offset), color),
            ]);
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base + 3]);
        }
        mesh
    }

    /// Wireframe of a camera frustum in the camera's local frame.
    ///
    /// The camera sits at the origin looking down -Z with +Y up. Lines run
    /// from the origin to the four corners of the image plane at `depth`,
    /// around that plane, and around a small triangle marking "up".
    #[must_use]
    pub fn frustum_wireframe(lens: &Lens, depth: f32, color: Vec3) -> Self {
        let frame_center = Vec3::new(0.0, 0.0, -depth);
        let half_height = depth * (lens.fov_y * 0.5).tan();
        let half_width = lens.aspect * half_height;
        let frame_up = Vec3::Y * half_height;
        let frame_right = Vec3::X * half_width;

        let nodes = [
            Vec3::ZERO,
            frame_center + frame_up - frame_right,
            frame_center + frame_up + frame_right,
            frame_center - frame_up - frame_right,
            frame_center - frame_up + frame_right,
            frame_center + frame_up * 1.2 - frame_right * 0.7,
            frame_center + frame_up * 1.2 + frame_right * 0.7,
            frame_center + frame_up * 2.0,
        ];
        let edges: [[u32; 2]; 11] = [
            [0, 1],
            [0, 2],
            [0, 3],
            [0, 4],
            [1, 2],
            [2, 4],
            [4, 3],
            [3, 1],
            [5, 6],
            [6, 7],
            [7, 5],
        ];

        Self {
            vertices: nodes.iter().map(|&p| Vertex::new(p, color)).collect(),
            indices: edges.iter().flatten().copied().collect(),
            topology: Topology::Lines,
        }
    }

    /// A blocky standing figure about 1.8 units tall, facing -X.
    #[must_use]
    pub fn figure(color: Vec3) -> Self {
        let skin = Vec3::new(0.93, 0.76, 0.62);
        let mut mesh = Self::centered_box(Vec3::new(0.0, 1.25, 0.0), Vec3::new(0.25, 0.6, 0.45), color);
        let parts = [
            // head
            Self::centered_box(Vec3::new(0.0, 1.7, 0.0), Vec3::new(0.25, 0.25, 0.25), skin),
            // legs
            Self::centered_box(Vec3::new(0.0, 0.475, -0.12), Vec3::new(0.2, 0.95, 0.18), color * 0.6),
            Self::centered_box(Vec3::new(0.0, 0.475, 0.12), Vec3::new(0.2, 0.95, 0.18), color * 0.6),
            // arms
            Self::centered_box(Vec3::new(0.0, 1.25, -0.3), Vec3::new(0.15, 0.6, 0.12), skin),
            Self::centered_box(Vec3::new(0.0, 1.25, 0.3), Vec3::new(0.15, 0.6, 0.12), skin),
        ];
        for part in &parts {
            mesh.append(part, Vec3::ZERO);
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_counts() {
        let mesh = Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE);
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.primitive_count(), 12);
        assert_eq!(mesh.bounds(), Some((Vec3::ZERO, Vec3::ONE)));
    }

    #[test]
    fn test_cuboid_faces_point_outward() {
        let mesh = Mesh::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0), Vec3::ONE);
        for tri in mesh.indices.chunks_exact(3) {
            let a = Vec3::from(mesh.vertices[tri[0] as usize].position);
            let b = Vec3::from(mesh.vertices[tri[1] as usize].position);
            let c = Vec3::from(mesh.vertices[tri[2] as usize].position);
            let normal = (b - a).cross(c - a);
            let centroid = (a + b + c) / 3.0;
            assert!(normal.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn test_grid_lines() {
        let mesh = Mesh::grid(5.0, 10, Vec3::ONE);
        assert_eq!(mesh.topology, Topology::Lines);
        assert_eq!(mesh.primitive_count(), 22);
    }

    #[test]
    fn test_frustum_corners_follow_lens() {
        let lens = Lens::from_degrees(90.0, 2.0, 0.01, 100.0);
        let mesh = Mesh::frustum_wireframe(&lens, 1.0, Vec3::ONE);
        assert_eq!(mesh.primitive_count(), 11);
        let upper_right = Vec3::from(mesh.vertices[2].position);
        assert!((upper_right - Vec3::new(2.0, 1.0, -1.0)).length() < 1e-5);
    }

    #[test]
    fn test_append_offsets_indices() {
        let a = Mesh::cuboid(Vec3::ZERO, Vec3::ONE, Vec3::ONE);
        let mut merged = a.clone();
        merged.append(&a, Vec3::X * 2.0);
        assert_eq!(merged.vertices.len(), 48);
        assert_eq!(*merged.indices.iter().max().unwrap(), 47);
        assert_eq!(merged.bounds().unwrap().1, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_figure_height() {
        let (lo, hi) = Mesh::figure(Vec3::X).bounds().unwrap();
        assert!(lo.y.abs() < 1e-6);
        assert!((hi.y - 1.825).abs() < 1e-5);
    }
}
