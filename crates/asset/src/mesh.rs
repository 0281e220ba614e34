//! CPU-side mesh representation produced by the loader.

use glam::Vec3;

/// Vertex with position/normal/uv. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// One named group of an OBJ file: triangle list plus the vertices it indexes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Material selected by the last `usemtl` inside this group.
    pub material: Option<String>,
}

impl Mesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of all vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_validity() {
        let mut mesh = Mesh::new("quad");
        assert!(!mesh.is_valid());
        mesh.vertices.push(MeshVertex::default());
        mesh.indices.extend([0, 0, 0]);
        assert!(mesh.is_valid());
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn bounds_cover_all_positions() {
        let mut mesh = Mesh::new("pts");
        assert!(mesh.bounds().is_none());
        mesh.vertices.push(MeshVertex::new([1.0, -2.0, 0.5], [0.0; 3], [0.0; 2]));
        mesh.vertices.push(MeshVertex::new([-1.0, 3.0, 0.0], [0.0; 3], [0.0; 2]));
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(max, Vec3::new(1.0, 3.0, 0.5));
    }
}
