use glam::{Vec2, Vec3};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Color3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color3 {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

impl Default for Color3 {
    fn default() -> Self {
        Self::new(0.8, 0.8, 0.8)
    }
}

// Triangle mesh with parallel per-vertex attribute arrays.
// Optional attributes are either empty or exactly one entry per vertex.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub colors: Vec<Color3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            ..Self::default()
        }
    }

    pub fn add_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let base_index = self.vertices.len() as u32;

        self.vertices.push(a);
        self.vertices.push(b);
        self.vertices.push(c);

        self.indices.push(base_index);
        self.indices.push(base_index + 1);
        self.indices.push(base_index + 2);
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() && self.indices.is_empty()
    }

    pub fn has_normals(&self) -> bool {
        !self.normals.is_empty() && self.normals.len() == self.vertices.len()
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty() && self.colors.len() == self.vertices.len()
    }

    pub fn has_uvs(&self) -> bool {
        !self.uvs.is_empty() && self.uvs.len() == self.vertices.len()
    }

    pub fn set_uniform_color(&mut self, r: f32, g: f32, b: f32) {
        self.colors = vec![Color3::new(r, g, b); self.vertices.len()];
    }

    pub fn set_colors(&mut self, colors: Vec<Color3>) -> Result<()> {
        if colors.len() != self.vertices.len() {
            warn!(
                "Rejecting {} vertex colors for a mesh with {} vertices",
                colors.len(),
                self.vertices.len()
            );
            return Err(ExtractError::AttributeLength {
                expected: self.vertices.len(),
                got: colors.len(),
            });
        }

        self.colors = colors;
        Ok(())
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    // Check the structural invariants: whole triangles, in-range indices, and
    // optional attributes that are either absent or one-per-vertex.
    pub fn validate(&self) -> Result<()> {
        let count = self.vertices.len();

        if self.indices.len() % 3 != 0 {
            return Err(ExtractError::PartialTriangle {
                index_count: self.indices.len(),
            });
        }

        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= count) {
            return Err(ExtractError::IndexOutOfRange {
                index,
                vertex_count: count,
            });
        }

        for len in [self.normals.len(), self.colors.len(), self.uvs.len()] {
            if len != 0 && len != count {
                return Err(ExtractError::AttributeLength { expected: count, got: len });
            }
        }

        Ok(())
    }

    // Raw views for GPU uploaders
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices[..])
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        mesh.add_triangle(Vec3::ZERO, Vec3::X, Vec3::Y);
        mesh
    }

    #[test]
    fn add_triangle_appends_ascending_indices() {
        let mut mesh = single_triangle();
        mesh.add_triangle(Vec3::Z, Vec3::ONE, Vec3::NEG_X);

        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn attributes_present_only_at_full_length() {
        let mut mesh = single_triangle();
        assert!(!mesh.has_normals());
        assert!(!mesh.has_colors());
        assert!(!mesh.has_uvs());

        mesh.normals = vec![Vec3::Z; 2];
        assert!(!mesh.has_normals());
        assert!(mesh.validate().is_err());

        mesh.normals.push(Vec3::Z);
        assert!(mesh.has_normals());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn colors_must_match_vertex_count() {
        let mut mesh = single_triangle();
        mesh.set_uniform_color(1.0, 0.0, 0.0);
        assert!(mesh.has_colors());
        assert_eq!(mesh.colors[2], Color3::new(1.0, 0.0, 0.0));

        let err = mesh.set_colors(vec![Color3::default(); 2]);
        assert!(matches!(err, Err(ExtractError::AttributeLength { expected: 3, got: 2 })));
        assert_eq!(mesh.colors[0], Color3::new(1.0, 0.0, 0.0));

        mesh.set_colors(vec![Color3::default(); 3]).unwrap();
        assert_eq!(mesh.colors[1], Color3::new(0.8, 0.8, 0.8));
    }

    #[test]
    fn validate_catches_dangling_indices() {
        let mut mesh = single_triangle();
        mesh.indices[1] = 7;
        assert!(matches!(
            mesh.validate(),
            Err(ExtractError::IndexOutOfRange { index: 7, vertex_count: 3 })
        ));

        mesh.indices = vec![0, 1];
        assert!(matches!(
            mesh.validate(),
            Err(ExtractError::PartialTriangle { index_count: 2 })
        ));
    }

    #[test]
    fn byte_views_cover_arrays() {
        let mesh = single_triangle();
        assert_eq!(mesh.position_bytes().len(), 3 * 12);
        assert_eq!(mesh.index_bytes().len(), 3 * 4);
        assert!(Mesh::new().is_empty());
    }
}
