use glam::{Vec2, Vec3};
use log::debug;
use rayon::prelude::*;

use crate::mesh::types::Mesh;
use crate::utils::dominant_axis;

// Default triplanar tiling
pub const DEFAULT_UV_SCALE: f32 = 10.0;

// Accumulated normals shorter than this get the fallback direction
pub const NORMAL_EPSILON: f32 = 1e-12;
pub const FALLBACK_NORMAL: Vec3 = Vec3::Y;

// Area-weighted smooth vertex normals.
//
// Each triangle adds its unnormalised face normal to its three vertices, so
// larger triangles weigh more. Vertices used by no (or only degenerate)
// triangles get `FALLBACK_NORMAL`.
pub fn compute_normals(mesh: &mut Mesh) {
    let mut normals = vec![Vec3::ZERO; mesh.vertices.len()];

    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (a as usize, b as usize, c as usize);
        let v0 = mesh.vertices[a];
        let face = (mesh.vertices[b] - v0).cross(mesh.vertices[c] - v0);

        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    normals.par_iter_mut().for_each(|n| {
        let length_sq = n.length_squared();
        *n = if length_sq > NORMAL_EPSILON {
            *n / length_sq.sqrt()
        } else {
            FALLBACK_NORMAL
        };
    });

    debug!("Computed {} vertex normals", normals.len());
    mesh.normals = normals;
}

// Planar projection onto the axis plane most aligned with `normal`,
// wrapped into [0, 1).
pub fn triplanar_uv(position: Vec3, normal: Vec3, scale: f32) -> Vec2 {
    let p = position * scale;
    let uv = match dominant_axis(normal) {
        0 => Vec2::new(p.y, p.z),
        1 => Vec2::new(p.x, p.z),
        _ => Vec2::new(p.x, p.y),
    };
    uv - uv.floor()
}

// Triplanar texture coordinates for every vertex, computing normals first
// when the mesh has none.
pub fn compute_uvs(mesh: &mut Mesh, scale: f32) {
    if !mesh.has_normals() {
        compute_normals(mesh);
    }

    mesh.uvs = mesh
        .vertices
        .par_iter()
        .zip(mesh.normals.par_iter())
        .map(|(&position, &normal)| triplanar_uv(position, normal, scale))
        .collect();

    debug!("Computed {} triplanar UVs at scale {}", mesh.uvs.len(), scale);
}
