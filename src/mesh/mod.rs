use log::debug;

pub mod types;
pub mod tables;
pub mod interp;
pub mod marching_cubes;
pub mod qef;
pub mod dual_contouring;
pub mod post;

pub use types::{Color3, Mesh};
pub use marching_cubes::{marching_cubes, marching_cubes_with};
pub use dual_contouring::{dual_contouring, dual_contouring_with};
pub use post::{compute_normals, compute_uvs, triplanar_uv, DEFAULT_UV_SCALE};

use crate::config::{ExtractConfig, Method};
use crate::error::Result;
use crate::field::ScalarField;

// Run the configured extractor, then the requested post-processing
pub fn extract(field: &ScalarField<'_>, config: &ExtractConfig) -> Result<Mesh> {
    let mut mesh = match config.method {
        Method::MarchingCubes => marching_cubes_with(field, config.isolevel, config.threads)?,
        Method::DualContouring => dual_contouring_with(
            field,
            config.isolevel,
            config.fill_with_cubes,
            config.voxel_scale,
            config.placement,
            config.threads,
        )?,
    };

    if config.compute_normals {
        compute_normals(&mut mesh);
    }

    if let Some(scale) = config.uv_scale {
        compute_uvs(&mut mesh, scale);
    }

    debug!(
        "{}: {} vertices, {} triangles",
        config.method.as_str(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    Ok(mesh)
}
