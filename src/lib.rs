// Isosurface extraction from sampled scalar fields.
//
// Two extractors share one slab-parallel worker model: marching cubes
// (unshared triangle soup) and dual contouring (one vertex per active cell,
// quads across sign-changing edges, or a cube per active cell).

pub mod config;
pub mod error;
pub mod field;
pub mod mesh;
pub mod shapes;
pub mod utils;
pub mod worker;

pub use config::{ExtractConfig, Method, VertexPlacement};
pub use error::{ExtractError, Result};
pub use field::{SampledGrid, ScalarField};
pub use mesh::{
    compute_normals, compute_uvs, dual_contouring, dual_contouring_with, extract, marching_cubes,
    marching_cubes_with, Color3, Mesh,
};
