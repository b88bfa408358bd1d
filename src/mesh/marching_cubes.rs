use std::ops::Range;
use std::time::Instant;
use glam::Vec3;
use log::debug;

use crate::error::{ExtractError, Result};
use crate::field::ScalarField;
use crate::mesh::interp::vertex_interp;
use crate::mesh::tables::{EDGE_CONNECTIONS, EDGE_TABLE, TRI_TABLE};
use crate::mesh::types::Mesh;
use crate::utils::for_slab_cells;
use crate::worker::{self, ThreadMesh};

// Configuration index: bit k set when corner k is below the isolevel
#[inline]
pub fn cube_index(values: &[f32; 8], isolevel: f32) -> usize {
    values
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v < isolevel)
        .fold(0, |index, (corner, _)| index | (1 << corner))
}

// Triangulate a single cell into `out`. Vertices are not shared between
// cells or triangles: each triangle pushes three fresh vertices.
pub fn polygonise_cell(values: &[f32; 8], positions: &[Vec3; 8], isolevel: f32, out: &mut ThreadMesh) {
    let config = cube_index(values, isolevel);
    let edge_mask = EDGE_TABLE[config];

    // Fully inside or fully outside
    if edge_mask == 0 {
        return;
    }

    // Only slots named by edge_mask are filled; TRI_TABLE never reads the others
    let mut edge_points = [Vec3::ZERO; 12];
    for (edge, &[a, b]) in EDGE_CONNECTIONS.iter().enumerate() {
        if edge_mask & (1 << edge) != 0 {
            edge_points[edge] = vertex_interp(isolevel, positions[a], positions[b], values[a], values[b]);
        }
    }

    // Table triangles face the inside region; emit them reversed so the
    // winding faces outward (toward increasing field values)
    for tri in TRI_TABLE[config].chunks_exact(3).take_while(|tri| tri[0] != -1) {
        let a = out.push_vertex(edge_points[tri[0] as usize]);
        let b = out.push_vertex(edge_points[tri[2] as usize]);
        let c = out.push_vertex(edge_points[tri[1] as usize]);
        out.push_triangle(a, b, c);
    }
}

fn extract_slabs(field: &ScalarField<'_>, isolevel: f32, z_range: Range<usize>) -> ThreadMesh {
    let mut out = ThreadMesh::new();

    for_slab_cells(z_range, field.cells_per_axis(), |x, y, z| {
        let (values, positions) = field.cell_corners(x, y, z);
        polygonise_cell(&values, &positions, isolevel, &mut out);
    });

    out
}

// Marching cubes over the whole field using hardware concurrency.
//
// Normals, colours and UVs are left empty; run the post-processor for those.
pub fn marching_cubes(field: &ScalarField<'_>, isolevel: f32) -> Result<Mesh> {
    marching_cubes_with(field, isolevel, None)
}

// Marching cubes with an explicit worker-count override (`None` = hardware concurrency).
pub fn marching_cubes_with(field: &ScalarField<'_>, isolevel: f32, threads: Option<usize>) -> Result<Mesh> {
    if !isolevel.is_finite() {
        return Err(ExtractError::InvalidIsolevel(isolevel));
    }

    let started = Instant::now();
    let slabs = field.cells_per_axis();
    let thread_count = worker::resolve_thread_count(threads, slabs);
    let ranges = worker::partition_slabs(slabs, thread_count);

    let buffers = worker::run_slabs(&ranges, |_, z_range| extract_slabs(field, isolevel, z_range))?;
    let merged = worker::merge(buffers)?;

    debug!(
        "Marching cubes: res {} on {} threads -> {} vertices, {} triangles in {:.2?}",
        field.res(),
        ranges.len(),
        merged.vertices.len(),
        merged.indices.len() / 3,
        started.elapsed()
    );

    Ok(Mesh::from_parts(merged.vertices, merged.indices))
}
