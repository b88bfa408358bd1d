use std::ops::Range;
use std::time::Instant;
use glam::Vec3;
use log::debug;

use crate::config::VertexPlacement;
use crate::error::{ExtractError, Result};
use crate::field::ScalarField;
use crate::mesh::interp::crossing_t;
use crate::mesh::qef::Qef;
use crate::mesh::tables::{CORNER_OFFSETS, EDGE_CONNECTIONS};
use crate::mesh::types::Mesh;
use crate::utils::for_slab_cells;
use crate::worker::{self, ThreadMesh};

// Cell has no dual vertex
pub const INACTIVE: u32 = u32::MAX;

// Voxel-cube faces as corner signs around the cell centre, counter-clockwise
// seen from outside. Each face gets its own four vertices.
const CUBE_FACES: [[[f32; 3]; 4]; 6] = [
    // -X
    [[-1.0, -1.0, -1.0], [-1.0, -1.0, 1.0], [-1.0, 1.0, 1.0], [-1.0, 1.0, -1.0]],
    // +X
    [[1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [1.0, -1.0, 1.0]],
    // -Y
    [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
    // +Y
    [[-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0], [1.0, 1.0, 1.0], [1.0, 1.0, -1.0]],
    // -Z
    [[-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, -1.0, -1.0]],
    // +Z
    [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
];

pub const CUBE_VERTEX_COUNT: usize = 24;
pub const CUBE_INDEX_COUNT: usize = 36;

fn unit_normal(field: &ScalarField<'_>, x: usize, y: usize, z: usize, corner: usize) -> Vec3 {
    let [dx, dy, dz] = CORNER_OFFSETS[corner];
    field.gradient(x + dx, y + dy, z + dz).normalize_or_zero()
}

// Dual vertex of cell (x, y, z), or None when no edge of the cell crosses
// the isolevel
pub fn cell_vertex(
    field: &ScalarField<'_>,
    isolevel: f32,
    placement: VertexPlacement,
    x: usize,
    y: usize,
    z: usize,
) -> Option<Vec3> {
    let (values, positions) = field.cell_corners(x, y, z);

    let inside = values.iter().filter(|&&v| v < isolevel).count();
    if inside == 0 || inside == 8 {
        return None;
    }

    let crossings = EDGE_CONNECTIONS
        .iter()
        .filter(|&&[a, b]| (values[a] < isolevel) != (values[b] < isolevel));

    let bounds = field.cell_bounds(x, y, z);

    match placement {
        VertexPlacement::CellCenter => {
            // Sign test only; the QEF result would be thrown away
            if crossings.count() == 0 {
                return None;
            }
            Some(bounds.center())
        }
        VertexPlacement::MassPoint | VertexPlacement::Qef => {
            let mut qef = Qef::new();
            for &[a, b] in crossings {
                let t = crossing_t(isolevel, values[a], values[b]);
                let position = positions[a].lerp(positions[b], t);

                let normal = if placement == VertexPlacement::Qef {
                    let na = unit_normal(field, x, y, z, a);
                    let nb = unit_normal(field, x, y, z, b);
                    na.lerp(nb, t).normalize_or_zero()
                } else {
                    Vec3::ZERO
                };

                qef.add(position, normal);
            }

            if qef.count() == 0 {
                return None;
            }

            Some(match placement {
                VertexPlacement::Qef => qef.solve(&bounds),
                _ => qef.mass_point(),
            })
        }
    }
}

// Push an axis-aligned cube and return the index of its first vertex
fn emit_cube(out: &mut ThreadMesh, center: Vec3, half: Vec3) -> u32 {
    let first = out.vertices.len() as u32;

    for face in CUBE_FACES.iter() {
        let base = out.vertices.len() as u32;
        for &corner in face {
            out.push_vertex(center + Vec3::from(corner) * half);
        }
        out.push_triangle(base, base + 1, base + 2);
        out.push_triangle(base, base + 2, base + 3);
    }

    first
}

struct CellPass<'f, 'a> {
    field: &'f ScalarField<'a>,
    isolevel: f32,
    placement: VertexPlacement,
    // Some(half extent) in voxel-cube mode
    cube_half: Option<Vec3>,
}

impl CellPass<'_, '_> {
    // Phase 1 for one slab; `window` holds the slab's cells, z-major like the grid
    fn run(&self, z_range: Range<usize>, window: &mut [u32]) -> ThreadMesh {
        let n = self.field.cells_per_axis();
        let z_start = z_range.start;
        let mut out = ThreadMesh::new();

        for_slab_cells(z_range, n, |x, y, z| {
            let Some(vertex) = cell_vertex(self.field, self.isolevel, self.placement, x, y, z) else {
                return;
            };

            let index = match self.cube_half {
                Some(half) => emit_cube(&mut out, self.field.cell_bounds(x, y, z).center(), half),
                None => out.push_vertex(vertex),
            };

            window[x + y * n + (z - z_start) * n * n] = index;
        });

        out
    }
}

fn emit_quad(out: &mut ThreadMesh, quad: [u32; 4], lower_inside: bool) {
    // Edge on the border of the active region
    if quad.contains(&INACTIVE) {
        return;
    }

    let [c0, c1, c2, c3] = quad;
    if lower_inside {
        out.push_triangle(c0, c1, c2);
        out.push_triangle(c0, c2, c3);
    } else {
        out.push_triangle(c0, c2, c1);
        out.push_triangle(c0, c3, c2);
    }
}

// Phase 2 for one slab. The slab owns every sample edge starting at a z in
// `z_range`; edges on the outer faces of the grid have fewer than four
// neighbouring cells and are skipped. Only indices are produced.
fn emit_quads(field: &ScalarField<'_>, isolevel: f32, cell_vertices: &[u32], z_range: Range<usize>) -> ThreadMesh {
    let n = field.cells_per_axis();
    let cell = |x: usize, y: usize, z: usize| cell_vertices[x + y * n + z * n * n];
    let interior = |c: usize| c >= 1 && c < n;
    let mut out = ThreadMesh::new();

    for_slab_cells(z_range, n, |x, y, z| {
        let lower_inside = field.value(x, y, z) < isolevel;

        // X edge (x, y, z) -> (x + 1, y, z)
        if interior(y) && interior(z) && lower_inside != (field.value(x + 1, y, z) < isolevel) {
            let quad = [cell(x, y - 1, z - 1), cell(x, y, z - 1), cell(x, y, z), cell(x, y - 1, z)];
            emit_quad(&mut out, quad, lower_inside);
        }

        // Y edge
        if interior(x) && interior(z) && lower_inside != (field.value(x, y + 1, z) < isolevel) {
            let quad = [cell(x - 1, y, z - 1), cell(x - 1, y, z), cell(x, y, z), cell(x, y, z - 1)];
            emit_quad(&mut out, quad, lower_inside);
        }

        // Z edge
        if interior(x) && interior(y) && lower_inside != (field.value(x, y, z + 1) < isolevel) {
            let quad = [cell(x - 1, y - 1, z), cell(x, y - 1, z), cell(x, y, z), cell(x - 1, y, z)];
            emit_quad(&mut out, quad, lower_inside);
        }
    });

    out
}

// Dual contouring with cell-centre vertices and hardware concurrency.
//
// With `fill_with_cubes` every active cell becomes an axis-aligned cube of
// half extent `cell_size * 0.5 * voxel_scale` instead of joining into a surface.
pub fn dual_contouring(field: &ScalarField<'_>, isolevel: f32, fill_with_cubes: bool, voxel_scale: f32) -> Result<Mesh> {
    dual_contouring_with(
        field,
        isolevel,
        fill_with_cubes,
        voxel_scale,
        VertexPlacement::default(),
        None,
    )
}

pub fn dual_contouring_with(
    field: &ScalarField<'_>,
    isolevel: f32,
    fill_with_cubes: bool,
    voxel_scale: f32,
    placement: VertexPlacement,
    threads: Option<usize>,
) -> Result<Mesh> {
    if !isolevel.is_finite() {
        return Err(ExtractError::InvalidIsolevel(isolevel));
    }
    if fill_with_cubes && !(voxel_scale.is_finite() && voxel_scale > 0.0) {
        return Err(ExtractError::InvalidVoxelScale(voxel_scale));
    }

    let started = Instant::now();
    let n = field.cells_per_axis();
    let per_slab = n * n;
    let thread_count = worker::resolve_thread_count(threads, n);
    let ranges = worker::partition_slabs(n, thread_count);

    let pass = CellPass {
        field,
        isolevel,
        placement,
        cube_half: fill_with_cubes.then(|| field.cell_size() * 0.5 * voxel_scale),
    };

    // Phase 1: one vertex (or cube) per active cell
    let mut cell_vertices = vec![INACTIVE; per_slab * n];
    let cells = worker::run_slabs_with(&ranges, per_slab, &mut cell_vertices, |_, z_range, window| {
        pass.run(z_range, window)
    })?;

    // Worker-local vertex indices become global once buffer offsets are known
    for (range, offset) in ranges.iter().zip(worker::merge_offsets(&cells)?) {
        cell_vertices[range.start * per_slab..range.end * per_slab]
            .iter_mut()
            .filter(|index| **index != INACTIVE)
            .for_each(|index| *index += offset);
    }

    let merged = worker::merge(cells)?;
    let active = cell_vertices.iter().filter(|&&index| index != INACTIVE).count();

    if fill_with_cubes {
        debug!(
            "Dual contouring (cubes): res {} on {} threads -> {} active cells, {} vertices in {:.2?}",
            field.res(),
            ranges.len(),
            active,
            merged.vertices.len(),
            started.elapsed()
        );
        return Ok(Mesh::from_parts(merged.vertices, merged.indices));
    }

    // Phase 2 reads the finished vertex array; the phase 1 join is the barrier
    let cell_vertices = &cell_vertices;
    let quads = worker::run_slabs(&ranges, |_, z_range| emit_quads(field, isolevel, cell_vertices, z_range))?;
    let indices = worker::merge(quads)?.indices;

    debug!(
        "Dual contouring: res {} on {} threads -> {} active cells, {} triangles in {:.2?}",
        field.res(),
        ranges.len(),
        active,
        indices.len() / 3,
        started.elapsed()
    );

    Ok(Mesh::from_parts(merged.vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::SampledGrid;

    fn sphere_grid(res: usize) -> SampledGrid {
        SampledGrid::from_fn(res, Vec3::splat(-1.5), Vec3::splat(1.5), |p| p.length() - 1.0)
    }

    fn face_normal(mesh: &Mesh, [a, b, c]: [u32; 3]) -> (Vec3, Vec3) {
        let (a, b, c) = (mesh.vertices[a as usize], mesh.vertices[b as usize], mesh.vertices[c as usize]);
        ((b - a).cross(c - a), (a + b + c) / 3.0)
    }

    #[test]
    fn flat_field_yields_empty_mesh() {
        let grid = SampledGrid::from_fn(5, Vec3::ZERO, Vec3::ONE, |_| 0.0);
        let field = grid.field().unwrap();

        assert!(dual_contouring(&field, 0.0, false, 1.0).unwrap().is_empty());
        assert!(dual_contouring(&field, 0.0, true, 1.0).unwrap().is_empty());
    }

    #[test]
    fn coarse_sphere_becomes_closed_outward_cube() {
        let grid = sphere_grid(3);
        let field = grid.field().unwrap();
        let mesh = dual_contouring(&field, 0.0, false, 1.0).unwrap();

        // All 8 cells touch the single inside sample at the origin
        assert_eq!(mesh.vertex_count(), 8);
        assert_eq!(mesh.indices.len(), 36);
        assert!(mesh.validate().is_ok());
        for v in &mesh.vertices {
            assert!((v.abs() - Vec3::splat(0.75)).length() < 1e-6);
        }

        for tri in mesh.triangles() {
            let (n, centroid) = face_normal(&mesh, tri);
            assert!(n.dot(centroid) > 0.0);
        }
    }

    #[test]
    fn quads_never_reference_inactive_cells() {
        let grid = SampledGrid::from_fn(12, Vec3::splat(-1.0), Vec3::splat(1.0), |p| {
            (p - Vec3::new(0.2, -0.1, 0.05)).length() - 0.6
        });
        let field = grid.field().unwrap();
        let mesh = dual_contouring_with(&field, 0.0, false, 1.0, VertexPlacement::CellCenter, Some(3)).unwrap();

        assert!(!mesh.is_empty());
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn voxel_cubes_use_24_vertices_and_36_indices_per_active_cell() {
        let grid = sphere_grid(6);
        let field = grid.field().unwrap();

        let surface = dual_contouring(&field, 0.0, false, 1.0).unwrap();
        let active = surface.vertex_count();

        let cubes = dual_contouring(&field, 0.0, true, 1.0).unwrap();
        assert_eq!(cubes.vertex_count(), CUBE_VERTEX_COUNT * active);
        assert_eq!(cubes.indices.len(), CUBE_INDEX_COUNT * active);
        assert!(cubes.validate().is_ok());
    }

    #[test]
    fn cube_faces_point_away_from_centre() {
        let mut out = ThreadMesh::new();
        let center = Vec3::new(1.0, 2.0, 3.0);
        emit_cube(&mut out, center, Vec3::splat(0.5));

        let mesh = Mesh::from_parts(out.vertices, out.indices);
        for tri in mesh.triangles() {
            let (n, centroid) = face_normal(&mesh, tri);
            assert!(n.dot(centroid - center) > 0.0);
        }
        assert!(mesh.vertices.iter().all(|v| (*v - center).abs().max_element() <= 0.5 + 1e-6));
    }

    #[test]
    fn rejects_bad_voxel_scale_only_in_cube_mode() {
        let grid = sphere_grid(3);
        let field = grid.field().unwrap();

        assert!(matches!(
            dual_contouring(&field, 0.0, true, 0.0),
            Err(ExtractError::InvalidVoxelScale(_))
        ));
        assert!(matches!(
            dual_contouring(&field, 0.0, true, f32::NAN),
            Err(ExtractError::InvalidVoxelScale(_))
        ));
        assert!(dual_contouring(&field, 0.0, false, 0.0).is_ok());
        assert!(matches!(
            dual_contouring(&field, f32::INFINITY, false, 1.0),
            Err(ExtractError::InvalidIsolevel(_))
        ));
    }

    #[test]
    fn placement_controls_vertex_position() {
        // Plane x = 0.3 through the middle cell column of a 4³ grid over [-1, 1]
        let grid = SampledGrid::from_fn(4, Vec3::splat(-1.0), Vec3::splat(1.0), |p| p.x - 0.3);
        let field = grid.field().unwrap();

        let center = cell_vertex(&field, 0.0, VertexPlacement::CellCenter, 1, 1, 1).unwrap();
        assert!(center.x.abs() < 1e-6);

        let mass = cell_vertex(&field, 0.0, VertexPlacement::MassPoint, 1, 1, 1).unwrap();
        assert!((mass.x - 0.3).abs() < 1e-4);

        let qef = cell_vertex(&field, 0.0, VertexPlacement::Qef, 1, 1, 1).unwrap();
        assert!((qef.x - 0.3).abs() < 1e-2);
        assert!(field.cell_bounds(1, 1, 1).contains_point(qef));

        assert!(cell_vertex(&field, 0.0, VertexPlacement::Qef, 0, 1, 1).is_none());
    }

    #[test]
    fn qef_vertices_stay_inside_their_cells() {
        let grid = sphere_grid(10);
        let field = grid.field().unwrap();
        let n = field.cells_per_axis();

        let mut active = 0;
        for z in 0..n {
            for y in 0..n {
                for x in 0..n {
                    if let Some(v) = cell_vertex(&field, 0.0, VertexPlacement::Qef, x, y, z) {
                        active += 1;
                        assert!(field.cell_bounds(x, y, z).contains_point(v));
                        // Close to the true surface
                        assert!((v.length() - 1.0).abs() < field.cell_size().length());
                    }
                }
            }
        }
        assert!(active > 0);
    }

    #[test]
    fn thread_count_does_not_change_totals() {
        let grid = sphere_grid(9);
        let field = grid.field().unwrap();

        let single = dual_contouring_with(&field, 0.0, false, 1.0, VertexPlacement::Qef, Some(1)).unwrap();
        for threads in [2, 3, 8] {
            let multi = dual_contouring_with(&field, 0.0, false, 1.0, VertexPlacement::Qef, Some(threads)).unwrap();
            assert_eq!(multi.vertex_count(), single.vertex_count());
            assert_eq!(multi.indices.len(), single.indices.len());
        }
    }
}
