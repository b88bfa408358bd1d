use std::time::Instant;
use glam::Vec3;
use log::info;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use isomesh::config::{ExtractConfig, VertexPlacement};
use isomesh::field::SampledGrid;
use isomesh::mesh::DEFAULT_UV_SCALE;
use isomesh::{extract, shapes};

// Default export grid: 256³ samples over [-2, 2]³
const RESOLUTION: usize = 256;
const BOUNDS: f32 = 2.0;

type Sdf = Box<dyn Fn(Vec3) -> f32 + Sync>;

fn scenes() -> Vec<(&'static str, Sdf)> {
    let terrain_noise = Fbm::<Perlin>::new(7)
        .set_octaves(5)
        .set_frequency(0.9)
        .set_persistence(0.5)
        .set_lacunarity(2.0);

    vec![
        ("sphere", Box::new(|p: Vec3| shapes::sphere(p, Vec3::ZERO, 1.0)) as Sdf),
        ("torus", Box::new(|p: Vec3| shapes::torus(p, Vec3::ZERO, 1.2, 0.4)) as Sdf),
        (
            "carved box",
            Box::new(|p: Vec3| {
                let body = shapes::round_box(p, Vec3::ZERO, Vec3::splat(1.0), 0.15);
                let bore = shapes::cylinder(p, Vec3::ZERO, 0.5, 1.5);
                let cap = shapes::sphere(p, Vec3::new(0.0, 1.2, 0.0), 0.6);
                shapes::smooth_union(shapes::subtract(body, bore), cap, 0.3)
            }) as Sdf,
        ),
        (
            "terrain",
            Box::new(move |p: Vec3| {
                let height = terrain_noise.get([p.x as f64, p.z as f64]) as f32 * 0.6;
                shapes::intersect(p.y - height, shapes::cuboid(p, Vec3::ZERO, Vec3::splat(1.9)))
            }) as Sdf,
        ),
    ]
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let res = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<usize>())
        .transpose()?
        .unwrap_or(RESOLUTION);

    let configs = [
        ExtractConfig::marching_cubes().with_normals(),
        ExtractConfig::dual_contouring().with_normals(),
        ExtractConfig::dual_contouring()
            .with_placement(VertexPlacement::Qef)
            .with_uvs(DEFAULT_UV_SCALE),
        ExtractConfig::dual_contouring().with_voxel_cubes(0.9),
    ];

    for (name, sdf) in scenes() {
        let started = Instant::now();
        let grid = SampledGrid::from_fn(res, Vec3::splat(-BOUNDS), Vec3::splat(BOUNDS), sdf);
        let field = grid.field()?;
        info!("Sampled {} at resolution {} in {:.2?}", name, res, started.elapsed());

        for config in &configs {
            let started = Instant::now();
            let mut mesh = extract(&field, config)?;
            mesh.set_uniform_color(0.8, 0.8, 0.8);
            mesh.validate()?;

            info!(
                "{:<10} {:<16} {:?} cubes={} -> {} vertices, {} triangles, {} KiB in {:.2?}",
                name,
                config.method.as_str(),
                config.placement,
                config.fill_with_cubes,
                mesh.vertex_count(),
                mesh.triangle_count(),
                (mesh.position_bytes().len() + mesh.index_bytes().len()) / 1024,
                started.elapsed()
            );
        }
    }

    Ok(())
}
