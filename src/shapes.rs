// Analytic signed distance functions for building test and demo fields.
//
// Negative inside, positive outside. Feed them to `SampledGrid::from_fn`.

use glam::{Vec2, Vec3};

pub fn sphere(p: Vec3, center: Vec3, radius: f32) -> f32 {
    (p - center).length() - radius
}

// Axis-aligned box with half extents `half`. Exact on the faces, a bound elsewhere.
pub fn cuboid(p: Vec3, center: Vec3, half: Vec3) -> f32 {
    ((p - center).abs() - half).max_element()
}

pub fn round_box(p: Vec3, center: Vec3, half: Vec3, radius: f32) -> f32 {
    cuboid(p, center, half - Vec3::splat(radius)) - radius
}

// Y-aligned capped cylinder; `half_height` along y.
pub fn cylinder(p: Vec3, center: Vec3, radius: f32, half_height: f32) -> f32 {
    let d = p - center;
    let radial = Vec2::new(d.x, d.z).length() - radius;
    radial.max(d.y.abs() - half_height)
}

// Torus in the XZ plane.
pub fn torus(p: Vec3, center: Vec3, major: f32, minor: f32) -> f32 {
    let d = p - center;
    let q = Vec2::new(Vec2::new(d.x, d.z).length() - major, d.y);
    q.length() - minor
}

// Half space n·p + offset < 0
pub fn plane(p: Vec3, normal: Vec3, offset: f32) -> f32 {
    normal.dot(p) + offset
}

pub fn union(a: f32, b: f32) -> f32 {
    a.min(b)
}

// a with b carved out
pub fn subtract(a: f32, b: f32) -> f32 {
    a.max(-b)
}

pub fn intersect(a: f32, b: f32) -> f32 {
    a.max(b)
}

// Polynomial smooth minimum; `k` is the blend width.
pub fn smooth_union(a: f32, b: f32, k: f32) -> f32 {
    if k <= 0.0 {
        return union(a, b);
    }
    let h = (k - (a - b).abs()).max(0.0) / k;
    a.min(b) - h * h * k * 0.25
}
