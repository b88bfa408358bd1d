use glam::Vec3;

pub const INTERP_EPSILON: f32 = 1e-5;

// Isolevel crossing along the edge p1 -> p2.
// Endpoint checks run before the flat-edge check so an exact hit is never
// swallowed by the degenerate fallback.
#[inline]
pub fn vertex_interp(isolevel: f32, p1: Vec3, p2: Vec3, v1: f32, v2: f32) -> Vec3 {
    if (isolevel - v1).abs() < INTERP_EPSILON {
        return p1;
    }
    if (isolevel - v2).abs() < INTERP_EPSILON {
        return p2;
    }
    if (v1 - v2).abs() < INTERP_EPSILON {
        return p1;
    }

    let mu = (isolevel - v1) / (v2 - v1);
    p1 + (p2 - p1) * mu
}

// Crossing parameter clamped to the edge, used by dual contouring
#[inline]
pub fn crossing_t(isolevel: f32, v1: f32, v2: f32) -> f32 {
    let denom = v2 - v1;
    if denom.abs() < INTERP_EPSILON {
        return 0.5;
    }
    ((isolevel - v1) / denom).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn edge_parameter(p1: Vec3, p2: Vec3, p: Vec3) -> f32 {
        (p - p1).dot(p2 - p1) / (p2 - p1).length_squared()
    }

    #[test]
    fn midpoint_crossing() {
        let p = vertex_interp(0.0, Vec3::ZERO, Vec3::X, -1.0, 1.0);
        assert!((p - Vec3::new(0.5, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn endpoint_hits_take_priority() {
        // v1 sits on the isolevel and the edge is also flat: p1 wins
        assert_eq!(vertex_interp(0.0, Vec3::ZERO, Vec3::X, 0.0, 0.0), Vec3::ZERO);
        // v2 on the isolevel with a flat edge must still return p2
        assert_eq!(vertex_interp(0.5, Vec3::ZERO, Vec3::X, 0.5 + 2e-5, 0.5), Vec3::X);
        assert_eq!(vertex_interp(1.0, Vec3::ZERO, Vec3::Y, -3.0, 1.0), Vec3::Y);
    }

    #[test]
    fn flat_edge_falls_back_to_first_point() {
        let p = vertex_interp(0.0, Vec3::ONE, Vec3::ZERO, 2.0, 2.0 + 1e-6);
        assert_eq!(p, Vec3::ONE);
        assert!(p.is_finite());
    }

    #[test]
    fn crossings_stay_on_segment_and_are_direction_independent() {
        let mut rng = Pcg32::seed_from_u64(7);

        for _ in 0..1000 {
            let p1 = Vec3::new(rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0));
            let p2 = p1 + Vec3::new(rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0), rng.gen_range(0.1..2.0));
            let v1: f32 = rng.gen_range(-1.0..-0.01);
            let v2: f32 = rng.gen_range(0.01..1.0);

            let forward = vertex_interp(0.0, p1, p2, v1, v2);
            let t = edge_parameter(p1, p2, forward);
            assert!((-1e-4..=1.0 + 1e-4).contains(&t), "t = {}", t);

            let backward = vertex_interp(0.0, p2, p1, v2, v1);
            assert!((forward - backward).length() < 1e-4);
        }
    }

    #[test]
    fn crossing_t_is_clamped() {
        assert_eq!(crossing_t(0.0, -1.0, 1.0), 0.5);
        assert_eq!(crossing_t(5.0, -1.0, 1.0), 1.0);
        assert_eq!(crossing_t(-5.0, -1.0, 1.0), 0.0);
        assert_eq!(crossing_t(0.0, 1.0, 1.0), 0.5);
    }
}
