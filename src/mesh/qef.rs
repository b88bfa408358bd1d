use glam::Vec3;

use crate::utils::AABB;

// Tikhonov term added to the diagonal before inversion
pub const QEF_REGULARIZATION: f32 = 0.01;
pub const QEF_SINGULAR_DET: f32 = 1e-10;

// Quadratic error function for one dual-contouring cell.
//
// Minimises sum_i (n_i · (x - p_i))² over the (position, normal) samples fed
// in with `add`. `ata` holds the upper triangle of AᵀA in the order
// xx, xy, xz, yy, yz, zz.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Qef {
    ata: [f32; 6],
    atb: Vec3,
    mass_point_sum: Vec3,
    count: u32,
}

impl Qef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, position: Vec3, normal: Vec3) {
        let n = normal;
        self.ata[0] += n.x * n.x;
        self.ata[1] += n.x * n.y;
        self.ata[2] += n.x * n.z;
        self.ata[3] += n.y * n.y;
        self.ata[4] += n.y * n.z;
        self.ata[5] += n.z * n.z;

        self.atb += n * n.dot(position);
        self.mass_point_sum += position;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    // Centroid of the added positions; origin when nothing was added
    pub fn mass_point(&self) -> Vec3 {
        if self.count == 0 {
            Vec3::ZERO
        } else {
            self.mass_point_sum / self.count as f32
        }
    }

    // Closed-form inverse of the regularised system, then x = (AᵀA)⁻¹ Aᵀb
    // clamped into `cell`. Falls back to the mass point when the determinant
    // is near zero.
    pub fn solve(&self, cell: &AABB) -> Vec3 {
        let a00 = self.ata[0] + QEF_REGULARIZATION;
        let a01 = self.ata[1];
        let a02 = self.ata[2];
        let a11 = self.ata[3] + QEF_REGULARIZATION;
        let a12 = self.ata[4];
        let a22 = self.ata[5] + QEF_REGULARIZATION;

        // Cofactors of the symmetric matrix
        let c00 = a11 * a22 - a12 * a12;
        let c01 = a02 * a12 - a01 * a22;
        let c02 = a01 * a12 - a02 * a11;
        let c11 = a00 * a22 - a02 * a02;
        let c12 = a01 * a02 - a00 * a12;
        let c22 = a00 * a11 - a01 * a01;

        let det = a00 * c00 + a01 * c01 + a02 * c02;
        if det.abs() < QEF_SINGULAR_DET {
            return self.mass_point();
        }

        let inv_det = 1.0 / det;
        let b = self.atb;
        let x = Vec3::new(
            (c00 * b.x + c01 * b.y + c02 * b.z) * inv_det,
            (c01 * b.x + c11 * b.y + c12 * b.z) * inv_det,
            (c02 * b.x + c12 * b.y + c22 * b.z) * inv_det,
        );

        if !x.is_finite() {
            return self.mass_point();
        }

        cell.clamp_point(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cell() -> AABB {
        AABB::new(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn three_orthogonal_planes_meet_at_corner_point() {
        let target = Vec3::new(0.3, 0.6, 0.4);
        let mut qef = Qef::new();
        qef.add(Vec3::new(0.3, 0.1, 0.9), Vec3::X);
        qef.add(Vec3::new(0.8, 0.6, 0.2), Vec3::Y);
        qef.add(Vec3::new(0.5, 0.5, 0.4), Vec3::Z);

        let x = qef.solve(&unit_cell());
        // Regularisation pulls slightly toward the origin
        assert!((x - target).length() < 0.02, "solved {:?}", x);
    }

    #[test]
    fn solution_is_clamped_into_cell() {
        let mut qef = Qef::new();
        qef.add(Vec3::new(5.0, 0.5, 0.5), Vec3::X);
        qef.add(Vec3::new(0.5, 5.0, 0.5), Vec3::Y);
        qef.add(Vec3::new(0.5, 0.5, 5.0), Vec3::Z);

        let x = qef.solve(&unit_cell());
        assert!(unit_cell().contains_point(x));
        assert_eq!(x, Vec3::ONE);
    }

    #[test]
    fn empty_system_solves_to_origin_and_mass_point_is_centroid() {
        let qef = Qef::new();
        // det = 0.01³ = 1e-6, well above the singular threshold, and atb = 0
        assert_eq!(qef.solve(&unit_cell()), Vec3::ZERO);

        let mut flat = Qef::new();
        flat.add(Vec3::new(0.2, 0.4, 0.6), Vec3::ZERO);
        flat.add(Vec3::new(0.4, 0.6, 0.8), Vec3::ZERO);
        assert_eq!(flat.count(), 2);
        assert!((flat.mass_point() - Vec3::new(0.3, 0.5, 0.7)).length() < 1e-6);
    }

    #[test]
    fn tiny_regularised_determinant_uses_mass_point() {
        // Cancel the regularisation on x so the determinant vanishes
        let mut qef = Qef {
            ata: [-QEF_REGULARIZATION, 0.0, 0.0, 1.0, 0.0, 1.0],
            ..Qef::default()
        };
        qef.add(Vec3::new(0.25, 0.25, 0.25), Vec3::ZERO);

        let x = qef.solve(&unit_cell());
        assert_eq!(x, Vec3::splat(0.25));
    }
}
