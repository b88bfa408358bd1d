// Read-only access to a cubic grid of signed distance samples.

use glam::Vec3;
use rayon::prelude::*;

use crate::error::{ExtractError, Result};
use crate::mesh::tables::CORNER_OFFSETS;
use crate::utils::AABB;

// Borrowed view over `res³` samples laid out row-major (x fastest, then y, then z).
#[derive(Clone, Copy, Debug)]
pub struct ScalarField<'a> {
    samples: &'a [f32],
    res: usize,
    bounds: AABB,
    cell_size: Vec3,
}

impl<'a> ScalarField<'a> {
    pub fn new(samples: &'a [f32], res: usize, bounds_min: Vec3, bounds_max: Vec3) -> Result<Self> {
        if res < 2 {
            return Err(ExtractError::ResolutionTooSmall { res });
        }

        let expected = res
            .checked_mul(res)
            .and_then(|sq| sq.checked_mul(res))
            .ok_or(ExtractError::GridTooLarge { res })?;

        // Every emitted index is derived from a sample or cell index
        if expected > u32::MAX as usize {
            return Err(ExtractError::GridTooLarge { res });
        }

        if samples.len() != expected {
            return Err(ExtractError::SampleCount {
                res,
                expected,
                got: samples.len(),
            });
        }

        let bounds = AABB::new(bounds_min, bounds_max);
        if !bounds.is_valid() {
            return Err(ExtractError::InvalidBounds {
                min: bounds_min,
                max: bounds_max,
            });
        }

        Ok(Self {
            samples,
            res,
            bounds,
            cell_size: bounds.size() / (res - 1) as f32,
        })
    }

    pub fn res(&self) -> usize {
        self.res
    }

    // Cells per axis (`res - 1`).
    pub fn cells_per_axis(&self) -> usize {
        self.res - 1
    }

    pub fn bounds(&self) -> AABB {
        self.bounds
    }

    pub fn cell_size(&self) -> Vec3 {
        self.cell_size
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + y * self.res + z * self.res * self.res
    }

    #[inline]
    pub fn value(&self, x: usize, y: usize, z: usize) -> f32 {
        self.samples[self.index(x, y, z)]
    }

    #[inline]
    pub fn position(&self, x: usize, y: usize, z: usize) -> Vec3 {
        self.bounds.min + Vec3::new(x as f32, y as f32, z as f32) * self.cell_size
    }

    // Corner values and positions of cell `(x, y, z)` in table corner order.
    pub fn cell_corners(&self, x: usize, y: usize, z: usize) -> ([f32; 8], [Vec3; 8]) {
        let mut values = [0.0f32; 8];
        let mut positions = [Vec3::ZERO; 8];

        for (i, &[dx, dy, dz]) in CORNER_OFFSETS.iter().enumerate() {
            values[i] = self.value(x + dx, y + dy, z + dz);
            positions[i] = self.position(x + dx, y + dy, z + dz);
        }

        (values, positions)
    }

    pub fn cell_bounds(&self, x: usize, y: usize, z: usize) -> AABB {
        AABB::new(self.position(x, y, z), self.position(x + 1, y + 1, z + 1))
    }

    // Field gradient at a sample by finite differences.
    //
    // Central differences in the interior, one-sided differences on the grid faces.
    pub fn gradient(&self, x: usize, y: usize, z: usize) -> Vec3 {
        let last = self.res - 1;

        let axis = |lo: f32, hi: f32, span: usize, spacing: f32| (hi - lo) / (span as f32 * spacing);

        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(last));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(last));
        let (z0, z1) = (z.saturating_sub(1), (z + 1).min(last));

        Vec3::new(
            axis(self.value(x0, y, z), self.value(x1, y, z), x1 - x0, self.cell_size.x),
            axis(self.value(x, y0, z), self.value(x, y1, z), y1 - y0, self.cell_size.y),
            axis(self.value(x, y, z0), self.value(x, y, z1), z1 - z0, self.cell_size.z),
        )
    }
}

// Owned sample grid, typically produced by evaluating an implicit function.
#[derive(Clone, Debug)]
pub struct SampledGrid {
    pub samples: Vec<f32>,
    pub res: usize,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
}

impl SampledGrid {
    // Evaluate `f` at every grid point, one Z slice per rayon task.
    pub fn from_fn<F>(res: usize, bounds_min: Vec3, bounds_max: Vec3, f: F) -> Self
    where
        F: Fn(Vec3) -> f32 + Sync,
    {
        let mut samples = vec![0.0f32; res * res * res];

        if res >= 2 {
            let step = (bounds_max - bounds_min) / (res - 1) as f32;
            let slice = res * res;

            samples.par_chunks_mut(slice).enumerate().for_each(|(z, plane)| {
                for y in 0..res {
                    for x in 0..res {
                        let p = bounds_min + Vec3::new(x as f32, y as f32, z as f32) * step;
                        plane[x + y * res] = f(p);
                    }
                }
            });
        }

        Self {
            samples,
            res,
            bounds_min,
            bounds_max,
        }
    }

    pub fn field(&self) -> Result<ScalarField<'_>> {
        ScalarField::new(&self.samples, self.res, self.bounds_min, self.bounds_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(res: usize) -> SampledGrid {
        // f = x, so the gradient is +x everywhere
        SampledGrid::from_fn(res, Vec3::splat(-1.0), Vec3::splat(1.0), |p| p.x)
    }

    #[test]
    fn rejects_bad_parameters() {
        let samples = vec![0.0f32; 8];
        assert!(matches!(
            ScalarField::new(&samples, 1, Vec3::ZERO, Vec3::ONE),
            Err(ExtractError::ResolutionTooSmall { res: 1 })
        ));
        assert!(matches!(
            ScalarField::new(&samples, 3, Vec3::ZERO, Vec3::ONE),
            Err(ExtractError::SampleCount { expected: 27, got: 8, .. })
        ));
        assert!(matches!(
            ScalarField::new(&samples, 2, Vec3::ONE, Vec3::ZERO),
            Err(ExtractError::InvalidBounds { .. })
        ));
        assert!(matches!(
            ScalarField::new(&samples, usize::MAX, Vec3::ZERO, Vec3::ONE),
            Err(ExtractError::GridTooLarge { .. })
        ));
        assert!(ScalarField::new(&samples, 2, Vec3::ZERO, Vec3::ONE).is_ok());
    }

    #[test]
    fn indexing_is_row_major() {
        let grid = SampledGrid::from_fn(4, Vec3::ZERO, Vec3::splat(3.0), |p| p.x + 10.0 * p.y + 100.0 * p.z);
        let field = grid.field().unwrap();

        assert_eq!(field.index(1, 0, 0), 1);
        assert_eq!(field.index(0, 1, 0), 4);
        assert_eq!(field.index(0, 0, 1), 16);
        assert_eq!(field.value(2, 1, 3), 2.0 + 10.0 + 300.0);
        assert_eq!(field.position(3, 3, 3), Vec3::splat(3.0));
        assert_eq!(field.cell_size(), Vec3::ONE);
    }

    #[test]
    fn cell_corners_follow_table_order() {
        let grid = ramp(3);
        let field = grid.field().unwrap();
        let (values, positions) = field.cell_corners(1, 0, 0);

        assert_eq!(positions[0], Vec3::new(0.0, -1.0, -1.0));
        assert_eq!(positions[6], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(values[1], 1.0);
        assert_eq!(values[3], 0.0);
    }

    #[test]
    fn gradient_is_exact_for_linear_fields() {
        let grid = ramp(5);
        let field = grid.field().unwrap();

        for &(x, y, z) in &[(0, 0, 0), (2, 2, 2), (4, 1, 3), (4, 4, 4)] {
            let g = field.gradient(x, y, z);
            assert!((g - Vec3::X).length() < 1e-5, "gradient at {:?} was {:?}", (x, y, z), g);
        }
    }

    #[test]
    fn cell_bounds_cover_one_cell() {
        let grid = ramp(3);
        let field = grid.field().unwrap();
        let cell = field.cell_bounds(1, 1, 1);
        assert_eq!(cell.min, Vec3::ZERO);
        assert_eq!(cell.max, Vec3::ONE);
    }
}
