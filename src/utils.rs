use std::ops::Range;
use glam::Vec3;

// Slab iteration: z outermost, x fastest, matching the row-major sample layout
pub fn for_slab_cells<F>(z_range: Range<usize>, extent: usize, mut f: F)
where
    F: FnMut(usize, usize, usize),
{
    for z in z_range {
        for y in 0..extent {
            for x in 0..extent {
                f(x, y, z);
            }
        }
    }
}

// Index of the largest absolute component; ties go to x, then y
pub fn dominant_axis(v: Vec3) -> usize {
    let a = v.abs();
    if a.x >= a.y && a.x >= a.z {
        0
    } else if a.y >= a.z {
        1
    } else {
        2
    }
}

// AABB utilities
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AABB {
    pub min: Vec3,
    pub max: Vec3,
}

impl AABB {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    // Finite and strictly non-empty on every axis
    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min.cmplt(self.max).all()
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
            point.y >= self.min.y && point.y <= self.max.y &&
            point.z >= self.min.z && point.z <= self.max.z
    }

    pub fn clamp_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }
}
