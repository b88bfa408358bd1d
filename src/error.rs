// Error types for grid validation and extraction.

use glam::Vec3;
use thiserror::Error;

// Errors surfaced by extraction entry points.
//
// Numerically degenerate input (flat fields, singular QEF systems, zero-length
// normals) is never reported here; those cases resolve to fallback values.
#[derive(Error, Debug)]
pub enum ExtractError {
    // Fewer than two samples per axis means there are no cells.
    #[error("grid resolution must be at least 2, got {res}")]
    ResolutionTooSmall {
        res: usize,
    },

    // Sample array does not hold `res³` values.
    #[error("sample count mismatch for resolution {res}: expected {expected}, got {got}")]
    SampleCount {
        res: usize,
        expected: usize,
        got: usize,
    },

    // Grid index space does not fit the `u32` index type.
    #[error("grid resolution {res} is too large for 32-bit mesh indices")]
    GridTooLarge {
        res: usize,
    },

    // Bounds must be finite with `max > min` on every axis.
    #[error("invalid bounds: min {min:?}, max {max:?}")]
    InvalidBounds {
        min: Vec3,
        max: Vec3,
    },

    #[error("isolevel must be finite, got {0}")]
    InvalidIsolevel(f32),

    #[error("voxel scale must be finite and positive, got {0}")]
    InvalidVoxelScale(f32),

    // Per-vertex attribute array of the wrong length.
    #[error("attribute length mismatch: expected {expected} entries, got {got}")]
    AttributeLength {
        expected: usize,
        got: usize,
    },

    // Index buffer length is not a multiple of three.
    #[error("index count {index_count} is not a whole number of triangles")]
    PartialTriangle {
        index_count: usize,
    },

    // Index refers past the end of the vertex array.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        index: u32,
        vertex_count: usize,
    },

    // Merged output would need indices past u32::MAX
    #[error("extraction produced {count} vertices, more than 32-bit mesh indices can address")]
    TooManyVertices {
        count: usize,
    },

    #[error("failed to spawn extraction worker: {0}")]
    ThreadSpawn(#[from] std::io::Error),

    #[error("extraction worker {thread} panicked")]
    WorkerPanicked {
        thread: usize,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
