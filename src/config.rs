use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    MarchingCubes,
    DualContouring,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarchingCubes => "Marching Cubes",
            Self::DualContouring => "Dual Contouring",
        }
    }
}

// Where dual contouring puts the single vertex of an active cell
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexPlacement {
    // Geometric centre of the cell; smooth but rounds off sharp features
    CellCenter,
    // Centroid of the cell's edge crossings
    MassPoint,
    // QEF minimiser clamped to the cell; keeps sharp edges and corners
    Qef,
}

impl Default for VertexPlacement {
    fn default() -> Self {
        Self::CellCenter
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    pub method: Method,
    pub isolevel: f32,
    // None = hardware concurrency
    pub threads: Option<usize>,
    pub placement: VertexPlacement,
    pub fill_with_cubes: bool,
    pub voxel_scale: f32,
    pub compute_normals: bool,
    // Some(scale) adds triplanar UVs (and normals, which they need)
    pub uv_scale: Option<f32>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            method: Method::DualContouring,
            isolevel: 0.0,
            threads: None,
            placement: VertexPlacement::CellCenter,
            fill_with_cubes: false,
            voxel_scale: 1.0,
            compute_normals: false,
            uv_scale: None,
        }
    }
}

impl ExtractConfig {
    pub fn marching_cubes() -> Self {
        Self {
            method: Method::MarchingCubes,
            ..Self::default()
        }
    }

    pub fn dual_contouring() -> Self {
        Self::default()
    }

    pub fn with_isolevel(mut self, isolevel: f32) -> Self {
        self.isolevel = isolevel;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_placement(mut self, placement: VertexPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_voxel_cubes(mut self, voxel_scale: f32) -> Self {
        self.fill_with_cubes = true;
        self.voxel_scale = voxel_scale;
        self
    }

    pub fn with_normals(mut self) -> Self {
        self.compute_normals = true;
        self
    }

    pub fn with_uvs(mut self, scale: f32) -> Self {
        self.uv_scale = Some(scale);
        self
    }
}
