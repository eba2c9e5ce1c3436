use crate::geometry::pose::Rotation;
use serde::{Deserialize, Serialize};

/// Search-effort presets for the shape-aware packer.
///
/// Wider presets test a superset of the candidates a narrower one tests, so
/// under the same seed `Balanced` never places fewer parts than `Fast`, nor
/// `Max` fewer than `Balanced`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Coarse grid, 0° and 90° only, no mirroring, no jitter.
    Fast,
    /// Finer grid, all four rotations, mirroring, uniform jitter.
    #[default]
    Balanced,
    /// Finest grid, plus normally distributed refinement around accepted
    /// candidates.
    Max,
}

impl Strategy {
    pub fn params(self) -> SearchParams {
        match self {
            Strategy::Fast => SearchParams {
                grid_step_factor: 4.0,
                full_rotations: false,
                try_mirror: false,
                jitter_samples: 0,
                refine_samples: 0,
            },
            Strategy::Balanced => SearchParams {
                grid_step_factor: 2.0,
                full_rotations: true,
                try_mirror: true,
                jitter_samples: 256,
                refine_samples: 0,
            },
            Strategy::Max => SearchParams {
                grid_step_factor: 1.0,
                full_rotations: true,
                try_mirror: true,
                jitter_samples: 1024,
                refine_samples: 128,
            },
        }
    }
}

/// Concrete search knobs derived from a [`Strategy`] preset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchParams {
    /// Multiplier on the base grid resolution; smaller means a denser grid.
    pub grid_step_factor: f64,
    /// All four quarter turns when true, 0° and 90° otherwise.
    pub full_rotations: bool,
    /// Whether mirrored candidates are part of the search.
    pub try_mirror: bool,
    /// Seeded uniform samples tried after the grid finds nothing.
    pub jitter_samples: usize,
    /// Normally distributed samples refining an accepted candidate.
    pub refine_samples: usize,
}

impl SearchParams {
    /// Rotations the search may use under this preset and sheet setting.
    pub fn rotations(&self, allow_rotation: bool) -> &'static [Rotation] {
        match (allow_rotation, self.full_rotations) {
            (false, _) => &[Rotation::Deg0],
            (true, false) => &[Rotation::Deg0, Rotation::Deg90],
            (true, true) => &Rotation::ALL,
        }
    }
}
