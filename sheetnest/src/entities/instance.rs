use crate::entities::{KeepOutRect, LockedPlacement, Part, SheetConfig};
use crate::packing::Strategy;
use serde::{Deserialize, Serialize};

/// Which packing algorithm a job runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackMode {
    /// Bounding-box shelf packing, fast and rotation-aware.
    Shelf,
    /// Polygon-outline packing with per-candidate collision search.
    #[default]
    Shape,
}

/// Everything one nesting run consumes.
///
/// A pure value: packing the same instance twice yields the same result,
/// alternative layouts come from changing `seed`.
#[derive(Clone, Debug)]
pub struct NestInstance {
    /// Free part instances to place, multiplicity already expanded.
    pub parts: Vec<Part>,
    /// Pinned placements, each with its resolved geometry.
    pub locked: Vec<(LockedPlacement, Part)>,
    pub sheet: SheetConfig,
    pub keep_outs: Vec<KeepOutRect>,
    pub strategy: Strategy,
    pub seed: u64,
    pub mode: PackMode,
}

impl NestInstance {
    /// All parts with geometry in this instance, free and pinned.
    pub fn all_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts
            .iter()
            .chain(self.locked.iter().map(|(_, part)| part))
    }

    /// Total net area queued for placement, mm².
    pub fn queued_area(&self) -> f64 {
        self.parts.iter().map(|p| p.area).sum()
    }
}
