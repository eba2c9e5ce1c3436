use crate::geometry::kernel::IntPolygonSet;
use crate::geometry::pose::{Pose, Rotation};
use crate::geometry::primitives::Point;

/// A placement pinned by the caller before the run. Preserved verbatim in the
/// result and treated as a static obstacle during packing.
#[derive(Clone, Debug, PartialEq)]
pub struct LockedPlacement {
    pub part_id: String,
    pub sheet_index: usize,
    /// Translation of the part's local frame, in mm.
    pub position: Point,
    pub rotation: Rotation,
    pub mirrored: bool,
}

impl LockedPlacement {
    pub fn pose(&self) -> Pose {
        Pose::new(self.rotation, self.mirrored, self.position)
    }
}

/// One placed part instance on a sheet.
#[derive(Clone, Debug)]
pub struct Placement {
    pub part_id: String,
    pub pose: Pose,
    /// True when the placement was pinned by the caller rather than found by
    /// the packer.
    pub locked: bool,
    /// World-space outline after the pose. Populated by the shape-aware
    /// packer, absent for shelf runs.
    pub shape: Option<IntPolygonSet>,
}

/// The ordered placements of a single sheet.
#[derive(Clone, Debug, Default)]
pub struct SheetLayout {
    pub sheet_index: usize,
    pub placements: Vec<Placement>,
}

impl SheetLayout {
    pub fn new(sheet_index: usize) -> Self {
        SheetLayout {
            sheet_index,
            placements: vec![],
        }
    }
}
