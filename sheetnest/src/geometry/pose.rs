use crate::geometry::primitives::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// One of the four quarter-turn rotations a placement can use.
///
/// Closed set on purpose: every rotation is exact on the integer lattice,
/// and matching over it is exhaustive wherever orientations are enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Number of quarter turns, 0..4.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    pub fn degrees(self) -> u32 {
        self.quarter_turns() as u32 * 90
    }

    pub fn from_degrees(degrees: u32) -> Option<Rotation> {
        match degrees % 360 {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// True if the rotation swaps the width and height of a bounding box.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// A placement transformation, decomposed into its three parts.
///
/// Applied to a part's local frame as mirror, then rotation, then translation.
/// The same order the SVG transform `translate(..) rotate(..) scale(-1 1)`
/// produces, so exported documents reuse poses verbatim.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub rotation: Rotation,
    pub mirrored: bool,
    pub translation: Point,
}

impl Pose {
    pub fn new(rotation: Rotation, mirrored: bool, translation: Point) -> Self {
        Pose {
            rotation,
            mirrored,
            translation,
        }
    }

    /// Axis-aligned bounds of `rect` after this pose. Exact: quarter-turn
    /// rotations and mirroring keep boxes axis-aligned, so the result is the
    /// tight bounds of any geometry `rect` tightly bounded.
    pub fn transformed_rect(&self, rect: &Rect) -> Rect {
        let (x_min, x_max) = match self.mirrored {
            true => (-rect.x_max, -rect.x_min),
            false => (rect.x_min, rect.x_max),
        };
        let (y_min, y_max) = (rect.y_min, rect.y_max);
        let (x_min, y_min, x_max, y_max) = match self.rotation {
            Rotation::Deg0 => (x_min, y_min, x_max, y_max),
            Rotation::Deg90 => (-y_max, x_min, -y_min, x_max),
            Rotation::Deg180 => (-x_max, -y_max, -x_min, -y_min),
            Rotation::Deg270 => (y_min, -x_max, y_max, -x_min),
        };
        Rect {
            x_min: x_min + self.translation.0,
            y_min: y_min + self.translation.1,
            x_max: x_max + self.translation.0,
            y_max: y_max + self.translation.1,
        }
    }
}

impl Display for Pose {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "r: {}°{}, t: ({:.3}, {:.3})",
            self.rotation.degrees(),
            if self.mirrored { ", mirrored" } else { "" },
            self.translation.0,
            self.translation.1
        )
    }
}
