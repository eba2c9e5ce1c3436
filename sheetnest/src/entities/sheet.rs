use crate::NestError;
use crate::geometry::kernel::{self, IntPolygonSet};
use crate::geometry::primitives::Rect;
use serde::{Deserialize, Serialize};

/// Material sheet parameters, shared by every sheet a run opens.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Sheet width in mm.
    pub width: f64,
    /// Sheet height in mm.
    pub height: f64,
    /// Clearance kept free along every sheet edge, in mm.
    #[serde(default)]
    pub margin: f64,
    /// Minimum distance between neighboring parts, in mm.
    #[serde(default)]
    pub gap: f64,
    /// Whether parts may be rotated in 90° steps.
    #[serde(default = "default_allow_rotation")]
    pub allow_rotation: bool,
}

fn default_allow_rotation() -> bool {
    true
}

impl SheetConfig {
    /// The rectangle placements must stay inside, or a [`NestError::Config`]
    /// naming the parameter that is off.
    pub fn usable_rect(&self) -> Result<Rect, NestError> {
        if !(self.width.is_finite() && self.width > 0.0)
            || !(self.height.is_finite() && self.height > 0.0)
        {
            return Err(NestError::Config(format!(
                "sheet dimensions {}x{} must be positive",
                self.width, self.height
            )));
        }
        if !(self.margin.is_finite() && self.margin >= 0.0) {
            return Err(NestError::Config(format!(
                "margin {} must be non-negative",
                self.margin
            )));
        }
        if !(self.gap.is_finite() && self.gap >= 0.0) {
            return Err(NestError::Config(format!(
                "gap {} must be non-negative",
                self.gap
            )));
        }
        Rect::try_new(
            self.margin,
            self.margin,
            self.width - self.margin,
            self.height - self.margin,
        )
        .map_err(|_| {
            NestError::Config(format!(
                "margin {} leaves no usable area on a {}x{} sheet",
                self.margin, self.width, self.height
            ))
        })
    }

    pub fn validate(&self) -> Result<(), NestError> {
        self.usable_rect().map(|_| ())
    }
}

/// Axis-aligned region no placement may intersect, applied to every sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KeepOutRect {
    pub rect: Rect,
}

impl KeepOutRect {
    /// Lattice polygon of the zone, for the collision tests.
    pub fn to_polygon_set(&self) -> IntPolygonSet {
        kernel::rectangle(&self.rect)
            .map(IntPolygonSet::from_polygon)
            .unwrap_or_default()
    }
}
