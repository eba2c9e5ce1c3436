use crate::entities::{PackMode, SheetConfig};
use crate::packing::Strategy;
use serde::{Deserialize, Serialize};

/// External representation of a nesting job, the unit of work a caller
/// submits. Deserializes from JSON; all dimensions are in millimeters.
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtNestJob {
    /// Name of the job, used to label exported documents.
    pub name: String,
    /// The material sheet every opened layout runs on.
    pub sheet: SheetConfig,
    /// The parts to nest and how many copies of each.
    pub parts: Vec<ExtPart>,
    /// Regions of every sheet no placement may intersect.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub keep_outs: Vec<ExtKeepOut>,
    /// Placements from a previous run to preserve verbatim.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub locked: Vec<ExtLockedPlacement>,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub mode: PackMode,
    /// Seed for the shape-aware search. Rerunning with the same seed
    /// reproduces the layout, incrementing it yields an alternative one.
    #[serde(default)]
    pub seed: u64,
}

/// External representation of a [`Part`](crate::entities::Part) definition.
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtPart {
    /// Unique identifier of the part.
    pub id: String,
    /// Shape of the part.
    pub shape: ExtShape,
    /// How many copies to place.
    #[serde(default = "one")]
    pub count: usize,
}

fn one() -> usize {
    1
}

/// Various ways to describe a part's shape.
#[derive(Serialize, Deserialize, Clone)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum ExtShape {
    /// Vector path data (M/L/H/V/C/S/Q/T/A/Z commands).
    Path(String),
    /// Circle of the given radius.
    Circle { radius: f64 },
    /// Axis-aligned rectangle.
    Rectangle { width: f64, height: f64 },
    /// Rectangle of the given length with semicircular end caps.
    Capsule { length: f64, radius: f64 },
}

/// Axis-aligned keep-out rectangle in sheet coordinates.
#[derive(Serialize, Deserialize, Clone, Copy)]
pub struct ExtKeepOut {
    pub x_min: f64,
    pub y_min: f64,
    pub width: f64,
    pub height: f64,
}

/// External representation of a
/// [`LockedPlacement`](crate::entities::LockedPlacement).
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtLockedPlacement {
    /// Id of the part definition this placement pins, an extra instance on
    /// top of that part's `count`.
    pub part_id: String,
    /// Zero-based index of the sheet the placement sits on.
    pub sheet: usize,
    /// Translation of the part's local frame (x, y), in mm.
    pub translation: (f64, f64),
    /// Rotation in degrees, a multiple of 90.
    #[serde(default)]
    pub rotation: u32,
    #[serde(default)]
    pub mirrored: bool,
}

/// External representation of a computed
/// [`NestingResult`](crate::entities::NestingResult).
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtNestSolution {
    /// The opened sheets in order, each with its placements.
    pub sheets: Vec<ExtSheetLayout>,
    /// Ids of part instances that fit on no sheet.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub unplaced: Vec<String>,
    /// True when the run was stopped early; the layouts are still valid.
    #[serde(default)]
    pub cancelled: bool,
    /// Placed part area over usable area, across all opened sheets.
    pub density: f64,
    pub run_time_ms: u64,
}

/// External representation of one sheet's
/// [`SheetLayout`](crate::entities::SheetLayout).
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtSheetLayout {
    pub sheet_index: usize,
    pub placements: Vec<ExtPlacement>,
    /// Placed part area over usable area of this sheet.
    pub density: f64,
}

/// External representation of a [`Placement`](crate::entities::Placement).
#[derive(Serialize, Deserialize, Clone)]
pub struct ExtPlacement {
    /// Id of the placed part instance.
    pub part_id: String,
    /// Translation of the part's local frame (x, y), in mm.
    pub translation: (f64, f64),
    /// Rotation in degrees, a multiple of 90.
    pub rotation: u32,
    pub mirrored: bool,
    /// True when the placement was pinned by the caller.
    pub locked: bool,
}
