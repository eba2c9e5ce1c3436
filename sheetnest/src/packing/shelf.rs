//! Bounding-box shelf packing: parts go into left-to-right rows, rows stack
//! bottom to top, full sheets spill onto new ones.

use crate::NestError;
use crate::entities::{NestInstance, NestingResult, Part, Placement, SheetLayout};
use crate::geometry::pose::{Pose, Rotation};
use crate::geometry::primitives::{Point, Rect};
use itertools::Itertools;
use log::{info, warn};
use ordered_float::NotNan;
use std::cmp::Reverse;

/// Where the next part of the current row goes and how tall the row has
/// grown. One cursor per open sheet, advanced only on successful placements.
#[derive(Clone, Copy, Debug)]
struct RowCursor {
    x: f64,
    y: f64,
    row_height: f64,
}

impl RowCursor {
    fn origin(usable: &Rect) -> Self {
        RowCursor {
            x: usable.x_min,
            y: usable.y_min,
            row_height: 0.0,
        }
    }

    /// Cursor at the start of the next row, above the current one.
    fn next_row(&self, usable: &Rect) -> Self {
        RowCursor {
            x: usable.x_min,
            y: self.y + self.row_height,
            row_height: 0.0,
        }
    }
}

/// Packs every part of the instance by bounding box. Keep-out zones and
/// pinned placements are not supported in this mode and are skipped with a
/// warning.
pub fn pack_shelf(instance: &NestInstance) -> Result<NestingResult, NestError> {
    let usable = instance.sheet.usable_rect()?;
    if !instance.keep_outs.is_empty() || !instance.locked.is_empty() {
        warn!(
            "shelf packing ignores keep-out zones and pinned placements, use shape mode to honor them"
        );
    }

    let gap = instance.sheet.gap;
    let rotations: &[Rotation] = match instance.sheet.allow_rotation {
        true => &Rotation::ALL,
        false => &[Rotation::Deg0],
    };

    let order: Vec<&Part> = instance
        .parts
        .iter()
        .sorted_by_cached_key(|p| Reverse(NotNan::new(p.bbox.area()).expect("bbox area is NaN")))
        .collect();

    let mut sheets: Vec<(SheetLayout, RowCursor)> = vec![];
    let mut unplaced = vec![];

    for (i, part) in order.iter().enumerate() {
        let found = sheets
            .iter()
            .enumerate()
            .find_map(|(idx, (_, cursor))| {
                fit_on_sheet(part, cursor, &usable, rotations, gap).map(|fit| (idx, fit))
            });

        let (idx, fit) = match found {
            Some(hit) => hit,
            None => {
                let fresh = RowCursor::origin(&usable);
                match fit_at(part, &fresh, &usable, rotations, gap) {
                    Some(fit) => {
                        sheets.push((SheetLayout::new(sheets.len()), fresh));
                        (sheets.len() - 1, fit)
                    }
                    None => {
                        warn!(
                            "part '{}' does not fit a {}x{} sheet in any orientation",
                            part.id, instance.sheet.width, instance.sheet.height
                        );
                        unplaced.push(part.id.clone());
                        continue;
                    }
                }
            }
        };

        let (layout, cursor) = &mut sheets[idx];
        let pose = place_pose(part, fit.rotation, fit.cursor);
        info!(
            "[SHELF] placing part {}/{} '{}' at [{}] on sheet {}",
            i + 1,
            order.len(),
            part.id,
            pose,
            layout.sheet_index
        );
        layout.placements.push(Placement {
            part_id: part.id.clone(),
            pose,
            locked: false,
            shape: None,
        });
        *cursor = fit.advanced;
    }

    let placed = sheets.iter().map(|(l, _)| l.placements.len()).sum::<usize>();
    info!(
        "[SHELF] placed {}/{} parts across {} sheets",
        placed,
        instance.parts.len(),
        sheets.len()
    );

    Ok(NestingResult {
        sheets: sheets.into_iter().map(|(layout, _)| layout).collect(),
        unplaced,
        cancelled: false,
    })
}

struct ShelfFit {
    rotation: Rotation,
    /// Cursor the part is placed at, possibly after a row advance.
    cursor: RowCursor,
    /// Cursor for the next part on the same sheet.
    advanced: RowCursor,
}

/// Tries the sheet's cursor, then once more at the start of a fresh row.
fn fit_on_sheet(
    part: &Part,
    cursor: &RowCursor,
    usable: &Rect,
    rotations: &[Rotation],
    gap: f64,
) -> Option<ShelfFit> {
    fit_at(part, cursor, usable, rotations, gap).or_else(|| match cursor.row_height > 0.0 {
        true => fit_at(part, &cursor.next_row(usable), usable, rotations, gap),
        false => None,
    })
}

/// Best fitting orientation at this cursor: among those that fit, the one
/// leaving the most remaining row width. Ties go to the earliest rotation.
fn fit_at(
    part: &Part,
    cursor: &RowCursor,
    usable: &Rect,
    rotations: &[Rotation],
    gap: f64,
) -> Option<ShelfFit> {
    rotations
        .iter()
        .filter_map(|&rotation| {
            let frame = posed_frame(part, rotation);
            let (w, h) = (frame.width() + gap, frame.height() + gap);
            let fits = cursor.x + w <= usable.x_max && cursor.y + h <= usable.y_max;
            match fits {
                true => {
                    let remaining = usable.x_max - cursor.x - w;
                    let key = Reverse(NotNan::new(remaining).expect("remaining width is NaN"));
                    Some((key, rotation, w, h))
                }
                false => None,
            }
        })
        .min_by_key(|&(key, ..)| key)
        .map(|(_, rotation, w, h)| ShelfFit {
            rotation,
            cursor: *cursor,
            advanced: RowCursor {
                x: cursor.x + w,
                y: cursor.y,
                row_height: cursor.row_height.max(h),
            },
        })
}

fn posed_frame(part: &Part, rotation: Rotation) -> Rect {
    Pose::new(rotation, false, Point(0.0, 0.0)).transformed_rect(&part.bbox)
}

/// Pose putting the part's rotated bbox corner on the cursor.
fn place_pose(part: &Part, rotation: Rotation, cursor: RowCursor) -> Pose {
    let frame = posed_frame(part, rotation);
    Pose::new(
        rotation,
        false,
        Point(cursor.x - frame.x_min, cursor.y - frame.y_min),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{NestInstance, PackMode, PartBuilder, SheetConfig};
    use crate::packing::Strategy;

    fn sheet(allow_rotation: bool) -> SheetConfig {
        SheetConfig {
            width: 300.0,
            height: 200.0,
            margin: 5.0,
            gap: 2.0,
            allow_rotation,
        }
    }

    fn instance(parts: Vec<Part>, sheet: SheetConfig) -> NestInstance {
        NestInstance {
            parts,
            locked: vec![],
            sheet,
            keep_outs: vec![],
            strategy: Strategy::Fast,
            seed: 0,
            mode: PackMode::Shelf,
        }
    }

    fn eight_rects() -> Vec<Part> {
        PartBuilder::new(0.05, 2.0)
            .rectangle("plate", 100.0, 60.0)
            .unwrap()
            .expand_copies(8)
    }

    #[test]
    fn eight_plates_fill_one_sheet_and_spill() {
        let result = pack_shelf(&instance(eight_rects(), sheet(true))).unwrap();
        assert_eq!(result.unplaced, Vec::<String>::new());
        assert_eq!(result.sheets.len(), 2);
        assert_eq!(result.sheets[0].placements.len(), 6);
        assert_eq!(result.sheets[1].placements.len(), 2);

        // standing the plates upright leaves the most row width, so the
        // first row is rotated
        let first = &result.sheets[0].placements[0];
        assert_eq!(first.pose.rotation, Rotation::Deg90);
        let plates = eight_rects();
        let placed = first.pose.transformed_rect(&plates[0].bbox);
        assert_eq!(placed, Rect::try_new(5.0, 5.0, 65.0, 105.0).unwrap());
    }

    #[test]
    fn rotation_off_still_places_everything() {
        let result = pack_shelf(&instance(eight_rects(), sheet(false))).unwrap();
        assert_eq!(result.placed_count(), 8);
        assert_eq!(result.sheets.len(), 2);
        assert!(
            result.sheets[0]
                .placements
                .iter()
                .all(|p| p.pose.rotation == Rotation::Deg0)
        );
    }

    #[test]
    fn exact_fits_use_the_full_row() {
        let parts = PartBuilder::new(0.05, 0.0)
            .rectangle("tile", 100.0, 100.0)
            .unwrap()
            .expand_copies(3);
        let config = SheetConfig {
            width: 300.0,
            height: 100.0,
            margin: 0.0,
            gap: 0.0,
            allow_rotation: false,
        };
        let result = pack_shelf(&instance(parts, config)).unwrap();
        assert_eq!(result.sheets.len(), 1);
        assert_eq!(result.sheets[0].placements.len(), 3);
        let xs: Vec<f64> = result.sheets[0]
            .placements
            .iter()
            .map(|p| p.pose.translation.0)
            .collect();
        assert_eq!(xs, vec![0.0, 100.0, 200.0]);
    }

    #[test]
    fn oversize_parts_are_reported_unplaced() {
        let parts = PartBuilder::new(0.05, 0.0)
            .rectangle("oversize", 400.0, 50.0)
            .unwrap()
            .expand_copies(1);
        let result = pack_shelf(&instance(parts, sheet(true))).unwrap();
        assert_eq!(result.sheets.len(), 0);
        assert_eq!(result.unplaced, vec!["oversize-copy-0".to_string()]);
    }

    #[test]
    fn smaller_parts_backfill_earlier_sheets() {
        let builder = PartBuilder::new(0.05, 0.0);
        let mut parts = builder
            .rectangle("big", 120.0, 180.0)
            .unwrap()
            .expand_copies(2);
        parts.extend(
            builder
                .rectangle("small", 60.0, 80.0)
                .unwrap()
                .expand_copies(2),
        );
        let config = SheetConfig {
            width: 200.0,
            height: 200.0,
            margin: 0.0,
            gap: 0.0,
            allow_rotation: false,
        };
        let result = pack_shelf(&instance(parts, config)).unwrap();
        // the first small part slots next to the big one on sheet 0
        assert_eq!(result.sheets.len(), 2);
        assert_eq!(result.sheets[0].placements.len(), 2);
        assert_eq!(result.placed_count(), 4);
        assert!(result.unplaced.is_empty());
    }
}
