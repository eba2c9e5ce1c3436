use crate::entities::{NestInstance, NestingResult, Placement, SheetLayout};
use crate::io::ext_repr::{ExtNestSolution, ExtPlacement, ExtSheetLayout};
use std::time::Instant;

/// Exports a solution out of the library. `epoch` is the moment the run
/// started, used to stamp the wall-clock runtime.
pub fn export(
    instance: &NestInstance,
    result: &NestingResult,
    epoch: Instant,
) -> ExtNestSolution {
    let sheets: Vec<ExtSheetLayout> = result
        .sheets
        .iter()
        .map(|layout| export_layout(layout, instance))
        .collect();
    let density = match sheets.len() {
        0 => 0.0,
        n => sheets.iter().map(|s| s.density).sum::<f64>() / n as f64,
    };
    ExtNestSolution {
        sheets,
        unplaced: result.unplaced.clone(),
        cancelled: result.cancelled,
        density,
        run_time_ms: epoch.elapsed().as_millis() as u64,
    }
}

/// Exports a single sheet. Density counts every placement on the sheet,
/// pinned ones included, against the usable area.
pub fn export_layout(layout: &SheetLayout, instance: &NestInstance) -> ExtSheetLayout {
    let usable_area = instance.sheet.usable_rect().map_or(0.0, |r| r.area());
    let placed_area: f64 = layout
        .placements
        .iter()
        .filter_map(|p| instance.all_parts().find(|part| part.id == p.part_id))
        .map(|part| part.area)
        .sum();
    ExtSheetLayout {
        sheet_index: layout.sheet_index,
        placements: layout.placements.iter().map(export_placement).collect(),
        density: match usable_area > 0.0 {
            true => placed_area / usable_area,
            false => 0.0,
        },
    }
}

fn export_placement(placement: &Placement) -> ExtPlacement {
    ExtPlacement {
        part_id: placement.part_id.clone(),
        translation: (placement.pose.translation.0, placement.pose.translation.1),
        rotation: placement.pose.rotation.degrees(),
        mirrored: placement.pose.mirrored,
        locked: placement.locked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{PackMode, PartBuilder, SheetConfig};
    use crate::geometry::pose::{Pose, Rotation};
    use crate::geometry::primitives::Point;
    use crate::packing::Strategy;

    fn demo_instance() -> NestInstance {
        let parts = PartBuilder::new(0.05, 0.0)
            .rectangle("plate", 100.0, 50.0)
            .unwrap()
            .expand_copies(1);
        NestInstance {
            parts,
            locked: vec![],
            sheet: SheetConfig {
                width: 200.0,
                height: 100.0,
                margin: 0.0,
                gap: 0.0,
                allow_rotation: true,
            },
            keep_outs: vec![],
            strategy: Strategy::Balanced,
            seed: 0,
            mode: PackMode::Shape,
        }
    }

    #[test]
    fn placements_export_their_pose_fields() {
        let instance = demo_instance();
        let result = NestingResult {
            sheets: vec![SheetLayout {
                sheet_index: 0,
                placements: vec![Placement {
                    part_id: "plate-copy-0".to_string(),
                    pose: Pose::new(Rotation::Deg90, true, Point(10.0, 20.0)),
                    locked: false,
                    shape: None,
                }],
            }],
            unplaced: vec![],
            cancelled: false,
        };
        let ext = export(&instance, &result, Instant::now());
        assert_eq!(ext.sheets.len(), 1);
        let placement = &ext.sheets[0].placements[0];
        assert_eq!(placement.part_id, "plate-copy-0");
        assert_eq!(placement.rotation, 90);
        assert!(placement.mirrored);
        assert_eq!(placement.translation, (10.0, 20.0));
        assert!(!placement.locked);
        // one 100x50 plate on a 200x100 sheet
        assert!((ext.sheets[0].density - 0.25).abs() < 1e-9);
        assert!((ext.density - 0.25).abs() < 1e-9);
    }

    #[test]
    fn empty_results_export_cleanly() {
        let instance = demo_instance();
        let result = NestingResult {
            sheets: vec![],
            unplaced: vec!["plate-copy-0".to_string()],
            cancelled: false,
        };
        let ext = export(&instance, &result, Instant::now());
        assert!(ext.sheets.is_empty());
        assert_eq!(ext.density, 0.0);
        assert_eq!(ext.unplaced, vec!["plate-copy-0".to_string()]);
    }
}
