//! Boolean algebra on the integer lattice.
//!
//! Union, difference and intersection run through the `i_overlay` clipping
//! backend, fed with exact `i64 → f64` lattice coordinates and rounded back.
//! Offsetting goes through `geo-buffer` on `geo-types` polygons. Every public
//! operation recovers from backend failure by logging a warning and returning
//! its input unchanged, so callers never see a crash mid-nest, only a skipped
//! operation.

mod factories;
mod lattice;

#[doc(inline)]
pub use factories::{capsule, circle, circle_segments, rectangle};
#[doc(inline)]
pub use lattice::{IntPoint, IntPolygon, IntPolygonSet, UNITS_PER_MM, mm_to_units, units_to_mm};

use anyhow::{Result, anyhow, ensure};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use log::warn;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Points closer than this (squared lattice units) merge during [`clean`].
const MERGE_DIST_SQ: i128 = 16;

/// Contours with less absolute area than this are dropped during [`clean`].
const MIN_ISLAND_AREA_MM2: f64 = 1e-3;

/// Merges any number of polygon sets under the non-zero fill rule.
///
/// Empty input yields an empty set and a single non-empty set is returned
/// unchanged. If the clipping backend fails, the inputs are returned
/// concatenated but unmerged, with a warning.
pub fn union(sets: &[IntPolygonSet]) -> IntPolygonSet {
    let filled: Vec<&IntPolygonSet> = sets.iter().filter(|s| !s.is_empty()).collect();
    match filled.as_slice() {
        [] => IntPolygonSet::default(),
        [single] => (*single).clone(),
        [first, rest @ ..] => {
            let subj = to_contours(first);
            let clip: Vec<Vec<[f64; 2]>> = rest.iter().flat_map(|s| to_contours(s)).collect();
            match try_overlay(subj, clip, OverlayRule::Union) {
                Ok(merged) => merged,
                Err(e) => {
                    warn!("union of {} sets failed ({e}), returning the inputs unmerged", sets.len());
                    IntPolygonSet::new(filled.iter().flat_map(|s| s.polygons.clone()).collect())
                }
            }
        }
    }
}

/// Subtracts `b` from `a`. An empty `b` leaves `a` unchanged, an empty `a`
/// stays empty. On backend failure `a` is returned unchanged, with a warning.
pub fn difference(a: &IntPolygonSet, b: &IntPolygonSet) -> IntPolygonSet {
    if b.is_empty() {
        return a.clone();
    }
    if a.is_empty() {
        return IntPolygonSet::default();
    }
    match try_overlay(to_contours(a), to_contours(b), OverlayRule::Difference) {
        Ok(result) => result,
        Err(e) => {
            warn!("difference failed ({e}), returning the minuend unchanged");
            a.clone()
        }
    }
}

/// The region covered by both sets. Empty when either operand is empty.
/// On backend failure `a` is returned unchanged, with a warning.
pub fn intersection(a: &IntPolygonSet, b: &IntPolygonSet) -> IntPolygonSet {
    if a.is_empty() || b.is_empty() {
        return IntPolygonSet::default();
    }
    match try_overlay(to_contours(a), to_contours(b), OverlayRule::Intersect) {
        Ok(result) => result,
        Err(e) => {
            warn!("intersection failed ({e}), returning the first operand unchanged");
            a.clone()
        }
    }
}

/// Inflates (`delta_mm > 0`) or shrinks (`delta_mm < 0`) a polygon set with
/// round joins. A delta of zero is a no-op returning the input unchanged; a
/// shape shrunk away entirely comes back empty. On failure the input is
/// returned unchanged, with a warning.
pub fn offset(set: &IntPolygonSet, delta_mm: f64) -> IntPolygonSet {
    if delta_mm == 0.0 || set.is_empty() {
        return set.clone();
    }
    match try_offset(set, delta_mm) {
        Ok(result) => result,
        Err(e) => {
            warn!("offset by {delta_mm}mm failed ({e}), returning the input unchanged");
            set.clone()
        }
    }
}

/// Normalizes a polygon set without changing the region it covers:
/// merges points closer than the minimum distance, drops contours left with
/// fewer than 3 points or with negligible area, and orients windings by
/// containment parity (outer contours positive, holes negative).
///
/// Idempotent: cleaning a cleaned set is the identity.
pub fn clean(set: &IntPolygonSet) -> IntPolygonSet {
    let mut polygons: Vec<IntPolygon> = set.polygons.iter().filter_map(clean_polygon).collect();
    normalize_winding(&mut polygons);
    IntPolygonSet::new(polygons)
}

fn clean_polygon(poly: &IntPolygon) -> Option<IntPolygon> {
    let mut points: Vec<IntPoint> = Vec::with_capacity(poly.points.len());
    for &p in &poly.points {
        if points
            .last()
            .is_none_or(|&prev| prev.sq_distance(p) >= MERGE_DIST_SQ)
        {
            points.push(p);
        }
    }
    // the closing edge gets the same treatment as the explicit ones
    while points.len() > 1 && points[0].sq_distance(*points.last().unwrap()) < MERGE_DIST_SQ {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    let poly = IntPolygon::new(points);
    (poly.area_mm2().abs() >= MIN_ISLAND_AREA_MM2).then_some(poly)
}

/// Orients contours by containment parity: even depth (outer boundaries)
/// positive, odd depth (holes) negative.
fn normalize_winding(polygons: &mut [IntPolygon]) {
    let depths: Vec<usize> = (0..polygons.len())
        .map(|i| {
            let probe = polygons[i].points[0];
            (0..polygons.len())
                .filter(|&j| j != i && polygons[j].contains_point(probe))
                .count()
        })
        .collect();
    for (poly, depth) in polygons.iter_mut().zip(depths) {
        let positive = poly.signed_area_2x() >= 0;
        if positive != (depth % 2 == 0) {
            poly.reverse();
        }
    }
}

fn try_overlay(
    subj: Vec<Vec<[f64; 2]>>,
    clip: Vec<Vec<[f64; 2]>>,
    rule: OverlayRule,
) -> Result<IntPolygonSet> {
    let shapes = catch_unwind(AssertUnwindSafe(move || {
        subj.overlay(&clip, rule, FillRule::NonZero)
    }))
    .map_err(|_| anyhow!("clipping backend panicked"))?;
    Ok(from_shapes(shapes))
}

fn try_offset(set: &IntPolygonSet, delta_mm: f64) -> Result<IntPolygonSet> {
    ensure!(delta_mm.is_finite(), "non-finite offset delta {delta_mm}");
    let cleaned = clean(set);
    ensure!(!cleaned.is_empty(), "no usable contours to offset");
    let multi = to_geo_multi_polygon(&cleaned);
    let delta_units = delta_mm * UNITS_PER_MM;
    let buffered = catch_unwind(AssertUnwindSafe(move || {
        geo_buffer::buffer_multi_polygon_rounded(&multi, delta_units)
    }))
    .map_err(|_| anyhow!("buffering panicked on a degenerate skeleton"))?;
    Ok(clean(&from_geo_multi_polygon(&buffered)))
}

fn to_contours(set: &IntPolygonSet) -> Vec<Vec<[f64; 2]>> {
    set.polygons
        .iter()
        .map(|poly| poly.points.iter().map(|p| [p.0 as f64, p.1 as f64]).collect())
        .collect()
}

fn from_shapes(shapes: Vec<Vec<Vec<[f64; 2]>>>) -> IntPolygonSet {
    let mut polygons = vec![];
    for shape in shapes {
        for contour in shape {
            if contour.len() >= 3 {
                polygons.push(IntPolygon::new(
                    contour
                        .iter()
                        .map(|c| IntPoint(c[0].round() as i64, c[1].round() as i64))
                        .collect(),
                ));
            }
        }
    }
    IntPolygonSet::new(polygons)
}

/// Groups a cleaned set into `geo` polygons, pairing every hole with the
/// smallest outer contour containing it.
fn to_geo_multi_polygon(set: &IntPolygonSet) -> MultiPolygon<f64> {
    let (outers, holes): (Vec<&IntPolygon>, Vec<&IntPolygon>) = set
        .polygons
        .iter()
        .partition(|p| p.signed_area_2x() >= 0);
    let mut shells: Vec<(&IntPolygon, Vec<LineString<f64>>)> =
        outers.into_iter().map(|o| (o, vec![])).collect();
    let mut orphans: Vec<Polygon<f64>> = vec![];
    for hole in holes {
        let probe = hole.points[0];
        let owner = shells
            .iter_mut()
            .filter(|(outer, _)| outer.contains_point(probe))
            .min_by_key(|(outer, _)| outer.signed_area_2x());
        match owner {
            Some((_, interiors)) => interiors.push(to_line_string(hole)),
            None => {
                // a hole without an owner is treated as a shell of its own
                let mut flipped = hole.clone();
                flipped.reverse();
                orphans.push(Polygon::new(to_line_string(&flipped), vec![]));
            }
        }
    }
    let mut polygons: Vec<Polygon<f64>> = shells
        .into_iter()
        .map(|(outer, interiors)| Polygon::new(to_line_string(outer), interiors))
        .collect();
    polygons.extend(orphans);
    MultiPolygon::new(polygons)
}

fn to_line_string(poly: &IntPolygon) -> LineString<f64> {
    poly.points
        .iter()
        .map(|p| Coord {
            x: p.0 as f64,
            y: p.1 as f64,
        })
        .collect()
}

fn from_geo_multi_polygon(multi: &MultiPolygon<f64>) -> IntPolygonSet {
    let mut polygons = vec![];
    for poly in &multi.0 {
        if let Some(exterior) = ring_to_polygon(poly.exterior(), false) {
            polygons.push(exterior);
        }
        for interior in poly.interiors() {
            if let Some(hole) = ring_to_polygon(interior, true) {
                polygons.push(hole);
            }
        }
    }
    IntPolygonSet::new(polygons)
}

fn ring_to_polygon(ring: &LineString<f64>, hole: bool) -> Option<IntPolygon> {
    let mut points: Vec<IntPoint> = ring
        .coords()
        .map(|c| IntPoint(c.x.round() as i64, c.y.round() as i64))
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return None;
    }
    let mut poly = IntPolygon::new(points);
    if (poly.signed_area_2x() < 0) != hole {
        poly.reverse();
    }
    Some(poly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::primitives::Point;
    use float_cmp::approx_eq;

    fn square(x: f64, y: f64, size: f64) -> IntPolygonSet {
        IntPolygonSet::from_polygon(
            IntPolygon::from_mm_points(&[
                Point(x, y),
                Point(x + size, y),
                Point(x + size, y + size),
                Point(x, y + size),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn union_of_nothing_is_empty() {
        assert!(union(&[]).is_empty());
    }

    #[test]
    fn union_of_one_set_is_the_identity() {
        let set = square(0.0, 0.0, 10.0);
        assert_eq!(union(&[set.clone()]), set);
        assert_eq!(union(&[IntPolygonSet::default(), set.clone()]), set);
    }

    #[test]
    fn union_coalesces_overlap() {
        let merged = union(&[square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)]);
        assert_eq!(merged.polygons.len(), 1);
        assert!(approx_eq!(f64, merged.area_mm2(), 175.0, epsilon = 1e-6));
    }

    #[test]
    fn union_keeps_disjoint_islands_apart() {
        let merged = union(&[square(0.0, 0.0, 10.0), square(20.0, 0.0, 10.0)]);
        assert_eq!(merged.polygons.len(), 2);
        assert!(approx_eq!(f64, merged.area_mm2(), 200.0, epsilon = 1e-6));
    }

    #[test]
    fn difference_identities() {
        let a = square(0.0, 0.0, 10.0);
        assert_eq!(difference(&a, &IntPolygonSet::default()), a);
        assert!(difference(&IntPolygonSet::default(), &a).is_empty());
    }

    #[test]
    fn difference_carves_a_hole() {
        let carved = difference(&square(0.0, 0.0, 20.0), &square(7.0, 7.0, 6.0));
        assert_eq!(carved.polygons.len(), 2);
        assert!(approx_eq!(f64, carved.area_mm2(), 400.0 - 36.0, epsilon = 1e-6));
        let negatives = carved
            .polygons
            .iter()
            .filter(|p| p.signed_area_2x() < 0)
            .count();
        assert_eq!(negatives, 1);
    }

    #[test]
    fn intersection_of_disjoint_sets_is_empty() {
        assert!(intersection(&square(0.0, 0.0, 10.0), &square(20.0, 20.0, 5.0)).is_empty());
        assert!(intersection(&square(0.0, 0.0, 10.0), &IntPolygonSet::default()).is_empty());
    }

    #[test]
    fn intersection_keeps_the_shared_region() {
        let shared = intersection(&square(0.0, 0.0, 10.0), &square(5.0, 5.0, 10.0));
        assert!(approx_eq!(f64, shared.area_mm2(), 25.0, epsilon = 1e-6));
    }

    #[test]
    fn offset_zero_is_the_identity() {
        let set = square(0.0, 0.0, 10.0);
        assert_eq!(offset(&set, 0.0), set);
    }

    #[test]
    fn offset_failure_returns_the_input_unchanged() {
        let set = square(0.0, 0.0, 10.0);
        assert_eq!(offset(&set, f64::NAN), set);
    }

    #[test]
    fn offset_inflates_with_round_joins() {
        let grown = offset(&square(0.0, 0.0, 10.0), 1.0);
        let area = grown.area_mm2();
        // 12x12 minus the four rounded corners
        assert!(area > 138.0 && area < 144.0 + 1e-6, "area = {area}");
    }

    #[test]
    fn offset_deflates_convex_shapes_exactly() {
        let shrunk = offset(&square(0.0, 0.0, 10.0), -1.0);
        assert!((shrunk.area_mm2() - 64.0).abs() < 0.5);
    }

    #[test]
    fn offset_past_collapse_is_empty() {
        assert!(offset(&square(0.0, 0.0, 10.0), -10.0).is_empty());
    }

    #[test]
    fn offset_moves_hole_boundaries_inward() {
        let ring = difference(&square(0.0, 0.0, 20.0), &square(6.0, 6.0, 8.0));
        let grown = offset(&ring, 1.0);
        assert_eq!(
            grown.polygons.iter().filter(|p| p.signed_area_2x() < 0).count(),
            1
        );
        let area = grown.area_mm2();
        // outer 22x22 minus rounded corners, hole shrinks to 6x6
        assert!(area > 440.0 && area < 448.0, "area = {area}");
    }

    #[test]
    fn clean_merges_crowded_points() {
        let set = IntPolygonSet::from_polygon(
            IntPolygon::from_mm_points(&[
                Point(0.0, 0.0),
                Point(10.0, 0.0),
                Point(10.002, 0.0),
                Point(10.0, 10.0),
                Point(0.0, 10.0),
                Point(0.001, 0.001),
            ])
            .unwrap(),
        );
        let cleaned = clean(&set);
        assert_eq!(cleaned.polygons[0].points.len(), 4);
    }

    #[test]
    fn clean_drops_degenerates_and_specks() {
        let speck = IntPolygon::from_mm_points(&[
            Point(50.0, 50.0),
            Point(50.02, 50.0),
            Point(50.02, 50.02),
            Point(50.0, 50.02),
        ])
        .unwrap();
        let stub = IntPolygon::new(vec![IntPoint(0, 0), IntPoint(5000, 0)]);
        let keeper = square(0.0, 0.0, 10.0).polygons[0].clone();
        let cleaned = clean(&IntPolygonSet::new(vec![keeper.clone(), speck, stub]));
        assert_eq!(cleaned.polygons, vec![keeper]);
    }

    #[test]
    fn clean_orients_by_containment_parity() {
        // outer wound the wrong way, hole wound the wrong way
        let mut outer = square(0.0, 0.0, 20.0).polygons[0].clone();
        outer.reverse();
        let hole = square(5.0, 5.0, 5.0).polygons[0].clone();
        let cleaned = clean(&IntPolygonSet::new(vec![outer, hole]));
        assert_eq!(cleaned.polygons.len(), 2);
        assert!(cleaned.polygons[0].signed_area_2x() > 0);
        assert!(cleaned.polygons[1].signed_area_2x() < 0);
    }

    #[test]
    fn clean_is_idempotent() {
        let mut outer = square(0.0, 0.0, 20.0).polygons[0].clone();
        outer.reverse();
        let messy = IntPolygonSet::new(vec![
            outer,
            square(5.0, 5.0, 5.0).polygons[0].clone(),
            IntPolygon::new(vec![IntPoint(0, 0), IntPoint(1, 1), IntPoint(2, 2)]),
        ]);
        let once = clean(&messy);
        assert_eq!(clean(&once), once);
    }
}
