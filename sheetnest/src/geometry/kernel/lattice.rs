//! Fixed-point lattice types underneath all boolean and collision math.
//!
//! Millimeter coordinates are scaled by [`UNITS_PER_MM`] and rounded to `i64`,
//! so every predicate below runs on integers (`i128` for the products) and two
//! equal shapes stay equal through transforms, unlike their float ancestors.

use crate::geometry::pose::{Pose, Rotation};
use crate::geometry::primitives::{Point, Rect};

/// Lattice resolution: 1 mm = 1000 units, one unit is a micrometer.
///
/// Lattice magnitudes stay far below 2^53, so the `i64 → f64` round trip
/// through the clipping backend is exact.
pub const UNITS_PER_MM: f64 = 1000.0;

pub fn mm_to_units(v: f64) -> i64 {
    (v * UNITS_PER_MM).round() as i64
}

pub fn units_to_mm(v: i64) -> f64 {
    v as f64 / UNITS_PER_MM
}

/// A point on the integer lattice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IntPoint(pub i64, pub i64);

impl IntPoint {
    pub fn x(&self) -> i64 {
        self.0
    }

    pub fn y(&self) -> i64 {
        self.1
    }

    pub fn sq_distance(&self, other: IntPoint) -> i128 {
        let dx = (self.0 - other.0) as i128;
        let dy = (self.1 - other.1) as i128;
        dx * dx + dy * dy
    }

    pub fn to_mm(self) -> Point {
        Point(units_to_mm(self.0), units_to_mm(self.1))
    }

    /// `None` when a coordinate is not finite, which invalidates the owning
    /// polygon rather than silently landing somewhere on the lattice.
    pub fn from_mm(p: Point) -> Option<IntPoint> {
        (p.0.is_finite() && p.1.is_finite()).then(|| IntPoint(mm_to_units(p.0), mm_to_units(p.1)))
    }
}

/// An implicitly closed contour on the lattice.
///
/// Winding carries meaning: positive signed area marks an outer boundary,
/// negative a hole. Values are immutable, transforms return new polygons.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntPolygon {
    pub points: Vec<IntPoint>,
}

impl IntPolygon {
    pub fn new(points: Vec<IntPoint>) -> Self {
        IntPolygon { points }
    }

    /// Converts millimeter points onto the lattice. `None` when fewer than 3
    /// points remain or any coordinate is non-finite.
    pub fn from_mm_points(points: &[Point]) -> Option<IntPolygon> {
        if points.len() < 3 {
            return None;
        }
        let converted = points
            .iter()
            .map(|&p| IntPoint::from_mm(p))
            .collect::<Option<Vec<_>>>()?;
        Some(IntPolygon::new(converted))
    }

    pub fn to_mm_points(&self) -> Vec<Point> {
        self.points.iter().map(|p| p.to_mm()).collect()
    }

    pub fn edges(&self) -> impl Iterator<Item = (IntPoint, IntPoint)> + '_ {
        let points = &self.points;
        let n = points.len();
        (0..n).map(move |i| (points[i], points[(i + 1) % n]))
    }

    /// Twice the signed area, by the shoelace formula. Positive for
    /// counter-clockwise winding.
    pub fn signed_area_2x(&self) -> i128 {
        self.edges()
            .map(|(a, b)| (a.1 + b.1) as i128 * (a.0 - b.0) as i128)
            .sum()
    }

    pub fn area_mm2(&self) -> f64 {
        self.signed_area_2x() as f64 / 2.0 / (UNITS_PER_MM * UNITS_PER_MM)
    }

    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    /// Applies mirror, then rotation, then translation. Mirroring reverses
    /// the winding of the result; callers relying on sign must account for it.
    pub fn transformed(&self, pose: &Pose) -> IntPolygon {
        let tx = mm_to_units(pose.translation.0);
        let ty = mm_to_units(pose.translation.1);
        let points = self
            .points
            .iter()
            .map(|p| {
                let x = if pose.mirrored { -p.0 } else { p.0 };
                let y = p.1;
                let (x, y) = match pose.rotation {
                    Rotation::Deg0 => (x, y),
                    Rotation::Deg90 => (-y, x),
                    Rotation::Deg180 => (-x, -y),
                    Rotation::Deg270 => (y, -x),
                };
                IntPoint(x + tx, y + ty)
            })
            .collect();
        IntPolygon::new(points)
    }

    /// Even-odd containment. Exact, no floating point. Points exactly on an
    /// edge may classify as either side; collision checks settle contact via
    /// the segment test before consulting containment.
    pub fn contains_point(&self, p: IntPoint) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.1 > p.1) != (b.1 > p.1) {
                // p lies strictly left of the edge at its own height
                let dy = (b.1 - a.1) as i128;
                let lhs = (p.0 - a.0) as i128 * dy;
                let rhs = (p.1 - a.1) as i128 * (b.0 - a.0) as i128;
                if (dy > 0 && lhs < rhs) || (dy < 0 && lhs > rhs) {
                    inside = !inside;
                }
            }
        }
        inside
    }

    pub(crate) fn bounds(&self) -> (IntPoint, IntPoint) {
        let mut min = IntPoint(i64::MAX, i64::MAX);
        let mut max = IntPoint(i64::MIN, i64::MIN);
        for p in &self.points {
            min = IntPoint(min.0.min(p.0), min.1.min(p.1));
            max = IntPoint(max.0.max(p.0), max.1.max(p.1));
        }
        (min, max)
    }
}

/// Zero or more contours forming one shape, holes as opposite winding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntPolygonSet {
    pub polygons: Vec<IntPolygon>,
}

impl IntPolygonSet {
    pub fn new(polygons: Vec<IntPolygon>) -> Self {
        IntPolygonSet { polygons }
    }

    pub fn from_polygon(polygon: IntPolygon) -> Self {
        IntPolygonSet {
            polygons: vec![polygon],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Net signed area in mm², holes subtract from their outer contours.
    pub fn area_mm2(&self) -> f64 {
        self.polygons.iter().map(|p| p.area_mm2()).sum()
    }

    pub fn bounds(&self) -> Option<(IntPoint, IntPoint)> {
        self.polygons
            .iter()
            .map(|p| p.bounds())
            .reduce(|(amin, amax), (bmin, bmax)| {
                (
                    IntPoint(amin.0.min(bmin.0), amin.1.min(bmin.1)),
                    IntPoint(amax.0.max(bmax.0), amax.1.max(bmax.1)),
                )
            })
    }

    pub fn bbox_mm(&self) -> Option<Rect> {
        let (min, max) = self.bounds()?;
        Rect::try_new(
            units_to_mm(min.0),
            units_to_mm(min.1),
            units_to_mm(max.0),
            units_to_mm(max.1),
        )
        .ok()
    }

    pub fn transformed(&self, pose: &Pose) -> IntPolygonSet {
        IntPolygonSet::new(self.polygons.iter().map(|p| p.transformed(pose)).collect())
    }

    pub fn to_mm_contours(&self) -> Vec<Vec<Point>> {
        self.polygons.iter().map(|p| p.to_mm_points()).collect()
    }

    /// Even-odd containment across every contour of the set, so a point
    /// inside a hole counts as outside.
    pub fn contains_point(&self, p: IntPoint) -> bool {
        self.polygons
            .iter()
            .filter(|poly| poly.contains_point(p))
            .count()
            % 2
            == 1
    }

    /// All points inside the axis-aligned box spanned by `min`/`max`,
    /// boundary included. Sufficient for whole-polygon containment since the
    /// box is convex.
    pub fn within_bounds(&self, min: IntPoint, max: IntPoint) -> bool {
        self.polygons.iter().all(|poly| {
            poly.points
                .iter()
                .all(|p| p.0 >= min.0 && p.0 <= max.0 && p.1 >= min.1 && p.1 <= max.1)
        })
    }

    /// True when the filled regions of the two sets touch or overlap.
    ///
    /// Any edge contact counts, so tangent shapes collide. Without edge
    /// contact one shape can only be fully inside or fully outside the other;
    /// even-odd containment of a representative vertex per contour settles
    /// that, holes included (a part sitting inside another's hole is free).
    pub fn collides_with(&self, other: &IntPolygonSet) -> bool {
        let (Some((amin, amax)), Some((bmin, bmax))) = (self.bounds(), other.bounds()) else {
            return false;
        };
        if amax.0 < bmin.0 || bmax.0 < amin.0 || amax.1 < bmin.1 || bmax.1 < amin.1 {
            return false;
        }
        for pa in &self.polygons {
            let (pa_min, pa_max) = pa.bounds();
            for pb in &other.polygons {
                let (pb_min, pb_max) = pb.bounds();
                if pa_max.0 < pb_min.0
                    || pb_max.0 < pa_min.0
                    || pa_max.1 < pb_min.1
                    || pb_max.1 < pa_min.1
                {
                    continue;
                }
                for ea in pa.edges() {
                    for eb in pb.edges() {
                        if segments_intersect(ea.0, ea.1, eb.0, eb.1) {
                            return true;
                        }
                    }
                }
            }
        }
        self.polygons
            .iter()
            .filter_map(|p| p.points.first())
            .any(|&v| other.contains_point(v))
            || other
                .polygons
                .iter()
                .filter_map(|p| p.points.first())
                .any(|&v| self.contains_point(v))
    }
}

fn orient(a: IntPoint, b: IntPoint, c: IntPoint) -> i128 {
    (b.0 - a.0) as i128 * (c.1 - a.1) as i128 - (b.1 - a.1) as i128 * (c.0 - a.0) as i128
}

/// `p` assumed collinear with `a`-`b`.
fn on_segment(a: IntPoint, b: IntPoint, p: IntPoint) -> bool {
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Exact segment intersection, endpoints and collinear overlap included.
pub(crate) fn segments_intersect(p1: IntPoint, p2: IntPoint, q1: IntPoint, q2: IntPoint) -> bool {
    let d1 = orient(q1, q2, p1);
    let d2 = orient(q1, q2, p2);
    let d3 = orient(p1, p2, q1);
    let d4 = orient(p1, p2, q2);
    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }
    (d1 == 0 && on_segment(q1, q2, p1))
        || (d2 == 0 && on_segment(q1, q2, p2))
        || (d3 == 0 && on_segment(p1, p2, q1))
        || (d4 == 0 && on_segment(p1, p2, q2))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mm(x: f64, y: f64, size: f64) -> IntPolygon {
        IntPolygon::from_mm_points(&[
            Point(x, y),
            Point(x + size, y),
            Point(x + size, y + size),
            Point(x, y + size),
        ])
        .unwrap()
    }

    /// 10x10 outer square with a 4x4 hole, both around (5, 5).
    fn ring() -> IntPolygonSet {
        let outer = square_mm(0.0, 0.0, 10.0);
        let mut hole = square_mm(3.0, 3.0, 4.0);
        hole.reverse();
        IntPolygonSet::new(vec![outer, hole])
    }

    #[test]
    fn shoelace_sign_follows_winding() {
        let ccw = square_mm(0.0, 0.0, 10.0);
        assert!(ccw.signed_area_2x() > 0);
        assert_eq!(ccw.area_mm2(), 100.0);

        let mut cw = ccw.clone();
        cw.reverse();
        assert_eq!(cw.area_mm2(), -100.0);
    }

    #[test]
    fn ring_area_subtracts_the_hole() {
        assert_eq!(ring().area_mm2(), 100.0 - 16.0);
    }

    #[test]
    fn mm_round_trip_is_exact() {
        let p = IntPoint::from_mm(Point(12.345, -0.001)).unwrap();
        assert_eq!(p, IntPoint(12345, -1));
        assert_eq!(p.to_mm(), Point(12.345, -0.001));
        assert_eq!(IntPoint::from_mm(Point(f64::NAN, 0.0)), None);
    }

    #[test]
    fn quarter_rotation_swaps_the_bbox() {
        let set = IntPolygonSet::from_polygon(IntPolygon::from_mm_points(&[
            Point(0.0, 0.0),
            Point(20.0, 0.0),
            Point(20.0, 10.0),
            Point(0.0, 10.0),
        ])
        .unwrap());
        let rotated = set.transformed(&Pose::new(
            Rotation::Deg90,
            false,
            Point(0.0, 0.0),
        ));
        let (min, max) = rotated.bounds().unwrap();
        assert_eq!((max.0 - min.0, max.1 - min.1), (10_000, 20_000));
    }

    #[test]
    fn mirror_reflects_about_the_y_axis() {
        let set = IntPolygonSet::from_polygon(square_mm(1.0, 1.0, 2.0));
        let mirrored = set.transformed(&Pose::new(Rotation::Deg0, true, Point(0.0, 0.0)));
        let (min, max) = mirrored.bounds().unwrap();
        assert_eq!((min.0, max.0), (-3000, -1000));
        assert_eq!((min.1, max.1), (1000, 3000));
    }

    #[test]
    fn translation_lands_on_the_lattice() {
        let set = IntPolygonSet::from_polygon(square_mm(0.0, 0.0, 1.0));
        let moved = set.transformed(&Pose::new(Rotation::Deg0, false, Point(5.5, -2.25)));
        let (min, _) = moved.bounds().unwrap();
        assert_eq!(min, IntPoint(5500, -2250));
    }

    #[test]
    fn containment_respects_holes() {
        let ring = ring();
        assert!(ring.contains_point(IntPoint::from_mm(Point(1.0, 5.0)).unwrap()));
        assert!(!ring.contains_point(IntPoint::from_mm(Point(5.0, 5.0)).unwrap()));
        assert!(!ring.contains_point(IntPoint::from_mm(Point(15.0, 5.0)).unwrap()));
    }

    #[test]
    fn collision_overlapping_and_disjoint() {
        let a = IntPolygonSet::from_polygon(square_mm(0.0, 0.0, 10.0));
        let b = IntPolygonSet::from_polygon(square_mm(5.0, 5.0, 10.0));
        let c = IntPolygonSet::from_polygon(square_mm(20.0, 20.0, 5.0));
        assert!(a.collides_with(&b));
        assert!(b.collides_with(&a));
        assert!(!a.collides_with(&c));
    }

    #[test]
    fn touching_edges_count_as_collision() {
        let a = IntPolygonSet::from_polygon(square_mm(0.0, 0.0, 10.0));
        let b = IntPolygonSet::from_polygon(square_mm(10.0, 0.0, 10.0));
        assert!(a.collides_with(&b));
    }

    #[test]
    fn part_inside_a_hole_does_not_collide() {
        let ring = ring();
        let inside_hole = IntPolygonSet::from_polygon(square_mm(4.0, 4.0, 2.0));
        let inside_band = IntPolygonSet::from_polygon(square_mm(0.5, 0.5, 1.0));
        assert!(!ring.collides_with(&inside_hole));
        assert!(!inside_hole.collides_with(&ring));
        assert!(ring.collides_with(&inside_band));
        assert!(inside_band.collides_with(&ring));
    }

    #[test]
    fn fully_contained_part_collides() {
        let big = IntPolygonSet::from_polygon(square_mm(0.0, 0.0, 20.0));
        let small = IntPolygonSet::from_polygon(square_mm(5.0, 5.0, 2.0));
        assert!(big.collides_with(&small));
        assert!(small.collides_with(&big));
    }

    #[test]
    fn segment_intersection_cases() {
        let p = |x: i64, y: i64| IntPoint(x, y);
        // proper crossing
        assert!(segments_intersect(p(0, 0), p(10, 10), p(0, 10), p(10, 0)));
        // shared endpoint
        assert!(segments_intersect(p(0, 0), p(10, 0), p(10, 0), p(20, 5)));
        // collinear overlap
        assert!(segments_intersect(p(0, 0), p(10, 0), p(5, 0), p(15, 0)));
        // collinear but apart
        assert!(!segments_intersect(p(0, 0), p(10, 0), p(11, 0), p(20, 0)));
        // parallel
        assert!(!segments_intersect(p(0, 0), p(10, 0), p(0, 1), p(10, 1)));
    }

    #[test]
    fn within_bounds_is_inclusive() {
        let set = IntPolygonSet::from_polygon(square_mm(0.0, 0.0, 10.0));
        assert!(set.within_bounds(IntPoint(0, 0), IntPoint(10_000, 10_000)));
        assert!(!set.within_bounds(IntPoint(1, 0), IntPoint(10_000, 10_000)));
    }
}
