use crate::geometry::primitives::Point;

/// Hard cap on recursive subdivision, so flattening terminates even when
/// degenerate control points keep the flatness test from ever passing.
pub(super) const MAX_SUBDIV_DEPTH: u32 = 10;

/// Flattens a cubic bezier to line segments within `tolerance`, appending
/// every generated point after `p0` to `out`, the endpoint included.
pub(super) fn flatten_cubic(
    p0: Point,
    c1: Point,
    c2: Point,
    p1: Point,
    tolerance: f64,
    out: &mut Vec<Point>,
) {
    subdivide(p0, c1, c2, p1, tolerance, 0, out);
}

/// Raises a quadratic bezier to the cubic tracing the identical curve.
pub(super) fn promote_quadratic(p0: Point, ctrl: Point, p1: Point) -> (Point, Point) {
    let c1 = Point(
        p0.0 + 2.0 / 3.0 * (ctrl.0 - p0.0),
        p0.1 + 2.0 / 3.0 * (ctrl.1 - p0.1),
    );
    let c2 = Point(
        p1.0 + 2.0 / 3.0 * (ctrl.0 - p1.0),
        p1.1 + 2.0 / 3.0 * (ctrl.1 - p1.1),
    );
    (c1, c2)
}

fn subdivide(
    p0: Point,
    c1: Point,
    c2: Point,
    p1: Point,
    tolerance: f64,
    depth: u32,
    out: &mut Vec<Point>,
) {
    if depth >= MAX_SUBDIV_DEPTH || is_flat(p0, c1, c2, p1, tolerance) {
        out.push(p1);
        return;
    }
    // de Casteljau split at t = 1/2, both halves are exact curve sections
    let m01 = mid(p0, c1);
    let m12 = mid(c1, c2);
    let m23 = mid(c2, p1);
    let m012 = mid(m01, m12);
    let m123 = mid(m12, m23);
    let m = mid(m012, m123);
    subdivide(p0, m01, m012, m, tolerance, depth + 1, out);
    subdivide(m, m123, m23, p1, tolerance, depth + 1, out);
}

/// The curve lies in the convex hull of its control points, so the chord
/// approximates it within `tolerance` once both controls are that close.
fn is_flat(p0: Point, c1: Point, c2: Point, p1: Point, tolerance: f64) -> bool {
    dist_to_segment(c1, p0, p1) <= tolerance && dist_to_segment(c2, p0, p1) <= tolerance
}

fn mid(a: Point, b: Point) -> Point {
    Point((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}

fn dist_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        return p.distance(&a);
    }
    let t = (((p.0 - a.0) * abx + (p.1 - a.1) * aby) / len_sq).clamp(0.0, 1.0);
    p.distance(&Point(a.0 + t * abx, a.1 + t * aby))
}
