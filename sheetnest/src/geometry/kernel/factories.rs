//! Factories for primitive outlines, producing counterclockwise lattice
//! polygons ready for the boolean ops.

use crate::geometry::kernel::IntPolygon;
use crate::geometry::primitives::{Point, Rect};
use std::f64::consts::{PI, TAU};

/// Regular polygon approximation of a circle, wound counterclockwise.
/// Returns `None` for a degenerate radius or non-finite center.
pub fn circle(center: Point, radius: f64, segments: usize) -> Option<IntPolygon> {
    if !(radius > 0.0) || !radius.is_finite() {
        return None;
    }
    let n = segments.max(3);
    let points: Vec<Point> = (0..n)
        .map(|i| {
            let theta = TAU * i as f64 / n as f64;
            Point(
                center.0 + radius * theta.cos(),
                center.1 + radius * theta.sin(),
            )
        })
        .collect();
    IntPolygon::from_mm_points(&points)
}

/// Axis-aligned rectangle outline, wound counterclockwise.
pub fn rectangle(rect: &Rect) -> Option<IntPolygon> {
    IntPolygon::from_mm_points(&[
        Point(rect.x_min, rect.y_min),
        Point(rect.x_max, rect.y_min),
        Point(rect.x_max, rect.y_max),
        Point(rect.x_min, rect.y_max),
    ])
}

/// Stadium shape: a rectangle of half-width `radius` along the segment
/// `a -> b`, capped with semicircles at both ends. Degenerates to a circle
/// when the endpoints coincide. `segments` is the point count per cap.
pub fn capsule(a: Point, b: Point, radius: f64, segments: usize) -> Option<IntPolygon> {
    if !(radius > 0.0) || !radius.is_finite() {
        return None;
    }
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len = dx.hypot(dy);
    if !len.is_finite() {
        return None;
    }
    if len < 1e-9 {
        return circle(a, radius, (segments * 2).max(3));
    }
    let u = (dx / len, dy / len);
    let n = (-u.1, u.0);
    let segs = segments.max(2);

    let cap = |center: Point, start_angle: f64, out: &mut Vec<Point>| {
        for i in 0..=segs {
            let phi = start_angle + PI * i as f64 / segs as f64;
            out.push(Point(
                center.0 + radius * (u.0 * phi.cos() + n.0 * phi.sin()),
                center.1 + radius * (u.1 * phi.cos() + n.1 * phi.sin()),
            ));
        }
    };

    let mut points = Vec::with_capacity(2 * (segs + 1));
    // counterclockwise: around b from -n to +n, then around a from +n to -n
    cap(b, -PI / 2.0, &mut points);
    cap(a, PI / 2.0, &mut points);
    IntPolygon::from_mm_points(&points)
}

/// Number of segments needed so a circle of `radius` deviates from its
/// polygonal approximation by at most `tolerance` (sagitta bound).
pub fn circle_segments(radius: f64, tolerance: f64) -> usize {
    if !(radius > 0.0) || !(tolerance > 0.0) {
        return 8;
    }
    let alpha = 2.0 * (1.0 - tolerance / radius).clamp(-1.0, 1.0).acos();
    if alpha <= 0.0 {
        return 512;
    }
    (TAU / alpha).ceil().clamp(8.0, 512.0) as usize
}
