use crate::geometry::primitives::Point;
use float_cmp::approx_eq;
use std::f64::consts::TAU;

/// Upper bound on the segments sampled for a single arc command.
const MAX_ARC_SEGMENTS: usize = 256;

/// Flattens an elliptical arc given in endpoint parameterization, appending
/// every generated point after `from` to `out`.
///
/// Endpoint form is converted to center form first: radii too small to span
/// the endpoints are scaled up, the large-arc and sweep flags select among
/// the four candidate arcs. Zero radii degrade to a straight segment and
/// coincident endpoints produce nothing.
#[allow(clippy::too_many_arguments)]
pub(super) fn flatten_arc(
    from: Point,
    radii: (f64, f64),
    x_rotation_deg: f64,
    large_arc: bool,
    sweep: bool,
    to: Point,
    tolerance: f64,
    out: &mut Vec<Point>,
) {
    if from == to {
        return;
    }
    let (mut rx, mut ry) = (radii.0.abs(), radii.1.abs());
    if approx_eq!(f64, rx, 0.0, epsilon = 1e-12) || approx_eq!(f64, ry, 0.0, epsilon = 1e-12) {
        out.push(to);
        return;
    }

    let phi = x_rotation_deg.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();

    // endpoints in the axis-aligned frame of the ellipse
    let dx = (from.0 - to.0) / 2.0;
    let dy = (from.1 - to.1) / 2.0;
    let x1p = cos_phi * dx + sin_phi * dy;
    let y1p = -sin_phi * dx + cos_phi * dy;

    let lambda = (x1p / rx).powi(2) + (y1p / ry).powi(2);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let num = rx * rx * ry * ry - rx * rx * y1p * y1p - ry * ry * x1p * x1p;
    let den = rx * rx * y1p * y1p + ry * ry * x1p * x1p;
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;

    let cx = cos_phi * cxp - sin_phi * cyp + (from.0 + to.0) / 2.0;
    let cy = sin_phi * cxp + cos_phi * cyp + (from.1 + to.1) / 2.0;

    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;

    let theta_1 = uy.atan2(ux);
    let mut d_theta = (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    if !sweep && d_theta > 0.0 {
        d_theta -= TAU;
    } else if sweep && d_theta < 0.0 {
        d_theta += TAU;
    }

    let arc_len = d_theta.abs() * rx.max(ry);
    let segments = ((arc_len / tolerance).ceil() as usize).clamp(2, MAX_ARC_SEGMENTS);
    for i in 1..=segments {
        let theta = theta_1 + d_theta * i as f64 / segments as f64;
        let (sin_t, cos_t) = theta.sin_cos();
        out.push(Point(
            cx + cos_phi * rx * cos_t - sin_phi * ry * sin_t,
            cy + sin_phi * rx * cos_t + cos_phi * ry * sin_t,
        ));
    }
    // sampling drifts by a few ulps, land on the exact endpoint
    if let Some(last) = out.last_mut() {
        *last = to;
    }
}
