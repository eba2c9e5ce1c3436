//! Candidate pose generation for the shape-aware packer.
//!
//! Three stages, each deterministic for a given seed: a bottom-left ordered
//! grid sweep, uniform jitter when the grid finds nothing, and normally
//! distributed refinement around an accepted pose.

use crate::entities::Part;
use crate::geometry::pose::{Pose, Rotation};
use crate::geometry::primitives::{Point, Rect};
use crate::packing::SearchParams;
use ordered_float::NotNan;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Upper bound on grid positions per axis, keeping tiny parts on huge sheets
/// from exploding the candidate count.
const MAX_STEPS_PER_AXIS: usize = 64;

/// Base grid resolution for a part: a quarter of its smaller bbox dimension,
/// never finer than 1 mm.
pub(crate) fn grid_resolution(part: &Part) -> f64 {
    f64::max(1.0, f64::min(part.bbox.width(), part.bbox.height()) / 4.0)
}

/// All grid candidates for `part` inside `usable`, ordered bottom-left first
/// (y ascending, then x, then orientation). Poses whose frame cannot fit the
/// usable rect in some orientation are omitted for that orientation.
pub(crate) fn grid_poses(
    part: &Part,
    usable: &Rect,
    params: &SearchParams,
    allow_rotation: bool,
) -> Vec<Pose> {
    let step = grid_resolution(part) * params.grid_step_factor;
    let mut candidates: Vec<(NotNan<f64>, NotNan<f64>, usize, Pose)> = vec![];
    for (order, (rotation, mirrored)) in orientations(params, allow_rotation).enumerate() {
        let frame = Pose::new(rotation, mirrored, Point(0.0, 0.0)).transformed_rect(&part.bbox);
        let (w, h) = (frame.width(), frame.height());
        if w > usable.width() || h > usable.height() {
            continue;
        }
        for y in axis_steps(usable.height() - h, step) {
            for x in axis_steps(usable.width() - w, step) {
                let pose = Pose::new(
                    rotation,
                    mirrored,
                    Point(
                        usable.x_min + x - frame.x_min,
                        usable.y_min + y - frame.y_min,
                    ),
                );
                let key = (
                    NotNan::new(y).expect("grid position is NaN"),
                    NotNan::new(x).expect("grid position is NaN"),
                );
                candidates.push((key.0, key.1, order, pose));
            }
        }
    }
    candidates.sort_by_key(|&(y, x, order, _)| (y, x, order));
    candidates.into_iter().map(|(_, _, _, pose)| pose).collect()
}

/// `count` uniformly random candidates. Samples whose orientation cannot fit
/// the usable rect are spent, not redrawn, so the budget is exact.
pub(crate) fn jitter_poses(
    part: &Part,
    usable: &Rect,
    params: &SearchParams,
    allow_rotation: bool,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<Pose> {
    let rotations = params.rotations(allow_rotation);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let rotation = rotations[rng.random_range(0..rotations.len())];
        let mirrored = params.try_mirror && rng.random_bool(0.5);
        let frame = Pose::new(rotation, mirrored, Point(0.0, 0.0)).transformed_rect(&part.bbox);
        let (w, h) = (frame.width(), frame.height());
        if w > usable.width() || h > usable.height() {
            continue;
        }
        let x = rng.random_range(0.0..=usable.width() - w);
        let y = rng.random_range(0.0..=usable.height() - h);
        out.push(Pose::new(
            rotation,
            mirrored,
            Point(
                usable.x_min + x - frame.x_min,
                usable.y_min + y - frame.y_min,
            ),
        ));
    }
    out
}

/// `count` candidates normally distributed around `accepted`, keeping its
/// rotation and mirror.
pub(crate) fn refine_poses(
    accepted: Pose,
    stddev: f64,
    count: usize,
    rng: &mut impl Rng,
) -> Vec<Pose> {
    let normal_x = Normal::new(accepted.translation.0, stddev).unwrap();
    let normal_y = Normal::new(accepted.translation.1, stddev).unwrap();
    (0..count)
        .map(|_| {
            Pose::new(
                accepted.rotation,
                accepted.mirrored,
                Point(normal_x.sample(rng), normal_y.sample(rng)),
            )
        })
        .collect()
}

fn orientations(
    params: &SearchParams,
    allow_rotation: bool,
) -> impl Iterator<Item = (Rotation, bool)> {
    let mirrors: &'static [bool] = match params.try_mirror {
        true => &[false, true],
        false => &[false],
    };
    params
        .rotations(allow_rotation)
        .iter()
        .flat_map(move |&rotation| mirrors.iter().map(move |&mirrored| (rotation, mirrored)))
}

/// Positions `0 ..= extent` at the given step, the far edge always included.
fn axis_steps(extent: f64, step: f64) -> Vec<f64> {
    let step = step
        .max(extent / MAX_STEPS_PER_AXIS as f64)
        .max(f64::EPSILON);
    let mut out = vec![];
    let mut v = 0.0;
    while v < extent {
        out.push(v);
        v += step;
    }
    out.push(extent);
    out
}
