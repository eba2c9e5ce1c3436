use std::sync::Arc;

use crate::NestError;
use crate::geometry::flatten::flatten_path;
use crate::geometry::kernel::{self, IntPolygon, IntPolygonSet, circle_segments};
use crate::geometry::primitives::{Point, Rect};

/// A single placeable instance of a shape.
#[derive(Clone, Debug)]
pub struct Part {
    pub id: String,
    /// Copies of the same geometry share this key, so exporters can emit one
    /// shape definition per distinct outline.
    pub shape_key: String,
    /// Cleaned outline on the lattice, holes as negative-winding contours.
    pub outline: Arc<IntPolygonSet>,
    /// Outline inflated by half the inter-part gap, used for collision tests.
    pub shape_cd: Arc<IntPolygonSet>,
    /// Tight bounds of the outline, in mm.
    pub bbox: Rect,
    /// Net area of the outline in mm², holes subtracted.
    pub area: f64,
    /// Path data the part was flattened from, if any.
    pub source_path: Option<String>,
}

impl Part {
    pub fn clone_with_id(&self, id: String) -> Part {
        Part { id, ..self.clone() }
    }

    /// Expands into `n` independently placeable copies with ids
    /// `{id}-copy-0 .. {id}-copy-(n-1)`, sharing this part's geometry and
    /// `shape_key`.
    pub fn expand_copies(&self, n: usize) -> Vec<Part> {
        (0..n)
            .map(|k| self.clone_with_id(format!("{}-copy-{k}", self.id)))
            .collect()
    }
}

/// Builds [`Part`]s from path strings or primitive shape parameters, applying
/// one flattening tolerance and inter-part gap throughout a job.
#[derive(Clone, Debug)]
pub struct PartBuilder {
    tolerance: f64,
    gap: f64,
}

impl PartBuilder {
    /// `tolerance` is the maximum curve flattening deviation in mm, `gap` the
    /// inter-part gap in mm. Each part's collision shape absorbs half the gap,
    /// the neighbor contributes the other half.
    pub fn new(tolerance: f64, gap: f64) -> Self {
        PartBuilder {
            tolerance,
            gap: gap.max(0.0),
        }
    }

    /// Flattens a path string into a part. Open sub-paths with at least 3
    /// points are closed implicitly, shorter ones are dropped.
    pub fn from_path(&self, id: &str, data: &str) -> Result<Part, NestError> {
        let polylines = flatten_path(data, self.tolerance)?;
        let polygons: Vec<IntPolygon> = polylines
            .iter()
            .filter(|pl| pl.points.len() >= 3)
            .filter_map(|pl| IntPolygon::from_mm_points(&pl.points))
            .collect();
        self.finish(id, IntPolygonSet::new(polygons), Some(data.to_string()))
    }

    /// Circle of the given radius centered on the part's local origin.
    pub fn circle(&self, id: &str, radius: f64) -> Result<Part, NestError> {
        let segments = circle_segments(radius, self.tolerance);
        let poly = kernel::circle(Point(0.0, 0.0), radius, segments)
            .ok_or_else(|| build_error(id, format!("circle radius {radius} is degenerate")))?;
        self.finish(id, IntPolygonSet::from_polygon(poly), None)
    }

    /// Axis-aligned rectangle with its corner on the part's local origin.
    pub fn rectangle(&self, id: &str, width: f64, height: f64) -> Result<Part, NestError> {
        let rect = Rect::try_new(0.0, 0.0, width, height)
            .map_err(|e| build_error(id, e.to_string()))?;
        let poly = kernel::rectangle(&rect)
            .ok_or_else(|| build_error(id, format!("rectangle {width}x{height} is degenerate")))?;
        self.finish(id, IntPolygonSet::from_polygon(poly), None)
    }

    /// Stadium shape along the local x axis, degenerating to a circle at
    /// `length == 0`.
    pub fn capsule(&self, id: &str, length: f64, radius: f64) -> Result<Part, NestError> {
        if !(length >= 0.0) {
            return Err(build_error(id, format!("capsule length {length} is negative")));
        }
        let segments = circle_segments(radius, self.tolerance).div_ceil(2);
        let poly = kernel::capsule(Point(0.0, 0.0), Point(length, 0.0), radius, segments)
            .ok_or_else(|| build_error(id, format!("capsule radius {radius} is degenerate")))?;
        self.finish(id, IntPolygonSet::from_polygon(poly), None)
    }

    fn finish(
        &self,
        id: &str,
        raw: IntPolygonSet,
        source_path: Option<String>,
    ) -> Result<Part, NestError> {
        let outline = kernel::clean(&raw);
        let bbox = outline
            .bbox_mm()
            .ok_or_else(|| build_error(id, "no contour survived cleaning".to_string()))?;
        let shape_cd = match self.gap > 0.0 {
            true => kernel::offset(&outline, self.gap / 2.0),
            false => outline.clone(),
        };
        let area = outline.area_mm2();
        Ok(Part {
            id: id.to_string(),
            shape_key: id.to_string(),
            outline: Arc::new(outline),
            shape_cd: Arc::new(shape_cd),
            bbox,
            area,
            source_path,
        })
    }
}

fn build_error(id: &str, reason: String) -> NestError {
    NestError::Build {
        id: id.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::f64::consts::PI;

    fn builder() -> PartBuilder {
        PartBuilder::new(0.05, 0.0)
    }

    #[test]
    fn path_square_gets_bbox_and_area() {
        let part = builder()
            .from_path("sq", "M 0 0 L 10 0 L 10 10 L 0 10 Z")
            .unwrap();
        assert_eq!(part.bbox, Rect::try_new(0.0, 0.0, 10.0, 10.0).unwrap());
        assert!(approx_eq!(f64, part.area, 100.0, epsilon = 1e-6));
        assert_eq!(part.outline.polygons.len(), 1);
        assert!(part.source_path.is_some());
    }

    #[test]
    fn holes_subtract_from_the_area() {
        let part = builder()
            .from_path(
                "ring",
                "M 0 0 L 20 0 L 20 20 L 0 20 Z M 5 5 L 5 10 L 10 10 L 10 5 Z",
            )
            .unwrap();
        assert!(approx_eq!(f64, part.area, 375.0, epsilon = 1e-6));
        assert_eq!(part.outline.polygons.len(), 2);
    }

    #[test]
    fn open_subpaths_close_implicitly() {
        let part = builder().from_path("tri", "M 0 0 L 10 0 L 0 10").unwrap();
        assert!(approx_eq!(f64, part.area, 50.0, epsilon = 1e-6));
    }

    #[test]
    fn zero_area_paths_are_a_build_error() {
        let err = builder().from_path("line", "M 0 0 L 10 0 Z").unwrap_err();
        assert!(matches!(err, NestError::Build { .. }));
    }

    #[test]
    fn parse_errors_pass_through() {
        let err = builder().from_path("bad", "M 0 0 P 1 1").unwrap_err();
        assert!(matches!(err, NestError::Parse { command: 'P', .. }));
    }

    #[test]
    fn factory_circle_matches_pi_r_squared() {
        let part = builder().circle("disc", 10.0).unwrap();
        assert!((part.area - PI * 100.0).abs() / (PI * 100.0) < 0.01);
        assert!((part.bbox.width() - 20.0).abs() < 0.1);
    }

    #[test]
    fn factory_rectangle_sits_on_the_origin() {
        let part = builder().rectangle("panel", 30.0, 20.0).unwrap();
        assert_eq!(part.bbox, Rect::try_new(0.0, 0.0, 30.0, 20.0).unwrap());
        assert!(approx_eq!(f64, part.area, 600.0, epsilon = 1e-6));
    }

    #[test]
    fn factory_capsule_degenerates_to_a_circle() {
        let part = builder().capsule("slot", 0.0, 5.0).unwrap();
        assert!((part.area - PI * 25.0).abs() / (PI * 25.0) < 0.02);
        assert!(builder().capsule("bad", -1.0, 5.0).is_err());
        assert!(builder().rectangle("bad", 0.0, 5.0).is_err());
    }

    #[test]
    fn copies_share_geometry_but_not_ids() {
        let part = builder().rectangle("panel", 30.0, 20.0).unwrap();
        let copies = part.expand_copies(3);
        assert_eq!(
            copies.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
            ["panel-copy-0", "panel-copy-1", "panel-copy-2"]
        );
        assert!(copies.iter().all(|c| c.shape_key == "panel"));
        assert!(Arc::ptr_eq(&part.outline, &copies[0].outline));
    }

    #[test]
    fn gap_inflates_the_collision_shape_only() {
        let part = PartBuilder::new(0.05, 2.0)
            .rectangle("panel", 30.0, 20.0)
            .unwrap();
        assert!(approx_eq!(f64, part.area, 600.0, epsilon = 1e-6));
        assert!(part.shape_cd.area_mm2() > 600.0);
        assert_eq!(part.bbox, Rect::try_new(0.0, 0.0, 30.0, 20.0).unwrap());
    }
}
