//! Turns vector path data into straight-segment polylines.
//!
//! The grammar is the SVG path mini-language: move/line/horizontal/vertical,
//! cubic and quadratic beziers with their smooth shorthands, elliptical arcs
//! and close, each in absolute and relative form. Curves are subdivided until
//! they deviate less than a caller-supplied tolerance from their chords.

mod arc;
mod bezier;

use crate::NestError;
use crate::geometry::primitives::Point;
use bezier::{flatten_cubic, promote_quadratic};
use log::warn;

/// Smallest accepted flattening tolerance, one lattice unit.
const MIN_TOLERANCE: f64 = 1e-3;

/// A flattened sub-path.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub points: Vec<Point>,
    /// Set when the sub-path ended in an explicit close command.
    pub closed: bool,
}

/// Flattens path data into polylines, one per sub-path.
///
/// `tolerance` bounds the deviation between any curved segment and its
/// polyline rendition, in the units of the path data (millimeters throughout
/// this crate). An unknown command letter aborts with [`NestError::Parse`].
/// Malformed numeric tokens are skipped with a logged warning and the
/// enclosing argument tuple is dropped, so damaged coordinate data degrades
/// to fewer segments instead of failing the whole part.
pub fn flatten_path(data: &str, tolerance: f64) -> Result<Vec<Polyline>, NestError> {
    Flattener::new(data, tolerance).run()
}

struct Flattener<'a> {
    scan: Scanner<'a>,
    tolerance: f64,
    /// Current point, the start of the next segment.
    cur: Point,
    /// First point of the current sub-path, where a close command returns to.
    start: Point,
    /// Second control point of the previous segment, when it was a cubic.
    prev_cubic_ctrl: Option<Point>,
    /// Control point of the previous segment, when it was a quadratic.
    prev_quad_ctrl: Option<Point>,
    points: Vec<Point>,
    out: Vec<Polyline>,
}

impl<'a> Flattener<'a> {
    fn new(data: &'a str, tolerance: f64) -> Self {
        Flattener {
            scan: Scanner::new(data),
            tolerance: tolerance.max(MIN_TOLERANCE),
            cur: Point(0.0, 0.0),
            start: Point(0.0, 0.0),
            prev_cubic_ctrl: None,
            prev_quad_ctrl: None,
            points: vec![],
            out: vec![],
        }
    }

    fn run(mut self) -> Result<Vec<Polyline>, NestError> {
        loop {
            self.scan.skip_separators();
            let offset = self.scan.pos;
            let Some(byte) = self.scan.peek() else { break };
            if !byte.is_ascii_alphabetic() {
                warn!("ignoring stray token in path data at byte {offset}");
                if self.scan.number().is_none() && self.scan.pos == offset {
                    self.scan.bump();
                }
                continue;
            }
            self.scan.bump();
            let rel = byte.is_ascii_lowercase();
            match byte.to_ascii_uppercase() {
                b'M' => self.cmd_move(rel),
                b'L' => self.cmd_line(rel),
                b'H' => self.cmd_horizontal(rel),
                b'V' => self.cmd_vertical(rel),
                b'C' => self.cmd_cubic(rel),
                b'S' => self.cmd_smooth_cubic(rel),
                b'Q' => self.cmd_quadratic(rel),
                b'T' => self.cmd_smooth_quadratic(rel),
                b'A' => self.cmd_arc(rel),
                b'Z' => self.cmd_close(),
                _ => {
                    return Err(NestError::Parse {
                        command: byte as char,
                        offset,
                    });
                }
            }
        }
        // a trailing sub-path without a close command is still emitted
        self.flush_open();
        Ok(self.out)
    }

    fn cmd_move(&mut self, rel: bool) {
        let mut first = true;
        while let Some([x, y]) = self.coords::<2>() {
            let p = self.resolve(x, y, rel);
            if first {
                self.begin_subpath(p);
                first = false;
            } else {
                // extra coordinate pairs are implicit line segments
                self.line_to(p);
            }
        }
        self.reset_ctrl();
    }

    fn cmd_line(&mut self, rel: bool) {
        while let Some([x, y]) = self.coords::<2>() {
            let p = self.resolve(x, y, rel);
            self.line_to(p);
        }
        self.reset_ctrl();
    }

    fn cmd_horizontal(&mut self, rel: bool) {
        while let Some([x]) = self.coords::<1>() {
            let x = if rel { self.cur.0 + x } else { x };
            self.line_to(Point(x, self.cur.1));
        }
        self.reset_ctrl();
    }

    fn cmd_vertical(&mut self, rel: bool) {
        while let Some([y]) = self.coords::<1>() {
            let y = if rel { self.cur.1 + y } else { y };
            self.line_to(Point(self.cur.0, y));
        }
        self.reset_ctrl();
    }

    fn cmd_cubic(&mut self, rel: bool) {
        while let Some([x1, y1, x2, y2, x, y]) = self.coords::<6>() {
            let c1 = self.resolve(x1, y1, rel);
            let c2 = self.resolve(x2, y2, rel);
            let p = self.resolve(x, y, rel);
            self.cubic_to(c1, c2, p);
        }
    }

    fn cmd_smooth_cubic(&mut self, rel: bool) {
        while let Some([x2, y2, x, y]) = self.coords::<4>() {
            let c1 = self.reflected_cubic_ctrl();
            let c2 = self.resolve(x2, y2, rel);
            let p = self.resolve(x, y, rel);
            self.cubic_to(c1, c2, p);
        }
    }

    fn cmd_quadratic(&mut self, rel: bool) {
        while let Some([qx, qy, x, y]) = self.coords::<4>() {
            let q = self.resolve(qx, qy, rel);
            let p = self.resolve(x, y, rel);
            self.quadratic_to(q, p);
        }
    }

    fn cmd_smooth_quadratic(&mut self, rel: bool) {
        while let Some([x, y]) = self.coords::<2>() {
            let q = self.reflected_quad_ctrl();
            let p = self.resolve(x, y, rel);
            self.quadratic_to(q, p);
        }
    }

    fn cmd_arc(&mut self, rel: bool) {
        loop {
            let Some([rx, ry, rot]) = self.coords::<3>() else {
                break;
            };
            let (Some(large_arc), Some(sweep)) = (self.scan.flag(), self.scan.flag()) else {
                warn!("dropping arc with malformed flags in path data");
                break;
            };
            let Some([x, y]) = self.coords::<2>() else {
                warn!("dropping arc with a missing endpoint in path data");
                break;
            };
            let p = self.resolve(x, y, rel);
            self.ensure_subpath();
            arc::flatten_arc(
                self.cur,
                (rx, ry),
                rot,
                large_arc,
                sweep,
                p,
                self.tolerance,
                &mut self.points,
            );
            self.cur = p;
        }
        self.reset_ctrl();
    }

    fn cmd_close(&mut self) {
        if self.points.len() >= 2 {
            self.out.push(Polyline {
                points: std::mem::take(&mut self.points),
                closed: true,
            });
        } else {
            self.points.clear();
        }
        // the closed sub-path's start becomes the current point again
        self.cur = self.start;
        self.points.push(self.start);
        self.reset_ctrl();
    }

    fn cubic_to(&mut self, c1: Point, c2: Point, p: Point) {
        self.ensure_subpath();
        flatten_cubic(self.cur, c1, c2, p, self.tolerance, &mut self.points);
        self.cur = p;
        self.prev_cubic_ctrl = Some(c2);
        self.prev_quad_ctrl = None;
    }

    fn quadratic_to(&mut self, q: Point, p: Point) {
        self.ensure_subpath();
        let (c1, c2) = promote_quadratic(self.cur, q, p);
        flatten_cubic(self.cur, c1, c2, p, self.tolerance, &mut self.points);
        self.cur = p;
        self.prev_quad_ctrl = Some(q);
        self.prev_cubic_ctrl = None;
    }

    /// Reflection of the previous cubic control about the current point, or
    /// the current point itself when the previous segment was not a cubic.
    fn reflected_cubic_ctrl(&self) -> Point {
        match self.prev_cubic_ctrl {
            Some(c) => Point(2.0 * self.cur.0 - c.0, 2.0 * self.cur.1 - c.1),
            None => self.cur,
        }
    }

    fn reflected_quad_ctrl(&self) -> Point {
        match self.prev_quad_ctrl {
            Some(q) => Point(2.0 * self.cur.0 - q.0, 2.0 * self.cur.1 - q.1),
            None => self.cur,
        }
    }

    fn begin_subpath(&mut self, p: Point) {
        self.flush_open();
        self.start = p;
        self.cur = p;
        self.points.push(p);
    }

    /// Starts a sub-path at the current point for drawing commands that
    /// arrive before any move command.
    fn ensure_subpath(&mut self) {
        if self.points.is_empty() {
            self.points.push(self.cur);
        }
    }

    fn flush_open(&mut self) {
        if self.points.len() >= 2 {
            self.out.push(Polyline {
                points: std::mem::take(&mut self.points),
                closed: false,
            });
        } else {
            self.points.clear();
        }
    }

    fn line_to(&mut self, p: Point) {
        self.ensure_subpath();
        self.points.push(p);
        self.cur = p;
    }

    fn resolve(&self, x: f64, y: f64, rel: bool) -> Point {
        match rel {
            true => Point(self.cur.0 + x, self.cur.1 + y),
            false => Point(x, y),
        }
    }

    fn reset_ctrl(&mut self) {
        self.prev_cubic_ctrl = None;
        self.prev_quad_ctrl = None;
    }

    /// Reads `N` consecutive numbers, or `None` once the arguments of the
    /// current command are exhausted. A tuple cut short mid-way is dropped.
    fn coords<const N: usize>(&mut self) -> Option<[f64; N]> {
        let mut vals = [0.0; N];
        for (i, v) in vals.iter_mut().enumerate() {
            match self.scan.number() {
                Some(n) => *v = n,
                None => {
                    if i > 0 {
                        warn!("dropping a path command tuple, expected {N} numbers but found {i}");
                    }
                    return None;
                }
            }
        }
        Some(vals)
    }
}

struct Scanner<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner { src, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.src.as_bytes().get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Some(b' ' | b',' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    /// Reads the next numeric token. `None` when the upcoming token is not a
    /// number, typically the next command letter or the end of the data.
    /// Malformed or non-finite numbers are skipped with a warning.
    fn number(&mut self) -> Option<f64> {
        loop {
            self.skip_separators();
            let b = self.peek()?;
            if !(b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.')) {
                return None;
            }
            let start = self.pos;
            self.lex_number();
            let token = &self.src[start..self.pos];
            match token.parse::<f64>() {
                Ok(v) if v.is_finite() => return Some(v),
                _ => warn!("skipping malformed number {token:?} in path data at byte {start}"),
            }
        }
    }

    /// Advances over one number-shaped token: sign, digits, fraction, exponent.
    fn lex_number(&mut self) {
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
    }

    /// Reads an arc flag, a bare `0` or `1` possibly abutting the next token.
    fn flag(&mut self) -> Option<bool> {
        self.skip_separators();
        match self.peek()? {
            b'0' => {
                self.pos += 1;
                Some(false)
            }
            b'1' => {
                self.pos += 1;
                Some(true)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn pts(line: &Polyline) -> &[Point] {
        &line.points
    }

    #[test]
    fn straight_line_paths_flatten_exactly() {
        let lines = flatten_path("M 5 5 L 105 5 L 105 65 L 5 65 Z", 0.1).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].closed);
        assert_eq!(
            pts(&lines[0]),
            &[
                Point(5.0, 5.0),
                Point(105.0, 5.0),
                Point(105.0, 65.0),
                Point(5.0, 65.0)
            ]
        );
    }

    #[test]
    fn relative_commands_accumulate() {
        let lines = flatten_path("m 10,10 h 5 v 5 h -5 z", 0.1).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].closed);
        assert_eq!(
            pts(&lines[0]),
            &[
                Point(10.0, 10.0),
                Point(15.0, 10.0),
                Point(15.0, 15.0),
                Point(10.0, 15.0)
            ]
        );
    }

    #[test]
    fn implicit_lines_after_move() {
        let lines = flatten_path("M 0 0 10 0 10 10", 0.1).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].closed);
        assert_eq!(
            pts(&lines[0]),
            &[Point(0.0, 0.0), Point(10.0, 0.0), Point(10.0, 10.0)]
        );
    }

    #[test]
    fn repeated_axis_commands() {
        let lines = flatten_path("M 0 0 H 10 20 V 5", 0.1).unwrap();
        assert_eq!(
            pts(&lines[0]),
            &[
                Point(0.0, 0.0),
                Point(10.0, 0.0),
                Point(20.0, 0.0),
                Point(20.0, 5.0)
            ]
        );
    }

    #[test]
    fn smooth_cubic_reflects_the_previous_control() {
        let shorthand = flatten_path("M 0 0 C 0 10 10 10 10 0 S 20 -10 20 0", 0.05).unwrap();
        let explicit = flatten_path("M 0 0 C 0 10 10 10 10 0 C 10 -10 20 -10 20 0", 0.05).unwrap();
        assert_eq!(shorthand, explicit);
    }

    #[test]
    fn smooth_cubic_after_a_line_collapses_its_control() {
        let shorthand = flatten_path("M 0 0 L 10 0 S 20 -10 20 0", 0.05).unwrap();
        let explicit = flatten_path("M 0 0 L 10 0 C 10 0 20 -10 20 0", 0.05).unwrap();
        assert_eq!(shorthand, explicit);
    }

    #[test]
    fn smooth_quadratic_reflects_the_previous_control() {
        let shorthand = flatten_path("M 0 0 Q 5 10 10 0 T 20 0", 0.05).unwrap();
        let explicit = flatten_path("M 0 0 Q 5 10 10 0 Q 15 -10 20 0", 0.05).unwrap();
        assert_eq!(shorthand, explicit);
    }

    #[test]
    fn quadratic_passes_through_its_midpoint() {
        let lines = flatten_path("M 0 0 Q 10 10 20 0", 0.05).unwrap();
        let hit = pts(&lines[0]).iter().any(|p| {
            approx_eq!(f64, p.0, 10.0, epsilon = 1e-9) && approx_eq!(f64, p.1, 5.0, epsilon = 1e-9)
        });
        assert!(hit, "expected the curve midpoint among {:?}", lines[0]);
    }

    #[test]
    fn multiple_subpaths_and_a_trailing_open_one() {
        let lines = flatten_path("M 0 0 L 10 0 L 10 10 Z M 20 20 L 30 20", 0.1).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].closed);
        assert_eq!(lines[0].points.len(), 3);
        assert!(!lines[1].closed);
        assert_eq!(pts(&lines[1]), &[Point(20.0, 20.0), Point(30.0, 20.0)]);
    }

    #[test]
    fn close_resets_the_current_point() {
        let lines = flatten_path("M 0 0 L 10 0 L 10 10 Z L 5 5", 0.1).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(pts(&lines[1]), &[Point(0.0, 0.0), Point(5.0, 5.0)]);
    }

    #[test]
    fn unknown_command_is_a_parse_error() {
        let err = flatten_path("M 0 0 P 5 5", 0.1).unwrap_err();
        assert_eq!(
            err,
            NestError::Parse {
                command: 'P',
                offset: 6
            }
        );
    }

    #[test]
    fn malformed_numbers_are_skipped() {
        let lines = flatten_path("M 0 0 L 10 0 L 1e+ 20 L 30 0", 0.1).unwrap();
        assert_eq!(
            pts(&lines[0]),
            &[Point(0.0, 0.0), Point(10.0, 0.0), Point(30.0, 0.0)]
        );
    }

    #[test]
    fn arc_samples_stay_on_the_circle() {
        let lines = flatten_path("M 0 0 A 10 10 0 0 1 20 0", 0.1).unwrap();
        let points = pts(&lines[0]);
        assert!(points.len() >= 4);
        for p in points {
            assert!((p.distance(&Point(10.0, 0.0)) - 10.0).abs() < 1e-9);
        }
        assert_eq!(*points.last().unwrap(), Point(20.0, 0.0));
    }

    #[test]
    fn packed_arc_flags_parse() {
        // flags may abut the following coordinates, as in "0 0 1" vs "0120 0"
        let spaced = flatten_path("M 0 0 A 10 10 0 0 1 20 0", 0.1).unwrap();
        let packed = flatten_path("M 0 0 A 10 10 0 0120 0", 0.1).unwrap();
        assert_eq!(spaced, packed);
    }
}
