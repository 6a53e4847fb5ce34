//! Appendable path used while a stroke is captured

use kurbo::ParamCurve;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Affine, BezPath, CubicBez, PathEl, PathSeg, Point, Rect, path_bounds};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurveError {
    #[error("Drawing command issued on a curve with no current point")]
    NoCurrentPoint,
}

/// An ordered sequence of absolute path elements
///
/// A non-empty curve always starts with a `MoveTo`. Finished calligraphic
/// outlines and previews end with `ClosePath`; running curves never do.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeCurve {
    path: BezPath,
}

impl StrokeCurve {
    pub fn new() -> Self {
        Self::default()
    }

    /// Curve consisting of the given fitted segments
    pub fn from_segments(segments: &[CubicBez]) -> Self {
        let mut curve = Self::new();
        for seg in segments {
            curve.push_segment(*seg);
        }
        curve
    }

    /// Open polyline through `points`
    pub fn polyline(points: &[Point]) -> Self {
        let mut curve = Self::new();
        curve.extend_lines(points);
        curve
    }

    /// Start the curve at `p`
    ///
    /// On an empty curve this is the leading `MoveTo`; on a non-empty curve
    /// it replaces the curve with a fresh one starting at `p`.
    pub fn move_to(&mut self, p: Point) {
        self.path.truncate(0);
        self.path.move_to(p);
    }

    pub fn line_to(&mut self, p: Point) -> Result<(), CurveError> {
        self.require_current_point()?;
        self.path.line_to(p);
        Ok(())
    }

    pub fn curve_to(&mut self, c1: Point, c2: Point, p: Point) -> Result<(), CurveError> {
        self.require_current_point()?;
        self.path.curve_to(c1, c2, p);
        Ok(())
    }

    /// Append a segment, starting the curve at its start if empty
    pub fn push_segment(&mut self, segment: impl Into<PathSeg>) {
        let segment = segment.into();
        if self.path.elements().is_empty() {
            self.path.move_to(segment.start());
        }
        self.path.push(segment.as_path_el());
    }

    /// Straight lines through `points`, starting the curve at the first one
    /// if it is empty
    pub fn extend_lines(&mut self, points: &[Point]) {
        let mut rest = points;
        if self.path.elements().is_empty() {
            let Some((first, tail)) = points.split_first() else {
                return;
            };
            self.path.move_to(*first);
            rest = tail;
        }
        for p in rest {
            self.path.line_to(*p);
        }
    }

    /// Close the current subpath; does nothing on an empty curve
    pub fn close_path(&mut self) {
        if !self.path.elements().is_empty() {
            self.path.close_path();
        }
    }

    pub fn reset(&mut self) {
        self.path.truncate(0);
    }

    pub fn is_empty(&self) -> bool {
        self.path.elements().is_empty()
    }

    pub fn len(&self) -> usize {
        self.path.elements().len()
    }

    pub fn elements(&self) -> &[PathEl] {
        self.path.elements()
    }

    pub fn path(&self) -> &BezPath {
        &self.path
    }

    pub fn into_path(self) -> BezPath {
        self.path
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.elements().last(), Some(PathEl::ClosePath))
    }

    pub fn first_point(&self) -> Option<Point> {
        self.elements().first().and_then(PathEl::end_point)
    }

    /// End point of the last drawing element
    pub fn current_point(&self) -> Option<Point> {
        self.elements().iter().rev().find_map(PathEl::end_point)
    }

    /// The last drawn segment, if the curve ends in one
    pub fn last_segment(&self) -> Option<PathSeg> {
        match self.elements() {
            [.., prev, last] => {
                let start = prev.end_point()?;
                match *last {
                    PathEl::CurveTo(c1, c2, p) => Some(CubicBez::new(start, c1, c2, p).into()),
                    PathEl::LineTo(p) => Some(kurbo::Line::new(start, p).into()),
                    PathEl::QuadTo(c, p) => Some(kurbo::QuadBez::new(start, c, p).into()),
                    PathEl::MoveTo(_) | PathEl::ClosePath => None,
                }
            }
            _ => None,
        }
    }

    /// The same path traversed from its end to its start
    ///
    /// The element count is preserved: the trailing end point becomes the
    /// leading `MoveTo` and every segment is replayed backwards with its
    /// controls swapped. A closing element is dropped.
    pub fn reversed(&self) -> StrokeCurve {
        let drawing: Vec<PathEl> = self
            .elements()
            .iter()
            .copied()
            .filter(|el| !matches!(el, PathEl::ClosePath))
            .collect();
        let mut reversed = StrokeCurve::new();
        let Some(end) = drawing.iter().rev().find_map(PathEl::end_point) else {
            return reversed;
        };

        reversed.path.move_to(end);
        for i in (1..drawing.len()).rev() {
            let Some(target) = drawing[i - 1].end_point() else {
                continue;
            };
            let el = match drawing[i] {
                PathEl::CurveTo(c1, c2, _) => PathEl::CurveTo(c2, c1, target),
                PathEl::QuadTo(c, _) => PathEl::QuadTo(c, target),
                PathEl::MoveTo(_) => PathEl::MoveTo(target),
                PathEl::LineTo(_) | PathEl::ClosePath => PathEl::LineTo(target),
            };
            reversed.path.push(el);
        }
        reversed
    }

    /// Append `other` after this curve
    ///
    /// With `connect_with_line` the leading `MoveTo` of `other` becomes a
    /// `LineTo` so both form one subpath; otherwise `other` starts a new
    /// subpath. Appending to an empty curve copies `other`.
    pub fn append(&mut self, other: &StrokeCurve, connect_with_line: bool) {
        let Some((first, rest)) = other.elements().split_first() else {
            return;
        };
        if self.path.elements().is_empty() {
            self.path = other.path.clone();
            return;
        }

        match (*first, connect_with_line) {
            (PathEl::MoveTo(p), true) => self.path.line_to(p),
            (el, _) => self.path.push(el),
        }
        for el in rest {
            self.path.push(*el);
        }
    }

    /// Bounding box of the path, `None` when empty
    pub fn bounds(&self) -> Option<Rect> {
        path_bounds(self.path.iter())
    }

    /// Copy of the curve with every point mapped through `affine`
    pub fn transformed(&self, affine: Affine) -> StrokeCurve {
        let mut path = self.path.clone();
        path.apply_affine(affine);
        StrokeCurve { path }
    }

    fn require_current_point(&self) -> Result<(), CurveError> {
        if self.path.elements().is_empty() {
            Err(CurveError::NoCurrentPoint)
        } else {
            Ok(())
        }
    }
}
