//! Geometry shared by the stroke engine and its hosts
//!
//! Points, rectangles, transforms and path elements come from kurbo. Points
//! are in desktop or document space depending on the caller.

pub use kurbo::{Affine, BezPath, CubicBez, PathEl, PathSeg, Point, Rect, Vec2};

use kurbo::{ParamCurveExtrema, QuadBez};

/// Union of two optional rectangles
pub fn union_bounds(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Exact bounding box of a run of path elements, `None` when it has no points
///
/// A lone `MoveTo` still counts as a point, unlike kurbo's `Shape` bounds
/// which only look at drawn segments.
pub fn path_bounds(elements: impl IntoIterator<Item = PathEl>) -> Option<Rect> {
    let mut bounds: Option<Rect> = None;
    let mut current: Option<Point> = None;
    for el in elements {
        let rect = match (el, current) {
            (PathEl::QuadTo(c, p), Some(start)) => QuadBez::new(start, c, p).bounding_box(),
            (PathEl::CurveTo(c1, c2, p), Some(start)) => {
                CubicBez::new(start, c1, c2, p).bounding_box()
            }
            (el, _) => match el.end_point() {
                Some(p) => Rect::from_points(p, p),
                None => continue,
            },
        };
        bounds = union_bounds(bounds, Some(rect));
        if let Some(p) = el.end_point() {
            current = Some(p);
        }
    }
    bounds
}
