//! Least-squares control point solve for a single cubic

use crate::types::{CubicBez, Point, Vec2};

/// Unit vector along `v`, `None` for a zero or non-finite vector
fn unit(v: Vec2) -> Option<Vec2> {
    let length = v.hypot();
    if length > 0.0 && length.is_finite() {
        Some(v / length)
    } else {
        None
    }
}

/// Normalized cumulative chord length for each point (0 at the start, 1 at the end)
///
/// Returns `None` when every point coincides.
pub(crate) fn chord_length_parameterize(data: &[Point]) -> Option<Vec<f64>> {
    let mut u = Vec::with_capacity(data.len());
    u.push(0.0);
    for pair in data.windows(2) {
        let last = u[u.len() - 1];
        u.push(last + pair[0].distance(pair[1]));
    }

    let total = u[u.len() - 1];
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    for value in u.iter_mut() {
        *value /= total;
    }
    // Guard against rounding so the end parameter is exactly 1
    if let Some(last) = u.last_mut() {
        *last = 1.0;
    }
    Some(u)
}

/// Unit tangent leaving the first point
///
/// With three or more points this is the start derivative of the parabola
/// through the first three samples at their chord distances. Falls back to
/// the first chord when the estimate degenerates or turns backwards.
pub(crate) fn left_tangent(data: &[Point]) -> Option<Vec2> {
    end_tangent(data[0], data[1], data.get(2).copied())
}

/// Unit tangent leaving the last point, pointing back along the data
pub(crate) fn right_tangent(data: &[Point]) -> Option<Vec2> {
    let n = data.len();
    let third = if n >= 3 { Some(data[n - 3]) } else { None };
    end_tangent(data[n - 1], data[n - 2], third)
}

fn end_tangent(d0: Point, d1: Point, d2: Option<Point>) -> Option<Vec2> {
    let chord = d1 - d0;
    let Some(d2) = d2 else {
        return unit(chord);
    };

    let s1 = d0.distance(d1);
    let s2 = s1 + d1.distance(d2);
    if s1 <= 0.0 || s2 <= s1 {
        return unit(chord);
    }

    let estimate = d0.to_vec2() * -(1.0 / s1 + 1.0 / s2)
        + d1.to_vec2() * (s2 / (s1 * (s2 - s1)))
        - d2.to_vec2() * (s1 / (s2 * (s2 - s1)));
    match unit(estimate) {
        Some(t) if t.dot(chord) > 0.0 => Some(t),
        _ => unit(chord),
    }
}

/// Unit tangent at an interior point, pointing backwards along the data
pub(crate) fn center_tangent(data: &[Point], center: usize) -> Option<Vec2> {
    unit(data[center - 1] - data[center + 1])
}

/// Fit the inner control points for fixed end points, tangents and parameters
///
/// Solves the 2x2 normal equations for the distance of each control point
/// along its end tangent. When the solution is degenerate (or points the
/// wrong way) both distances fall back to a third of the chord.
pub(crate) fn generate_bezier(
    data: &[Point],
    u: &[f64],
    tangent_start: Vec2,
    tangent_end: Vec2,
) -> CubicBez {
    let first = data[0];
    let last = data[data.len() - 1];

    let mut c = [[0.0_f64; 2]; 2];
    let mut x = [0.0_f64; 2];

    for (point, &t) in data.iter().zip(u) {
        let s = 1.0 - t;
        let b0 = s * s * s;
        let b1 = 3.0 * s * s * t;
        let b2 = 3.0 * s * t * t;
        let b3 = t * t * t;

        let a1 = tangent_start * b1;
        let a2 = tangent_end * b2;

        c[0][0] += a1.dot(a1);
        c[0][1] += a1.dot(a2);
        c[1][1] += a2.dot(a2);

        let shortfall =
            point.to_vec2() - (first.to_vec2() * (b0 + b1) + last.to_vec2() * (b2 + b3));
        x[0] += a1.dot(shortfall);
        x[1] += a2.dot(shortfall);
    }
    c[1][0] = c[0][1];

    let det_c0_c1 = c[0][0] * c[1][1] - c[1][0] * c[0][1];
    let det_c0_x = c[0][0] * x[1] - c[1][0] * x[0];
    let det_x_c1 = x[0] * c[1][1] - x[1] * c[0][1];

    let chord = first.distance(last);
    let (mut alpha_start, mut alpha_end) = if det_c0_c1.abs() > f64::EPSILON * c[0][0] * c[1][1] {
        (det_x_c1 / det_c0_c1, det_c0_x / det_c0_c1)
    } else {
        (0.0, 0.0)
    };

    let epsilon = 1.0e-6 * chord;
    if !(alpha_start.is_finite() && alpha_end.is_finite())
        || alpha_start < epsilon
        || alpha_end < epsilon
    {
        alpha_start = chord / 3.0;
        alpha_end = chord / 3.0;
    }

    CubicBez::new(
        first,
        first + tangent_start * alpha_start,
        last + tangent_end * alpha_end,
        last,
    )
}
