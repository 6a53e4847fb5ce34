//! Cubic Bezier fitting of sampled trajectories
//!
//! A run of samples is approximated by a single cubic using least squares
//! over chord-length parameters, refined by Newton-Raphson
//! reparameterization. When one cubic cannot meet the tolerance the run is
//! split at its worst sample and both halves are fitted recursively, bounded
//! by a maximum segment count.
//!
//! Tolerances are passed squared so the hot loop never takes a square root.

mod least_squares;
mod reparameterize;

use kurbo::ParamCurveNearest;
use thiserror::Error;
use tracing::debug;

use crate::constants::{FIT_MAX_ITERATIONS, FIT_REFINE_RATIO, NEAREST_ACCURACY};
use crate::types::{CubicBez, Point, Vec2};

use least_squares::{
    center_tangent, chord_length_parameterize, generate_bezier, left_tangent, right_tangent,
};
use reparameterize::{max_error, reparameterize};

/// The samples could not be fitted within the tolerance and segment budget
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("No fit within tolerance using at most {max_beziers} segment(s)")]
    Unfittable { max_beziers: usize },
}

/// Fit a single cubic through `points`
///
/// Returns `Ok(None)` when there are fewer than two distinct points (there is
/// nothing to fit), and `Err` when one cubic cannot meet the tolerance.
pub fn fit_cubic(points: &[Point], tolerance_sq: f64) -> Result<Option<CubicBez>, FitError> {
    Ok(fit_cubic_split(points, tolerance_sq, 1)?.into_iter().next())
}

/// Fit up to `max_beziers` cubics through `points`
///
/// The result is empty when there are fewer than two distinct points. Every
/// returned segment keeps its samples within `sqrt(tolerance_sq)`; if that is
/// impossible within the budget the whole fit fails instead of returning
/// segments that exceed the tolerance.
pub fn fit_cubic_split(
    points: &[Point],
    tolerance_sq: f64,
    max_beziers: usize,
) -> Result<Vec<CubicBez>, FitError> {
    let data = clean_points(points);
    let mut segments = Vec::new();
    if data.len() < 2 || max_beziers == 0 {
        return Ok(segments);
    }

    fit_recursive(&data, None, None, tolerance_sq, max_beziers, &mut segments)?;
    debug!(
        "fit_cubic_split: {} points -> {} segment(s)",
        data.len(),
        segments.len()
    );
    Ok(segments)
}

/// Largest distance from any input point to the nearest fitted segment
pub fn max_deviation(points: &[Point], segments: &[CubicBez]) -> f64 {
    if segments.is_empty() {
        return 0.0;
    }
    clean_points(points)
        .iter()
        .map(|p| {
            segments
                .iter()
                .map(|seg| seg.nearest(*p, NEAREST_ACCURACY).distance_sq.sqrt())
                .fold(f64::INFINITY, f64::min)
        })
        .fold(0.0, f64::max)
}

/// Drop non-finite points and adjacent duplicates
fn clean_points(points: &[Point]) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().copied().filter(|p| p.is_finite()) {
        if out.last() != Some(&p) {
            out.push(p);
        }
    }
    out
}

/// Fit `data` (at least two distinct, deduplicated points) and append the
/// segments to `out`, returning how many were produced
fn fit_recursive(
    data: &[Point],
    tangent_start: Option<Vec2>,
    tangent_end: Option<Vec2>,
    tolerance_sq: f64,
    max_beziers: usize,
    out: &mut Vec<CubicBez>,
) -> Result<usize, FitError> {
    let first = data[0];
    let last = data[data.len() - 1];

    if data.len() == 2 {
        let third = first.distance(last) / 3.0;
        let c1 = tangent_start.map_or(first.lerp(last, 1.0 / 3.0), |t| first + t * third);
        let c2 = tangent_end.map_or(first.lerp(last, 2.0 / 3.0), |t| last + t * third);
        out.push(CubicBez::new(first, c1, c2, last));
        return Ok(1);
    }

    let Some(mut u) = chord_length_parameterize(data) else {
        return Ok(0);
    };

    let t_start = tangent_start
        .or_else(|| left_tangent(data))
        .unwrap_or(Vec2::ZERO);
    let t_end = tangent_end
        .or_else(|| right_tangent(data))
        .unwrap_or(Vec2::ZERO);

    let mut bezier = generate_bezier(data, &u, t_start, t_end);
    reparameterize(data, &mut u, &bezier);
    let (mut error_sq, mut split) = max_error(data, &u, &bezier);

    if error_sq <= tolerance_sq {
        out.push(bezier);
        return Ok(1);
    }

    if error_sq <= tolerance_sq * FIT_REFINE_RATIO * FIT_REFINE_RATIO {
        for _ in 0..FIT_MAX_ITERATIONS {
            bezier = generate_bezier(data, &u, t_start, t_end);
            reparameterize(data, &mut u, &bezier);
            (error_sq, split) = max_error(data, &u, &bezier);
            if error_sq <= tolerance_sq {
                out.push(bezier);
                return Ok(1);
            }
        }
    }

    if max_beziers <= 1 {
        return Err(FitError::Unfittable { max_beziers });
    }

    // Split at the worst sample; both halves share its tangent so the join
    // stays smooth.
    let joint = center_tangent(data, split);
    let first_count = fit_recursive(
        &data[..=split],
        tangent_start,
        joint,
        tolerance_sq,
        max_beziers - 1,
        out,
    )?;
    let second_count = fit_recursive(
        &data[split..],
        joint.map(|t| -t),
        tangent_end,
        tolerance_sq,
        max_beziers - first_count,
        out,
    )?;

    Ok(first_count + second_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::ParamCurve;

    fn assert_within(points: &[Point], segments: &[CubicBez], tolerance: f64) {
        let deviation = max_deviation(points, segments);
        assert!(
            deviation <= tolerance + 1e-9,
            "deviation {deviation} exceeds tolerance {tolerance}"
        );
    }

    /// Distance to `seg` by dense sampling
    fn sampled_distance(seg: &CubicBez, p: Point) -> f64 {
        (0..=20_000)
            .map(|i| seg.eval(i as f64 / 20_000.0).distance(p))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_fit_fewer_than_two_distinct_points() {
        assert!(fit_cubic_split(&[], 1.0, 8).unwrap().is_empty());
        let same = [Point::new(1.0, 1.0); 3];
        assert!(fit_cubic_split(&same, 1.0, 8).unwrap().is_empty());
        assert_eq!(fit_cubic(&same, 1.0).unwrap(), None);
    }

    #[test]
    fn test_fit_two_points_is_straight() {
        let points = [Point::ZERO, Point::new(3.0, 0.0)];
        let seg = fit_cubic(&points, 0.01).unwrap().unwrap();
        assert_eq!(seg.p0, points[0]);
        assert_eq!(seg.p3, points[1]);
        assert!(seg.p1.distance(Point::new(1.0, 0.0)) < 1e-12);
    }

    #[test]
    fn test_fit_ignores_duplicates_and_nan() {
        let points = [
            Point::ZERO,
            Point::ZERO,
            Point::new(f64::NAN, 1.0),
            Point::new(5.0, 0.0),
        ];
        let segments = fit_cubic_split(&points, 0.01, 8).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].p3, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_fit_corner_within_tolerance() {
        let points = [Point::ZERO, Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let segments = fit_cubic_split(&points, 0.01 * 0.01, 8).unwrap();
        assert!(!segments.is_empty() && segments.len() <= 2);
        assert_within(&points, &segments, 0.01);
        if segments.len() == 2 {
            assert_eq!(segments[0].p3, Point::new(10.0, 0.0));
        }
    }

    #[test]
    fn test_fit_smooth_arc() {
        let points: Vec<Point> = (0..=20)
            .map(|i| {
                let a = i as f64 / 20.0 * std::f64::consts::FRAC_PI_2;
                Point::new(50.0 * a.cos(), 50.0 * a.sin())
            })
            .collect();
        let segments = fit_cubic_split(&points, 0.25 * 0.25, 8).unwrap();
        assert!(!segments.is_empty() && segments.len() <= 2);
        assert_within(&points, &segments, 0.25);
    }

    #[test]
    fn test_fit_sine_wave_is_continuous() {
        let points: Vec<Point> = (0..=40)
            .map(|i| {
                let x = i as f64 * 2.5;
                Point::new(x, 20.0 * (x / 100.0 * std::f64::consts::TAU).sin())
            })
            .collect();
        let segments = fit_cubic_split(&points, 0.5 * 0.5, 8).unwrap();
        assert!(!segments.is_empty() && segments.len() <= 8);
        assert_within(&points, &segments, 0.5);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].p3, pair[1].p0);
        }
        assert_eq!(segments[0].p0, points[0]);
        assert_eq!(segments[segments.len() - 1].p3, points[40]);
    }

    #[test]
    fn test_fit_reports_failure_when_budget_exhausted() {
        let points: Vec<Point> = (0..40)
            .map(|i| Point::new(i as f64, if i % 2 == 0 { 0.0 } else { 10.0 }))
            .collect();
        assert_eq!(
            fit_cubic_split(&points, 0.01, 2),
            Err(FitError::Unfittable { max_beziers: 1 })
        );
        assert!(fit_cubic(&points, 0.01).is_err());
    }

    #[test]
    fn test_max_deviation_on_looping_segment() {
        // Self-intersecting cubic: many points have two competing nearest
        // candidates far apart in parameter space
        let seg = CubicBez::new(
            Point::ZERO,
            Point::new(120.0, 90.0),
            Point::new(-60.0, 90.0),
            Point::new(60.0, 0.0),
        );
        for i in -2..=6 {
            for j in -1..=5 {
                let p = Point::new(15.0 * i as f64, 15.0 * j as f64);
                let measured = max_deviation(&[p], &[seg]);
                let sampled = sampled_distance(&seg, p);
                assert!(
                    (measured - sampled).abs() < 1e-2,
                    "at {p:?}: measured {measured}, sampled {sampled}"
                );
            }
        }
    }

    #[test]
    fn test_max_deviation_zero_on_curve() {
        let seg = CubicBez::new(
            Point::ZERO,
            Point::new(120.0, 90.0),
            Point::new(-60.0, 90.0),
            Point::new(60.0, 0.0),
        );
        let points: Vec<Point> = (0..=12).map(|i| seg.eval(i as f64 / 12.0)).collect();
        assert!(max_deviation(&points, &[seg]) < 1e-6);
        assert_eq!(max_deviation(&points, &[]), 0.0);
    }
}
