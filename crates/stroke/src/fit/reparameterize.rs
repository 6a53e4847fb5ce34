//! Parameter refinement and error measurement for a fitted cubic

use kurbo::{ParamCurve, ParamCurveDeriv};

use crate::types::{CubicBez, Point};

/// Move every interior parameter one Newton step closer to its point
pub(crate) fn reparameterize(data: &[Point], u: &mut [f64], bezier: &CubicBez) {
    let d1 = bezier.deriv();
    let d2 = d1.deriv();
    let last = data.len() - 1;

    for i in 1..last {
        let t = u[i];
        let diff = bezier.eval(t) - data[i];
        let q1 = d1.eval(t).to_vec2();
        let q2 = d2.eval(t).to_vec2();

        let numerator = diff.dot(q1);
        let denominator = q1.hypot2() + diff.dot(q2);
        if denominator.abs() < f64::EPSILON || !denominator.is_finite() {
            continue;
        }
        let improved = t - numerator / denominator;
        if improved.is_finite() {
            u[i] = improved.clamp(0.0, 1.0);
        }
    }
}

/// Largest squared deviation over the interior points and where it occurs
///
/// The split index is always interior (1..len-1) so a recursive split makes
/// progress on both halves.
pub(crate) fn max_error(data: &[Point], u: &[f64], bezier: &CubicBez) -> (f64, usize) {
    let mut max_dist_sq = 0.0;
    let mut split = data.len() / 2;

    for i in 1..data.len() - 1 {
        let dist_sq = (bezier.eval(u[i]) - data[i]).hypot2();
        if dist_sq > max_dist_sq {
            max_dist_sq = dist_sq;
            split = i;
        }
    }

    (max_dist_sq, split)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(end: Point) -> CubicBez {
        CubicBez::new(
            Point::ZERO,
            Point::ZERO.lerp(end, 1.0 / 3.0),
            Point::ZERO.lerp(end, 2.0 / 3.0),
            end,
        )
    }

    #[test]
    fn test_max_error_finds_worst_point() {
        let bezier = straight(Point::new(4.0, 0.0));
        let data = [
            Point::ZERO,
            Point::new(1.0, 0.5),
            Point::new(2.0, -2.0),
            Point::new(3.0, 0.0),
            Point::new(4.0, 0.0),
        ];
        let u = [0.0, 0.25, 0.5, 0.75, 1.0];
        let (err, split) = max_error(&data, &u, &bezier);
        assert_eq!(split, 2);
        assert!((err - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_reparameterize_keeps_endpoints() {
        let bezier = straight(Point::new(10.0, 0.0));
        let data = [Point::ZERO, Point::new(7.0, 0.0), Point::new(10.0, 0.0)];
        let mut u = [0.0, 0.5, 1.0];
        reparameterize(&data, &mut u, &bezier);
        assert_eq!(u[0], 0.0);
        assert_eq!(u[2], 1.0);
        assert!((u[1] - 0.7).abs() < 1e-9);
    }
}
