//! Line capture: the pen centre fitted one cubic at a time

use nib_config::{SAMPLING_SIZE, StrokeMode, ToolSettings};
use tracing::{debug, warn};

use crate::curve::StrokeCurve;
use crate::filter::PenDynamics;
use crate::fit::fit_cubic;
use crate::types::Point;

use super::{SampleWindow, StrokeCapture};

#[derive(Debug, Clone, Default)]
pub struct LineCapture {
    window: SampleWindow,
    /// Single cubic through the current window
    current: StrokeCurve,
    /// Settled part of the stroke
    accumulated: StrokeCurve,
    segments: Vec<StrokeCurve>,
}

impl LineCapture {
    pub fn new() -> Self {
        Self {
            window: SampleWindow::new(),
            ..Default::default()
        }
    }

    /// Record a pen position directly
    pub fn push_sample(&mut self, p: Point) {
        self.window.push(p);
    }

    pub fn accumulated(&self) -> &StrokeCurve {
        &self.accumulated
    }

    /// Move the current cubic onto the accumulated curve
    fn concat_current(&mut self) {
        if self.current.is_empty() {
            return;
        }
        if self.accumulated.is_empty() {
            self.accumulated = self.current.clone();
        } else if let Some(seg) = self.current.last_segment() {
            self.accumulated.push_segment(seg);
        }
    }

    /// Settle what has been fitted and start a new window at its end
    fn split(&mut self, tolerance_sq: f64) {
        let points = self.window.points().to_vec();
        let Some(newest) = points.last().copied() else {
            return;
        };

        match self.current.current_point() {
            Some(end) => {
                self.concat_current();
                self.segments.push(self.current.clone());

                self.window.clear();
                self.window.push(end);
                if newest != end {
                    self.window.push(newest);
                }
                self.current = match fit_cubic(self.window.points(), tolerance_sq) {
                    Ok(Some(seg)) => StrokeCurve::from_segments(&[seg]),
                    _ => StrokeCurve::new(),
                };
            }
            None => {
                // Nothing fitted yet: keep the raw samples as straight lines
                if self.accumulated.is_empty() {
                    self.accumulated.extend_lines(&points);
                } else {
                    self.accumulated.extend_lines(&points[1..]);
                }
                self.segments.push(StrokeCurve::polyline(&points));
                self.window.restart_from(points.len() - 1);
            }
        }
    }
}

impl StrokeCapture for LineCapture {
    fn mode(&self) -> StrokeMode {
        StrokeMode::Line
    }

    fn reset(&mut self) {
        self.window.clear();
        self.current.reset();
        self.accumulated.reset();
        self.segments.clear();
    }

    fn add_sample(&mut self, pen: &PenDynamics, _settings: &ToolSettings) {
        self.push_sample(pen.current_view_point());
    }

    fn fit_and_split(&mut self, tolerance_sq: f64) {
        let n = self.window.len();
        if n < SAMPLING_SIZE {
            match fit_cubic(self.window.points(), tolerance_sq) {
                Ok(Some(seg)) => {
                    self.current = StrokeCurve::from_segments(&[seg]);
                    return;
                }
                // Fewer than two distinct samples so far
                Ok(None) => return,
                Err(err) => debug!("LineCapture: {} samples do not fit one cubic: {}", n, err),
            }
        }

        if self.current.is_empty() {
            warn!("LineCapture: no fitted curve, keeping {} raw samples", n);
        }
        self.split(tolerance_sq);
    }

    fn preview(&self) -> &StrokeCurve {
        &self.current
    }

    fn segments(&self) -> &[StrokeCurve] {
        &self.segments
    }

    fn finish(&mut self, tolerance_sq: f64) -> StrokeCurve {
        self.fit_and_split(tolerance_sq);
        self.concat_current();
        let path = std::mem::take(&mut self.accumulated);
        debug!("LineCapture::finish: path with {} commands", path.len());
        self.reset();
        path
    }

    fn window_len(&self) -> usize {
        self.window.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::max_deviation;
    use crate::types::{CubicBez, PathEl};

    fn cubics(curve: &StrokeCurve) -> Vec<CubicBez> {
        let mut segments = Vec::new();
        let mut start = None;
        for el in curve.elements() {
            if let (PathEl::CurveTo(c1, c2, p), Some(s)) = (*el, start) {
                segments.push(CubicBez::new(s, c1, c2, p));
            }
            start = el.end_point();
        }
        segments
    }

    #[test]
    fn test_corner_trajectory_within_tolerance() {
        let input = [Point::ZERO, Point::new(10.0, 0.0), Point::new(10.0, 10.0)];
        let mut capture = LineCapture::new();
        for p in input {
            capture.push_sample(p);
            capture.fit_and_split(0.01 * 0.01);
        }
        let path = capture.finish(0.01 * 0.01);
        assert!(!path.is_empty());
        assert!(!path.is_closed());
        assert_eq!(path.first_point(), Some(Point::ZERO));
        assert_eq!(path.current_point(), Some(Point::new(10.0, 10.0)));

        let segments = cubics(&path);
        assert!(!segments.is_empty() && segments.len() <= 2);
        assert!(max_deviation(&input, &segments) <= 0.01);
    }

    #[test]
    fn test_single_sample_produces_nothing() {
        let mut capture = LineCapture::new();
        capture.push_sample(Point::new(1.0, 1.0));
        capture.fit_and_split(1.0);
        assert!(capture.preview().is_empty());
        assert!(capture.finish(1.0).is_empty());
    }

    #[test]
    fn test_full_window_settles_and_continues() {
        let mut capture = LineCapture::new();
        for i in 0..SAMPLING_SIZE {
            capture.push_sample(Point::new(i as f64, 0.0));
            capture.fit_and_split(0.01);
        }
        // The 16th sample filled the window and forced a split
        assert_eq!(capture.segments().len(), 1);
        assert_eq!(capture.accumulated().len(), 2);
        assert_eq!(capture.window_len(), 2);
        assert_eq!(
            capture.preview().current_point(),
            Some(Point::new((SAMPLING_SIZE - 1) as f64, 0.0))
        );

        let path = capture.finish(0.01);
        assert_eq!(path.len(), 3);
        assert_eq!(
            path.current_point(),
            Some(Point::new((SAMPLING_SIZE - 1) as f64, 0.0))
        );
    }

    #[test]
    fn test_unfittable_sample_starts_new_piece() {
        let mut capture = LineCapture::new();
        let points = [
            Point::ZERO,
            Point::new(10.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
        ];
        for p in points {
            capture.push_sample(p);
            capture.fit_and_split(0.01);
        }
        let path = capture.finish(0.01);
        assert_eq!(path.first_point(), Some(Point::ZERO));
        assert_eq!(path.current_point(), Some(Point::new(10.0, 10.0)));
        assert!(path.len() >= 3);
        // Every settled piece ends on an input sample
        for el in &path.elements()[..path.len() - 1] {
            let end = el.end_point().unwrap();
            assert!(points.contains(&end), "{end:?} is not an input sample");
        }
    }
}
