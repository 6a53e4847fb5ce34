//! Stroke accumulation: from smoothed pen samples to path geometry
//!
//! A capture collects the pen positions of one gesture into a bounded sample
//! window, fits the window with cubic Beziers whenever it fills up and keeps
//! the fitted pieces in a running curve. The two capture modes share that
//! flow and differ in what they sample:
//!
//! - [`LineCapture`] follows the pen centre and produces an open path.
//! - [`CalligraphicCapture`] follows both edges of a wide nib and closes
//!   them into a filled outline when the gesture ends.
//!
//! All points handled here are in desktop coordinates.

mod calligraphic;
mod line;

pub use calligraphic::{CalligraphicCapture, nib_offset, stroke_width};
pub use line::LineCapture;

use nib_config::{SAMPLING_SIZE, StrokeMode, ToolSettings};
use tracing::debug;

use crate::curve::StrokeCurve;
use crate::filter::PenDynamics;
use crate::types::Point;

/// A capture mode of the calligraphy tool
pub trait StrokeCapture {
    fn mode(&self) -> StrokeMode;

    /// Drop every per-gesture buffer
    fn reset(&mut self);

    /// Record the pen's current position as a new sample
    fn add_sample(&mut self, pen: &PenDynamics, settings: &ToolSettings);

    /// Fit the samples collected so far
    ///
    /// Called after every accepted sample; a mode decides on its own whether
    /// the window is due for fitting or only the preview changes.
    fn fit_and_split(&mut self, tolerance_sq: f64);

    /// Live preview of the part of the stroke not yet settled
    fn preview(&self) -> &StrokeCurve;

    /// Preview pieces settled since the gesture began
    fn segments(&self) -> &[StrokeCurve];

    /// Run the final fit pass and hand out the finished geometry
    ///
    /// The capture is reset afterwards. An empty curve means the gesture
    /// produced nothing worth keeping.
    fn finish(&mut self, tolerance_sq: f64) -> StrokeCurve;

    /// Number of samples currently in the window
    fn window_len(&self) -> usize;
}

/// Create the capture for `mode`
pub fn capture_for_mode(mode: StrokeMode) -> Box<dyn StrokeCapture> {
    match mode {
        StrokeMode::Line => Box::new(LineCapture::new()),
        StrokeMode::Calligraphic => Box::new(CalligraphicCapture::new()),
    }
}

/// Fixed-capacity run of samples waiting to be fitted
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleWindow {
    points: Vec<Point>,
}

impl SampleWindow {
    pub fn new() -> Self {
        Self {
            points: Vec::with_capacity(SAMPLING_SIZE),
        }
    }

    /// Append a sample; returns `false` if the window is already full
    pub fn push(&mut self, p: Point) -> bool {
        if self.points.len() >= SAMPLING_SIZE {
            debug!("SampleWindow::push: window full, sample dropped");
            return false;
        }
        self.points.push(p);
        true
    }

    /// Keep only the sample at `index`, which becomes the window start
    pub fn restart_from(&mut self, index: usize) {
        if let Some(p) = self.points.get(index).copied() {
            self.points.clear();
            self.points.push(p);
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= SAMPLING_SIZE
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }
}
