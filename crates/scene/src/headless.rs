//! In-memory canvas, view and timers for running the tool without a window

use stroke::{Affine, Canvas, Point, Rect, StrokeCurve, TimerId, Timers, View, union_bounds};
use tracing::debug;

/// Canvas that records what it was asked to show
#[derive(Debug, Default)]
pub struct HeadlessCanvas {
    pub redraws: usize,
    pub previews: usize,
    pub clears: usize,
    /// Union of every region requested so far (`None` once a full redraw was asked)
    pub damage: Option<Rect>,
    full_redraw: bool,
}

impl HeadlessCanvas {
    /// A full-canvas redraw was requested
    pub fn full_redraw(&self) -> bool {
        self.full_redraw
    }
}

impl Canvas for HeadlessCanvas {
    fn request_redraw(&mut self, region: Option<Rect>) {
        self.redraws += 1;
        match region {
            Some(rect) if !self.full_redraw => {
                self.damage = union_bounds(self.damage, Some(rect));
            }
            Some(_) => {}
            None => {
                self.full_redraw = true;
                self.damage = None;
            }
        }
    }

    fn show_preview(&mut self, current: &StrokeCurve, settled: &[StrokeCurve]) {
        self.previews += 1;
        debug!(
            "HeadlessCanvas: preview {} commands, {} settled pieces",
            current.len(),
            settled.len()
        );
    }

    fn clear_preview(&mut self) {
        self.clears += 1;
    }
}

/// Fixed viewport mapping desktop to document coordinates
#[derive(Debug, Clone)]
pub struct HeadlessView {
    pub viewport: Rect,
    pub pixel_size: f64,
    pub to_document: Affine,
    /// Pointer position reported to timer-driven sampling
    pub pointer: Option<Point>,
}

impl HeadlessView {
    pub fn new(viewport: Rect) -> Self {
        Self {
            viewport,
            pixel_size: 1.0,
            to_document: Affine::IDENTITY,
            pointer: None,
        }
    }
}

impl View for HeadlessView {
    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    fn desktop_to_document(&self) -> Affine {
        self.to_document
    }

    fn pointer(&self) -> Option<Point> {
        self.pointer
    }
}

/// Timers that only fire when the caller ticks them
#[derive(Debug, Default)]
pub struct ManualTimers {
    next: u32,
    active: Vec<(TimerId, u64)>,
}

impl ManualTimers {
    pub fn active(&self) -> impl Iterator<Item = TimerId> + '_ {
        self.active.iter().map(|(id, _)| *id)
    }

    pub fn is_running(&self) -> bool {
        !self.active.is_empty()
    }

    /// Interval of a running timer
    pub fn interval_ms(&self, id: TimerId) -> Option<u64> {
        self.active
            .iter()
            .find(|(timer, _)| *timer == id)
            .map(|(_, ms)| *ms)
    }
}

impl Timers for ManualTimers {
    fn start(&mut self, interval_ms: u64) -> TimerId {
        self.next += 1;
        let id = TimerId(self.next);
        self.active.push((id, interval_ms));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.active.retain(|(timer, _)| *timer != id);
    }
}
