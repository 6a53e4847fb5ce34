//! Pen dynamics: the physical model that smooths raw pointer samples
//!
//! The pen is a mass on a spring pulled towards the pointer and slowed by
//! drag. Positions are integrated in a unit square derived from the viewport
//! so the feel of the tool does not depend on zoom or window size.

use std::f64::consts::{FRAC_PI_2, PI};

use nib_config::ToolSettings;
use tracing::debug;

use crate::constants::{DRAG_RANGE, DYNA_EPSILON, MASS_RANGE};
use crate::types::{Point, Rect, Vec2};

/// Linear interpolation between `from` and `to`
#[inline]
pub fn flerp(from: f64, to: f64, t: f64) -> f64 {
    from + t * (to - from)
}

/// Smoothed pen state for one gesture
#[derive(Debug, Clone, PartialEq)]
pub struct PenDynamics {
    /// Current position (normalized)
    cur: Point,
    /// Position before the last accepted step (normalized)
    last: Point,
    vel: Vec2,
    acc: Vec2,
    /// Unit nib direction
    ang: Vec2,
    /// Viewport used to (de)normalize the current gesture
    viewport: Rect,
}

impl Default for PenDynamics {
    fn default() -> Self {
        Self {
            cur: Point::ZERO,
            last: Point::ZERO,
            vel: Vec2::ZERO,
            acc: Vec2::ZERO,
            ang: Vec2::ZERO,
            viewport: Rect::new(0.0, 0.0, 1.0, 1.0),
        }
    }
}

impl PenDynamics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put the pen at rest on `raw` (desktop coordinates)
    pub fn reset(&mut self, raw: Point, viewport: Rect) {
        self.viewport = viewport;
        self.cur = self.normalize(raw);
        self.last = self.cur;
        self.vel = Vec2::ZERO;
        self.acc = Vec2::ZERO;
        self.ang = Vec2::ZERO;
    }

    /// Pull the pen towards `raw` for one time step
    ///
    /// Returns `false` when the sample produces no movement (the pointer is
    /// already under the pen, or the pen has come to rest); the caller skips
    /// the sample in that case.
    pub fn apply(&mut self, raw: Point, viewport: Rect, settings: &ToolSettings) -> bool {
        self.viewport = viewport;
        let target = self.normalize(raw);

        let mass = flerp(MASS_RANGE.0, MASS_RANGE.1, settings.mass);
        let drag = flerp(DRAG_RANGE.0, DRAG_RANGE.1, settings.drag * settings.drag);

        let force = target - self.cur;
        if force.hypot() < DYNA_EPSILON {
            return false;
        }

        self.acc = force / mass;
        self.vel += self.acc;

        let speed = self.vel.hypot();
        if speed < DYNA_EPSILON {
            return false;
        }

        self.ang = nib_direction(fixed_nib_angle(settings.angle), self.vel, settings.flatness);

        self.vel *= 1.0 - drag;
        self.last = self.cur;
        self.cur += self.vel;

        debug!(
            "PenDynamics::apply: cur=({:.5}, {:.5}) speed={:.6}",
            self.cur.x, self.cur.y, speed
        );
        true
    }

    /// Map a desktop point into the unit square of the viewport
    pub fn normalize(&self, p: Point) -> Point {
        ((p - self.viewport.origin()) / self.scale()).to_point()
    }

    /// Map a normalized point back to desktop coordinates
    pub fn denormalize(&self, n: Point) -> Point {
        self.viewport.origin() + n.to_vec2() * self.scale()
    }

    /// Current pen position in desktop coordinates
    pub fn current_view_point(&self) -> Point {
        self.denormalize(self.cur)
    }

    pub fn cur(&self) -> Point {
        self.cur
    }

    pub fn last(&self) -> Point {
        self.last
    }

    pub fn vel(&self) -> Vec2 {
        self.vel
    }

    pub fn acc(&self) -> Vec2 {
        self.acc
    }

    pub fn ang(&self) -> Vec2 {
        self.ang
    }

    fn scale(&self) -> f64 {
        let extent = self.viewport.width().max(self.viewport.height());
        if extent > 0.0 && extent.is_finite() {
            extent
        } else {
            1.0
        }
    }
}

/// Angle (radians) of the nib when it keeps its fixed orientation
///
/// `degrees` is the tool angle setting, measured so that 0 is horizontal.
pub fn fixed_nib_angle(degrees: f64) -> f64 {
    let radians = (degrees - 90.0) / 180.0 * PI;
    Vec2::new(-radians.sin(), radians.cos()).atan2()
}

/// Blend the fixed nib angle `a1` with the direction across the motion
///
/// Both candidates describe an undirected nib, so the perpendicular is
/// brought into the same half circle as `a1` before blending and the flip is
/// undone afterwards. `flatness` of 1 keeps `a1`, 0 follows the motion.
pub fn nib_direction(a1: f64, vel: Vec2, flatness: f64) -> Vec2 {
    let mut a2 = Vec2::new(-vel.y, vel.x).atan2();

    let mut flipped = false;
    if (a2 - a1).abs() > FRAC_PI_2 {
        a2 += PI;
        flipped = true;
    }
    if a2 > PI {
        a2 -= 2.0 * PI;
    }
    if a2 < -PI {
        a2 += 2.0 * PI;
    }

    let angle = a1 + (1.0 - flatness) * (a2 - a1) - if flipped { PI } else { 0.0 };
    Vec2::from_angle(angle)
}
