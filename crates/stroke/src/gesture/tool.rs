//! The calligraphy tool: pen dynamics feeding a capture mode

use nib_config::{ANGLE_STEP, ConfigError, StrokeMode, ToolSettings, WIDTH_STEP};
use tracing::{debug, info, warn};

use crate::accumulator::{StrokeCapture, capture_for_mode};
use crate::curve::StrokeCurve;
use crate::filter::PenDynamics;
use crate::host::{DocumentError, LayerHandle, NodeHandle, TimerId, ToolContext, View};
use crate::types::{Point, Rect, union_bounds};

use super::{ButtonMask, GestureState, InputEvent, KeyCode, ToolGesture};

/// Freehand calligraphy tool
///
/// Pointer samples go through [`PenDynamics`] and the capture for the
/// configured [`StrokeMode`]; the result is committed to the document when
/// button 1 is released.
pub struct DynaDrawTool {
    settings: ToolSettings,
    pen: PenDynamics,
    capture: Box<dyn StrokeCapture>,
    state: GestureState,
    /// Layer the current gesture draws into
    layer: Option<LayerHandle>,
    /// Path node holding the result, once created
    node: Option<NodeHandle>,
    timer: Option<TimerId>,
    /// At least one sample moved the pen during this gesture
    dragging: bool,
    last_sample_ms: Option<u64>,
    /// Area covered by the preview at the last redraw
    preview_region: Option<Rect>,
}

impl DynaDrawTool {
    pub fn new(settings: ToolSettings) -> Self {
        let capture = capture_for_mode(settings.mode);
        Self {
            settings,
            pen: PenDynamics::new(),
            capture,
            state: GestureState::Idle,
            layer: None,
            node: None,
            timer: None,
            dragging: false,
            last_sample_ms: None,
            preview_region: None,
        }
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    /// Apply one preference entry; a mode change takes effect at the next
    /// gesture
    pub fn set_setting(&mut self, key: &str, value: Option<&str>) -> Result<(), ConfigError> {
        self.settings.set(key, value)?;
        if self.state == GestureState::Idle {
            self.sync_capture_mode();
        }
        Ok(())
    }

    pub fn mode(&self) -> StrokeMode {
        self.capture.mode()
    }

    pub fn pen(&self) -> &PenDynamics {
        &self.pen
    }

    fn sync_capture_mode(&mut self) {
        if self.capture.mode() != self.settings.mode {
            debug!("DynaDrawTool: switching capture to {:?}", self.settings.mode);
            self.capture = capture_for_mode(self.settings.mode);
        }
    }

    fn tolerance_sq(&self, view: &dyn View) -> f64 {
        let tolerance = view.pixel_size() * self.settings.mode.tolerance();
        tolerance * tolerance
    }

    fn label(&self) -> &'static str {
        match self.settings.mode {
            StrokeMode::Line => "Draw freehand line",
            StrokeMode::Calligraphic => "Draw calligraphic stroke",
        }
    }

    fn begin(&mut self, ctx: &mut ToolContext<'_>, point: Point, time_ms: u64) -> bool {
        if self.state != GestureState::Idle {
            debug!("DynaDrawTool::begin: gesture already in progress, ignoring");
            return false;
        }

        let Some(layer) = ctx.document.current_layer() else {
            warn!("No current layer to draw on");
            return true;
        };
        match ctx.document.layer_state(layer) {
            Ok(state) if state.hidden => {
                warn!("Current layer is hidden. Unhide it to be able to draw on it.");
                return true;
            }
            Ok(state) if state.locked => {
                warn!("Current layer is locked. Unlock it to be able to draw on it.");
                return true;
            }
            Ok(_) => {}
            Err(err) => {
                warn!("Cannot draw on current layer: {}", err);
                return true;
            }
        }

        self.sync_capture_mode();
        self.capture.reset();
        let viewport = ctx.view.viewport();
        self.pen.reset(point, viewport);
        self.pen.apply(point, viewport, &self.settings);

        self.layer = Some(layer);
        self.node = None;
        self.dragging = false;
        self.last_sample_ms = Some(time_ms);
        self.preview_region = None;
        self.state = GestureState::Capturing;

        if self.settings.use_timer && self.timer.is_none() {
            self.timer = Some(ctx.timers.start(self.settings.sample_interval_ms));
        }

        info!(
            "Stroke started at ({:.1}, {:.1}) in {:?} mode",
            point.x, point.y, self.settings.mode
        );
        true
    }

    fn motion(
        &mut self,
        ctx: &mut ToolContext<'_>,
        point: Point,
        time_ms: u64,
        buttons: ButtonMask,
    ) -> bool {
        if self.state != GestureState::Capturing
            || self.timer.is_some()
            || !buttons.contains(ButtonMask::BUTTON1)
        {
            return false;
        }

        if self.settings.decimate_moves {
            let elapsed = self.last_sample_ms.map(|last| time_ms.saturating_sub(last));
            if elapsed.is_some_and(|ms| ms < self.settings.sample_interval_ms) {
                return true;
            }
        }

        if self.sample(ctx, point) {
            self.last_sample_ms = Some(time_ms);
        }
        true
    }

    /// Feed one pointer position through the pen and the capture
    fn sample(&mut self, ctx: &mut ToolContext<'_>, point: Point) -> bool {
        let viewport = ctx.view.viewport();
        if !self.pen.apply(point, viewport, &self.settings) {
            return false;
        }
        if self.pen.cur() == self.pen.last() {
            return false;
        }
        self.dragging = true;

        let tolerance_sq = self.tolerance_sq(ctx.view);
        self.capture.add_sample(&self.pen, &self.settings);
        self.state = GestureState::Fitting;
        self.capture.fit_and_split(tolerance_sq);
        self.state = GestureState::Capturing;

        ctx.canvas
            .show_preview(self.capture.preview(), self.capture.segments());
        let region = union_bounds(self.preview_region, self.capture.preview().bounds());
        self.preview_region = self.capture.preview().bounds();
        ctx.canvas.request_redraw(region);
        true
    }

    fn release(&mut self, ctx: &mut ToolContext<'_>, button: u8) -> bool {
        if button != 1 || self.state == GestureState::Idle {
            return false;
        }

        if let Some(timer) = self.timer.take() {
            ctx.timers.cancel(timer);
        }
        ctx.canvas.clear_preview();

        if !std::mem::take(&mut self.dragging) {
            debug!("DynaDrawTool::release: no movement, nothing to commit");
            self.capture.reset();
            self.state = GestureState::Idle;
            return true;
        }

        self.state = GestureState::Committing;
        let tolerance_sq = self.tolerance_sq(ctx.view);
        let outline = self.capture.finish(tolerance_sq);
        let region = union_bounds(self.preview_region.take(), outline.bounds());

        if let Err(err) = self.write_outline(ctx, &outline) {
            warn!("Failed to write stroke to the document: {}", err);
        }
        let label = self.label();
        match ctx.document.commit(label) {
            Ok(()) => info!("{} committed ({} commands)", label, outline.len()),
            Err(err) => warn!("Failed to commit {}: {}", label, err),
        }

        self.node = None;
        self.layer = None;
        self.state = GestureState::Idle;
        ctx.canvas.request_redraw(region);
        true
    }

    /// Create, update or drop the result node for `outline`
    fn write_outline(
        &mut self,
        ctx: &mut ToolContext<'_>,
        outline: &StrokeCurve,
    ) -> Result<(), DocumentError> {
        if outline.is_empty() {
            if let Some(node) = self.node.take() {
                ctx.document.remove_node(node)?;
            }
            return Ok(());
        }

        let node = match self.node {
            Some(node) => node,
            None => {
                let layer = self
                    .layer
                    .or_else(|| ctx.document.current_layer())
                    .ok_or_else(|| DocumentError::Rejected("no current layer".to_string()))?;
                let node = ctx.document.create_path_node(layer, self.capture.mode())?;
                self.node = Some(node);
                node
            }
        };

        let path = outline.transformed(ctx.view.desktop_to_document());
        ctx.document.set_path_data(node, path.elements())
    }

    fn key(&mut self, ctx: &mut ToolContext<'_>, code: KeyCode) -> bool {
        match code {
            KeyCode::Up => self.settings.nudge_angle(ANGLE_STEP),
            KeyCode::Down => self.settings.nudge_angle(-ANGLE_STEP),
            KeyCode::Right => self.settings.nudge_width(WIDTH_STEP),
            KeyCode::Left => self.settings.nudge_width(-WIDTH_STEP),
            KeyCode::Escape => {
                let active = self.state != GestureState::Idle;
                self.cancel(ctx);
                return active;
            }
            KeyCode::Other(_) => return false,
        }
        debug!(
            "DynaDrawTool: angle={} width={:.2}",
            self.settings.angle, self.settings.width
        );
        true
    }
}

impl ToolGesture for DynaDrawTool {
    fn handle_event(&mut self, ctx: &mut ToolContext<'_>, event: &InputEvent) -> bool {
        match *event {
            InputEvent::Begin {
                point,
                time_ms,
                button,
            } => button == 1 && self.begin(ctx, point, time_ms),
            InputEvent::Move {
                point,
                time_ms,
                buttons,
            } => self.motion(ctx, point, time_ms, buttons),
            InputEvent::End { button, .. } => self.release(ctx, button),
            InputEvent::Key { code } => self.key(ctx, code),
        }
    }

    fn on_timer(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        if self.state != GestureState::Capturing || self.timer.is_none() {
            return false;
        }
        match ctx.view.pointer() {
            Some(point) => self.sample(ctx, point),
            None => false,
        }
    }

    fn cancel(&mut self, ctx: &mut ToolContext<'_>) {
        if let Some(timer) = self.timer.take() {
            ctx.timers.cancel(timer);
        }
        if let Some(node) = self.node.take() {
            if let Err(err) = ctx.document.remove_node(node) {
                warn!("Failed to detach stroke node on cancel: {}", err);
            }
        }
        if self.state != GestureState::Idle {
            ctx.canvas.clear_preview();
            ctx.canvas.request_redraw(self.preview_region.take());
            info!("Stroke cancelled");
        }

        self.capture.reset();
        self.dragging = false;
        self.layer = None;
        self.last_sample_ms = None;
        self.state = GestureState::Idle;
    }

    fn state(&self) -> GestureState {
        self.state
    }
}
