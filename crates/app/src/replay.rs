//! Drive the calligraphy tool with a recorded gesture

use nib_config::{StrokeMode, ToolSettings};
use nib_scene::{
    HeadlessCanvas, HeadlessView, ManualTimers, NodeId, SceneDocument, UpdateError,
};
use serde::Serialize;
use stroke::{
    ButtonMask, DynaDrawTool, InputEvent, PathEl, Point, Rect, ToolContext, ToolGesture, Vec2,
    union_bounds,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Document has no current layer")]
    NoLayer,
}

/// What one replayed gesture left in the document
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub mode: StrokeMode,
    pub events: usize,
    /// Path node created by the gesture
    pub node: Option<NodeId>,
    pub elements: Vec<PathEl>,
    /// Update passes run while replaying
    pub passes: u64,
    pub aborted: u64,
    /// Area the render layer would have repainted
    pub damage: Option<Rect>,
}

/// Press, drag along an S-curve, release
pub fn synthetic_gesture(origin: Point, samples: usize) -> Vec<InputEvent> {
    let samples = samples.max(1);
    let at = |i: usize| {
        let t = i as f64 / samples as f64;
        origin + Vec2::new(300.0 * t, 80.0 * (t * std::f64::consts::TAU).sin())
    };

    let mut events = Vec::with_capacity(samples + 2);
    events.push(InputEvent::Begin {
        point: at(0),
        time_ms: 0,
        button: 1,
    });
    for i in 1..=samples {
        events.push(InputEvent::Move {
            point: at(i),
            time_ms: i as u64 * 12,
            buttons: ButtonMask::BUTTON1,
        });
    }
    events.push(InputEvent::End {
        point: at(samples),
        time_ms: (samples as u64 + 1) * 12,
        button: 1,
    });
    events
}

/// Feed `events` to a fresh tool drawing into `document`
///
/// The scene's pending update runs after every event, as an event loop's idle
/// handler would. In timer mode moves only update the pointer and each one
/// is followed by a timer tick.
pub fn replay(
    document: &mut SceneDocument,
    settings: ToolSettings,
    events: &[InputEvent],
) -> Result<ReplayReport, ReplayError> {
    let layer = document.layer().ok_or(ReplayError::NoLayer)?;
    let before = document.paths_in(layer);
    let stats_before = document.graph().stats();

    let mode = settings.mode;
    let mut tool = DynaDrawTool::new(settings);
    let mut canvas = HeadlessCanvas::default();
    let mut view = HeadlessView::new(Rect::new(0.0, 0.0, 1024.0, 768.0));
    let mut timers = ManualTimers::default();
    let mut damage = None;

    for event in events {
        match *event {
            InputEvent::Move { point, .. } if timers.is_running() => {
                view.pointer = Some(point);
                let mut ctx = ToolContext::new(&mut *document, &mut canvas, &view, &mut timers);
                tool.on_timer(&mut ctx);
            }
            _ => {
                let mut ctx = ToolContext::new(&mut *document, &mut canvas, &view, &mut timers);
                tool.handle_event(&mut ctx, event);
            }
        }

        let graph = document.graph_mut();
        match graph.run_pending() {
            Ok(_) => damage = union_bounds(damage, graph.take_damage()),
            Err(UpdateError::NoConvergence { iterations }) => {
                warn!("replay: update gave up after {} iterations", iterations)
            }
        }
    }

    let node = document
        .paths_in(layer)
        .into_iter()
        .find(|id| !before.contains(id));
    let elements = node
        .and_then(|id| document.graph().node(id))
        .and_then(|n| n.path_elements())
        .map(<[PathEl]>::to_vec)
        .unwrap_or_default();
    let stats = document.graph().stats();

    debug!(
        "replay: {} previews, {} redraws",
        canvas.previews, canvas.redraws
    );
    info!(
        "Replayed {:?} gesture: {} events, {} path elements",
        mode,
        events.len(),
        elements.len()
    );

    Ok(ReplayReport {
        mode,
        events: events.len(),
        node,
        elements,
        passes: stats.passes - stats_before.passes,
        aborted: stats.aborted - stats_before.aborted,
        damage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nib_config::SceneSettings;

    fn document() -> SceneDocument {
        SceneDocument::new(SceneSettings::default()).unwrap()
    }

    #[test]
    fn test_synthetic_gesture_shape() {
        let events = synthetic_gesture(Point::new(10.0, 20.0), 30);
        assert_eq!(events.len(), 32);
        assert!(matches!(events[0], InputEvent::Begin { button: 1, .. }));
        assert!(matches!(events[31], InputEvent::End { button: 1, .. }));
    }

    #[test]
    fn test_replay_both_modes_into_one_document() {
        let mut document = document();
        let events = synthetic_gesture(Point::new(200.0, 300.0), 48);

        let line = replay(
            &mut document,
            ToolSettings::with_mode(StrokeMode::Line),
            &events,
        )
        .unwrap();
        assert!(line.node.is_some());
        assert!(!line.elements.contains(&PathEl::ClosePath));
        assert!(line.passes > 0);
        assert_eq!(line.aborted, 0);

        let calligraphic = replay(&mut document, ToolSettings::default(), &events).unwrap();
        assert!(calligraphic.node.is_some());
        assert_ne!(calligraphic.node, line.node);
        assert_eq!(calligraphic.elements.last(), Some(&PathEl::ClosePath));
        assert!(calligraphic.damage.is_some());

        let layer = document.layer().unwrap();
        assert_eq!(document.paths_in(layer).len(), 2);
        assert_eq!(document.history().len(), 2);
    }

    #[test]
    fn test_replay_in_timer_mode() {
        let mut document = document();
        let mut settings = ToolSettings::default();
        settings.use_timer = true;
        let events = synthetic_gesture(Point::new(200.0, 300.0), 40);

        let report = replay(&mut document, settings, &events).unwrap();
        assert!(report.node.is_some());
        assert_eq!(report.elements.last(), Some(&PathEl::ClosePath));
    }

    #[test]
    fn test_click_creates_nothing() {
        let mut document = document();
        let events = synthetic_gesture(Point::new(200.0, 300.0), 1);
        let click = [events[0], events[2]];
        let report = replay(&mut document, ToolSettings::default(), &click).unwrap();
        assert!(report.node.is_none());
        assert!(report.elements.is_empty());
        assert!(document.history().is_empty());
    }
}
