//! Collaborators the stroke tool talks to
//!
//! The tool never owns the document, the canvas or the view. It reaches them
//! through these traits, bundled per call in a [`ToolContext`], so the same
//! tool drives a real editor, the scene graph adapter or a test fake.

use nib_config::StrokeMode;
use thiserror::Error;

use crate::curve::StrokeCurve;
use crate::types::{Affine, PathEl, Point, Rect};

/// Opaque handle of a document node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub u64);

/// Opaque handle of a layer (a node that can own drawn paths)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerHandle(pub u64);

/// Handle of a running periodic timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u32);

/// Whether a layer accepts new drawing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LayerState {
    pub hidden: bool,
    pub locked: bool,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unknown layer {0:?}")]
    UnknownLayer(LayerHandle),
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeHandle),
    #[error("Layer {0:?} does not accept new nodes")]
    LayerRejected(LayerHandle),
    #[error("Document rejected the change: {0}")]
    Rejected(String),
}

/// The document model the finished stroke is written into
pub trait Document {
    /// Layer new drawing goes into, if any
    fn current_layer(&self) -> Option<LayerHandle>;

    fn layer_state(&self, layer: LayerHandle) -> Result<LayerState, DocumentError>;

    /// Create an empty path node owned by `layer`
    ///
    /// `mode` tells how the path will be painted: line strokes are outlined,
    /// calligraphic outlines are filled.
    fn create_path_node(
        &mut self,
        layer: LayerHandle,
        mode: StrokeMode,
    ) -> Result<NodeHandle, DocumentError>;

    /// Replace the geometry of a path node (document coordinates)
    fn set_path_data(
        &mut self,
        node: NodeHandle,
        elements: &[PathEl],
    ) -> Result<(), DocumentError>;

    /// Detach a node from the document
    fn remove_node(&mut self, node: NodeHandle) -> Result<(), DocumentError>;

    /// Close the transaction of one gesture
    fn commit(&mut self, label: &str) -> Result<(), DocumentError>;
}

/// The rendering surface showing the live preview
pub trait Canvas {
    /// Repaint `region` (desktop coordinates), or everything for `None`
    fn request_redraw(&mut self, region: Option<Rect>);

    /// Show the unsettled preview curve and the settled preview pieces
    fn show_preview(&mut self, current: &StrokeCurve, settled: &[StrokeCurve]);

    fn clear_preview(&mut self);
}

/// Geometry of the window the user draws in
pub trait View {
    /// Visible area in desktop coordinates
    fn viewport(&self) -> Rect;

    /// Size of one screen pixel in desktop units
    fn pixel_size(&self) -> f64;

    fn desktop_to_document(&self) -> Affine;

    /// Current pointer position in desktop coordinates
    fn pointer(&self) -> Option<Point>;
}

/// Periodic callbacks used by timer-driven sampling
pub trait Timers {
    fn start(&mut self, interval_ms: u64) -> TimerId;

    fn cancel(&mut self, id: TimerId);
}

/// Everything a tool may touch while handling one event
pub struct ToolContext<'a> {
    pub document: &'a mut dyn Document,
    pub canvas: &'a mut dyn Canvas,
    pub view: &'a dyn View,
    pub timers: &'a mut dyn Timers,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        document: &'a mut dyn Document,
        canvas: &'a mut dyn Canvas,
        view: &'a dyn View,
        timers: &'a mut dyn Timers,
    ) -> Self {
        Self {
            document,
            canvas,
            view,
            timers,
        }
    }
}
