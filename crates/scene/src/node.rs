//! Scene node data

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use stroke::{Affine, BezPath, PathEl, Rect};

use crate::arena::NodeId;
use crate::flags::DirtyFlags;

/// One colour stop of a gradient paint server
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f64,
    /// Linear RGBA
    pub color: [f32; 4],
}

/// How an area is painted
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Paint {
    #[default]
    None,
    Color([f32; 4]),
    /// Paint from another node (a gradient)
    Server(NodeId),
}

impl Paint {
    pub fn server(&self) -> Option<NodeId> {
        match *self {
            Paint::Server(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub fill: Paint,
    pub stroke: Paint,
    pub stroke_width: f64,
    pub opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Paint::Color([0.0, 0.0, 0.0, 1.0]),
            stroke: Paint::None,
            stroke_width: 1.0,
            opacity: 1.0,
        }
    }
}

impl Style {
    /// Black fill, no outline; how calligraphic outlines are painted
    pub fn filled() -> Self {
        Self::default()
    }

    /// Black one-unit outline, no fill; how freehand lines are painted
    pub fn stroked() -> Self {
        Self {
            fill: Paint::None,
            stroke: Paint::Color([0.0, 0.0, 0.0, 1.0]),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Container; layers are groups new drawing can go into
    Group { layer: bool },
    Path { path: BezPath },
    /// Renders another node at this node's transform
    Clone { source: Option<NodeId> },
    Gradient { stops: Vec<GradientStop> },
}

impl NodeKind {
    pub fn is_group(&self) -> bool {
        matches!(self, NodeKind::Group { .. })
    }

    pub fn is_layer(&self) -> bool {
        matches!(self, NodeKind::Group { layer: true })
    }
}

/// Why a node holds a reference to another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceRole {
    CloneSource,
    FillServer,
    StrokeServer,
}

impl ReferenceRole {
    /// What the referencing node must recompute when its target changes
    pub fn dirty_flags(self) -> DirtyFlags {
        match self {
            ReferenceRole::CloneSource => DirtyFlags::GEOMETRY | DirtyFlags::BBOX,
            ReferenceRole::FillServer | ReferenceRole::StrokeServer => DirtyFlags::STYLE,
        }
    }
}

/// A node listening for modified/released events of the slot it is stored on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    pub subscriber: NodeId,
    pub role: ReferenceRole,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub(crate) kind: NodeKind,
    pub(crate) style: Style,
    pub(crate) transform: Affine,
    pub(crate) hidden: bool,
    pub(crate) locked: bool,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) update_flags: DirtyFlags,
    pub(crate) modified_flags: DirtyFlags,
    pub(crate) world_transform: Affine,
    pub(crate) bbox: Option<Rect>,
    pub(crate) opacity: f64,
    /// Nodes referencing this one
    pub(crate) subscribers: SmallVec<[Subscription; 2]>,
    /// Nodes this one references
    pub(crate) references: SmallVec<[(NodeId, ReferenceRole); 2]>,
}

impl SceneNode {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            style: Style::default(),
            transform: Affine::IDENTITY,
            hidden: false,
            locked: false,
            parent,
            children: Vec::new(),
            update_flags: DirtyFlags::empty(),
            modified_flags: DirtyFlags::empty(),
            world_transform: Affine::IDENTITY,
            bbox: None,
            opacity: 1.0,
            subscribers: SmallVec::new(),
            references: SmallVec::new(),
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn update_flags(&self) -> DirtyFlags {
        self.update_flags
    }

    pub fn modified_flags(&self) -> DirtyFlags {
        self.modified_flags
    }

    pub fn is_dirty(&self) -> bool {
        !(self.update_flags | self.modified_flags).is_empty()
    }

    /// Transform to document space as of the last update pass
    pub fn world_transform(&self) -> Affine {
        self.world_transform
    }

    /// Bounding box in document space as of the last update pass
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox
    }

    /// Opacity multiplied down from the root
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn subscribers(&self) -> &[Subscription] {
        &self.subscribers
    }

    pub fn path_elements(&self) -> Option<&[PathEl]> {
        match &self.kind {
            NodeKind::Path { path } => Some(path.elements()),
            _ => None,
        }
    }

    pub fn clone_source(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Clone { source } => source,
            _ => None,
        }
    }
}
