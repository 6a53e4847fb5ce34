//! Tree edits and attribute setters
//!
//! Every setter stores the new value and marks the node dirty; nothing is
//! recomputed until the next update pass.

use stroke::{Affine, BezPath};
use tracing::debug;

use super::SceneGraph;
use crate::arena::NodeId;
use crate::error::SceneError;
use crate::flags::DirtyFlags;
use crate::node::{NodeKind, ReferenceRole, SceneNode, Style};

impl SceneGraph {
    /// Create a node of `kind` as the last child of `parent`
    pub fn add_child(&mut self, parent: NodeId, kind: NodeKind) -> Result<NodeId, SceneError> {
        if !self.get(parent)?.kind.is_group() {
            return Err(SceneError::NotAGroup(parent));
        }
        // Clone sources are registered through link_clone
        let (kind, source) = match kind {
            NodeKind::Clone { source } => (NodeKind::Clone { source: None }, source),
            kind => (kind, None),
        };

        let id = self.nodes.insert(SceneNode::new(kind, Some(parent)));
        self.get_mut(parent)?.children.push(id);
        debug!("SceneGraph::add_child: {:?} under {:?}", id, parent);

        self.request_update(parent, DirtyFlags::STRUCTURE | DirtyFlags::BBOX)?;
        self.request_update(id, DirtyFlags::GEOMETRY | DirtyFlags::STYLE | DirtyFlags::BBOX)?;

        if let Some(source) = source {
            if let Err(err) = self.link_clone(id, source) {
                self.remove(id)?;
                return Err(err);
            }
        }
        Ok(id)
    }

    pub fn add_layer(&mut self, parent: NodeId) -> Result<NodeId, SceneError> {
        self.add_child(parent, NodeKind::Group { layer: true })
    }

    pub fn set_path(&mut self, id: NodeId, path: BezPath) -> Result<(), SceneError> {
        match &mut self.get_mut(id)?.kind {
            NodeKind::Path { path: current } => *current = path,
            _ => return Err(SceneError::NotAPath(id)),
        }
        self.request_update(id, DirtyFlags::GEOMETRY | DirtyFlags::BBOX)
    }

    /// Replace the style, re-registering any paint server references
    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<(), SceneError> {
        for server in [style.fill.server(), style.stroke.server()].into_iter().flatten() {
            self.check_paint_server(id, server)?;
        }

        self.replace_reference(id, ReferenceRole::FillServer, style.fill.server())?;
        self.replace_reference(id, ReferenceRole::StrokeServer, style.stroke.server())?;
        self.get_mut(id)?.style = style;
        self.request_update(id, DirtyFlags::STYLE)
    }

    pub fn set_transform(&mut self, id: NodeId, transform: Affine) -> Result<(), SceneError> {
        self.get_mut(id)?.transform = transform;
        self.request_update(id, DirtyFlags::GEOMETRY | DirtyFlags::BBOX)
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        if node.hidden == hidden {
            return Ok(());
        }
        node.hidden = hidden;
        self.request_update(id, DirtyFlags::STYLE | DirtyFlags::BBOX)
    }

    pub fn set_locked(&mut self, id: NodeId, locked: bool) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        if node.locked == locked {
            return Ok(());
        }
        node.locked = locked;
        self.request_update(id, DirtyFlags::STYLE)
    }

    /// The node or one of its ancestors is hidden
    pub fn is_effectively_hidden(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| self.nodes.get(n).is_some_and(|node| node.hidden))
    }

    /// The node or one of its ancestors is locked
    pub fn is_effectively_locked(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .any(|n| self.nodes.get(n).is_some_and(|node| node.locked))
    }

    /// Detach `id` and free it with its whole subtree
    ///
    /// Nodes referencing anything in the subtree are told before the slots
    /// are reclaimed and drop their reference.
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        if id == self.root {
            return Err(SceneError::RemoveRoot);
        }
        let node = self.get(id)?;
        let parent = node.parent;
        let bbox = node.bbox;

        if let Some(pid) = parent {
            self.get_mut(pid)?.children.retain(|c| *c != id);
        }
        self.add_damage(bbox);
        self.release_subtree(id);

        if let Some(pid) = parent {
            self.request_update(pid, DirtyFlags::STRUCTURE | DirtyFlags::BBOX)?;
        }
        debug!("SceneGraph::remove: {:?} released", id);
        Ok(())
    }
}
