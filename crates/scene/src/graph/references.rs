//! Non-owning references between nodes and release notification
//!
//! A reference is a pair of entries: the target keeps a [`Subscription`] for
//! the referencing node, and the referencing node remembers the target. Both
//! sides are cleaned up when either node is released, so no handle outlives
//! its slot.

use tracing::debug;

use super::SceneGraph;
use crate::arena::NodeId;
use crate::error::SceneError;
use crate::node::{NodeKind, Paint, ReferenceRole, Subscription};

impl SceneGraph {
    /// Make `clone` render `source`
    pub fn link_clone(&mut self, clone: NodeId, source: NodeId) -> Result<(), SceneError> {
        if !matches!(self.get(clone)?.kind, NodeKind::Clone { .. }) {
            return Err(SceneError::NotAClone(clone));
        }
        if matches!(self.get(source)?.kind, NodeKind::Gradient { .. }) {
            return Err(SceneError::ReferenceRefused {
                owner: clone,
                target: source,
            });
        }
        self.accept_reference(clone, source)?;

        self.replace_reference(clone, ReferenceRole::CloneSource, Some(source))?;
        if let NodeKind::Clone { source: slot } = &mut self.get_mut(clone)?.kind {
            *slot = Some(source);
        }
        self.request_update(clone, ReferenceRole::CloneSource.dirty_flags())
    }

    pub fn unlink_clone(&mut self, clone: NodeId) -> Result<(), SceneError> {
        if !matches!(self.get(clone)?.kind, NodeKind::Clone { .. }) {
            return Err(SceneError::NotAClone(clone));
        }
        self.replace_reference(clone, ReferenceRole::CloneSource, None)?;
        if let NodeKind::Clone { source } = &mut self.get_mut(clone)?.kind {
            *source = None;
        }
        self.request_update(clone, ReferenceRole::CloneSource.dirty_flags())
    }

    /// Fill `owner` from the gradient `server`
    pub fn set_fill_server(&mut self, owner: NodeId, server: NodeId) -> Result<(), SceneError> {
        self.set_paint_server(owner, server, ReferenceRole::FillServer)
    }

    /// Stroke `owner` with the gradient `server`
    pub fn set_stroke_server(&mut self, owner: NodeId, server: NodeId) -> Result<(), SceneError> {
        self.set_paint_server(owner, server, ReferenceRole::StrokeServer)
    }

    fn set_paint_server(
        &mut self,
        owner: NodeId,
        server: NodeId,
        role: ReferenceRole,
    ) -> Result<(), SceneError> {
        self.check_paint_server(owner, server)?;
        self.replace_reference(owner, role, Some(server))?;

        let style = &mut self.get_mut(owner)?.style;
        match role {
            ReferenceRole::StrokeServer => style.stroke = Paint::Server(server),
            _ => style.fill = Paint::Server(server),
        }
        self.request_update(owner, role.dirty_flags())
    }

    pub(crate) fn check_paint_server(
        &self,
        owner: NodeId,
        server: NodeId,
    ) -> Result<(), SceneError> {
        self.get(owner)?;
        if !matches!(self.get(server)?.kind, NodeKind::Gradient { .. }) {
            return Err(SceneError::NotAPaintServer(server));
        }
        self.accept_reference(owner, server)
    }

    /// Refuse references from a node to itself or to one of its ancestors
    pub fn accept_reference(&self, owner: NodeId, target: NodeId) -> Result<(), SceneError> {
        self.get(owner)?;
        self.get(target)?;
        if target == owner || self.is_ancestor(target, owner) {
            return Err(SceneError::ReferenceRefused { owner, target });
        }
        Ok(())
    }

    /// Point `owner`'s reference for `role` at `target`, dropping any old one
    pub(crate) fn replace_reference(
        &mut self,
        owner: NodeId,
        role: ReferenceRole,
        target: Option<NodeId>,
    ) -> Result<(), SceneError> {
        let previous = self
            .get(owner)?
            .references
            .iter()
            .find(|(_, r)| *r == role)
            .map(|(t, _)| *t);
        if previous == target {
            return Ok(());
        }

        if let Some(old) = previous {
            self.unsubscribe(owner, old, role);
        }
        if let Some(new) = target {
            self.get_mut(new)?.subscribers.push(Subscription {
                subscriber: owner,
                role,
            });
            self.get_mut(owner)?.references.push((new, role));
        }
        Ok(())
    }

    fn unsubscribe(&mut self, owner: NodeId, target: NodeId, role: ReferenceRole) {
        if let Some(node) = self.nodes.get_mut(target) {
            node.subscribers
                .retain(|s| !(s.subscriber == owner && s.role == role));
        }
        if let Some(node) = self.nodes.get_mut(owner) {
            node.references.retain(|(t, r)| !(*t == target && *r == role));
        }
    }

    /// Release a detached subtree children first
    pub(crate) fn release_subtree(&mut self, id: NodeId) {
        let children = match self.nodes.get(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.release_subtree(child);
        }
        self.release_node(id);
    }

    fn release_node(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let subscribers = std::mem::take(&mut node.subscribers);
        let references = std::mem::take(&mut node.references);

        for subscription in subscribers {
            self.drop_reference(subscription.subscriber, id, subscription.role);
        }
        for (target, role) in references {
            self.unsubscribe(id, target, role);
        }

        self.dispatch(|observer, _| observer.node_released(id));
        self.nodes.remove(id);
        debug!("SceneGraph::release_node: {:?}", id);
    }

    /// `target` is going away: clear whatever `subscriber` holds of it
    fn drop_reference(&mut self, subscriber: NodeId, target: NodeId, role: ReferenceRole) {
        let Some(node) = self.nodes.get_mut(subscriber) else {
            return;
        };
        node.references
            .retain(|(t, r)| !(*t == target && *r == role));

        match role {
            ReferenceRole::CloneSource => {
                if let NodeKind::Clone { source } = &mut node.kind {
                    if *source == Some(target) {
                        *source = None;
                    }
                }
            }
            ReferenceRole::FillServer => {
                if node.style.fill == Paint::Server(target) {
                    node.style.fill = Paint::None;
                }
            }
            ReferenceRole::StrokeServer => {
                if node.style.stroke == Paint::Server(target) {
                    node.style.stroke = Paint::None;
                }
            }
        }

        if let Err(err) = self.request_update(subscriber, role.dirty_flags()) {
            debug!("SceneGraph::drop_reference: skipping subscriber: {}", err);
        }
    }
}
