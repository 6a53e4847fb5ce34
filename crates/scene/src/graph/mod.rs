//! The retained scene graph and its update scheduler
//!
//! Mutations only mark nodes dirty and request a pending update. The event
//! loop later calls [`SceneGraph::run_pending`], which runs update and
//! modified passes until the root is clean again (see `update.rs`).
//!
//! Split across submodules:
//! - `mutate.rs` - Tree edits and attribute setters
//! - `update.rs` - Update and modified passes, convergence bound
//! - `references.rs` - Clone/paint-server references and release

mod mutate;
mod references;
mod update;

use nib_config::SceneSettings;
use stroke::{Affine, Rect, union_bounds};
use tracing::debug;

use crate::arena::{Arena, NodeId};
use crate::error::SceneError;
use crate::flags::DirtyFlags;
use crate::node::{NodeKind, SceneNode};
use crate::observer::{ObserverId, SceneObserver};

/// The one deferred update a graph may have outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UpdateToken(pub u64);

/// Counters kept by the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateStats {
    /// Tokens handed out
    pub scheduled: u64,
    /// Update/modified iterations run
    pub passes: u64,
    /// Updates given up on for not converging
    pub aborted: u64,
}

pub struct SceneGraph {
    nodes: Arena<SceneNode>,
    root: NodeId,
    settings: SceneSettings,
    pending: Option<UpdateToken>,
    next_token: u64,
    damage: Option<Rect>,
    stats: UpdateStats,
    observers: Vec<(ObserverId, Box<dyn SceneObserver>)>,
    next_observer: u32,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(SceneSettings::default())
    }
}

impl SceneGraph {
    pub fn new(settings: SceneSettings) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.insert(SceneNode::new(NodeKind::Group { layer: false }, None));
        Self {
            nodes,
            root,
            settings,
            pending: None,
            next_token: 0,
            damage: None,
            stats: UpdateStats::default(),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn settings(&self) -> &SceneSettings {
        &self.settings
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Like [`Self::node`] but failing on a stale handle
    pub fn get(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::StaleHandle(id))
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::StaleHandle(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.nodes.iter()
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.nodes.get(id).and_then(|n| n.parent), move |&p| {
            self.nodes.get(p).and_then(|n| n.parent)
        })
    }

    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Transform from `id`'s coordinates to document space
    ///
    /// Composed from the current local transforms, so it is correct even
    /// while an update is pending.
    pub fn composed_transform(&self, id: NodeId) -> Result<Affine, SceneError> {
        let node = self.get(id)?;
        Ok(self
            .ancestors(id)
            .filter_map(|a| self.nodes.get(a))
            .fold(node.transform, |acc, ancestor| ancestor.transform * acc))
    }

    /// Mark `flags` stale on `id` and every ancestor, then request an update
    ///
    /// The walk stops at the first ancestor that already carries all of
    /// `flags`, since everything above it does too.
    pub fn request_update(&mut self, id: NodeId, flags: DirtyFlags) -> Result<(), SceneError> {
        let node = self.get_mut(id)?;
        node.update_flags |= flags;
        let mut parent = node.parent;

        while let Some(pid) = parent {
            let Some(p) = self.nodes.get_mut(pid) else {
                break;
            };
            if p.update_flags.contains(flags) {
                break;
            }
            p.update_flags |= flags;
            parent = p.parent;
        }

        self.schedule();
        Ok(())
    }

    /// Hand out the update token unless one is already outstanding
    fn schedule(&mut self) {
        if self.pending.is_some() {
            return;
        }
        self.next_token += 1;
        let token = UpdateToken(self.next_token);
        self.pending = Some(token);
        self.stats.scheduled += 1;
        debug!("SceneGraph::schedule: update token {:?}", token);
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_token(&self) -> Option<UpdateToken> {
        self.pending
    }

    pub fn stats(&self) -> UpdateStats {
        self.stats
    }

    /// Area changed by the passes since the last call
    pub fn take_damage(&mut self) -> Option<Rect> {
        self.damage.take()
    }

    pub(crate) fn add_damage(&mut self, rect: Option<Rect>) {
        self.damage = union_bounds(self.damage, rect);
    }

    pub fn add_observer(&mut self, observer: Box<dyn SceneObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, observer));
        id
    }

    /// Unregister an observer; has no effect from inside its own callback
    pub fn remove_observer(&mut self, id: ObserverId) -> Option<Box<dyn SceneObserver>> {
        let index = self.observers.iter().position(|(oid, _)| *oid == id)?;
        Some(self.observers.remove(index).1)
    }

    /// Run `f` on every observer while they are detached from the graph
    pub(crate) fn dispatch(&mut self, mut f: impl FnMut(&mut dyn SceneObserver, &mut SceneGraph)) {
        let mut observers = std::mem::take(&mut self.observers);
        for (_, observer) in observers.iter_mut() {
            f(observer.as_mut(), self);
        }
        // Observers registered during dispatch
        observers.append(&mut self.observers);
        self.observers = observers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stroke::{BezPath, Point};

    fn square(size: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(Point::ZERO);
        path.line_to(Point::new(size, 0.0));
        path.line_to(Point::new(size, size));
        path.close_path();
        path
    }

    #[test]
    fn test_dirty_leaf_marks_every_ancestor() {
        for depth in [1, 2, 5, 20] {
            let mut graph = SceneGraph::default();
            let mut parent = graph.root();
            let mut chain = vec![parent];
            for _ in 0..depth {
                parent = graph.add_child(parent, NodeKind::Group { layer: false }).unwrap();
                chain.push(parent);
            }
            let leaf = graph
                .add_child(parent, NodeKind::Path { path: BezPath::new() })
                .unwrap();
            graph.ensure_up_to_date().unwrap();

            graph.set_path(leaf, square(4.0)).unwrap();
            for id in &chain {
                let flags = graph.node(*id).unwrap().update_flags();
                assert!(flags.contains(DirtyFlags::GEOMETRY), "depth {depth}");
            }
        }
    }

    #[test]
    fn test_walk_stops_at_dirty_ancestor() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let group = graph.add_child(root, NodeKind::Group { layer: false }).unwrap();
        let a = graph.add_child(group, NodeKind::Path { path: BezPath::new() }).unwrap();
        let b = graph.add_child(group, NodeKind::Path { path: BezPath::new() }).unwrap();
        graph.ensure_up_to_date().unwrap();

        graph.request_update(a, DirtyFlags::STYLE).unwrap();
        // Pretend the root was cleaned by hand: the walk from b stops at group
        graph.get_mut(root).unwrap().update_flags = DirtyFlags::empty();
        graph.request_update(b, DirtyFlags::STYLE).unwrap();
        assert!(graph.node(root).unwrap().update_flags().is_empty());

        graph.request_update(b, DirtyFlags::GEOMETRY).unwrap();
        assert!(graph.node(root).unwrap().update_flags().contains(DirtyFlags::GEOMETRY));
    }

    #[test]
    fn test_scheduling_is_idempotent() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let path = graph.add_child(root, NodeKind::Path { path: BezPath::new() }).unwrap();
        let token = graph.pending_token();
        assert!(token.is_some());
        for i in 0..10 {
            graph.set_path(path, square(i as f64 + 1.0)).unwrap();
        }
        assert_eq!(graph.pending_token(), token);
        assert_eq!(graph.stats().scheduled, 1);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let path = graph.add_child(root, NodeKind::Path { path: BezPath::new() }).unwrap();
        graph.remove(path).unwrap();
        assert_eq!(
            graph.request_update(path, DirtyFlags::STYLE),
            Err(SceneError::StaleHandle(path))
        );
        assert_eq!(graph.set_path(path, square(1.0)), Err(SceneError::StaleHandle(path)));
        assert!(graph.node(path).is_none());
    }

    #[test]
    fn test_composed_transform_applies_parents_last() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let layer = graph.add_layer(root).unwrap();
        let group = graph.add_child(layer, NodeKind::Group { layer: false }).unwrap();
        graph.set_transform(layer, Affine::translate((10.0, 0.0))).unwrap();
        graph.set_transform(group, Affine::scale(2.0)).unwrap();

        let composed = graph.composed_transform(group).unwrap();
        assert_eq!(composed * Point::new(1.0, 1.0), Point::new(12.0, 2.0));
        assert_eq!(graph.composed_transform(root).unwrap(), Affine::IDENTITY);

        graph.ensure_up_to_date().unwrap();
        assert_eq!(graph.node(group).unwrap().world_transform(), composed);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let layer = graph.add_layer(root).unwrap();
        let path = graph.add_child(layer, NodeKind::Path { path: BezPath::new() }).unwrap();
        assert_eq!(graph.ancestors(path).collect::<Vec<_>>(), vec![layer, root]);
        assert!(graph.is_ancestor(root, path));
        assert!(!graph.is_ancestor(path, layer));
    }
}
