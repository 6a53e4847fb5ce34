//! Update and modified passes
//!
//! One iteration is a top-down update pass followed by a bottom-up modified
//! pass. Modified notifications may dirty nodes again, so iterations repeat
//! until the root is clean, up to `max_update_iterations`.

use stroke::{Affine, Rect, path_bounds, union_bounds};
use tracing::{debug, error};

use super::SceneGraph;
use crate::arena::NodeId;
use crate::error::UpdateError;
use crate::flags::DirtyFlags;
use crate::node::NodeKind;

/// Clone chains deeper than this are treated as empty
const MAX_CLONE_DEPTH: usize = 32;

/// State handed from a parent to its children during the update pass
#[derive(Debug, Clone, Copy)]
struct UpdateContext {
    world: Affine,
    opacity: f64,
    /// Flags forced onto children because something they inherit changed
    inherited: DirtyFlags,
}

impl SceneGraph {
    /// Run the deferred update if one was requested
    ///
    /// Returns whether a pass ran. This is the idle handler of the event loop.
    pub fn run_pending(&mut self) -> Result<bool, UpdateError> {
        if self.pending.is_none() {
            return Ok(false);
        }
        self.ensure_up_to_date()?;
        Ok(true)
    }

    /// Iterate update/modified passes until nothing is dirty
    ///
    /// Gives up after `max_update_iterations`: the pending token is cancelled
    /// and the flags stay set for the next request. Damage gathered so far is
    /// kept, so the next settled pass repaints it as well.
    pub fn ensure_up_to_date(&mut self) -> Result<(), UpdateError> {
        let limit = self.settings.max_update_iterations;
        let mut iterations = 0;

        while self.get(self.root).is_ok_and(|root| root.is_dirty()) {
            if iterations >= limit {
                self.pending = None;
                self.stats.aborted += 1;
                error!(
                    "SceneGraph: update did not settle after {} iterations, aborting",
                    iterations
                );
                return Err(UpdateError::NoConvergence { iterations });
            }

            let root = self.root;
            let context = UpdateContext {
                world: Affine::IDENTITY,
                opacity: 1.0,
                inherited: DirtyFlags::empty(),
            };
            self.update_subtree(root, context);
            self.modified_subtree(root);
            self.dispatch(|observer, graph| observer.document_modified(graph));

            iterations += 1;
            self.stats.passes += 1;
        }

        self.pending = None;
        if iterations > 0 {
            debug!("SceneGraph::ensure_up_to_date: settled after {} iterations", iterations);
        }
        Ok(())
    }

    fn update_subtree(&mut self, id: NodeId, context: UpdateContext) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let flags = node.update_flags | context.inherited;
        if flags.is_empty() {
            return;
        }
        node.update_flags = DirtyFlags::empty();

        let world = context.world * node.transform;
        let opacity = context.opacity * node.style.opacity;
        let mut inherited = DirtyFlags::empty();
        if world != node.world_transform {
            inherited |= DirtyFlags::GEOMETRY | DirtyFlags::BBOX;
        }
        if opacity != node.opacity {
            inherited |= DirtyFlags::STYLE;
        }
        node.world_transform = world;
        node.opacity = opacity;
        let children = node.children.clone();

        let child_context = UpdateContext {
            world,
            opacity,
            inherited,
        };
        for child in children {
            self.update_subtree(child, child_context);
        }

        // Children are settled: recompute this node's box from them
        let bbox = self.compute_bbox(id);
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let old = std::mem::replace(&mut node.bbox, bbox);
        node.modified_flags |= flags;
        // Groups only repaint on their own account when their style changed
        if !node.kind.is_group() || flags.contains(DirtyFlags::STYLE) {
            self.add_damage(union_bounds(old, bbox));
        }
    }

    fn compute_bbox(&self, id: NodeId) -> Option<Rect> {
        let node = self.nodes.get(id)?;
        match &node.kind {
            NodeKind::Group { .. } => node
                .children
                .iter()
                .filter_map(|c| self.nodes.get(*c))
                .filter(|child| !child.hidden)
                .fold(None, |acc, child| union_bounds(acc, child.bbox)),
            NodeKind::Path { path } => {
                let world = node.world_transform;
                path_bounds(path.iter().map(|el| world * el))
            }
            NodeKind::Clone { source } => {
                let source_id = (*source)?;
                let source = self.nodes.get(source_id)?;
                let local = self.content_bounds(source_id, 0)?;
                Some((node.world_transform * source.transform).transform_rect_bbox(local))
            }
            NodeKind::Gradient { .. } => None,
        }
    }

    /// Bounds of a node's content in its own coordinates
    fn content_bounds(&self, id: NodeId, depth: usize) -> Option<Rect> {
        if depth > MAX_CLONE_DEPTH {
            return None;
        }
        let node = self.nodes.get(id)?;
        match &node.kind {
            NodeKind::Path { path } => path_bounds(path.iter()),
            NodeKind::Group { .. } => node.children.iter().fold(None, |acc, &child| {
                let inner = self.nodes.get(child).filter(|n| !n.hidden).and_then(|n| {
                    self.content_bounds(child, depth + 1)
                        .map(|r| n.transform.transform_rect_bbox(r))
                });
                union_bounds(acc, inner)
            }),
            NodeKind::Clone { source } => {
                let source_id = (*source)?;
                let source = self.nodes.get(source_id)?;
                self.content_bounds(source_id, depth + 1)
                    .map(|r| source.transform.transform_rect_bbox(r))
            }
            NodeKind::Gradient { .. } => None,
        }
    }

    /// Emit modified notifications children first
    fn modified_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let flags = std::mem::take(&mut node.modified_flags);
        if flags.is_empty() {
            return;
        }
        let children = node.children.clone();
        for child in children {
            self.modified_subtree(child);
        }
        self.notify_modified(id, flags);
    }

    fn notify_modified(&mut self, id: NodeId, flags: DirtyFlags) {
        let subscribers = match self.nodes.get(id) {
            Some(node) => node.subscribers.clone(),
            None => return,
        };
        for subscription in subscribers {
            let flags = subscription.role.dirty_flags();
            if let Err(err) = self.request_update(subscription.subscriber, flags) {
                debug!("SceneGraph::notify_modified: skipping subscriber: {}", err);
            }
        }
        self.dispatch(|observer, graph| observer.node_modified(graph, id, flags));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Paint, Style};
    use crate::observer::SceneObserver;
    use nib_config::SceneSettings;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stroke::{BezPath, Point};

    fn rect_path(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
        let mut path = BezPath::new();
        path.move_to(Point::new(x0, y0));
        path.line_to(Point::new(x1, y0));
        path.line_to(Point::new(x1, y1));
        path.line_to(Point::new(x0, y1));
        path.close_path();
        path
    }

    fn unit_path(graph: &mut SceneGraph, parent: NodeId) -> NodeId {
        path_in(graph, parent, rect_path(0.0, 0.0, 1.0, 1.0))
    }

    fn path_in(graph: &mut SceneGraph, parent: NodeId, path: BezPath) -> NodeId {
        graph.add_child(parent, NodeKind::Path { path }).unwrap()
    }

    /// Dirties the root again on every notification
    struct Redirty;

    impl SceneObserver for Redirty {
        fn document_modified(&mut self, graph: &mut SceneGraph) {
            let root = graph.root();
            graph.request_update(root, DirtyFlags::STYLE).unwrap();
        }
    }

    #[derive(Clone, Default)]
    struct ModifiedLog(Rc<RefCell<Vec<(NodeId, DirtyFlags)>>>);

    impl SceneObserver for ModifiedLog {
        fn node_modified(&mut self, _graph: &mut SceneGraph, node: NodeId, flags: DirtyFlags) {
            self.0.borrow_mut().push((node, flags));
        }
    }

    #[test]
    fn test_many_changes_run_one_pass() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let path = unit_path(&mut graph, layer);
        graph.run_pending().unwrap();
        let before = graph.stats();

        for i in 1..=25 {
            let size = i as f64;
            graph.set_path(path, rect_path(0.0, 0.0, size, size)).unwrap();
            graph.set_hidden(path, i % 2 == 0).unwrap();
        }
        assert!(graph.run_pending().unwrap());
        let after = graph.stats();
        assert_eq!(after.scheduled - before.scheduled, 1);
        assert_eq!(after.passes - before.passes, 1);
        assert!(!graph.has_pending());
        assert!(!graph.run_pending().unwrap());
    }

    #[test]
    fn test_cycle_aborts_with_diagnostic() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        unit_path(&mut graph, layer);
        graph.add_observer(Box::new(Redirty));

        let result = graph.run_pending();
        assert_eq!(result, Err(UpdateError::NoConvergence { iterations: 16 }));
        assert!(!graph.has_pending());
        assert_eq!(graph.stats().aborted, 1);
        assert_eq!(graph.stats().passes, 16);
        assert!(graph.node(graph.root()).unwrap().is_dirty());
    }

    #[test]
    fn test_aborted_pass_keeps_damage_for_next_pass() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let path = unit_path(&mut graph, layer);
        graph.ensure_up_to_date().unwrap();
        graph.take_damage();

        graph
            .set_path(path, rect_path(100.0, 100.0, 101.0, 101.0))
            .unwrap();
        let observer = graph.add_observer(Box::new(Redirty));
        assert!(graph.run_pending().is_err());

        assert!(graph.remove_observer(observer).is_some());
        graph.ensure_up_to_date().unwrap();
        assert!(!graph.node(graph.root()).unwrap().is_dirty());

        // Both where the path was and where it went are repainted
        let damage = graph.take_damage().unwrap();
        assert!(damage.x0 <= 0.0 && damage.y0 <= 0.0);
        assert!(damage.x1 >= 101.0 && damage.y1 >= 101.0);
    }

    #[test]
    fn test_iteration_bound_follows_settings() {
        let mut graph = SceneGraph::new(SceneSettings {
            max_update_iterations: 3,
        });
        graph.add_layer(graph.root()).unwrap();
        graph.add_observer(Box::new(Redirty));
        assert_eq!(
            graph.ensure_up_to_date(),
            Err(UpdateError::NoConvergence { iterations: 3 })
        );
    }

    #[test]
    fn test_update_computes_world_bbox() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let path = path_in(&mut graph, layer, rect_path(0.0, 0.0, 10.0, 5.0));
        graph
            .set_transform(layer, Affine::translate((100.0, 0.0)))
            .unwrap();
        graph.ensure_up_to_date().unwrap();

        let bbox = graph.node(path).unwrap().bbox().unwrap();
        assert_eq!(bbox, Rect::new(100.0, 0.0, 110.0, 5.0));
        assert_eq!(graph.node(graph.root()).unwrap().bbox(), Some(bbox));
        assert!(!graph.node(graph.root()).unwrap().is_dirty());
    }

    #[test]
    fn test_transform_change_reaches_clean_children() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let path = unit_path(&mut graph, layer);
        graph.ensure_up_to_date().unwrap();
        graph.take_damage();

        graph.set_transform(layer, Affine::scale(2.0)).unwrap();
        assert!(graph.node(path).unwrap().update_flags().is_empty());
        graph.ensure_up_to_date().unwrap();

        let bbox = graph.node(path).unwrap().bbox().unwrap();
        assert_eq!((bbox.x1, bbox.y1), (2.0, 2.0));
        let damage = graph.take_damage().unwrap();
        assert_eq!(damage, Rect::new(0.0, 0.0, 2.0, 2.0));
    }

    #[test]
    fn test_hidden_child_leaves_group_bbox() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        unit_path(&mut graph, layer);
        let far = path_in(&mut graph, layer, rect_path(50.0, 50.0, 60.0, 60.0));
        graph.ensure_up_to_date().unwrap();
        assert_eq!(graph.node(layer).unwrap().bbox().unwrap().x1, 60.0);

        graph.set_hidden(far, true).unwrap();
        graph.ensure_up_to_date().unwrap();
        assert_eq!(
            graph.node(layer).unwrap().bbox(),
            Some(Rect::new(0.0, 0.0, 1.0, 1.0))
        );
    }

    #[test]
    fn test_opacity_multiplies_down() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let path = unit_path(&mut graph, layer);
        let half = Style {
            opacity: 0.5,
            ..Style::default()
        };
        graph.set_style(layer, half).unwrap();
        graph.set_style(path, half).unwrap();
        graph.ensure_up_to_date().unwrap();
        assert_eq!(graph.node(path).unwrap().opacity(), 0.25);
    }

    #[test]
    fn test_modified_notifications_are_post_order() {
        let mut graph = SceneGraph::default();
        let root = graph.root();
        let layer = graph.add_layer(root).unwrap();
        let path = unit_path(&mut graph, layer);
        let log = ModifiedLog::default();
        graph.add_observer(Box::new(log.clone()));
        graph.ensure_up_to_date().unwrap();

        let order: Vec<NodeId> = log.0.borrow().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec![path, layer, root]);
        assert!(log.0.borrow()[0].1.contains(DirtyFlags::GEOMETRY));
    }

    #[test]
    fn test_clone_follows_source() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let source = unit_path(&mut graph, layer);
        let clone = graph
            .add_child(layer, NodeKind::Clone { source: Some(source) })
            .unwrap();
        graph
            .set_transform(clone, Affine::translate((10.0, 0.0)))
            .unwrap();
        graph.ensure_up_to_date().unwrap();
        assert_eq!(
            graph.node(clone).unwrap().bbox(),
            Some(Rect::new(10.0, 0.0, 11.0, 1.0))
        );

        graph
            .set_path(source, rect_path(0.0, 0.0, 3.0, 3.0))
            .unwrap();
        graph.ensure_up_to_date().unwrap();
        assert_eq!(
            graph.node(clone).unwrap().bbox(),
            Some(Rect::new(10.0, 0.0, 13.0, 3.0))
        );
        assert!(!graph.node(clone).unwrap().is_dirty());
    }

    #[test]
    fn test_gradient_change_restyles_users() {
        let mut graph = SceneGraph::default();
        let layer = graph.add_layer(graph.root()).unwrap();
        let server = graph
            .add_child(layer, NodeKind::Gradient { stops: vec![] })
            .unwrap();
        let path = unit_path(&mut graph, layer);
        graph.set_fill_server(path, server).unwrap();
        graph.ensure_up_to_date().unwrap();

        let log = ModifiedLog::default();
        graph.add_observer(Box::new(log.clone()));
        graph.request_update(server, DirtyFlags::STYLE).unwrap();
        graph.ensure_up_to_date().unwrap();

        assert!(
            log.0
                .borrow()
                .iter()
                .any(|(id, flags)| *id == path && flags.contains(DirtyFlags::STYLE))
        );
        assert_eq!(graph.node(path).unwrap().style().fill, Paint::Server(server));
    }
}
