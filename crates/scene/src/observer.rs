use crate::arena::NodeId;
use crate::flags::DirtyFlags;
use crate::graph::SceneGraph;

/// Handle of a registered observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u32);

/// Receives notifications from the update engine
///
/// Callbacks run synchronously inside the pass. Observers may dirty the graph
/// again; the pass then loops until it settles or gives up.
pub trait SceneObserver {
    /// `node` finished updating; `flags` says what changed
    fn node_modified(&mut self, _graph: &mut SceneGraph, _node: NodeId, _flags: DirtyFlags) {}

    /// `node` is about to be freed; its handle is dead after this call
    fn node_released(&mut self, _node: NodeId) {}

    /// One update/modified iteration completed over the whole graph
    fn document_modified(&mut self, _graph: &mut SceneGraph) {}
}
