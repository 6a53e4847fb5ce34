use thiserror::Error;

use crate::arena::NodeId;

/// Errors from scene graph mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("Stale or unknown node handle {0:?}")]
    StaleHandle(NodeId),
    #[error("Node {0:?} cannot own children")]
    NotAGroup(NodeId),
    #[error("Node {0:?} is not a path")]
    NotAPath(NodeId),
    #[error("Node {0:?} is not a clone")]
    NotAClone(NodeId),
    #[error("Node {0:?} is not a paint server")]
    NotAPaintServer(NodeId),
    #[error("Node {owner:?} may not reference {target:?}")]
    ReferenceRefused { owner: NodeId, target: NodeId },
    #[error("The root node cannot be removed")]
    RemoveRoot,
}

/// Failure of an update pass
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("Scene did not settle after {iterations} update iterations")]
    NoConvergence { iterations: usize },
}
