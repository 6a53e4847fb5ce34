//! The scene graph seen as the stroke tool's document

use nib_config::{SceneSettings, StrokeMode};
use stroke::{BezPath, Document, DocumentError, LayerHandle, LayerState, NodeHandle, PathEl};
use tracing::{debug, info};

use crate::arena::NodeId;
use crate::error::SceneError;
use crate::graph::SceneGraph;
use crate::node::{NodeKind, Style};

/// A [`SceneGraph`] with a current layer and a list of committed changes
pub struct SceneDocument {
    graph: SceneGraph,
    current_layer: Option<NodeId>,
    history: Vec<String>,
}

impl SceneDocument {
    /// New document with one empty layer selected
    pub fn new(settings: SceneSettings) -> Result<Self, SceneError> {
        let mut graph = SceneGraph::new(settings);
        let layer = graph.add_layer(graph.root())?;
        Ok(Self {
            graph,
            current_layer: Some(layer),
            history: Vec::new(),
        })
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn layer(&self) -> Option<NodeId> {
        self.current_layer
    }

    pub fn set_current_layer(&mut self, layer: Option<NodeId>) -> Result<(), SceneError> {
        if let Some(id) = layer {
            if !self.graph.get(id)?.kind().is_layer() {
                return Err(SceneError::NotAGroup(id));
            }
        }
        self.current_layer = layer;
        Ok(())
    }

    /// Labels passed to `commit`, oldest first
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Path nodes directly under `layer`
    pub fn paths_in(&self, layer: NodeId) -> Vec<NodeId> {
        self.graph
            .node(layer)
            .map(|node| {
                node.children()
                    .iter()
                    .copied()
                    .filter(|c| {
                        self.graph
                            .node(*c)
                            .is_some_and(|n| matches!(n.kind(), NodeKind::Path { .. }))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn resolve_layer(&self, layer: LayerHandle) -> Result<NodeId, DocumentError> {
        let id = NodeId::from_bits(layer.0);
        match self.graph.node(id) {
            Some(node) if node.kind().is_layer() => Ok(id),
            _ => Err(DocumentError::UnknownLayer(layer)),
        }
    }

    fn resolve_node(&self, node: NodeHandle) -> Result<NodeId, DocumentError> {
        let id = NodeId::from_bits(node.0);
        if self.graph.contains(id) {
            Ok(id)
        } else {
            Err(DocumentError::UnknownNode(node))
        }
    }
}

impl Document for SceneDocument {
    fn current_layer(&self) -> Option<LayerHandle> {
        self.current_layer
            .filter(|id| self.graph.contains(*id))
            .map(|id| LayerHandle(id.to_bits()))
    }

    fn layer_state(&self, layer: LayerHandle) -> Result<LayerState, DocumentError> {
        let id = self.resolve_layer(layer)?;
        Ok(LayerState {
            hidden: self.graph.is_effectively_hidden(id),
            locked: self.graph.is_effectively_locked(id),
        })
    }

    /// New path under `layer`, placed so its data is read in document space
    ///
    /// The node carries the inverse of the layer's transform, which cancels
    /// the layer's placement when the update pass composes world transforms.
    fn create_path_node(
        &mut self,
        layer: LayerHandle,
        mode: StrokeMode,
    ) -> Result<NodeHandle, DocumentError> {
        let id = self.resolve_layer(layer)?;
        if self.graph.is_effectively_locked(id) {
            return Err(DocumentError::LayerRejected(layer));
        }
        let layer_transform = self.graph.composed_transform(id).map_err(rejected)?;
        let det = layer_transform.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(DocumentError::Rejected(format!(
                "layer {:?} has a degenerate transform",
                id
            )));
        }

        let style = match mode {
            StrokeMode::Line => Style::stroked(),
            StrokeMode::Calligraphic => Style::filled(),
        };
        let node = self
            .graph
            .add_child(id, NodeKind::Path { path: BezPath::new() })
            .map_err(rejected)?;
        self.graph.set_style(node, style).map_err(rejected)?;
        self.graph
            .set_transform(node, layer_transform.inverse())
            .map_err(rejected)?;
        debug!("SceneDocument::create_path_node: {:?} in {:?}", node, id);
        Ok(NodeHandle(node.to_bits()))
    }

    fn set_path_data(&mut self, node: NodeHandle, elements: &[PathEl]) -> Result<(), DocumentError> {
        let id = self.resolve_node(node)?;
        if !matches!(elements.first(), None | Some(PathEl::MoveTo(_))) {
            return Err(DocumentError::Rejected(
                "path data must start with a move".to_string(),
            ));
        }
        self.graph
            .set_path(id, BezPath::from_vec(elements.to_vec()))
            .map_err(rejected)
    }

    fn remove_node(&mut self, node: NodeHandle) -> Result<(), DocumentError> {
        let id = self.resolve_node(node)?;
        self.graph.remove(id).map_err(rejected)
    }

    /// Record the transaction; the update pass itself runs from the scheduler
    fn commit(&mut self, label: &str) -> Result<(), DocumentError> {
        self.history.push(label.to_string());
        info!("SceneDocument: committed \"{}\"", label);
        Ok(())
    }
}

fn rejected(err: SceneError) -> DocumentError {
    DocumentError::Rejected(err.to_string())
}
