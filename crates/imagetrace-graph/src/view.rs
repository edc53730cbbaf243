use imagetrace_core::SimilarityMatrix;
use serde::Serialize;
use tracing::debug;

use crate::edge::Edge;
use crate::graph::SimilarityGraph;
use crate::threshold::Threshold;

/// What the host renders for one (matrix, threshold, selection) triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub edges: Vec<Edge>,
    pub connection_count: usize,
    pub total_possible_connections: usize,
    pub percentage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selection: Option<usize>,
    /// Edges incident on `selection`; `None` when nothing is selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_edges: Option<Vec<Edge>>,
}

impl GraphView {
    pub fn from_graph(graph: &SimilarityGraph, selection: Option<usize>) -> Self {
        let selected_edges = selection.map(|node| {
            if node >= graph.node_count() {
                debug!(
                    target: "imagetrace::graph",
                    node,
                    nodes = graph.node_count(),
                    "Selection outside matrix"
                );
            }
            graph.incident_edges(node).copied().collect()
        });

        Self {
            edges: graph.edges().to_vec(),
            connection_count: graph.connection_count(),
            total_possible_connections: graph.total_possible_connections(),
            percentage: graph.percentage(),
            selection,
            selected_edges,
        }
    }

    /// Edges to draw: the selection's edges when one is active, else all
    pub fn visible_edges(&self) -> &[Edge] {
        self.selected_edges.as_deref().unwrap_or(&self.edges)
    }
}

/// Filter `matrix` at `threshold` and, if `selection` is set, restrict a
/// second edge list to that node. The full edge list is never narrowed.
pub fn build(matrix: &SimilarityMatrix, threshold: Threshold, selection: Option<usize>) -> GraphView {
    GraphView::from_graph(&SimilarityGraph::build(matrix, threshold), selection)
}
