use imagetrace_core::SimilarityMatrix;
use serde::Serialize;
use tracing::debug;

use crate::edge::Edge;
use crate::threshold::Threshold;

/// Number of unordered pairs among `n` nodes, `n(n-1)/2`
pub fn total_possible_connections(n: usize) -> usize {
    if n <= 1 {
        0
    } else {
        n * (n - 1) / 2
    }
}

/// Connection share as a percentage with one decimal, or `"0"` when there is
/// nothing to connect. Ties round up (6.25 renders as "6.3").
pub fn format_percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return "0".to_string();
    }
    // tenths of a percent, rounded half-up in integer arithmetic
    let (count, total) = (count as u128, total as u128);
    let tenths = (count * 2000 + total) / (2 * total);
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// Edges of a similarity matrix whose score meets a threshold.
///
/// Edges are ordered by `(source, target)` ascending with `source < target`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityGraph {
    node_count: usize,
    threshold: Threshold,
    edges: Vec<Edge>,
}

impl SimilarityGraph {
    /// Reads the upper triangle of `matrix`; the diagonal is ignored.
    pub fn build(matrix: &SimilarityMatrix, threshold: Threshold) -> Self {
        let node_count = matrix.dimension();
        let edges: Vec<Edge> = matrix
            .rows()
            .iter()
            .enumerate()
            .flat_map(|(i, row)| {
                row.iter()
                    .enumerate()
                    .skip(i + 1)
                    .filter(|(_, score)| threshold.admits(**score))
                    .map(move |(j, score)| Edge::new(i, j, *score))
            })
            .collect();

        debug!(
            target: "imagetrace::graph",
            nodes = node_count,
            edges = edges.len(),
            threshold = threshold.value(),
            "Built similarity graph"
        );

        Self {
            node_count,
            threshold,
            edges,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn connection_count(&self) -> usize {
        self.edges.len()
    }

    pub fn total_possible_connections(&self) -> usize {
        total_possible_connections(self.node_count)
    }

    pub fn percentage(&self) -> String {
        format_percentage(self.connection_count(), self.total_possible_connections())
    }

    /// Edges touching `node`, in graph order
    pub fn incident_edges(&self, node: usize) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.iter().filter(move |edge| edge.touches(node))
    }

    pub fn degree(&self, node: usize) -> usize {
        self.incident_edges(node).count()
    }

    /// Highest-weight edge; the earliest one wins ties
    pub fn strongest_edge(&self) -> Option<&Edge> {
        self.edges.iter().fold(None, |best: Option<&Edge>, edge| match best {
            Some(current) if current.weight >= edge.weight => Some(current),
            _ => Some(edge),
        })
    }

    /// Nodes with no qualifying edge, ascending
    pub fn isolated_nodes(&self) -> Vec<usize> {
        let mut connected = vec![false; self.node_count];
        for edge in &self.edges {
            connected[edge.source] = true;
            connected[edge.target] = true;
        }
        connected
            .iter()
            .enumerate()
            .filter(|(_, linked)| !**linked)
            .map(|(node, _)| node)
            .collect()
    }
}
