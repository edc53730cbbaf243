use serde::{Deserialize, Serialize};

/// Undirected edge between two matrix indices, stored with `source < target`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

impl Edge {
    /// Builds an edge, normalising the endpoint order
    pub fn new(a: usize, b: usize, weight: f64) -> Self {
        let (source, target) = if a <= b { (a, b) } else { (b, a) };
        Self {
            source,
            target,
            weight,
        }
    }

    pub fn touches(&self, node: usize) -> bool {
        self.source == node || self.target == node
    }

    /// The endpoint opposite `node`, if `node` is on this edge
    pub fn other(&self, node: usize) -> Option<usize> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    pub fn endpoints(&self) -> (usize, usize) {
        (self.source, self.target)
    }
}
