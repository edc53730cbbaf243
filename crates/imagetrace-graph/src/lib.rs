//! Turns a pairwise similarity matrix plus a threshold into a filtered
//! relationship graph with summary statistics.
//!
//! Everything here is pure: no timing, no I/O. A graph is rebuilt whenever the
//! matrix or threshold changes and is never mutated in place.

pub mod edge;
pub mod graph;
pub mod threshold;
pub mod view;

pub use edge::Edge;
pub use graph::{format_percentage, total_possible_connections, SimilarityGraph};
pub use threshold::{Threshold, ThresholdPreset};
pub use view::{build, GraphView};
