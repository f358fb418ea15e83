//! Composition graphs: ordered layer inputs and the overlay chain over them.

/// Graph model and the artifact-to-graph builder.
pub mod graph;
