pub mod graph;
pub mod node;

pub use graph::{GraphError, RunGraph};
pub use node::TaskNode;
