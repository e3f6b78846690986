pub mod metrics;
pub mod node;
pub mod promoter;
pub mod queue;
pub mod result_set;
pub mod search;
pub mod tree;

pub use metrics::*;
pub use node::NodeId;
pub use promoter::*;
pub use queue::*;
pub use result_set::*;
pub use tree::*;
