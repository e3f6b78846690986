//! An in-memory M-tree: a metric index that answers membership and
//! k-nearest-neighbor queries given nothing but a distance function over
//! the stored values.
//!
//! ```
//! use std::sync::Arc;
//! use rustymtree::{AbsoluteDifference, MTree};
//!
//! let tree = MTree::from_values([0i64, 10, 20, 30], 2, Arc::new(AbsoluteDifference)).unwrap();
//! assert!(tree.contains(&20));
//! assert_eq!(tree.knn(&11, 1), vec![10]);
//! ```

pub mod distance;
pub mod tree;

pub use distance::*;
pub use tree::*;
