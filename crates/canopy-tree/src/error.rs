//! Tree errors

use thiserror::Error;

/// Errors raised by index arithmetic and tree storage
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A child or subtree operation was applied to a leaf
    #[error("node {index} is not a parent")]
    NotAParent {
        /// Offending node index
        index: u32,
    },

    /// The root has no parent or sibling
    #[error("node {index} is the root")]
    IsRoot {
        /// Offending node index
        index: u32,
    },

    /// An index does not address a node of the current tree
    #[error("index {index} outside tree of size {tree_size}")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Size of the tree the index was checked against
        tree_size: u32,
    },

    /// The upper half of the leaves is not blank
    #[error("tree is not shrinkable")]
    NotShrinkable,

    /// The diff was staged against an earlier tree generation
    #[error("diff is stale; the tree changed since it was created")]
    StaleDiff,

    /// A supplied path has the wrong number of nodes
    #[error("direct path has {expected} nodes, got {actual}")]
    PathLengthMismatch {
        /// Length of the leaf's direct path
        expected: usize,
        /// Number of nodes supplied
        actual: usize,
    },
}

/// Result type for tree operations
pub type Result<T> = std::result::Result<T, TreeError>;
