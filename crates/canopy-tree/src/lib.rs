//! Canopy ratchet-tree storage
//!
//! The left-balanced binary tree underneath the key-agreement protocol:
//!
//! - [`math`]: pure index arithmetic over the `2n - 1` array layout
//!   (level, parent, sibling, direct path, copath, root)
//! - [`tree`]: blank-aware array storage generic over leaf and parent
//!   payloads, with a diff/staging layer for atomic structural edits
//!
//! Nodes reference each other by index only; a diff is just two
//! index-to-node maps plus a pending capacity, which is what makes the
//! merge trivially atomic.

pub mod error;
pub mod math;
pub mod tree;

pub use error::{Result, TreeError};
pub use math::{LeafIndex, NodeIndex, ParentIndex};
pub use tree::{StagedDiff, Tree, TreeDiff};
