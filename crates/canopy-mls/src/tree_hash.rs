//! Tree hashing and the parent-hash chain
//!
//! The tree hash folds the whole tree into one digest bound into the
//! group context. The parent hash links each refreshed node to its parent
//! on the filtered path, anchoring a committer's leaf to the key material
//! above it; the chain starts empty at the top of the filtered path.
//!
//! Freshly installed path nodes carry no unmerged leaves, so the sibling
//! hashes entering the chain are plain subtree hashes of the tree as it
//! stands after the old path is blanked.

use crate::error::Result;
use crate::node::TreeView;
use canopy_codec::WireEncode;
use canopy_crypto::{CipherSuite, HpkePublicKey};
use canopy_tree::math;
use canopy_tree::{LeafIndex, NodeIndex, ParentIndex};

const NODE_TYPE_LEAF: u8 = 1;
const NODE_TYPE_PARENT: u8 = 2;

/// Hash of the subtree rooted at `node`
pub(crate) fn subtree_hash<V: TreeView>(
    suite: CipherSuite,
    view: &V,
    node: NodeIndex,
) -> Result<Vec<u8>> {
    let mut w = canopy_codec::WireWriter::new();
    if let Some(leaf_index) = node.leaf_index() {
        w.write_u8(NODE_TYPE_LEAF);
        w.write_u32(leaf_index.as_u32());
        match view.view_leaf(leaf_index)? {
            Some(leaf) => {
                w.write_u8(1);
                leaf.encode(&mut w)?;
            }
            None => w.write_u8(0),
        }
    } else if let Some(parent_index) = node.parent_index() {
        let left_hash = subtree_hash(suite, view, math::left(node)?)?;
        let right_hash = subtree_hash(suite, view, math::right(node)?)?;
        w.write_u8(NODE_TYPE_PARENT);
        match view.view_parent(parent_index)? {
            Some(parent) => {
                w.write_u8(1);
                parent.encode(&mut w)?;
            }
            None => w.write_u8(0),
        }
        w.write_bytes8(&left_hash)?;
        w.write_bytes8(&right_hash)?;
    }
    Ok(suite.hash(&w.into_bytes()))
}

/// Hash of the whole tree as seen through `view`
pub(crate) fn tree_hash<V: TreeView>(suite: CipherSuite, view: &V) -> Result<Vec<u8>> {
    subtree_hash(suite, view, math::root(view.view_leaf_count()))
}

/// One link of the parent-hash chain: the parent's key, the parent's own
/// stored hash, and the sibling subtree hash seen by the child
fn parent_hash(
    suite: CipherSuite,
    encryption_key: &HpkePublicKey,
    parent_hash: &[u8],
    sibling_tree_hash: &[u8],
) -> Result<Vec<u8>> {
    let mut w = canopy_codec::WireWriter::new();
    encryption_key.encode(&mut w)?;
    w.write_bytes8(parent_hash)?;
    w.write_bytes8(sibling_tree_hash)?;
    Ok(suite.hash(&w.into_bytes()))
}

/// The child of `parent` whose subtree does not contain `leaf`
pub(crate) fn copath_child(parent: ParentIndex, leaf: LeafIndex) -> Result<NodeIndex> {
    let left = math::left(parent.node())?;
    if math::is_in_subtree(leaf, left) {
        Ok(math::right(parent.node())?)
    } else {
        Ok(left)
    }
}

/// Fresh parent nodes for a filtered path, their stored parent hashes
/// chained top-down, plus the hash the committer's leaf must carry.
///
/// `keys[k]` is the new encryption key at `filtered[k]`; the view must
/// already have the old direct path blanked so sibling hashes reflect the
/// refreshed tree.
pub(crate) fn path_parent_hashes<V: TreeView>(
    suite: CipherSuite,
    view: &V,
    sender: LeafIndex,
    filtered: &[ParentIndex],
    keys: &[HpkePublicKey],
) -> Result<(Vec<crate::node::ParentNode>, Vec<u8>)> {
    debug_assert_eq!(filtered.len(), keys.len());
    let mut nodes = vec![None; filtered.len()];
    let mut chain = Vec::new();
    for k in (0..filtered.len()).rev() {
        let node = crate::node::ParentNode {
            encryption_key: keys[k].clone(),
            parent_hash: chain.clone(),
            unmerged_leaves: Vec::new(),
        };
        let sibling = copath_child(filtered[k], sender)?;
        let sibling_hash = subtree_hash(suite, view, sibling)?;
        chain = parent_hash(suite, &keys[k], &node.parent_hash, &sibling_hash)?;
        nodes[k] = Some(node);
    }
    let nodes = nodes.into_iter().flatten().collect();
    Ok((nodes, chain))
}
