//! Tree node contents
//!
//! Leaf slots hold [`LeafNode`]s; parent slots hold [`ParentNode`]s. The
//! [`TreeNode`] union is the public projection of a slot used when a tree
//! travels inside a welcome. [`TreeView`] lets the hashing and TreeKEM
//! code read a tree and a diff interchangeably.

use crate::error::{MlsError, Result};
use crate::leaf_node::LeafNode;
use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::HpkePublicKey;
use canopy_tree::{LeafIndex, ParentIndex, Tree, TreeDiff, TreeError};

const NODE_LEAF: u16 = 1;
const NODE_PARENT: u16 = 2;

/// The ratchet tree: leaf nodes below, parent nodes above
pub type RatchetTree = Tree<LeafNode, ParentNode>;

/// An interior node of the ratchet tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentNode {
    /// HPKE public key shared by the subtree
    pub encryption_key: HpkePublicKey,
    /// Hash chain linking this node toward the root
    pub parent_hash: Vec<u8>,
    /// Leaves that joined below this node since its last refresh
    pub unmerged_leaves: Vec<LeafIndex>,
}

impl WireEncode for ParentNode {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.encryption_key.encode(w)?;
        w.write_bytes8(&self.parent_hash)?;
        let count = u32::try_from(self.unmerged_leaves.len())
            .map_err(|_| CodecError::malformed("unmerged leaf list exceeds u32 count"))?;
        w.write_u32(count);
        for leaf in &self.unmerged_leaves {
            w.write_u32(leaf.as_u32());
        }
        Ok(())
    }
}

impl WireDecode for ParentNode {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        let encryption_key = HpkePublicKey::decode(r)?;
        let parent_hash = r.read_bytes8()?.to_vec();
        let count = r.read_u32()? as usize;
        if count > r.remaining() / 4 {
            return Err(CodecError::malformed(
                "unmerged leaf count exceeds remaining input",
            ));
        }
        let mut unmerged_leaves = Vec::with_capacity(count);
        for _ in 0..count {
            unmerged_leaves.push(LeafIndex::new(r.read_u32()?));
        }
        Ok(Self {
            encryption_key,
            parent_hash,
            unmerged_leaves,
        })
    }
}

/// One exported tree slot: a leaf or a parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// Contents of an even (leaf) slot
    Leaf(LeafNode),
    /// Contents of an odd (parent) slot
    Parent(ParentNode),
}

impl WireEncode for TreeNode {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        match self {
            TreeNode::Leaf(leaf) => {
                w.write_u16(NODE_LEAF);
                leaf.encode(w)
            }
            TreeNode::Parent(parent) => {
                w.write_u16(NODE_PARENT);
                parent.encode(w)
            }
        }
    }
}

impl WireDecode for TreeNode {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        match r.read_u16()? {
            NODE_LEAF => Ok(TreeNode::Leaf(LeafNode::decode(r)?)),
            NODE_PARENT => Ok(TreeNode::Parent(ParentNode::decode(r)?)),
            other => Err(CodecError::malformed(format!("unknown node type {other}"))),
        }
    }
}

/// Project a tree into its array-ordered public slots
pub fn export_ratchet_tree(tree: &RatchetTree) -> Vec<Option<TreeNode>> {
    let size = tree.tree_size() as usize;
    let mut nodes = Vec::with_capacity(size);
    for raw in 0..size as u32 {
        if raw % 2 == 0 {
            let leaf = tree
                .leaf(LeafIndex::new(raw / 2))
                .ok()
                .flatten()
                .cloned()
                .map(TreeNode::Leaf);
            nodes.push(leaf);
        } else {
            let parent = tree
                .parent_node(ParentIndex::new(raw / 2))
                .ok()
                .flatten()
                .cloned()
                .map(TreeNode::Parent);
            nodes.push(parent);
        }
    }
    nodes
}

/// Rebuild a tree from array-ordered public slots
pub fn import_ratchet_tree(nodes: Vec<Option<TreeNode>>) -> Result<RatchetTree> {
    if nodes.is_empty() || nodes.len() % 2 == 0 {
        return Err(MlsError::Codec(CodecError::malformed(
            "ratchet tree must hold an odd number of slots",
        )));
    }
    let mut leaves = Vec::with_capacity(nodes.len() / 2 + 1);
    let mut parents = Vec::with_capacity(nodes.len() / 2);
    for (raw, slot) in nodes.into_iter().enumerate() {
        match (raw % 2, slot) {
            (0, Some(TreeNode::Leaf(leaf))) => leaves.push(Some(leaf)),
            (0, None) => leaves.push(None),
            (1, Some(TreeNode::Parent(parent))) => parents.push(Some(parent)),
            (1, None) => parents.push(None),
            _ => {
                return Err(MlsError::Codec(CodecError::malformed(format!(
                    "node kind does not match slot parity at index {raw}"
                ))))
            }
        }
    }
    Ok(RatchetTree::from_parts(leaves, parents)?)
}

/// Read access shared by [`RatchetTree`] and its diffs
pub(crate) trait TreeView {
    /// Leaf capacity of the view
    fn view_leaf_count(&self) -> u32;
    /// Leaf slot contents
    fn view_leaf(&self, index: LeafIndex) -> std::result::Result<Option<&LeafNode>, TreeError>;
    /// Parent slot contents
    fn view_parent(&self, index: ParentIndex)
        -> std::result::Result<Option<&ParentNode>, TreeError>;
}

impl TreeView for RatchetTree {
    fn view_leaf_count(&self) -> u32 {
        self.leaf_count()
    }

    fn view_leaf(&self, index: LeafIndex) -> std::result::Result<Option<&LeafNode>, TreeError> {
        self.leaf(index)
    }

    fn view_parent(
        &self,
        index: ParentIndex,
    ) -> std::result::Result<Option<&ParentNode>, TreeError> {
        self.parent_node(index)
    }
}

impl<'a> TreeView for TreeDiff<'a, LeafNode, ParentNode> {
    fn view_leaf_count(&self) -> u32 {
        self.leaf_count()
    }

    fn view_leaf(&self, index: LeafIndex) -> std::result::Result<Option<&LeafNode>, TreeError> {
        self.leaf(index)
    }

    fn view_parent(
        &self,
        index: ParentIndex,
    ) -> std::result::Result<Option<&ParentNode>, TreeError> {
        self.parent_node(index)
    }
}
