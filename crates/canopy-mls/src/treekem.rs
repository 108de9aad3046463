//! TreeKEM: the path-update ratchet
//!
//! A committer samples a fresh path-secret chain, derives one key pair per
//! node of its filtered direct path, and encrypts each node's path secret
//! to the resolution of that node's copath child. Receivers decrypt at the
//! first node shared with the sender, re-derive everything above it, and
//! install the new path through a diff so the application is atomic.
//!
//! Path-secret chain, with `Nh` the suite hash length:
//!
//! ```text
//! node_secret[k]     = ExpandWithLabel(path_secret[k], "node", "", Nh)
//! (sk, pk)[k]        = KEM.DeriveKeyPair(node_secret[k])
//! path_secret[k + 1] = ExpandWithLabel(path_secret[k], "path", "", Nh)
//! commit_secret      = ExpandWithLabel(path_secret[L], "path", "", Nh)
//! ```

use crate::error::{MlsError, Result};
use crate::leaf_node::{LeafNode, LeafNodeSource};
use crate::node::{ParentNode, TreeView};
use crate::tree_hash::{copath_child, path_parent_hashes};
use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{
    hpke, kdf, CipherSuite, HpkeCiphertext, HpkePrivateKey, HpkePublicKey, Secret,
    SignaturePrivateKey,
};
use canopy_tree::{math, LeafIndex, NodeIndex, ParentIndex, TreeDiff};
use rand::{CryptoRng, RngCore};
use std::collections::BTreeMap;

/// One refreshed node of an update path: its new public key and the path
/// secret sealed to every key in the node's copath resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePathNode {
    /// New HPKE public key at this node
    pub encryption_key: HpkePublicKey,
    /// One ciphertext per copath-resolution entry, in resolution order
    pub encrypted_path_secrets: Vec<HpkeCiphertext>,
}

impl WireEncode for UpdatePathNode {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.encryption_key.encode(w)?;
        self.encrypted_path_secrets.encode(w)
    }
}

impl WireDecode for UpdatePathNode {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            encryption_key: HpkePublicKey::decode(r)?,
            encrypted_path_secrets: Vec::decode(r)?,
        })
    }
}

/// A committer's refreshed leaf plus its filtered direct path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePath {
    /// The committer's new leaf (source `Commit`)
    pub leaf_node: LeafNode,
    /// Refreshed nodes, bottom-up along the filtered direct path
    pub nodes: Vec<UpdatePathNode>,
}

impl WireEncode for UpdatePath {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.leaf_node.encode(w)?;
        self.nodes.encode(w)
    }
}

impl WireDecode for UpdatePath {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            leaf_node: LeafNode::decode(r)?,
            nodes: Vec::decode(r)?,
        })
    }
}

/// Everything a committer learns from building an update path
pub(crate) struct UpdatePathResult {
    /// The wire-ready path
    pub update_path: UpdatePath,
    /// Secret feeding the key schedule
    pub commit_secret: Secret,
    /// Fresh private keys for the refreshed nodes, bottom-up
    pub node_private_keys: Vec<(ParentIndex, HpkePrivateKey)>,
    /// Private half of the new leaf encryption key
    pub leaf_private_key: HpkePrivateKey,
    /// Path secret per refreshed node, for welcoming joiners
    pub path_secrets: Vec<(ParentIndex, Secret)>,
}

/// What a receiver learns from applying an update path
pub(crate) struct PathApplication {
    /// Secret feeding the key schedule
    pub commit_secret: Secret,
    /// Private keys for the refreshed nodes the receiver can derive
    pub node_private_keys: Vec<(ParentIndex, HpkePrivateKey)>,
}

/// The resolution of a node: the minimal set of non-blank descendants
/// covering its subtree, plus any unmerged leaves at parent nodes
pub(crate) fn resolution<V: TreeView>(
    view: &V,
    node: NodeIndex,
) -> Result<Vec<(NodeIndex, HpkePublicKey)>> {
    if let Some(leaf_index) = node.leaf_index() {
        Ok(match view.view_leaf(leaf_index)? {
            Some(leaf) => vec![(node, leaf.encryption_key.clone())],
            None => Vec::new(),
        })
    } else if let Some(parent_index) = node.parent_index() {
        match view.view_parent(parent_index)? {
            Some(parent) => {
                let mut entries = vec![(node, parent.encryption_key.clone())];
                for &unmerged in &parent.unmerged_leaves {
                    if let Some(leaf) = view.view_leaf(unmerged)? {
                        entries.push((unmerged.node(), leaf.encryption_key.clone()));
                    }
                }
                Ok(entries)
            }
            None => {
                let mut entries = resolution(view, math::left(node)?)?;
                entries.extend(resolution(view, math::right(node)?)?);
                Ok(entries)
            }
        }
    } else {
        Ok(Vec::new())
    }
}

/// The sender's direct path with every node removed whose copath child
/// resolves to nothing (no recipients, no ciphertexts)
pub(crate) fn filtered_direct_path<V: TreeView>(
    view: &V,
    leaf: LeafIndex,
) -> Result<Vec<ParentIndex>> {
    let mut filtered = Vec::new();
    for parent in math::direct_path(leaf, view.view_leaf_count())? {
        let sibling = copath_child(parent, leaf)?;
        if !resolution(view, sibling)?.is_empty() {
            filtered.push(parent);
        }
    }
    Ok(filtered)
}

fn derive_node_key_pair(
    suite: CipherSuite,
    path_secret: &Secret,
) -> Result<canopy_crypto::HpkeKeyPair> {
    let node_secret = kdf::expand_with_label(
        suite,
        path_secret.as_slice(),
        "node",
        b"",
        suite.hash_len(),
    )?;
    Ok(hpke::derive_key_pair(suite, node_secret.as_slice())?)
}

fn next_path_secret(suite: CipherSuite, path_secret: &Secret) -> Result<Secret> {
    Ok(kdf::expand_with_label(
        suite,
        path_secret.as_slice(),
        "path",
        b"",
        suite.hash_len(),
    )?)
}

/// Build, sign, and install an update path for `sender` on the diff.
///
/// The diff must already reflect any proposals of the enclosing commit, so
/// resolutions include freshly added members. `group_context` is the
/// encoded context all ciphertexts are bound to as HPKE `info`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn create_update_path(
    suite: CipherSuite,
    diff: &mut TreeDiff<'_, LeafNode, ParentNode>,
    sender: LeafIndex,
    signature_private_key: &SignaturePrivateKey,
    group_id: &[u8],
    group_context: &[u8],
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<UpdatePathResult> {
    let old_leaf = diff
        .leaf(sender)?
        .ok_or(MlsError::BlankSenderLeaf {
            index: sender.as_u32(),
        })?
        .clone();

    // Filtering and recipient resolutions are computed before the path is
    // blanked; receivers do the same, so both sides agree on recipients.
    let filtered = filtered_direct_path(diff, sender)?;
    let mut recipients = Vec::with_capacity(filtered.len());
    for &parent in &filtered {
        recipients.push(resolution(diff, copath_child(parent, sender)?)?);
    }

    let nh = suite.hash_len();
    let mut chain = {
        let mut seed = vec![0u8; nh];
        rng.fill_bytes(&mut seed);
        Secret::new(seed)
    };
    let mut path_secrets = Vec::with_capacity(filtered.len());
    let mut node_key_pairs = Vec::with_capacity(filtered.len());
    for &parent in &filtered {
        node_key_pairs.push((parent, derive_node_key_pair(suite, &chain)?));
        path_secrets.push((parent, chain.clone()));
        chain = next_path_secret(suite, &chain)?;
    }
    let commit_secret = if filtered.is_empty() {
        Secret::zero(nh)
    } else {
        next_path_secret(suite, &chain)?
    };

    // One ciphertext per copath-resolution entry, bound to the context.
    let mut wire_nodes = Vec::with_capacity(filtered.len());
    for (k, recipients_at_node) in recipients.iter().enumerate() {
        let mut encrypted = Vec::with_capacity(recipients_at_node.len());
        for (_, recipient_key) in recipients_at_node {
            encrypted.push(hpke::seal(
                suite,
                recipient_key,
                group_context,
                b"",
                path_secrets[k].1.as_slice(),
                rng,
            )?);
        }
        wire_nodes.push(UpdatePathNode {
            encryption_key: node_key_pairs[k].1.public.clone(),
            encrypted_path_secrets: encrypted,
        });
    }

    // Install: blank the whole direct path, then set the refreshed nodes
    // with their parent-hash chain, then the new leaf.
    diff.blank_path(sender)?;
    let public_keys: Vec<HpkePublicKey> = node_key_pairs
        .iter()
        .map(|(_, pair)| pair.public.clone())
        .collect();
    let (parents, leaf_parent_hash) =
        path_parent_hashes(suite, diff, sender, &filtered, &public_keys)?;
    for (&index, parent) in filtered.iter().zip(parents) {
        diff.replace_parent(index, parent)?;
    }

    let leaf_pair = hpke::generate_key_pair(suite, rng)?;
    let new_leaf = LeafNode::new(
        suite,
        signature_private_key,
        leaf_pair.public,
        old_leaf.signature_key.clone(),
        old_leaf.credential.clone(),
        old_leaf.capabilities.clone(),
        LeafNodeSource::Commit(leaf_parent_hash),
        old_leaf.extensions.clone(),
        Some((group_id, sender)),
    )?;
    diff.replace_leaf(sender, new_leaf.clone())?;

    Ok(UpdatePathResult {
        update_path: UpdatePath {
            leaf_node: new_leaf,
            nodes: wire_nodes,
        },
        commit_secret,
        node_private_keys: node_key_pairs
            .into_iter()
            .map(|(index, pair)| (index, pair.private))
            .collect(),
        leaf_private_key: leaf_pair.private,
        path_secrets,
    })
}

/// Decrypt, verify, and install a sender's update path on the diff.
///
/// `private_keys` maps raw node indices to the private keys this member
/// holds (its own leaf plus previously learned path nodes). All-or-nothing:
/// the diff is only mutated after every check has passed.
#[allow(clippy::too_many_arguments)]
pub(crate) fn apply_update_path(
    suite: CipherSuite,
    diff: &mut TreeDiff<'_, LeafNode, ParentNode>,
    sender: LeafIndex,
    own_leaf: LeafIndex,
    update_path: &UpdatePath,
    private_keys: &BTreeMap<u32, HpkePrivateKey>,
    group_id: &[u8],
    group_context: &[u8],
) -> Result<PathApplication> {
    if diff.leaf(sender)?.is_none() {
        return Err(MlsError::BlankSenderLeaf {
            index: sender.as_u32(),
        });
    }
    if !matches!(update_path.leaf_node.source, LeafNodeSource::Commit(_)) {
        return Err(MlsError::InvalidLeafNode {
            reason: "update path leaf must have source Commit".to_string(),
        });
    }
    update_path.leaf_node.verify(suite, Some((group_id, sender)))?;

    let filtered = filtered_direct_path(diff, sender)?;
    if update_path.nodes.len() != filtered.len() {
        return Err(MlsError::CiphertextCountMismatch {
            expected: filtered.len(),
            actual: update_path.nodes.len(),
        });
    }

    // First node of the sender's filtered path covering this member.
    let overlap = filtered
        .iter()
        .position(|parent| math::is_in_subtree(own_leaf, parent.node()))
        .ok_or(MlsError::NoPathOverlap)?;

    // This member sits under the overlap node's copath child; its position
    // in that child's resolution selects the ciphertext.
    let resolution_entries = resolution(diff, copath_child(filtered[overlap], sender)?)?;
    let ciphertexts = &update_path.nodes[overlap].encrypted_path_secrets;
    if ciphertexts.len() != resolution_entries.len() {
        return Err(MlsError::CiphertextCountMismatch {
            expected: resolution_entries.len(),
            actual: ciphertexts.len(),
        });
    }
    let mut decrypted = None;
    for (position, (node, _)) in resolution_entries.iter().enumerate() {
        if !math::is_in_subtree(own_leaf, *node) {
            continue;
        }
        if let Some(private_key) = private_keys.get(&node.as_u32()) {
            decrypted = Some(hpke::open(
                suite,
                private_key,
                &ciphertexts[position],
                group_context,
                b"",
            )?);
            break;
        }
    }
    let mut chain = Secret::new(
        decrypted.ok_or(MlsError::Crypto(canopy_crypto::CryptoError::HpkeOpenFailure))?,
    );

    // Re-derive the chain upward, checking every transmitted public key.
    let mut node_private_keys = Vec::with_capacity(filtered.len() - overlap);
    for k in overlap..filtered.len() {
        let pair = derive_node_key_pair(suite, &chain)?;
        if pair.public != update_path.nodes[k].encryption_key {
            return Err(MlsError::TreeKemDerivationMismatch {
                node: filtered[k].node().as_u32(),
            });
        }
        node_private_keys.push((filtered[k], pair.private));
        chain = next_path_secret(suite, &chain)?;
    }
    let commit_secret = next_path_secret(suite, &chain)?;

    // Install: blank the direct path, set the transmitted nodes with a
    // recomputed parent-hash chain, and check the leaf links to it.
    diff.blank_path(sender)?;
    let public_keys: Vec<HpkePublicKey> = update_path
        .nodes
        .iter()
        .map(|node| node.encryption_key.clone())
        .collect();
    let (parents, leaf_parent_hash) =
        path_parent_hashes(suite, diff, sender, &filtered, &public_keys)?;
    for (&index, parent) in filtered.iter().zip(parents) {
        diff.replace_parent(index, parent)?;
    }
    match &update_path.leaf_node.source {
        LeafNodeSource::Commit(claimed) if *claimed == leaf_parent_hash => {}
        _ => return Err(MlsError::InvalidParentHash),
    }
    diff.replace_leaf(sender, update_path.leaf_node.clone())?;

    Ok(PathApplication {
        commit_secret,
        node_private_keys,
    })
}

/// Re-derive private keys from a welcomed path secret, walking the joiner's
/// direct path upward from `start` and skipping blank nodes. Derived public
/// keys must match the tree.
pub(crate) fn derive_path_keys_from_secret<V: TreeView>(
    suite: CipherSuite,
    view: &V,
    own_leaf: LeafIndex,
    start: ParentIndex,
    path_secret: Secret,
) -> Result<Vec<(ParentIndex, HpkePrivateKey)>> {
    let mut chain = path_secret;
    let mut keys = Vec::new();
    let mut started = false;
    for parent in math::direct_path(own_leaf, view.view_leaf_count())? {
        if !started {
            if parent != start {
                continue;
            }
            started = true;
        }
        let Some(node) = view.view_parent(parent)? else {
            continue;
        };
        let pair = derive_node_key_pair(suite, &chain)?;
        if pair.public != node.encryption_key {
            return Err(MlsError::TreeKemDerivationMismatch {
                node: parent.node().as_u32(),
            });
        }
        keys.push((parent, pair.private));
        chain = next_path_secret(suite, &chain)?;
    }
    if !started {
        return Err(MlsError::NoPathOverlap);
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::extensions::Extensions;
    use crate::leaf_node::{Capabilities, Lifetime};
    use crate::node::RatchetTree;
    use canopy_crypto::sign;
    use rand::rngs::OsRng;

    const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

    fn test_leaf(identity: &[u8]) -> LeafNode {
        let signature_pair = sign::generate_key_pair(SUITE, &mut OsRng).unwrap();
        let encryption_pair = hpke::generate_key_pair(SUITE, &mut OsRng).unwrap();
        LeafNode::new(
            SUITE,
            &signature_pair.private,
            encryption_pair.public,
            signature_pair.public,
            Credential::basic(identity.to_vec()),
            Capabilities::for_suite(SUITE),
            LeafNodeSource::KeyPackage(Lifetime::unbounded()),
            Extensions::empty(),
            None,
        )
        .unwrap()
    }

    fn test_parent() -> ParentNode {
        let pair = hpke::generate_key_pair(SUITE, &mut OsRng).unwrap();
        ParentNode {
            encryption_key: pair.public,
            parent_hash: Vec::new(),
            unmerged_leaves: Vec::new(),
        }
    }

    /// Four occupied leaves with every parent populated
    fn full_tree() -> RatchetTree {
        let leaves = vec![
            Some(test_leaf(b"a")),
            Some(test_leaf(b"b")),
            Some(test_leaf(b"c")),
            Some(test_leaf(b"d")),
        ];
        let parents = vec![Some(test_parent()), Some(test_parent()), Some(test_parent())];
        RatchetTree::from_parts(leaves, parents).unwrap()
    }

    #[test]
    fn resolution_of_nonblank_node_is_itself() {
        let tree = full_tree();
        let entries = resolution(&tree, NodeIndex::new(1)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, NodeIndex::new(1));
    }

    #[test]
    fn resolution_of_blank_parent_concatenates_children() {
        let mut tree = full_tree();
        let mut diff = tree.diff();
        diff.blank_parent(ParentIndex::new(0)).unwrap();
        let staged = diff.stage();
        tree.merge(staged).unwrap();

        let entries = resolution(&tree, NodeIndex::new(1)).unwrap();
        let nodes: Vec<u32> = entries.iter().map(|(n, _)| n.as_u32()).collect();
        assert_eq!(nodes, vec![0, 2]);
    }

    #[test]
    fn unmerged_leaves_join_their_ancestor_resolution() {
        let mut tree = full_tree();
        let mut diff = tree.diff();
        let mut parent = diff.parent_node(ParentIndex::new(0)).unwrap().unwrap().clone();
        parent.unmerged_leaves.push(LeafIndex::new(1));
        diff.replace_parent(ParentIndex::new(0), parent).unwrap();
        let staged = diff.stage();
        tree.merge(staged).unwrap();

        let entries = resolution(&tree, NodeIndex::new(1)).unwrap();
        let nodes: Vec<u32> = entries.iter().map(|(n, _)| n.as_u32()).collect();
        assert_eq!(nodes, vec![1, 2]);
    }

    #[test]
    fn blanked_subtrees_filter_the_direct_path() {
        // Remove leaves 0 and 1: both leaves blank, their direct paths
        // (nodes 1 and 3) blank. A later commit from leaf 2 then skips
        // the root: its copath child's resolution is empty.
        let mut tree = full_tree();
        let mut diff = tree.diff();
        for removed in [LeafIndex::new(0), LeafIndex::new(1)] {
            diff.blank_leaf(removed).unwrap();
            diff.blank_path(removed).unwrap();
        }
        let staged = diff.stage();
        tree.merge(staged).unwrap();
        assert_eq!(tree.tree_size(), 7);

        let filtered = filtered_direct_path(&tree, LeafIndex::new(2)).unwrap();
        assert_eq!(filtered, vec![ParentIndex::new(2)]);
    }

    #[test]
    fn update_path_round_trips_on_the_wire() {
        let path = UpdatePath {
            leaf_node: test_leaf(b"committer"),
            nodes: vec![UpdatePathNode {
                encryption_key: hpke::generate_key_pair(SUITE, &mut OsRng).unwrap().public,
                encrypted_path_secrets: vec![HpkeCiphertext {
                    kem_output: vec![1; 32],
                    ciphertext: vec![2; 48],
                }],
            }],
        };
        let bytes = path.to_wire().unwrap();
        assert_eq!(UpdatePath::from_wire(&bytes).unwrap(), path);
    }
}
