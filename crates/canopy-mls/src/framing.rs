//! Commit framing
//!
//! Proposals travel inline in the commit that applies them. The framed
//! commit binds `(group_id, epoch, sender, commit)` and the sender's
//! current group context under the `FramedContentTBS` label, and carries
//! the confirmation tag of the epoch it creates.

use crate::error::Result;
use crate::key_package::KeyPackage;
use crate::leaf_node::LeafNode;
use crate::treekem::UpdatePath;
use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{sign, CipherSuite, SignaturePrivateKey, SignaturePublicKey};
use canopy_tree::LeafIndex;

const FRAMED_CONTENT_LABEL: &str = "FramedContentTBS";

const PROPOSAL_ADD: u16 = 1;
const PROPOSAL_UPDATE: u16 = 2;
const PROPOSAL_REMOVE: u16 = 3;

/// A proposed structural change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Proposal {
    /// Add the key package's owner to the tree
    Add {
        /// The joiner's key package
        key_package: KeyPackage,
    },
    /// Replace the sender's leaf in place
    Update {
        /// Replacement leaf (source `Update`)
        leaf_node: LeafNode,
    },
    /// Blank the member's leaf and its direct path
    Remove {
        /// Leaf of the member being removed
        removed: LeafIndex,
    },
}

impl WireEncode for Proposal {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        match self {
            Proposal::Add { key_package } => {
                w.write_u16(PROPOSAL_ADD);
                key_package.encode(w)
            }
            Proposal::Update { leaf_node } => {
                w.write_u16(PROPOSAL_UPDATE);
                leaf_node.encode(w)
            }
            Proposal::Remove { removed } => {
                w.write_u16(PROPOSAL_REMOVE);
                w.write_u32(removed.as_u32());
                Ok(())
            }
        }
    }
}

impl WireDecode for Proposal {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        match r.read_u16()? {
            PROPOSAL_ADD => Ok(Proposal::Add {
                key_package: KeyPackage::decode(r)?,
            }),
            PROPOSAL_UPDATE => Ok(Proposal::Update {
                leaf_node: LeafNode::decode(r)?,
            }),
            PROPOSAL_REMOVE => Ok(Proposal::Remove {
                removed: LeafIndex::new(r.read_u32()?),
            }),
            other => Err(CodecError::malformed(format!(
                "unknown proposal type {other}"
            ))),
        }
    }
}

/// Proposals plus the committer's update path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Structural changes applied by this commit, in order
    pub proposals: Vec<Proposal>,
    /// The committer's path refresh; absent only for proposal-free relays
    pub path: Option<UpdatePath>,
}

impl WireEncode for Commit {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.proposals.encode(w)?;
        self.path.encode(w)
    }
}

impl WireDecode for Commit {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            proposals: Vec::decode(r)?,
            path: Option::decode(r)?,
        })
    }
}

/// A signed, confirmation-tagged commit ready for the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedCommit {
    /// Group the commit belongs to
    pub group_id: Vec<u8>,
    /// Epoch the commit was built against
    pub epoch: u64,
    /// Committer's leaf
    pub sender: LeafIndex,
    /// The commit body
    pub commit: Commit,
    /// Signature over the framed TBS
    pub signature: Vec<u8>,
    /// Confirmation tag of the epoch this commit creates
    pub confirmation_tag: Vec<u8>,
}

impl AuthenticatedCommit {
    /// The framed TBS: wire fields plus the sender's group context
    pub(crate) fn tbs_bytes(
        group_id: &[u8],
        epoch: u64,
        sender: LeafIndex,
        commit: &Commit,
        group_context: &[u8],
    ) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        w.write_bytes32(group_id)?;
        w.write_u64(epoch);
        w.write_u32(sender.as_u32());
        commit.encode(&mut w)?;
        w.write_bytes32(group_context)?;
        Ok(w.into_bytes())
    }

    /// Sign a commit body into an authenticated frame; the confirmation
    /// tag is attached by the caller once the new epoch exists
    pub(crate) fn sign(
        suite: CipherSuite,
        signature_private_key: &SignaturePrivateKey,
        group_id: Vec<u8>,
        epoch: u64,
        sender: LeafIndex,
        commit: Commit,
        group_context: &[u8],
    ) -> Result<Self> {
        let tbs = Self::tbs_bytes(&group_id, epoch, sender, &commit, group_context)?;
        let signature =
            sign::sign_with_label(suite, signature_private_key, FRAMED_CONTENT_LABEL, &tbs)?;
        Ok(Self {
            group_id,
            epoch,
            sender,
            commit,
            signature,
            confirmation_tag: Vec::new(),
        })
    }

    /// Verify the frame signature against the sender's leaf signature key
    pub(crate) fn verify(
        &self,
        suite: CipherSuite,
        sender_key: &SignaturePublicKey,
        group_context: &[u8],
    ) -> Result<()> {
        let tbs = Self::tbs_bytes(
            &self.group_id,
            self.epoch,
            self.sender,
            &self.commit,
            group_context,
        )?;
        sign::verify_with_label(
            suite,
            sender_key,
            FRAMED_CONTENT_LABEL,
            &tbs,
            &self.signature,
        )?;
        Ok(())
    }
}

impl WireEncode for AuthenticatedCommit {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes32(&self.group_id)?;
        w.write_u64(self.epoch);
        w.write_u32(self.sender.as_u32());
        self.commit.encode(w)?;
        w.write_bytes16(&self.signature)?;
        w.write_bytes8(&self.confirmation_tag)
    }
}

impl WireDecode for AuthenticatedCommit {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            group_id: r.read_bytes32()?.to_vec(),
            epoch: r.read_u64()?,
            sender: LeafIndex::new(r.read_u32()?),
            commit: Commit::decode(r)?,
            signature: r.read_bytes16()?.to_vec(),
            confirmation_tag: r.read_bytes8()?.to_vec(),
        })
    }
}
