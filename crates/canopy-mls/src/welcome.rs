//! Welcome messages
//!
//! A committer welcomes each added member with the joiner secret (and the
//! path secret of their common ancestor) sealed to the member's init key,
//! plus a group-info body sealed under the welcome key so the joiner can
//! rebuild the tree and verify it landed in the right epoch.

use crate::context::GroupContext;
use crate::error::Result;
use crate::node::TreeNode;
use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{sign, CipherSuite, HpkeCiphertext, Secret, SignaturePrivateKey,
    SignaturePublicKey};
use canopy_tree::LeafIndex;

const GROUP_INFO_LABEL: &str = "GroupInfoTBS";

/// Secrets a joiner needs to enter the new epoch
#[derive(Debug, Clone)]
pub struct GroupSecrets {
    /// Joiner secret of the epoch the welcome creates
    pub joiner_secret: Secret,
    /// Path secret of the common ancestor with the committer, when the
    /// committer refreshed a path
    pub path_secret: Option<Secret>,
}

impl WireEncode for GroupSecrets {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.joiner_secret.encode(w)?;
        self.path_secret.encode(w)
    }
}

impl WireDecode for GroupSecrets {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            joiner_secret: Secret::decode(r)?,
            path_secret: Option::decode(r)?,
        })
    }
}

/// [`GroupSecrets`] sealed to one joiner's init key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedGroupSecrets {
    /// Suite-hash reference of the joiner's key package
    pub new_member: Vec<u8>,
    /// HPKE ciphertext over the encoded group secrets
    pub encrypted_group_secrets: HpkeCiphertext,
}

impl WireEncode for EncryptedGroupSecrets {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes8(&self.new_member)?;
        self.encrypted_group_secrets.encode(w)
    }
}

impl WireDecode for EncryptedGroupSecrets {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            new_member: r.read_bytes8()?.to_vec(),
            encrypted_group_secrets: HpkeCiphertext::decode(r)?,
        })
    }
}

/// Everything a joiner needs to reconstruct the new epoch's public state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Context of the epoch the welcome creates
    pub group_context: GroupContext,
    /// Public ratchet tree, in array order
    pub tree: Vec<Option<TreeNode>>,
    /// Confirmation tag of the new epoch
    pub confirmation_tag: Vec<u8>,
    /// Leaf of the committer who signed this group info
    pub signer: LeafIndex,
    /// Signature over the TBS
    pub signature: Vec<u8>,
}

impl GroupInfo {
    fn tbs_bytes(
        group_context: &GroupContext,
        tree: &[Option<TreeNode>],
        confirmation_tag: &[u8],
        signer: LeafIndex,
    ) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        group_context.encode(&mut w)?;
        let count = u32::try_from(tree.len())
            .map_err(|_| canopy_codec::CodecError::malformed("tree exceeds u32 slot count"))?;
        w.write_u32(count);
        for slot in tree {
            slot.encode(&mut w)?;
        }
        w.write_bytes8(confirmation_tag)?;
        w.write_u32(signer.as_u32());
        Ok(w.into_bytes())
    }

    /// Build and sign a group info for the given epoch state
    pub(crate) fn sign(
        suite: CipherSuite,
        signature_private_key: &SignaturePrivateKey,
        group_context: GroupContext,
        tree: Vec<Option<TreeNode>>,
        confirmation_tag: Vec<u8>,
        signer: LeafIndex,
    ) -> Result<Self> {
        let tbs = Self::tbs_bytes(&group_context, &tree, &confirmation_tag, signer)?;
        let signature =
            sign::sign_with_label(suite, signature_private_key, GROUP_INFO_LABEL, &tbs)?;
        Ok(Self {
            group_context,
            tree,
            confirmation_tag,
            signer,
            signature,
        })
    }

    /// Verify the signature against the signer's leaf signature key
    pub(crate) fn verify(&self, suite: CipherSuite, signer_key: &SignaturePublicKey) -> Result<()> {
        let tbs = Self::tbs_bytes(
            &self.group_context,
            &self.tree,
            &self.confirmation_tag,
            self.signer,
        )?;
        sign::verify_with_label(suite, signer_key, GROUP_INFO_LABEL, &tbs, &self.signature)?;
        Ok(())
    }
}

impl WireEncode for GroupInfo {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.group_context.encode(w)?;
        self.tree.encode(w)?;
        w.write_bytes8(&self.confirmation_tag)?;
        w.write_u32(self.signer.as_u32());
        w.write_bytes16(&self.signature)
    }
}

impl WireDecode for GroupInfo {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            group_context: GroupContext::decode(r)?,
            tree: Vec::decode(r)?,
            confirmation_tag: r.read_bytes8()?.to_vec(),
            signer: LeafIndex::new(r.read_u32()?),
            signature: r.read_bytes16()?.to_vec(),
        })
    }
}

/// The message conveying a new epoch to added members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Welcome {
    /// Suite of the group being joined
    pub cipher_suite: CipherSuite,
    /// One sealed [`GroupSecrets`] per added member
    pub secrets: Vec<EncryptedGroupSecrets>,
    /// [`GroupInfo`] sealed under the welcome key and nonce
    pub encrypted_group_info: Vec<u8>,
}

impl WireEncode for Welcome {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.cipher_suite.encode(w)?;
        self.secrets.encode(w)?;
        w.write_bytes32(&self.encrypted_group_info)
    }
}

impl WireDecode for Welcome {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            cipher_suite: CipherSuite::decode(r)?,
            secrets: Vec::decode(r)?,
            encrypted_group_info: r.read_bytes32()?.to_vec(),
        })
    }
}
