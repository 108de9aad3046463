//! Leaf nodes
//!
//! A leaf carries a member's HPKE encryption key, signature key,
//! credential, declared capability set, source discriminator, and a
//! signature over the to-be-signed projection. The TBS of a leaf born in
//! a key package stands alone; a leaf installed by an update or commit is
//! additionally bound to `(group_id, leaf_index)`.

use crate::credential::Credential;
use crate::error::{MlsError, Result};
use crate::extensions::Extensions;
use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{sign, CipherSuite, HpkePublicKey, SignaturePrivateKey, SignaturePublicKey};
use canopy_tree::LeafIndex;

const LEAF_NODE_LABEL: &str = "LeafNodeTBS";

const SOURCE_KEY_PACKAGE: u16 = 1;
const SOURCE_UPDATE: u16 = 2;
const SOURCE_COMMIT: u16 = 3;

/// Validity window of a key-package leaf, in seconds since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lifetime {
    /// Earliest acceptable time
    pub not_before: u64,
    /// Latest acceptable time
    pub not_after: u64,
}

impl Lifetime {
    /// A lifetime accepting any time
    pub fn unbounded() -> Self {
        Self {
            not_before: 0,
            not_after: u64::MAX,
        }
    }
}

impl WireEncode for Lifetime {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_u64(self.not_before);
        w.write_u64(self.not_after);
        Ok(())
    }
}

impl WireDecode for Lifetime {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            not_before: r.read_u64()?,
            not_after: r.read_u64()?,
        })
    }
}

/// What a member declares it can handle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Supported protocol versions
    pub versions: Vec<u16>,
    /// Supported cipher suites
    pub cipher_suites: Vec<u16>,
    /// Supported extension types
    pub extensions: Vec<u16>,
    /// Supported proposal types
    pub proposals: Vec<u16>,
    /// Supported credential types
    pub credentials: Vec<u16>,
}

impl Capabilities {
    /// The minimal capability set for one suite: MLS 1.0, the suite, and
    /// basic credentials
    pub fn for_suite(suite: CipherSuite) -> Self {
        Self {
            versions: vec![crate::extensions::ProtocolVersion::Mls10.as_u16()],
            cipher_suites: vec![suite.as_u16()],
            extensions: Vec::new(),
            proposals: Vec::new(),
            credentials: vec![crate::credential::CREDENTIAL_BASIC],
        }
    }

    /// Whether the set covers the given version and suite
    pub fn supports(&self, version: u16, suite: CipherSuite) -> bool {
        self.versions.contains(&version) && self.cipher_suites.contains(&suite.as_u16())
    }
}

impl WireEncode for Capabilities {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.versions.encode(w)?;
        self.cipher_suites.encode(w)?;
        self.extensions.encode(w)?;
        self.proposals.encode(w)?;
        self.credentials.encode(w)
    }
}

impl WireDecode for Capabilities {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            versions: Vec::decode(r)?,
            cipher_suites: Vec::decode(r)?,
            extensions: Vec::decode(r)?,
            proposals: Vec::decode(r)?,
            credentials: Vec::decode(r)?,
        })
    }
}

/// How a leaf entered the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafNodeSource {
    /// Born inside a key package, awaiting an Add
    KeyPackage(Lifetime),
    /// Replaced in place by an update proposal
    Update,
    /// Installed by a commit's update path; carries the leaf parent hash
    Commit(Vec<u8>),
}

impl LeafNodeSource {
    /// Whether this source's TBS is bound to `(group_id, leaf_index)`
    fn requires_group_binding(&self) -> bool {
        !matches!(self, LeafNodeSource::KeyPackage(_))
    }
}

impl WireEncode for LeafNodeSource {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        match self {
            LeafNodeSource::KeyPackage(lifetime) => {
                w.write_u16(SOURCE_KEY_PACKAGE);
                lifetime.encode(w)
            }
            LeafNodeSource::Update => {
                w.write_u16(SOURCE_UPDATE);
                Ok(())
            }
            LeafNodeSource::Commit(parent_hash) => {
                w.write_u16(SOURCE_COMMIT);
                w.write_bytes8(parent_hash)
            }
        }
    }
}

impl WireDecode for LeafNodeSource {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        match r.read_u16()? {
            SOURCE_KEY_PACKAGE => Ok(LeafNodeSource::KeyPackage(Lifetime::decode(r)?)),
            SOURCE_UPDATE => Ok(LeafNodeSource::Update),
            SOURCE_COMMIT => Ok(LeafNodeSource::Commit(r.read_bytes8()?.to_vec())),
            other => Err(CodecError::malformed(format!(
                "unknown leaf node source {other}"
            ))),
        }
    }
}

/// A tree leaf describing one member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    /// HPKE public key receiving path secrets
    pub encryption_key: HpkePublicKey,
    /// Public key verifying this leaf's signatures
    pub signature_key: SignaturePublicKey,
    /// The member's identity claim
    pub credential: Credential,
    /// Declared capability set
    pub capabilities: Capabilities,
    /// How the leaf entered the tree
    pub source: LeafNodeSource,
    /// Uninterpreted leaf extensions
    pub extensions: Extensions,
    /// Signature over the TBS projection
    pub signature: Vec<u8>,
}

fn encode_tbs(
    w: &mut WireWriter,
    encryption_key: &HpkePublicKey,
    signature_key: &SignaturePublicKey,
    credential: &Credential,
    capabilities: &Capabilities,
    source: &LeafNodeSource,
    extensions: &Extensions,
    binding: Option<(&[u8], LeafIndex)>,
) -> canopy_codec::Result<()> {
    encryption_key.encode(w)?;
    signature_key.encode(w)?;
    credential.encode(w)?;
    capabilities.encode(w)?;
    source.encode(w)?;
    extensions.encode(w)?;
    if let Some((group_id, leaf_index)) = binding {
        w.write_bytes32(group_id)?;
        w.write_u32(leaf_index.as_u32());
    }
    Ok(())
}

impl LeafNode {
    /// Build and sign a leaf node. Sources other than `KeyPackage` must be
    /// bound to `(group_id, leaf_index)`; a `KeyPackage` source must not.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        suite: CipherSuite,
        signature_private_key: &SignaturePrivateKey,
        encryption_key: HpkePublicKey,
        signature_key: SignaturePublicKey,
        credential: Credential,
        capabilities: Capabilities,
        source: LeafNodeSource,
        extensions: Extensions,
        binding: Option<(&[u8], LeafIndex)>,
    ) -> Result<Self> {
        if source.requires_group_binding() != binding.is_some() {
            return Err(MlsError::InvalidLeafNode {
                reason: "group binding does not match leaf node source".to_string(),
            });
        }
        let mut w = WireWriter::new();
        encode_tbs(
            &mut w,
            &encryption_key,
            &signature_key,
            &credential,
            &capabilities,
            &source,
            &extensions,
            binding,
        )?;
        let signature = sign::sign_with_label(
            suite,
            signature_private_key,
            LEAF_NODE_LABEL,
            &w.into_bytes(),
        )?;
        Ok(Self {
            encryption_key,
            signature_key,
            credential,
            capabilities,
            source,
            extensions,
            signature,
        })
    }

    /// The TBS bytes this leaf's signature covers
    pub fn tbs_bytes(&self, binding: Option<(&[u8], LeafIndex)>) -> Result<Vec<u8>> {
        if self.source.requires_group_binding() != binding.is_some() {
            return Err(MlsError::InvalidLeafNode {
                reason: "group binding does not match leaf node source".to_string(),
            });
        }
        let mut w = WireWriter::new();
        encode_tbs(
            &mut w,
            &self.encryption_key,
            &self.signature_key,
            &self.credential,
            &self.capabilities,
            &self.source,
            &self.extensions,
            binding,
        )?;
        Ok(w.into_bytes())
    }

    /// Verify the leaf signature and that the capability set covers the
    /// version and suite in use
    pub fn verify(&self, suite: CipherSuite, binding: Option<(&[u8], LeafIndex)>) -> Result<()> {
        if !self
            .capabilities
            .supports(crate::extensions::ProtocolVersion::Mls10.as_u16(), suite)
        {
            return Err(MlsError::InvalidCapability {
                reason: format!(
                    "leaf does not declare MLS 1.0 with suite 0x{:04x}",
                    suite.as_u16()
                ),
            });
        }
        let tbs = self.tbs_bytes(binding)?;
        sign::verify_with_label(
            suite,
            &self.signature_key,
            LEAF_NODE_LABEL,
            &tbs,
            &self.signature,
        )?;
        Ok(())
    }
}

impl WireEncode for LeafNode {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.encryption_key.encode(w)?;
        self.signature_key.encode(w)?;
        self.credential.encode(w)?;
        self.capabilities.encode(w)?;
        self.source.encode(w)?;
        self.extensions.encode(w)?;
        w.write_bytes16(&self.signature)
    }
}

impl WireDecode for LeafNode {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            encryption_key: HpkePublicKey::decode(r)?,
            signature_key: SignaturePublicKey::decode(r)?,
            credential: Credential::decode(r)?,
            capabilities: Capabilities::decode(r)?,
            source: LeafNodeSource::decode(r)?,
            extensions: Extensions::decode(r)?,
            signature: r.read_bytes16()?.to_vec(),
        })
    }
}
