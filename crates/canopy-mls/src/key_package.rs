//! Key packages
//!
//! A key package advertises a prospective member: protocol version, suite,
//! HPKE init key, leaf node, and extensions, signed under `KeyPackageTBS`.
//! The producer keeps a [`KeyPackageBundle`] holding the three private
//! keys. Consumers verify both the outer and the leaf signature before
//! using a package to add its owner.

use crate::credential::Credential;
use crate::error::{MlsError, Result};
use crate::extensions::{Extensions, ProtocolVersion, EXTENSION_LAST_RESORT};
use crate::leaf_node::{Capabilities, LeafNode, LeafNodeSource, Lifetime};
use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{
    hpke, sign, CipherSuite, HpkePrivateKey, HpkePublicKey, SignaturePrivateKey,
};
use rand::{CryptoRng, RngCore};

const KEY_PACKAGE_LABEL: &str = "KeyPackageTBS";

/// A signed init-key bundle advertising a prospective member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPackage {
    /// Protocol version the package was built for
    pub version: ProtocolVersion,
    /// Cipher suite binding all key material
    pub cipher_suite: CipherSuite,
    /// HPKE key welcoming secrets are sealed to
    pub init_key: HpkePublicKey,
    /// The leaf node that will enter the tree on Add
    pub leaf_node: LeafNode,
    /// Uninterpreted key-package extensions
    pub extensions: Extensions,
    /// Signature over the outer TBS
    pub signature: Vec<u8>,
}

impl KeyPackage {
    fn tbs_bytes(
        version: ProtocolVersion,
        cipher_suite: CipherSuite,
        init_key: &HpkePublicKey,
        leaf_node: &LeafNode,
        extensions: &Extensions,
    ) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        version.encode(&mut w)?;
        cipher_suite.encode(&mut w)?;
        init_key.encode(&mut w)?;
        leaf_node.encode(&mut w)?;
        extensions.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Verify both signatures and the structural invariants
    pub fn verify(&self, suite: CipherSuite) -> Result<()> {
        if self.cipher_suite != suite {
            return Err(MlsError::InvalidKeyPackage {
                reason: format!(
                    "key package is for suite 0x{:04x}, group uses 0x{:04x}",
                    self.cipher_suite.as_u16(),
                    suite.as_u16()
                ),
            });
        }
        if !matches!(self.leaf_node.source, LeafNodeSource::KeyPackage(_)) {
            return Err(MlsError::InvalidKeyPackage {
                reason: "leaf node source must be KeyPackage".to_string(),
            });
        }
        if self.init_key == self.leaf_node.encryption_key {
            return Err(MlsError::InvalidKeyPackage {
                reason: "init key must differ from the leaf encryption key".to_string(),
            });
        }
        self.leaf_node.verify(suite, None)?;
        let tbs = Self::tbs_bytes(
            self.version,
            self.cipher_suite,
            &self.init_key,
            &self.leaf_node,
            &self.extensions,
        )?;
        sign::verify_with_label(
            suite,
            &self.leaf_node.signature_key,
            KEY_PACKAGE_LABEL,
            &tbs,
            &self.signature,
        )?;
        Ok(())
    }

    /// Suite-hash reference identifying this package in welcomes
    pub fn hash_ref(&self) -> Result<Vec<u8>> {
        Ok(self.cipher_suite.hash(&self.to_wire()?))
    }

    /// Whether the package opts into reuse by multiple joiners
    pub fn is_last_resort(&self) -> bool {
        self.extensions.contains(EXTENSION_LAST_RESORT)
    }
}

impl WireEncode for KeyPackage {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.version.encode(w)?;
        self.cipher_suite.encode(w)?;
        self.init_key.encode(w)?;
        self.leaf_node.encode(w)?;
        self.extensions.encode(w)?;
        w.write_bytes16(&self.signature)
    }
}

impl WireDecode for KeyPackage {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            version: ProtocolVersion::decode(r)?,
            cipher_suite: CipherSuite::decode(r)?,
            init_key: HpkePublicKey::decode(r)?,
            leaf_node: LeafNode::decode(r)?,
            extensions: Extensions::decode(r)?,
            signature: r.read_bytes16()?.to_vec(),
        })
    }
}

/// A key package plus the producer's three private keys
#[derive(Debug, Clone)]
pub struct KeyPackageBundle {
    /// The public package
    pub key_package: KeyPackage,
    /// Private half of the init key
    pub init_private_key: HpkePrivateKey,
    /// Private half of the leaf encryption key
    pub encryption_private_key: HpkePrivateKey,
    /// Private half of the leaf signature key
    pub signature_private_key: SignaturePrivateKey,
}

impl KeyPackageBundle {
    /// Generate fresh key material and produce a signed key package
    pub fn generate(
        suite: CipherSuite,
        credential: Credential,
        lifetime: Lifetime,
        extensions: Extensions,
        rng: &mut (impl CryptoRng + RngCore),
    ) -> Result<Self> {
        suite.ensure_supported()?;
        let signature_pair = sign::generate_key_pair(suite, rng)?;
        let init_pair = hpke::generate_key_pair(suite, rng)?;
        let encryption_pair = hpke::generate_key_pair(suite, rng)?;

        let leaf_node = LeafNode::new(
            suite,
            &signature_pair.private,
            encryption_pair.public,
            signature_pair.public,
            credential,
            Capabilities::for_suite(suite),
            LeafNodeSource::KeyPackage(lifetime),
            Extensions::empty(),
            None,
        )?;

        let tbs = KeyPackage::tbs_bytes(
            ProtocolVersion::Mls10,
            suite,
            &init_pair.public,
            &leaf_node,
            &extensions,
        )?;
        let signature =
            sign::sign_with_label(suite, &signature_pair.private, KEY_PACKAGE_LABEL, &tbs)?;

        Ok(Self {
            key_package: KeyPackage {
                version: ProtocolVersion::Mls10,
                cipher_suite: suite,
                init_key: init_pair.public,
                leaf_node,
                extensions,
                signature,
            },
            init_private_key: init_pair.private,
            encryption_private_key: encryption_pair.private,
            signature_private_key: signature_pair.private,
        })
    }
}
