//! Key and secret byte containers
//!
//! Thin newtypes over serialized key material. Public halves are plain
//! bytes; private halves and raw secrets are zeroed when dropped.

use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Serialized HPKE (KEM) public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HpkePublicKey(pub Vec<u8>);

impl HpkePublicKey {
    /// Borrow the raw key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Serialized HPKE (KEM) private key; zeroed on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct HpkePrivateKey(Vec<u8>);

impl HpkePrivateKey {
    /// Wrap raw private key bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HpkePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HpkePrivateKey").field(&"<redacted>").finish()
    }
}

/// An HPKE key pair in serialized form
#[derive(Debug, Clone)]
pub struct HpkeKeyPair {
    /// Public half
    pub public: HpkePublicKey,
    /// Private half
    pub private: HpkePrivateKey,
}

/// Serialized signature public key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SignaturePublicKey(pub Vec<u8>);

impl SignaturePublicKey {
    /// Borrow the raw key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

/// Serialized signature private key; zeroed on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SignaturePrivateKey(Vec<u8>);

impl SignaturePrivateKey {
    /// Wrap raw private key bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Borrow the raw key bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SignaturePrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignaturePrivateKey")
            .field(&"<redacted>")
            .finish()
    }
}

/// A signature key pair in serialized form
#[derive(Debug, Clone)]
pub struct SignatureKeyPair {
    /// Public half
    pub public: SignaturePublicKey,
    /// Private half
    pub private: SignaturePrivateKey,
}

/// A raw derived secret (path secret, epoch secret, ...); zeroed on drop
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wrap raw secret bytes
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// An all-zero secret of the given length
    pub fn zero(len: usize) -> Self {
        Self(vec![0u8; len])
    }

    /// Borrow the raw secret bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Length of the secret in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&"<redacted>").finish()
    }
}

/// Output of an HPKE seal: the KEM encapsulation plus the AEAD ciphertext
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HpkeCiphertext {
    /// KEM shared-secret encapsulation
    pub kem_output: Vec<u8>,
    /// AEAD ciphertext (tag included)
    pub ciphertext: Vec<u8>,
}

impl WireEncode for HpkePublicKey {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.0)
    }
}

impl WireDecode for HpkePublicKey {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self(r.read_bytes16()?.to_vec()))
    }
}

impl WireEncode for HpkePrivateKey {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.0)
    }
}

impl WireDecode for HpkePrivateKey {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self::new(r.read_bytes16()?.to_vec()))
    }
}

impl WireEncode for SignaturePublicKey {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.0)
    }
}

impl WireDecode for SignaturePublicKey {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self(r.read_bytes16()?.to_vec()))
    }
}

impl WireEncode for SignaturePrivateKey {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.0)
    }
}

impl WireDecode for SignaturePrivateKey {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self::new(r.read_bytes16()?.to_vec()))
    }
}

impl WireEncode for Secret {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.0)
    }
}

impl WireDecode for Secret {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self::new(r.read_bytes16()?.to_vec()))
    }
}

impl WireEncode for HpkeCiphertext {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_bytes16(&self.kem_output)?;
        w.write_bytes32(&self.ciphertext)
    }
}

impl WireDecode for HpkeCiphertext {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        let kem_output = r.read_bytes16()?.to_vec();
        let ciphertext = r.read_bytes32()?.to_vec();
        Ok(Self {
            kem_output,
            ciphertext,
        })
    }
}
