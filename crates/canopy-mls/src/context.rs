//! Group context
//!
//! The tuple bound into leaf signatures (for update/commit leaves), HPKE
//! `info` for path encryption, and the epoch-secret expansion.

use crate::extensions::Extensions;
use crate::extensions::ProtocolVersion;
use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::CipherSuite;

/// The current shape of the group, hashed into everything
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupContext {
    /// Protocol version
    pub version: ProtocolVersion,
    /// Cipher suite of the group
    pub cipher_suite: CipherSuite,
    /// Application-chosen group identifier
    pub group_id: Vec<u8>,
    /// Monotonically increasing epoch counter
    pub epoch: u64,
    /// Hash of the ratchet tree
    pub tree_hash: Vec<u8>,
    /// Running hash of all confirmed commits
    pub confirmed_transcript_hash: Vec<u8>,
    /// Group-level extensions
    pub extensions: Extensions,
}

impl WireEncode for GroupContext {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.version.encode(w)?;
        self.cipher_suite.encode(w)?;
        w.write_bytes32(&self.group_id)?;
        w.write_u64(self.epoch);
        w.write_bytes8(&self.tree_hash)?;
        w.write_bytes8(&self.confirmed_transcript_hash)?;
        self.extensions.encode(w)
    }
}

impl WireDecode for GroupContext {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self {
            version: ProtocolVersion::decode(r)?,
            cipher_suite: CipherSuite::decode(r)?,
            group_id: r.read_bytes32()?.to_vec(),
            epoch: r.read_u64()?,
            tree_hash: r.read_bytes8()?.to_vec(),
            confirmed_transcript_hash: r.read_bytes8()?.to_vec(),
            extensions: Extensions::decode(r)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let context = GroupContext {
            version: ProtocolVersion::Mls10,
            cipher_suite: CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519,
            group_id: b"nostr-room".to_vec(),
            epoch: 42,
            tree_hash: vec![1u8; 32],
            confirmed_transcript_hash: vec![2u8; 32],
            extensions: Extensions::empty(),
        };
        let bytes = context.to_wire().unwrap();
        assert_eq!(GroupContext::from_wire(&bytes).unwrap(), context);
    }
}
