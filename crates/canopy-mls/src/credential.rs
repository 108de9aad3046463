//! Member credentials
//!
//! Modeled as a tagged union, not a hierarchy; the codec handles the
//! discriminator explicitly. `Basic` is the only variant the core
//! interprets. The `X509` slot carries an uninspected chain so future
//! credential types stay wire-compatible.

use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};

/// Wire discriminator of the basic credential
pub const CREDENTIAL_BASIC: u16 = 1;
/// Wire discriminator of the X.509 credential
pub const CREDENTIAL_X509: u16 = 2;

/// A member's identity claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// A bare application-chosen identity string
    Basic {
        /// Opaque identity bytes
        identity: Vec<u8>,
    },
    /// An X.509 certificate chain, carried but not validated
    X509 {
        /// DER certificates, leaf first
        chain: Vec<Vec<u8>>,
    },
}

impl Credential {
    /// Construct a basic credential
    pub fn basic(identity: impl Into<Vec<u8>>) -> Self {
        Credential::Basic {
            identity: identity.into(),
        }
    }

    /// Wire discriminator of this variant
    pub fn credential_type(&self) -> u16 {
        match self {
            Credential::Basic { .. } => CREDENTIAL_BASIC,
            Credential::X509 { .. } => CREDENTIAL_X509,
        }
    }

    /// Identity bytes for a basic credential
    pub fn identity(&self) -> Option<&[u8]> {
        match self {
            Credential::Basic { identity } => Some(identity),
            Credential::X509 { .. } => None,
        }
    }
}

impl WireEncode for Credential {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        match self {
            Credential::Basic { identity } => {
                w.write_u16(CREDENTIAL_BASIC);
                w.write_bytes16(identity)
            }
            Credential::X509 { chain } => {
                w.write_u16(CREDENTIAL_X509);
                chain.encode(w)
            }
        }
    }
}

impl WireDecode for Credential {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        match r.read_u16()? {
            CREDENTIAL_BASIC => Ok(Credential::Basic {
                identity: r.read_bytes16()?.to_vec(),
            }),
            CREDENTIAL_X509 => Ok(Credential::X509 {
                chain: Vec::<Vec<u8>>::decode(r)?,
            }),
            other => Err(CodecError::malformed(format!(
                "unknown credential type {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_round_trip() {
        let credential = Credential::basic(b"alice".to_vec());
        let bytes = credential.to_wire().unwrap();
        assert_eq!(Credential::from_wire(&bytes).unwrap(), credential);
        assert_eq!(credential.credential_type(), CREDENTIAL_BASIC);
        assert_eq!(credential.identity(), Some(&b"alice"[..]));
    }

    #[test]
    fn x509_round_trip() {
        let credential = Credential::X509 {
            chain: vec![vec![1, 2], vec![3]],
        };
        let bytes = credential.to_wire().unwrap();
        assert_eq!(Credential::from_wire(&bytes).unwrap(), credential);
        assert_eq!(credential.identity(), None);
    }

    #[test]
    fn unknown_discriminator_fails() {
        assert!(Credential::from_wire(&[0x00, 0x09, 0x00]).is_err());
    }
}
