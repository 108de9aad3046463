//! Cipher-suite enumeration and per-suite constants
//!
//! A cipher suite is a single `u16` identifier binding a hash, an HKDF, a
//! signature scheme, and an HPKE triple (KEM, KDF, AEAD). The full registry
//! is enumerated here; [`CipherSuite::is_supported`] reports the subset the
//! backend actually serves.

use crate::error::{CryptoError, Result};
use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Hash function bound into a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256, 32-byte output
    Sha256,
    /// SHA-384, 48-byte output
    Sha384,
    /// SHA-512, 64-byte output
    Sha512,
}

/// Signature scheme bound into a suite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureScheme {
    /// EdDSA over edwards25519
    Ed25519,
    /// EdDSA over edwards448
    Ed448,
    /// ECDSA over P-256 with SHA-256
    EcdsaSecp256r1Sha256,
    /// ECDSA over P-384 with SHA-384
    EcdsaSecp384r1Sha384,
    /// ECDSA over P-521 with SHA-512
    EcdsaSecp521r1Sha512,
}

/// The MLS cipher-suite registry, plus the post-quantum hybrid draft entry.
///
/// Names follow the registry spelling to keep suite identities greppable;
/// the spellings are the documentation.
#[allow(non_camel_case_types, missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CipherSuite {
    MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519 = 0x0001,
    MLS_128_DHKEMP256_AES128GCM_SHA256_P256 = 0x0002,
    MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519 = 0x0003,
    MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448 = 0x0004,
    MLS_256_DHKEMP521_AES256GCM_SHA512_P521 = 0x0005,
    MLS_256_DHKEMX448_CHACHA20POLY1305_SHA512_Ed448 = 0x0006,
    MLS_256_DHKEMP384_AES256GCM_SHA384_P384 = 0x0007,
    MLS_128_X25519KYBER768DRAFT00_AES128GCM_SHA256_Ed25519 = 0x004d,
}

impl CipherSuite {
    /// All enumerated suites
    pub fn all() -> [CipherSuite; 8] {
        [
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519,
            CipherSuite::MLS_128_DHKEMP256_AES128GCM_SHA256_P256,
            CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519,
            CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448,
            CipherSuite::MLS_256_DHKEMP521_AES256GCM_SHA512_P521,
            CipherSuite::MLS_256_DHKEMX448_CHACHA20POLY1305_SHA512_Ed448,
            CipherSuite::MLS_256_DHKEMP384_AES256GCM_SHA384_P384,
            CipherSuite::MLS_128_X25519KYBER768DRAFT00_AES128GCM_SHA256_Ed25519,
        ]
    }

    /// Wire identifier of the suite
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Whether the backend can serve this suite end to end.
    ///
    /// The backend pairs an X25519 HPKE KEM with Ed25519 signatures; suites
    /// needing Ed448/ECDSA signers or P-384/P-521/X448/Kyber KEMs are
    /// enumerated but rejected at use.
    pub fn is_supported(self) -> bool {
        matches!(
            self,
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519
                | CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519
        )
    }

    /// Fail with [`CryptoError::UnsupportedSuite`] unless the suite is served
    pub fn ensure_supported(self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(CryptoError::UnsupportedSuite {
                suite: self.as_u16(),
            })
        }
    }

    /// Hash function of the suite
    pub fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519
            | CipherSuite::MLS_128_DHKEMP256_AES128GCM_SHA256_P256
            | CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519
            | CipherSuite::MLS_128_X25519KYBER768DRAFT00_AES128GCM_SHA256_Ed25519 => {
                HashAlgorithm::Sha256
            }
            CipherSuite::MLS_256_DHKEMP384_AES256GCM_SHA384_P384 => HashAlgorithm::Sha384,
            CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448
            | CipherSuite::MLS_256_DHKEMP521_AES256GCM_SHA512_P521
            | CipherSuite::MLS_256_DHKEMX448_CHACHA20POLY1305_SHA512_Ed448 => {
                HashAlgorithm::Sha512
            }
        }
    }

    /// Signature scheme of the suite
    pub fn signature_scheme(self) -> SignatureScheme {
        match self {
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519
            | CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519
            | CipherSuite::MLS_128_X25519KYBER768DRAFT00_AES128GCM_SHA256_Ed25519 => {
                SignatureScheme::Ed25519
            }
            CipherSuite::MLS_128_DHKEMP256_AES128GCM_SHA256_P256 => {
                SignatureScheme::EcdsaSecp256r1Sha256
            }
            CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448
            | CipherSuite::MLS_256_DHKEMX448_CHACHA20POLY1305_SHA512_Ed448 => {
                SignatureScheme::Ed448
            }
            CipherSuite::MLS_256_DHKEMP384_AES256GCM_SHA384_P384 => {
                SignatureScheme::EcdsaSecp384r1Sha384
            }
            CipherSuite::MLS_256_DHKEMP521_AES256GCM_SHA512_P521 => {
                SignatureScheme::EcdsaSecp521r1Sha512
            }
        }
    }

    /// Output length `Nh` of the suite hash, in bytes
    pub fn hash_len(self) -> usize {
        match self.hash_algorithm() {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha384 => 48,
            HashAlgorithm::Sha512 => 64,
        }
    }

    /// AEAD key length of the suite, in bytes
    pub fn aead_key_len(self) -> usize {
        match self {
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519
            | CipherSuite::MLS_128_DHKEMP256_AES128GCM_SHA256_P256
            | CipherSuite::MLS_128_X25519KYBER768DRAFT00_AES128GCM_SHA256_Ed25519 => 16,
            _ => 32,
        }
    }

    /// AEAD nonce length of the suite, in bytes
    pub fn aead_nonce_len(self) -> usize {
        12
    }

    /// Hash `data` with the suite hash
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self.hash_algorithm() {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// HMAC over `data` with the suite hash
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        let key_error = |e: hmac::digest::InvalidLength| CryptoError::DerivationFailure {
            reason: format!("HMAC key setup failed: {e}"),
        };
        match self.hash_algorithm() {
            HashAlgorithm::Sha256 => {
                let mut m = Hmac::<Sha256>::new_from_slice(key).map_err(key_error)?;
                m.update(data);
                Ok(m.finalize().into_bytes().to_vec())
            }
            HashAlgorithm::Sha384 => {
                let mut m = Hmac::<Sha384>::new_from_slice(key).map_err(key_error)?;
                m.update(data);
                Ok(m.finalize().into_bytes().to_vec())
            }
            HashAlgorithm::Sha512 => {
                let mut m = Hmac::<Sha512>::new_from_slice(key).map_err(key_error)?;
                m.update(data);
                Ok(m.finalize().into_bytes().to_vec())
            }
        }
    }
}

impl TryFrom<u16> for CipherSuite {
    type Error = CryptoError;

    fn try_from(value: u16) -> Result<Self> {
        CipherSuite::all()
            .into_iter()
            .find(|suite| suite.as_u16() == value)
            .ok_or(CryptoError::UnsupportedSuite { suite: value })
    }
}

impl WireEncode for CipherSuite {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_u16(self.as_u16());
        Ok(())
    }
}

impl WireDecode for CipherSuite {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        let raw = r.read_u16()?;
        CipherSuite::try_from(raw)
            .map_err(|_| CodecError::malformed(format!("unknown cipher suite 0x{raw:04x}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_complete() {
        assert_eq!(CipherSuite::all().len(), 8);
        for suite in CipherSuite::all() {
            assert_eq!(CipherSuite::try_from(suite.as_u16()).unwrap(), suite);
        }
        assert!(CipherSuite::try_from(0x0042).is_err());
    }

    #[test]
    fn supported_subset() {
        let supported: Vec<_> = CipherSuite::all()
            .into_iter()
            .filter(|s| s.is_supported())
            .collect();
        assert_eq!(
            supported,
            vec![
                CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519,
                CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519,
            ]
        );
    }

    #[test]
    fn hash_lengths() {
        assert_eq!(
            CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519.hash_len(),
            32
        );
        assert_eq!(
            CipherSuite::MLS_256_DHKEMP384_AES256GCM_SHA384_P384.hash_len(),
            48
        );
        assert_eq!(
            CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448.hash_len(),
            64
        );
    }
}
