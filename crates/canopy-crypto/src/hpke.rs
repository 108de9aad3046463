//! HPKE backend (RFC 9180)
//!
//! Capability surface over the `hpke` crate: single-recipient seal/open in
//! base mode plus deterministic key-pair derivation. Both supported suites
//! pair the X25519-HKDF-SHA256 KEM with HKDF-SHA256; they differ only in
//! the AEAD.

use crate::error::{CryptoError, Result};
use crate::keys::{HpkeCiphertext, HpkeKeyPair, HpkePrivateKey, HpkePublicKey};
use crate::suite::CipherSuite;
use hpke::aead::{Aead, AesGcm128, ChaCha20Poly1305};
use hpke::kdf::HkdfSha256;
use hpke::kem::X25519HkdfSha256;
use hpke::{Deserializable, Kem, OpModeR, OpModeS, Serializable};
use rand::{CryptoRng, RngCore};

fn seal_with<A: Aead>(
    recipient: &HpkePublicKey,
    info: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<HpkeCiphertext> {
    let pk = <X25519HkdfSha256 as Kem>::PublicKey::from_bytes(recipient.as_slice()).map_err(
        |e| CryptoError::InvalidKeySize {
            reason: format!("invalid HPKE public key: {e:?}"),
        },
    )?;
    let (encapped, mut ctx) = hpke::setup_sender::<A, HkdfSha256, X25519HkdfSha256, _>(
        &OpModeS::Base,
        &pk,
        info,
        rng,
    )
    .map_err(|e| CryptoError::HpkeSealFailure {
        reason: format!("HPKE setup failed: {e:?}"),
    })?;
    let ciphertext = ctx
        .seal(plaintext, aad)
        .map_err(|e| CryptoError::HpkeSealFailure {
            reason: format!("HPKE seal failed: {e:?}"),
        })?;
    Ok(HpkeCiphertext {
        kem_output: encapped.to_bytes().to_vec(),
        ciphertext,
    })
}

fn open_with<A: Aead>(
    private: &HpkePrivateKey,
    ciphertext: &HpkeCiphertext,
    info: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    let sk = <X25519HkdfSha256 as Kem>::PrivateKey::from_bytes(private.as_slice()).map_err(
        |e| CryptoError::InvalidKeySize {
            reason: format!("invalid HPKE private key: {e:?}"),
        },
    )?;
    let encapped = <X25519HkdfSha256 as Kem>::EncappedKey::from_bytes(&ciphertext.kem_output)
        .map_err(|_| CryptoError::HpkeOpenFailure)?;
    let mut ctx = hpke::setup_receiver::<A, HkdfSha256, X25519HkdfSha256>(
        &OpModeR::Base,
        &sk,
        &encapped,
        info,
    )
    .map_err(|_| CryptoError::HpkeOpenFailure)?;
    ctx.open(&ciphertext.ciphertext, aad)
        .map_err(|_| CryptoError::HpkeOpenFailure)
}

/// Encrypt `plaintext` to `recipient` in base mode
pub fn seal(
    suite: CipherSuite,
    recipient: &HpkePublicKey,
    info: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<HpkeCiphertext> {
    suite.ensure_supported()?;
    match suite {
        CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519 => {
            seal_with::<AesGcm128>(recipient, info, aad, plaintext, rng)
        }
        CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519 => {
            seal_with::<ChaCha20Poly1305>(recipient, info, aad, plaintext, rng)
        }
        _ => Err(CryptoError::UnsupportedSuite {
            suite: suite.as_u16(),
        }),
    }
}

/// Decrypt an [`HpkeCiphertext`] produced by [`seal`]
pub fn open(
    suite: CipherSuite,
    private: &HpkePrivateKey,
    ciphertext: &HpkeCiphertext,
    info: &[u8],
    aad: &[u8],
) -> Result<Vec<u8>> {
    suite.ensure_supported()?;
    match suite {
        CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519 => {
            open_with::<AesGcm128>(private, ciphertext, info, aad)
        }
        CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519 => {
            open_with::<ChaCha20Poly1305>(private, ciphertext, info, aad)
        }
        _ => Err(CryptoError::UnsupportedSuite {
            suite: suite.as_u16(),
        }),
    }
}

/// Deterministically derive a KEM key pair from input keying material
/// (RFC 9180 `DeriveKeyPair`)
pub fn derive_key_pair(suite: CipherSuite, ikm: &[u8]) -> Result<HpkeKeyPair> {
    suite.ensure_supported()?;
    let (sk, pk) = X25519HkdfSha256::derive_keypair(ikm);
    Ok(HpkeKeyPair {
        public: HpkePublicKey(pk.to_bytes().to_vec()),
        private: HpkePrivateKey::new(sk.to_bytes().to_vec()),
    })
}

/// Sample a fresh KEM key pair
pub fn generate_key_pair(
    suite: CipherSuite,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<HpkeKeyPair> {
    suite.ensure_supported()?;
    let (sk, pk) = X25519HkdfSha256::gen_keypair(rng);
    Ok(HpkeKeyPair {
        public: HpkePublicKey(pk.to_bytes().to_vec()),
        private: HpkePrivateKey::new(sk.to_bytes().to_vec()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

    #[test]
    fn seal_open_round_trip() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let ct = seal(SUITE, &pair.public, b"info", b"aad", b"path secret", &mut OsRng).unwrap();
        let pt = open(SUITE, &pair.private, &ct, b"info", b"aad").unwrap();
        assert_eq!(pt, b"path secret");
    }

    #[test]
    fn wrong_info_fails_open() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let ct = seal(SUITE, &pair.public, b"info", b"", b"secret", &mut OsRng).unwrap();
        assert_eq!(
            open(SUITE, &pair.private, &ct, b"other", b""),
            Err(CryptoError::HpkeOpenFailure)
        );
    }

    #[test]
    fn wrong_key_fails_open() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let other = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let ct = seal(SUITE, &pair.public, b"info", b"", b"secret", &mut OsRng).unwrap();
        assert!(open(SUITE, &other.private, &ct, b"info", b"").is_err());
    }

    #[test]
    fn chacha_suite_round_trips() {
        let suite = CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519;
        let pair = generate_key_pair(suite, &mut OsRng).unwrap();
        let ct = seal(suite, &pair.public, b"", b"", b"secret", &mut OsRng).unwrap();
        assert_eq!(open(suite, &pair.private, &ct, b"", b"").unwrap(), b"secret");
    }

    #[test]
    fn derive_key_pair_is_deterministic() {
        let a = derive_key_pair(SUITE, &[9u8; 32]).unwrap();
        let b = derive_key_pair(SUITE, &[9u8; 32]).unwrap();
        assert_eq!(a.public, b.public);
        let c = derive_key_pair(SUITE, &[8u8; 32]).unwrap();
        assert_ne!(a.public, c.public);
    }

    #[test]
    fn unsupported_kem_is_rejected() {
        let suite = CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448;
        assert!(matches!(
            derive_key_pair(suite, &[0u8; 64]),
            Err(CryptoError::UnsupportedSuite { .. })
        ));
    }
}
