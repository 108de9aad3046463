//! Labeled signing and verification
//!
//! Signatures cover a label structure, never raw content:
//!
//! ```text
//! SignContent = bytes8("MLS 1.0 " + label) || bytes32(content)
//! ```
//!
//! Only the Ed25519 scheme is backed; suites binding Ed448 or ECDSA fail
//! with `UnsupportedSuite`.

use crate::error::{CryptoError, Result};
use crate::keys::{SignatureKeyPair, SignaturePrivateKey, SignaturePublicKey};
use crate::suite::{CipherSuite, SignatureScheme};
use canopy_codec::WireWriter;
use ed25519_dalek::{Signer, Verifier};
use rand::{CryptoRng, RngCore};

fn sign_content(label: &str, content: &[u8]) -> Result<Vec<u8>> {
    let full_label = format!("MLS 1.0 {label}");
    let mut w = WireWriter::new();
    w.write_bytes8(full_label.as_bytes())
        .map_err(|e| CryptoError::SignatureFailure {
            reason: format!("label encoding failed: {e}"),
        })?;
    w.write_bytes32(content)
        .map_err(|e| CryptoError::SignatureFailure {
            reason: format!("content encoding failed: {e}"),
        })?;
    Ok(w.into_bytes())
}

fn ensure_ed25519(suite: CipherSuite) -> Result<()> {
    if suite.signature_scheme() == SignatureScheme::Ed25519 && suite.is_supported() {
        Ok(())
    } else {
        Err(CryptoError::UnsupportedSuite {
            suite: suite.as_u16(),
        })
    }
}

fn signing_key(private: &SignaturePrivateKey) -> Result<ed25519_dalek::SigningKey> {
    let bytes: [u8; 32] =
        private
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize {
                reason: format!(
                    "Ed25519 private key must be 32 bytes, got {}",
                    private.as_slice().len()
                ),
            })?;
    Ok(ed25519_dalek::SigningKey::from_bytes(&bytes))
}

/// Generate a fresh signature key pair for the suite
pub fn generate_key_pair(
    suite: CipherSuite,
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<SignatureKeyPair> {
    ensure_ed25519(suite)?;
    let signing = ed25519_dalek::SigningKey::generate(rng);
    Ok(SignatureKeyPair {
        public: SignaturePublicKey(signing.verifying_key().to_bytes().to_vec()),
        private: SignaturePrivateKey::new(signing.to_bytes().to_vec()),
    })
}

/// `SignWithLabel(sk, label, content)`
pub fn sign_with_label(
    suite: CipherSuite,
    private: &SignaturePrivateKey,
    label: &str,
    content: &[u8],
) -> Result<Vec<u8>> {
    ensure_ed25519(suite)?;
    let message = sign_content(label, content)?;
    let key = signing_key(private)?;
    let signature = key
        .try_sign(&message)
        .map_err(|e| CryptoError::SignatureFailure {
            reason: format!("Ed25519 signing failed: {e}"),
        })?;
    Ok(signature.to_bytes().to_vec())
}

/// `VerifyWithLabel(pk, label, content, signature)`
pub fn verify_with_label(
    suite: CipherSuite,
    public: &SignaturePublicKey,
    label: &str,
    content: &[u8],
    signature: &[u8],
) -> Result<()> {
    ensure_ed25519(suite)?;
    let message = sign_content(label, content)?;
    let bytes: [u8; 32] =
        public
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeySize {
                reason: format!(
                    "Ed25519 public key must be 32 bytes, got {}",
                    public.as_slice().len()
                ),
            })?;
    let key =
        ed25519_dalek::VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidKeySize {
            reason: "Ed25519 public key is not a valid curve point".to_string(),
        })?;
    let signature = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| CryptoError::InvalidSignature)?;
    key.verify(&message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

    #[test]
    fn sign_verify_round_trip() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let signature = sign_with_label(SUITE, &pair.private, "test_label", b"hello").unwrap();
        assert!(
            verify_with_label(SUITE, &pair.public, "test_label", b"hello", &signature).is_ok()
        );
    }

    #[test]
    fn wrong_label_fails() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let signature = sign_with_label(SUITE, &pair.private, "test_label", b"hello").unwrap();
        assert_eq!(
            verify_with_label(SUITE, &pair.public, "wrong_label", b"hello", &signature),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn wrong_content_or_key_fails() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let other = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let signature = sign_with_label(SUITE, &pair.private, "test_label", b"hello").unwrap();
        assert!(
            verify_with_label(SUITE, &pair.public, "test_label", b"hellp", &signature).is_err()
        );
        assert!(
            verify_with_label(SUITE, &other.public, "test_label", b"hello", &signature).is_err()
        );
    }

    #[test]
    fn flipped_signature_bit_fails() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let mut signature = sign_with_label(SUITE, &pair.private, "test_label", b"hello").unwrap();
        signature[0] ^= 0x01;
        assert!(
            verify_with_label(SUITE, &pair.public, "test_label", b"hello", &signature).is_err()
        );
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        let pair = generate_key_pair(SUITE, &mut OsRng).unwrap();
        let suite = CipherSuite::MLS_128_DHKEMP256_AES128GCM_SHA256_P256;
        assert!(matches!(
            sign_with_label(suite, &pair.private, "test_label", b"hello"),
            Err(CryptoError::UnsupportedSuite { .. })
        ));
    }
}
