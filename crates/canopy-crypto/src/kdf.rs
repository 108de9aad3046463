//! Labeled HKDF constructions
//!
//! Every label is prefixed with the ASCII literal `"MLS 1.0 "` before it is
//! bound into the KDF label structure:
//!
//! ```text
//! KdfLabel = u16 length || bytes8("MLS 1.0 " + label) || bytes32(context)
//! ExpandWithLabel(secret, label, context, length)
//!     = HKDF-Expand(secret, KdfLabel, length)
//! DeriveSecret(secret, label) = ExpandWithLabel(secret, label, "", Nh)
//! ```
//!
//! The exporter follows the same construction over a hashed context. Note
//! that reference implementations disagree on whether the exporter label is
//! fed through `DeriveSecret` (reapplying the prefix) or used raw; this
//! module applies `DeriveSecret` to the caller label and then expands under
//! the fixed label `"exporter"`. Cross-check against reference vectors
//! before interoperating with another stack.

use crate::error::{CryptoError, Result};
use crate::keys::Secret;
use crate::suite::{CipherSuite, HashAlgorithm};
use canopy_codec::WireWriter;
use hkdf::Hkdf;
use sha2::{Sha256, Sha384, Sha512};

/// Build the KDF label structure for `ExpandWithLabel`
fn kdf_label(label: &str, context: &[u8], length: usize) -> Result<Vec<u8>> {
    let length = u16::try_from(length).map_err(|_| CryptoError::DerivationFailure {
        reason: format!("output length {length} exceeds u16"),
    })?;
    let full_label = format!("MLS 1.0 {label}");

    let mut w = WireWriter::new();
    w.write_u16(length);
    w.write_bytes8(full_label.as_bytes())
        .map_err(|e| CryptoError::DerivationFailure {
            reason: format!("label encoding failed: {e}"),
        })?;
    w.write_bytes32(context)
        .map_err(|e| CryptoError::DerivationFailure {
            reason: format!("context encoding failed: {e}"),
        })?;
    Ok(w.into_bytes())
}

fn hkdf_expand(suite: CipherSuite, prk: &[u8], info: &[u8], length: usize) -> Result<Secret> {
    let mut okm = vec![0u8; length];
    let expand_failed = |_| CryptoError::DerivationFailure {
        reason: format!("HKDF-Expand to {length} bytes failed"),
    };
    let bad_prk = |_| CryptoError::DerivationFailure {
        reason: "HKDF PRK shorter than hash output".to_string(),
    };
    match suite.hash_algorithm() {
        HashAlgorithm::Sha256 => Hkdf::<Sha256>::from_prk(prk)
            .map_err(bad_prk)?
            .expand(info, &mut okm)
            .map_err(expand_failed)?,
        HashAlgorithm::Sha384 => Hkdf::<Sha384>::from_prk(prk)
            .map_err(bad_prk)?
            .expand(info, &mut okm)
            .map_err(expand_failed)?,
        HashAlgorithm::Sha512 => Hkdf::<Sha512>::from_prk(prk)
            .map_err(bad_prk)?
            .expand(info, &mut okm)
            .map_err(expand_failed)?,
    }
    Ok(Secret::new(okm))
}

/// HKDF-Extract with the suite hash; `salt` and `ikm` follow the key-schedule
/// argument order `Extract(salt, ikm)`
pub fn extract(suite: CipherSuite, salt: &[u8], ikm: &[u8]) -> Secret {
    match suite.hash_algorithm() {
        HashAlgorithm::Sha256 => {
            let (prk, _) = Hkdf::<Sha256>::extract(Some(salt), ikm);
            Secret::new(prk.to_vec())
        }
        HashAlgorithm::Sha384 => {
            let (prk, _) = Hkdf::<Sha384>::extract(Some(salt), ikm);
            Secret::new(prk.to_vec())
        }
        HashAlgorithm::Sha512 => {
            let (prk, _) = Hkdf::<Sha512>::extract(Some(salt), ikm);
            Secret::new(prk.to_vec())
        }
    }
}

/// `ExpandWithLabel(secret, label, context, length)`
pub fn expand_with_label(
    suite: CipherSuite,
    secret: &[u8],
    label: &str,
    context: &[u8],
    length: usize,
) -> Result<Secret> {
    let info = kdf_label(label, context, length)?;
    hkdf_expand(suite, secret, &info, length)
}

/// `DeriveSecret(secret, label)` — an `ExpandWithLabel` with empty context
/// and the suite hash length
pub fn derive_secret(suite: CipherSuite, secret: &[u8], label: &str) -> Result<Secret> {
    expand_with_label(suite, secret, label, b"", suite.hash_len())
}

/// The exporter: `ExpandWithLabel(DeriveSecret(exporter_secret, label),
/// "exporter", Hash(context), length)`
pub fn export_secret(
    suite: CipherSuite,
    exporter_secret: &[u8],
    label: &str,
    context: &[u8],
    length: usize,
) -> Result<Secret> {
    let derived = derive_secret(suite, exporter_secret, label)?;
    let hashed_context = suite.hash(context);
    expand_with_label(suite, derived.as_slice(), "exporter", &hashed_context, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

    #[test]
    fn derive_secret_is_expand_with_empty_context() {
        let secret =
            hex::decode("5a097e149f2a375d0b9e1d1f4dc3a9c6c1788df888e5441f41a8791f4dc56cea")
                .unwrap();
        let derived = derive_secret(SUITE, &secret, "exporter").unwrap();
        let expanded = expand_with_label(SUITE, &secret, "exporter", b"", 32).unwrap();
        assert_eq!(derived, expanded);
        assert_eq!(derived.len(), 32);
    }

    #[test]
    fn path_chain_step_is_deterministic_and_nonzero() {
        let zero = vec![0u8; 32];
        let step1 = expand_with_label(SUITE, &zero, "path", b"", 32).unwrap();
        let step2 = expand_with_label(SUITE, &zero, "path", b"", 32).unwrap();
        assert_eq!(step1, step2);
        assert_ne!(step1.as_slice(), &zero[..]);
    }

    #[test]
    fn label_and_context_separate_outputs() {
        let secret = vec![7u8; 32];
        let a = expand_with_label(SUITE, &secret, "node", b"", 32).unwrap();
        let b = expand_with_label(SUITE, &secret, "path", b"", 32).unwrap();
        let c = expand_with_label(SUITE, &secret, "node", b"ctx", 32).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn exporter_depends_on_every_input() {
        let secret = vec![0u8; 32];
        let base = export_secret(SUITE, &secret, "nostr", b"", 32).unwrap();
        assert_ne!(
            base,
            export_secret(SUITE, &secret, "other", b"", 32).unwrap()
        );
        assert_ne!(
            base,
            export_secret(SUITE, &secret, "nostr", b"ctx", 32).unwrap()
        );
        assert_ne!(base, export_secret(SUITE, &secret, "nostr", b"", 16).unwrap());
    }

    #[test]
    fn wide_hashes_expand() {
        let secret = vec![1u8; 64];
        let suite = CipherSuite::MLS_256_DHKEMX448_AES256GCM_SHA512_Ed448;
        let out = derive_secret(suite, &secret, "epoch").unwrap();
        assert_eq!(out.len(), 64);
    }
}
