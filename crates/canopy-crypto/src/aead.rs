//! Direct AEAD seal/open with the suite AEAD
//!
//! Used where a symmetric key is already shared (welcome encryption), as
//! opposed to the HPKE path where the key is encapsulated per recipient.

use crate::error::{CryptoError, Result};
use crate::suite::CipherSuite;
use aes_gcm::aead::{Aead as _, Payload};
use aes_gcm::{Aes128Gcm, KeyInit as _};
use chacha20poly1305::ChaCha20Poly1305;

fn check_lengths(suite: CipherSuite, key: &[u8], nonce: &[u8]) -> Result<()> {
    if key.len() != suite.aead_key_len() {
        return Err(CryptoError::InvalidKeySize {
            reason: format!(
                "AEAD key must be {} bytes, got {}",
                suite.aead_key_len(),
                key.len()
            ),
        });
    }
    if nonce.len() != suite.aead_nonce_len() {
        return Err(CryptoError::InvalidKeySize {
            reason: format!(
                "AEAD nonce must be {} bytes, got {}",
                suite.aead_nonce_len(),
                nonce.len()
            ),
        });
    }
    Ok(())
}

/// Encrypt `plaintext` under the suite AEAD
pub fn seal(
    suite: CipherSuite,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    suite.ensure_supported()?;
    check_lengths(suite, key, nonce)?;
    let payload = Payload {
        msg: plaintext,
        aad,
    };
    match suite {
        CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519 => {
            let cipher = Aes128Gcm::new_from_slice(key).map_err(|e| {
                CryptoError::InvalidKeySize {
                    reason: format!("AES-128-GCM key setup failed: {e}"),
                }
            })?;
            cipher
                .encrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::HpkeSealFailure {
                    reason: "AEAD encryption failed".to_string(),
                })
        }
        CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|e| {
                CryptoError::InvalidKeySize {
                    reason: format!("ChaCha20-Poly1305 key setup failed: {e}"),
                }
            })?;
            cipher
                .encrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::HpkeSealFailure {
                    reason: "AEAD encryption failed".to_string(),
                })
        }
        _ => Err(CryptoError::UnsupportedSuite {
            suite: suite.as_u16(),
        }),
    }
}

/// Decrypt a ciphertext produced by [`seal`]
pub fn open(
    suite: CipherSuite,
    key: &[u8],
    nonce: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    suite.ensure_supported()?;
    check_lengths(suite, key, nonce)?;
    let payload = Payload {
        msg: ciphertext,
        aad,
    };
    match suite {
        CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519 => {
            let cipher = Aes128Gcm::new_from_slice(key).map_err(|e| {
                CryptoError::InvalidKeySize {
                    reason: format!("AES-128-GCM key setup failed: {e}"),
                }
            })?;
            cipher
                .decrypt(aes_gcm::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::HpkeOpenFailure)
        }
        CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519 => {
            let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|e| {
                CryptoError::InvalidKeySize {
                    reason: format!("ChaCha20-Poly1305 key setup failed: {e}"),
                }
            })?;
            cipher
                .decrypt(chacha20poly1305::Nonce::from_slice(nonce), payload)
                .map_err(|_| CryptoError::HpkeOpenFailure)
        }
        _ => Err(CryptoError::UnsupportedSuite {
            suite: suite.as_u16(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_round_trip() {
        let suite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;
        let key = [1u8; 16];
        let nonce = [2u8; 12];
        let ct = seal(suite, &key, &nonce, b"aad", b"group info").unwrap();
        assert_eq!(open(suite, &key, &nonce, b"aad", &ct).unwrap(), b"group info");
    }

    #[test]
    fn chacha_round_trip() {
        let suite = CipherSuite::MLS_128_DHKEMX25519_CHACHA20POLY1305_SHA256_Ed25519;
        let key = [1u8; 32];
        let nonce = [2u8; 12];
        let ct = seal(suite, &key, &nonce, b"", b"group info").unwrap();
        assert_eq!(open(suite, &key, &nonce, b"", &ct).unwrap(), b"group info");
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let suite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;
        let key = [1u8; 16];
        let nonce = [2u8; 12];
        let mut ct = seal(suite, &key, &nonce, b"", b"group info").unwrap();
        ct[0] ^= 0x01;
        assert_eq!(
            open(suite, &key, &nonce, b"", &ct),
            Err(CryptoError::HpkeOpenFailure)
        );
    }

    #[test]
    fn wrong_key_length_is_rejected() {
        let suite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;
        assert!(matches!(
            seal(suite, &[0u8; 32], &[0u8; 12], b"", b""),
            Err(CryptoError::InvalidKeySize { .. })
        ));
    }
}
