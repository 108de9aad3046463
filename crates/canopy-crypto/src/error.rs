//! Crypto errors

use thiserror::Error;

/// Errors raised by the cipher-suite façade
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The suite is enumerated but the backend cannot serve it
    #[error("unsupported cipher suite 0x{suite:04x}")]
    UnsupportedSuite {
        /// Wire identifier of the rejected suite
        suite: u16,
    },

    /// Key material has the wrong length or is not a valid curve point
    #[error("invalid key material: {reason}")]
    InvalidKeySize {
        /// What was wrong with the key
        reason: String,
    },

    /// Producing a signature failed
    #[error("signature operation failed: {reason}")]
    SignatureFailure {
        /// Backend failure description
        reason: String,
    },

    /// A signature did not verify under the given key and label
    #[error("signature verification failed")]
    InvalidSignature,

    /// HKDF expansion or extraction failed
    #[error("key derivation failed: {reason}")]
    DerivationFailure {
        /// Backend failure description
        reason: String,
    },

    /// HPKE encryption failed
    #[error("HPKE seal failed: {reason}")]
    HpkeSealFailure {
        /// Backend failure description
        reason: String,
    },

    /// HPKE decryption failed; deliberately carries no detail
    #[error("HPKE open failed")]
    HpkeOpenFailure,
}

/// Result type for crypto operations
pub type Result<T> = std::result::Result<T, CryptoError>;
