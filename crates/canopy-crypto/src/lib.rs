//! Canopy cipher-suite façade
//!
//! Binds a `u16` suite identifier to a hash, an HKDF, a signature scheme,
//! and an HPKE triple, and exposes the labeled constructions everything
//! above it is built from:
//!
//! - [`kdf`]: `ExpandWithLabel` / `DeriveSecret` / the exporter
//! - [`sign`]: `SignWithLabel` / `VerifyWithLabel`
//! - [`hpke`]: base-mode seal/open and KEM key-pair derivation
//! - [`aead`]: direct AEAD seal/open for welcome encryption
//!
//! Dispatch is a closed match on [`CipherSuite`]; there is no open-ended
//! backend registry. All labels carry the `"MLS 1.0 "` prefix.

pub mod aead;
pub mod error;
pub mod hpke;
pub mod kdf;
pub mod keys;
pub mod sign;
pub mod suite;

pub use error::{CryptoError, Result};
pub use keys::{
    HpkeCiphertext, HpkeKeyPair, HpkePrivateKey, HpkePublicKey, Secret, SignatureKeyPair,
    SignaturePrivateKey, SignaturePublicKey,
};
pub use suite::{CipherSuite, HashAlgorithm, SignatureScheme};
