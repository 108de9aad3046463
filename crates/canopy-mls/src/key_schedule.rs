//! Per-epoch secret graph
//!
//! At every commit the schedule folds the previous `init_secret` and the
//! new `commit_secret` into the next epoch's secrets:
//!
//! ```text
//! joiner_secret  = DeriveSecret(Extract(init_secret, commit_secret), "joiner")
//! welcome_secret = DeriveSecret(Extract(joiner_secret, psk_secret), "welcome")
//! epoch_secret   = ExpandWithLabel(Extract(joiner_secret, psk_secret),
//!                                  "epoch", group_context, Nh)
//! ```
//!
//! Absent a pre-shared key, `psk_secret` is the all-zero string of length
//! `Nh` (only the resumption slot exists; no other PSK injection). Every
//! child of `epoch_secret` is a single `DeriveSecret`.

use crate::error::Result;
use canopy_crypto::{kdf, CipherSuite, Secret};
use rand::{CryptoRng, RngCore};

/// The epoch secret and its derived children
#[derive(Debug, Clone)]
pub struct EpochSecrets {
    /// Root of this epoch's derivations
    pub epoch_secret: Secret,
    /// Protects sender metadata in framed messages
    pub sender_data_secret: Secret,
    /// Seeds the application ratchet tree
    pub encryption_secret: Secret,
    /// Feeds the caller-visible exporter
    pub exporter_secret: Secret,
    /// Key for external joiners
    pub external_secret: Secret,
    /// Keys the confirmation tag
    pub confirmation_key: Secret,
    /// Keys membership authentication
    pub membership_key: Secret,
    /// Pre-shared key for resumption
    pub resumption_psk: Secret,
    /// Carried into the next epoch's extract
    pub init_secret: Secret,
}

impl EpochSecrets {
    /// Derive the full child set from an epoch secret
    pub fn from_epoch_secret(suite: CipherSuite, epoch_secret: Secret) -> Result<Self> {
        let child = |label: &str| kdf::derive_secret(suite, epoch_secret.as_slice(), label);
        Ok(Self {
            sender_data_secret: child("sender data")?,
            encryption_secret: child("encryption")?,
            exporter_secret: child("exporter")?,
            external_secret: child("external")?,
            confirmation_key: child("confirm")?,
            membership_key: child("membership")?,
            resumption_psk: child("resumption")?,
            init_secret: child("init")?,
            epoch_secret,
        })
    }
}

/// One full turn of the key schedule
#[derive(Debug, Clone)]
pub struct KeyScheduleEpoch {
    /// Secret handed to welcomed joiners
    pub joiner_secret: Secret,
    /// Secret protecting the welcome's group info
    pub welcome_secret: Secret,
    /// The epoch secret and its children
    pub epoch_secrets: EpochSecrets,
}

fn member_turn(
    suite: CipherSuite,
    joiner_secret: Secret,
    group_context: &[u8],
) -> Result<KeyScheduleEpoch> {
    let psk_secret = Secret::zero(suite.hash_len());
    let member_ikm = kdf::extract(suite, joiner_secret.as_slice(), psk_secret.as_slice());
    let welcome_secret = kdf::derive_secret(suite, member_ikm.as_slice(), "welcome")?;
    let epoch_secret = kdf::expand_with_label(
        suite,
        member_ikm.as_slice(),
        "epoch",
        group_context,
        suite.hash_len(),
    )?;
    Ok(KeyScheduleEpoch {
        joiner_secret,
        welcome_secret,
        epoch_secrets: EpochSecrets::from_epoch_secret(suite, epoch_secret)?,
    })
}

/// Advance the schedule across a commit
pub fn advance(
    suite: CipherSuite,
    init_secret: &Secret,
    commit_secret: &Secret,
    group_context: &[u8],
) -> Result<KeyScheduleEpoch> {
    let joiner_ikm = kdf::extract(suite, init_secret.as_slice(), commit_secret.as_slice());
    let joiner_secret = kdf::derive_secret(suite, joiner_ikm.as_slice(), "joiner")?;
    member_turn(suite, joiner_secret, group_context)
}

/// Rebuild an epoch from a welcomed joiner secret
pub fn from_joiner_secret(
    suite: CipherSuite,
    joiner_secret: Secret,
    group_context: &[u8],
) -> Result<KeyScheduleEpoch> {
    member_turn(suite, joiner_secret, group_context)
}

/// The welcome secret alone, for a joiner that has no group context yet
pub fn welcome_secret_from_joiner(suite: CipherSuite, joiner_secret: &Secret) -> Result<Secret> {
    let psk_secret = Secret::zero(suite.hash_len());
    let member_ikm = kdf::extract(suite, joiner_secret.as_slice(), psk_secret.as_slice());
    Ok(kdf::derive_secret(suite, member_ikm.as_slice(), "welcome")?)
}

/// Seed the schedule for a brand-new group at epoch zero
pub fn bootstrap(
    suite: CipherSuite,
    group_context: &[u8],
    rng: &mut (impl CryptoRng + RngCore),
) -> Result<KeyScheduleEpoch> {
    let mut seed = vec![0u8; suite.hash_len()];
    rng.fill_bytes(&mut seed);
    let init_secret = Secret::new(seed);
    let commit_secret = Secret::zero(suite.hash_len());
    advance(suite, &init_secret, &commit_secret, group_context)
}

/// AEAD key and nonce protecting a welcome's group info
pub fn welcome_key_nonce(suite: CipherSuite, welcome_secret: &Secret) -> Result<(Secret, Secret)> {
    let key = kdf::expand_with_label(
        suite,
        welcome_secret.as_slice(),
        "key",
        b"",
        suite.aead_key_len(),
    )?;
    let nonce = kdf::expand_with_label(
        suite,
        welcome_secret.as_slice(),
        "nonce",
        b"",
        suite.aead_nonce_len(),
    )?;
    Ok((key, nonce))
}

/// MAC binding an epoch's confirmation key to the confirmed transcript
pub fn confirmation_tag(
    suite: CipherSuite,
    confirmation_key: &Secret,
    confirmed_transcript_hash: &[u8],
) -> Result<Vec<u8>> {
    Ok(suite.hmac(confirmation_key.as_slice(), confirmed_transcript_hash)?)
}

/// Fold a signed commit into the confirmed transcript hash
pub fn next_confirmed_transcript_hash(
    suite: CipherSuite,
    interim_transcript_hash: &[u8],
    commit_tbs: &[u8],
    signature: &[u8],
) -> Vec<u8> {
    let mut input =
        Vec::with_capacity(interim_transcript_hash.len() + commit_tbs.len() + signature.len());
    input.extend_from_slice(interim_transcript_hash);
    input.extend_from_slice(commit_tbs);
    input.extend_from_slice(signature);
    suite.hash(&input)
}

/// Fold a confirmation tag into the interim transcript hash
pub fn next_interim_transcript_hash(
    suite: CipherSuite,
    confirmed_transcript_hash: &[u8],
    confirmation_tag: &[u8],
) -> Vec<u8> {
    let mut input =
        Vec::with_capacity(confirmed_transcript_hash.len() + confirmation_tag.len());
    input.extend_from_slice(confirmed_transcript_hash);
    input.extend_from_slice(confirmation_tag);
    suite.hash(&input)
}
