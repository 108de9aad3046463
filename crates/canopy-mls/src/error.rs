//! Protocol errors
//!
//! Lower-layer failures (codec, crypto, tree) convert in via `#[from]`;
//! the variants here are the protocol-level failure taxonomy. Every error
//! surfaces to the caller unchanged, and no operation leaves partial state
//! behind: all tree mutations go through a staged diff that merges only on
//! success.

use canopy_codec::CodecError;
use canopy_crypto::CryptoError;
use canopy_tree::TreeError;
use thiserror::Error;

/// Errors raised by the MLS core
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MlsError {
    /// Wire-format failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Cipher-suite façade failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Tree-structural failure
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A leaf's capabilities do not cover the protocol version or suite
    /// in use
    #[error("invalid capability: {reason}")]
    InvalidCapability {
        /// What the capability set fails to cover
        reason: String,
    },

    /// A leaf node is structurally unusable
    #[error("invalid leaf node: {reason}")]
    InvalidLeafNode {
        /// What made the leaf unusable
        reason: String,
    },

    /// A key package is structurally unusable
    #[error("invalid key package: {reason}")]
    InvalidKeyPackage {
        /// What made the key package unusable
        reason: String,
    },

    /// A single-use key package was offered a second time
    #[error("key package has already been used")]
    ReusedKeyPackage,

    /// A commit arrived for an epoch that already accepted one
    #[error("epoch {commit_epoch} is closed; group is at epoch {current_epoch}")]
    EpochClosed {
        /// Epoch the commit was built against
        commit_epoch: u64,
        /// Epoch the group is currently in
        current_epoch: u64,
    },

    /// The committer's leaf is blank
    #[error("sender leaf {index} is blank")]
    BlankSenderLeaf {
        /// Sender leaf ordinal
        index: u32,
    },

    /// No node of the sender's filtered path covers the receiver
    #[error("update path does not overlap the receiver's direct path")]
    NoPathOverlap,

    /// An update-path node carries the wrong number of ciphertexts
    #[error("update path carries {actual} ciphertexts, expected {expected}")]
    CiphertextCountMismatch {
        /// Size of the copath resolution
        expected: usize,
        /// Number of ciphertexts transmitted
        actual: usize,
    },

    /// A re-derived node public key differs from the transmitted one
    #[error("derived public key mismatch at node {node}")]
    TreeKemDerivationMismatch {
        /// Node index where the chain diverged
        node: u32,
    },

    /// The parent-hash chain does not link the leaf to its path
    #[error("parent hash verification failed")]
    InvalidParentHash,

    /// The confirmation tag does not match the recomputed key schedule
    #[error("confirmation tag verification failed")]
    InvalidConfirmationTag,

    /// A welcome carries no secrets addressed to this key package
    #[error("welcome has no entry for the given key package")]
    NoMatchingGroupSecrets,

    /// The joiner's leaf is absent from the welcomed tree
    #[error("own leaf not found in the ratchet tree")]
    OwnLeafNotFound,
}

/// Result type for MLS core operations
pub type Result<T> = std::result::Result<T, MlsError>;
