//! Canopy MLS core
//!
//! Group key management for secure messaging (RFC 9420 shape), built for
//! the Nostr event-encryption binding: MLS manages the group's key
//! material, and applications pull per-epoch secrets out of the exporter
//! to encrypt payloads out-of-band. The core never touches application
//! messages.
//!
//! Layering, leaves first:
//!
//! - [`credential`], [`leaf_node`], [`key_package`]: who a member is and
//!   how they advertise key material
//! - [`treekem`], [`tree_hash`]: the path-update ratchet over the tree
//! - [`key_schedule`]: per-epoch secret graph and exporter
//! - [`framing`], [`welcome`]: signed commits and joiner bootstrap
//! - [`group`]: the façade owning one member's view of one group
//!
//! Handles are single-threaded and synchronous; shard one handle per task
//! for parallelism. There is no shared state across groups.

pub mod context;
pub mod credential;
pub mod error;
pub mod extensions;
pub mod framing;
pub mod group;
pub mod key_package;
pub mod key_schedule;
pub mod leaf_node;
pub mod node;
pub mod treekem;
pub mod welcome;

mod tree_hash;

pub use context::GroupContext;
pub use credential::Credential;
pub use error::{MlsError, Result};
pub use extensions::{Extension, Extensions, ProtocolVersion, EXTENSION_LAST_RESORT};
pub use framing::{AuthenticatedCommit, Commit, Proposal};
pub use group::{Member, MlsGroup};
pub use key_package::{KeyPackage, KeyPackageBundle};
pub use leaf_node::{Capabilities, LeafNode, LeafNodeSource, Lifetime};
pub use node::{ParentNode, RatchetTree, TreeNode};
pub use treekem::{UpdatePath, UpdatePathNode};
pub use welcome::Welcome;

// Re-exported so callers name suites and indices without extra imports.
pub use canopy_crypto::CipherSuite;
pub use canopy_tree::LeafIndex;
