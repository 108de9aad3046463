//! Group façade
//!
//! [`MlsGroup`] owns the ratchet tree, the current epoch's secrets, and
//! this member's private keys, and is the only mutator of them. Every
//! operation is synchronous and all-or-nothing: tree changes stage in a
//! diff that merges only after every check has passed.
//!
//! Exactly one commit is accepted per epoch. A commit built against any
//! other epoch is rejected with `EpochClosed`; processing a commit (or
//! producing one) advances the epoch and closes it.

use crate::context::GroupContext;
use crate::error::{MlsError, Result};
use crate::extensions::{Extensions, ProtocolVersion};
use crate::framing::{AuthenticatedCommit, Commit, Proposal};
use crate::key_package::{KeyPackage, KeyPackageBundle};
use crate::key_schedule::{self, EpochSecrets, KeyScheduleEpoch};
use crate::leaf_node::LeafNode;
use crate::node::{export_ratchet_tree, import_ratchet_tree, ParentNode, RatchetTree};
use crate::tree_hash::tree_hash;
use crate::treekem::{self, UpdatePathResult};
use crate::welcome::{EncryptedGroupSecrets, GroupInfo, GroupSecrets, Welcome};
use crate::credential::Credential;
use canopy_codec::{CodecError, WireDecode, WireEncode, WireReader, WireWriter};
use canopy_crypto::{
    aead, hpke, kdf, CipherSuite, CryptoError, HpkePrivateKey, Secret, SignaturePrivateKey,
    SignaturePublicKey,
};
use canopy_tree::{math, LeafIndex, ParentIndex, StagedDiff, TreeDiff};
use rand::rngs::OsRng;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A non-blank leaf as seen by callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// The member's leaf
    pub index: LeafIndex,
    /// The member's identity claim
    pub credential: Credential,
    /// The member's leaf signature key
    pub signature_key: SignaturePublicKey,
}

/// One member's handle on one group
#[derive(Debug)]
pub struct MlsGroup {
    suite: CipherSuite,
    group_id: Vec<u8>,
    epoch: u64,
    tree: RatchetTree,
    extensions: Extensions,
    own_leaf: LeafIndex,
    signature_private_key: SignaturePrivateKey,
    /// Raw node index to held private key; always includes the own leaf
    private_keys: BTreeMap<u32, HpkePrivateKey>,
    epoch_secrets: EpochSecrets,
    confirmed_transcript_hash: Vec<u8>,
    interim_transcript_hash: Vec<u8>,
    used_key_packages: BTreeSet<Vec<u8>>,
}

/// Everything produced by building a commit, before it is installed
struct PendingCommit {
    frame: AuthenticatedCommit,
    schedule: KeyScheduleEpoch,
    new_context: GroupContext,
    new_confirmed: Vec<u8>,
    new_interim: Vec<u8>,
    staged: StagedDiff<LeafNode, ParentNode>,
    new_private_keys: BTreeMap<u32, HpkePrivateKey>,
    path_secrets: Vec<(ParentIndex, Secret)>,
    welcome_targets: Vec<(KeyPackage, LeafIndex)>,
    added_refs: Vec<Vec<u8>>,
}

impl MlsGroup {
    /// Found a new group at epoch 0 with the creator as leaf 0
    pub fn create_group(
        suite: CipherSuite,
        creator_bundle: &KeyPackageBundle,
        group_id: Vec<u8>,
        extensions: Extensions,
    ) -> Result<Self> {
        suite.ensure_supported()?;
        creator_bundle.key_package.verify(suite)?;

        let tree = RatchetTree::new(creator_bundle.key_package.leaf_node.clone());
        let own_leaf = LeafIndex::new(0);

        let context = GroupContext {
            version: ProtocolVersion::Mls10,
            cipher_suite: suite,
            group_id: group_id.clone(),
            epoch: 0,
            tree_hash: tree_hash(suite, &tree)?,
            confirmed_transcript_hash: Vec::new(),
            extensions: extensions.clone(),
        };
        let schedule = key_schedule::bootstrap(suite, &context.to_wire()?, &mut OsRng)?;
        let confirmation_tag = key_schedule::confirmation_tag(
            suite,
            &schedule.epoch_secrets.confirmation_key,
            &context.confirmed_transcript_hash,
        )?;
        let interim_transcript_hash = key_schedule::next_interim_transcript_hash(
            suite,
            &context.confirmed_transcript_hash,
            &confirmation_tag,
        );

        let mut private_keys = BTreeMap::new();
        private_keys.insert(
            own_leaf.node().as_u32(),
            creator_bundle.encryption_private_key.clone(),
        );
        let mut used_key_packages = BTreeSet::new();
        used_key_packages.insert(creator_bundle.key_package.hash_ref()?);

        info!(group_id = %hex::encode(&group_id), "created group");
        Ok(Self {
            suite,
            group_id,
            epoch: 0,
            tree,
            extensions,
            own_leaf,
            signature_private_key: creator_bundle.signature_private_key.clone(),
            private_keys,
            epoch_secrets: schedule.epoch_secrets,
            confirmed_transcript_hash: Vec::new(),
            interim_transcript_hash,
            used_key_packages,
        })
    }

    /// Cipher suite of the group
    pub fn cipher_suite(&self) -> CipherSuite {
        self.suite
    }

    /// Group identifier
    pub fn group_id(&self) -> &[u8] {
        &self.group_id
    }

    /// Current epoch
    pub fn current_epoch(&self) -> u64 {
        self.epoch
    }

    /// This member's leaf
    pub fn own_leaf_index(&self) -> LeafIndex {
        self.own_leaf
    }

    /// All non-blank leaves, in leaf order
    pub fn current_members(&self) -> Vec<Member> {
        self.tree
            .leaves()
            .filter_map(|(index, slot)| {
                slot.map(|leaf| Member {
                    index,
                    credential: leaf.credential.clone(),
                    signature_key: leaf.signature_key.clone(),
                })
            })
            .collect()
    }

    /// Derive an application secret from this epoch's exporter
    pub fn export_secret(&self, label: &str, context: &[u8], length: usize) -> Result<Vec<u8>> {
        let secret = kdf::export_secret(
            self.suite,
            self.epoch_secrets.exporter_secret.as_slice(),
            label,
            context,
            length,
        )?;
        Ok(secret.as_slice().to_vec())
    }

    fn group_context(&self) -> Result<GroupContext> {
        Ok(GroupContext {
            version: ProtocolVersion::Mls10,
            cipher_suite: self.suite,
            group_id: self.group_id.clone(),
            epoch: self.epoch,
            tree_hash: tree_hash(self.suite, &self.tree)?,
            confirmed_transcript_hash: self.confirmed_transcript_hash.clone(),
            extensions: self.extensions.clone(),
        })
    }

    /// Apply a proposal list to a diff, returning welcome targets and the
    /// hash refs of consumed key packages
    fn apply_proposals(
        &self,
        diff: &mut TreeDiff<'_, LeafNode, ParentNode>,
        proposals: &[Proposal],
    ) -> Result<(Vec<(KeyPackage, LeafIndex)>, Vec<Vec<u8>>)> {
        let mut targets = Vec::new();
        let mut added_refs = Vec::new();
        for proposal in proposals {
            match proposal {
                Proposal::Add { key_package } => {
                    key_package.verify(self.suite)?;
                    let hash_ref = key_package.hash_ref()?;
                    if self.used_key_packages.contains(&hash_ref)
                        && !key_package.is_last_resort()
                    {
                        return Err(MlsError::ReusedKeyPackage);
                    }
                    let slot = match diff.first_blank_leaf() {
                        Some(slot) => slot,
                        None => {
                            let next = diff.leaf_count();
                            diff.grow();
                            LeafIndex::new(next)
                        }
                    };
                    diff.replace_leaf(slot, key_package.leaf_node.clone())?;
                    for parent in math::direct_path(slot, diff.leaf_count())? {
                        if let Some(node) = diff.parent_node(parent)? {
                            let mut node = node.clone();
                            if let Err(position) = node.unmerged_leaves.binary_search(&slot) {
                                node.unmerged_leaves.insert(position, slot);
                            }
                            diff.replace_parent(parent, node)?;
                        }
                    }
                    targets.push((key_package.clone(), slot));
                    added_refs.push(hash_ref);
                }
                Proposal::Remove { removed } => {
                    if diff.leaf(*removed)?.is_none() {
                        return Err(MlsError::InvalidLeafNode {
                            reason: format!("cannot remove blank leaf {}", removed.as_u32()),
                        });
                    }
                    diff.blank_leaf(*removed)?;
                    diff.blank_path(*removed)?;
                }
                Proposal::Update { .. } => {
                    return Err(MlsError::InvalidLeafNode {
                        reason: "update proposals travel in a committer's path".to_string(),
                    });
                }
            }
        }
        // Fold empty upper halves away so the tree stays as small as the
        // membership allows; committer and processors apply the same rule.
        while diff.leaf_count() > 1 {
            match diff.shrink() {
                Ok(()) => {}
                Err(canopy_tree::TreeError::NotShrinkable) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok((targets, added_refs))
    }

    /// Build a signed commit over the given proposals with a path refresh
    fn build_commit(&self, proposals: Vec<Proposal>) -> Result<PendingCommit> {
        let current_context = self.group_context()?.to_wire()?;
        let mut diff = self.tree.diff();
        let (welcome_targets, added_refs) = self.apply_proposals(&mut diff, &proposals)?;

        let UpdatePathResult {
            update_path,
            commit_secret,
            node_private_keys,
            leaf_private_key,
            path_secrets,
        } = treekem::create_update_path(
            self.suite,
            &mut diff,
            self.own_leaf,
            &self.signature_private_key,
            &self.group_id,
            &current_context,
            &mut OsRng,
        )?;

        let commit = Commit {
            proposals,
            path: Some(update_path),
        };
        let mut frame = AuthenticatedCommit::sign(
            self.suite,
            &self.signature_private_key,
            self.group_id.clone(),
            self.epoch,
            self.own_leaf,
            commit,
            &current_context,
        )?;
        let tbs = AuthenticatedCommit::tbs_bytes(
            &self.group_id,
            self.epoch,
            self.own_leaf,
            &frame.commit,
            &current_context,
        )?;

        let new_confirmed = key_schedule::next_confirmed_transcript_hash(
            self.suite,
            &self.interim_transcript_hash,
            &tbs,
            &frame.signature,
        );
        let new_context = GroupContext {
            version: ProtocolVersion::Mls10,
            cipher_suite: self.suite,
            group_id: self.group_id.clone(),
            epoch: self.epoch + 1,
            tree_hash: tree_hash(self.suite, &diff)?,
            confirmed_transcript_hash: new_confirmed.clone(),
            extensions: self.extensions.clone(),
        };
        let schedule = key_schedule::advance(
            self.suite,
            &self.epoch_secrets.init_secret,
            &commit_secret,
            &new_context.to_wire()?,
        )?;
        frame.confirmation_tag = key_schedule::confirmation_tag(
            self.suite,
            &schedule.epoch_secrets.confirmation_key,
            &new_confirmed,
        )?;
        let new_interim = key_schedule::next_interim_transcript_hash(
            self.suite,
            &new_confirmed,
            &frame.confirmation_tag,
        );

        // After a self-signed path every held key is refreshed: the new
        // leaf key plus one key per refreshed path node.
        let mut new_private_keys = BTreeMap::new();
        new_private_keys.insert(self.own_leaf.node().as_u32(), leaf_private_key);
        for (index, key) in node_private_keys {
            new_private_keys.insert(index.node().as_u32(), key);
        }

        Ok(PendingCommit {
            frame,
            schedule,
            new_context,
            new_confirmed,
            new_interim,
            staged: diff.stage(),
            new_private_keys,
            path_secrets,
            welcome_targets,
            added_refs,
        })
    }

    /// Install a pending commit into this handle
    fn install_commit(&mut self, pending: PendingCommit) -> Result<(AuthenticatedCommit, KeyScheduleEpoch, GroupContext, Vec<(ParentIndex, Secret)>, Vec<(KeyPackage, LeafIndex)>)> {
        self.tree.merge(pending.staged)?;
        self.epoch += 1;
        self.epoch_secrets = pending.schedule.epoch_secrets.clone();
        self.confirmed_transcript_hash = pending.new_confirmed;
        self.interim_transcript_hash = pending.new_interim;
        self.private_keys = pending.new_private_keys;
        for hash_ref in pending.added_refs {
            self.used_key_packages.insert(hash_ref);
        }
        info!(epoch = self.epoch, "advanced to new epoch");
        Ok((
            pending.frame,
            pending.schedule,
            pending.new_context,
            pending.path_secrets,
            pending.welcome_targets,
        ))
    }

    /// Seal a welcome for each member added by the commit
    fn build_welcome(
        &self,
        schedule: &KeyScheduleEpoch,
        new_context: GroupContext,
        confirmation_tag: Vec<u8>,
        path_secrets: &[(ParentIndex, Secret)],
        targets: &[(KeyPackage, LeafIndex)],
    ) -> Result<Welcome> {
        let mut secrets = Vec::with_capacity(targets.len());
        for (key_package, slot) in targets {
            // The joiner decrypts from the first refreshed node covering
            // its leaf, the common ancestor with the committer.
            let path_secret = path_secrets
                .iter()
                .find(|(index, _)| math::is_in_subtree(*slot, index.node()))
                .map(|(_, secret)| secret.clone());
            let group_secrets = GroupSecrets {
                joiner_secret: schedule.joiner_secret.clone(),
                path_secret,
            };
            let sealed = hpke::seal(
                self.suite,
                &key_package.init_key,
                b"",
                b"",
                &group_secrets.to_wire()?,
                &mut OsRng,
            )?;
            secrets.push(EncryptedGroupSecrets {
                new_member: key_package.hash_ref()?,
                encrypted_group_secrets: sealed,
            });
        }

        let group_info = GroupInfo::sign(
            self.suite,
            &self.signature_private_key,
            new_context,
            export_ratchet_tree(&self.tree),
            confirmation_tag,
            self.own_leaf,
        )?;
        let (key, nonce) = key_schedule::welcome_key_nonce(self.suite, &schedule.welcome_secret)?;
        let encrypted_group_info = aead::seal(
            self.suite,
            key.as_slice(),
            nonce.as_slice(),
            b"",
            &group_info.to_wire()?,
        )?;

        Ok(Welcome {
            cipher_suite: self.suite,
            secrets,
            encrypted_group_info,
        })
    }

    /// Add a member, producing the welcome for them and the commit for
    /// everyone else
    pub fn add_member(
        &mut self,
        key_package: &KeyPackage,
    ) -> Result<(Welcome, AuthenticatedCommit)> {
        let pending = self.build_commit(vec![Proposal::Add {
            key_package: key_package.clone(),
        }])?;
        let (frame, schedule, new_context, path_secrets, targets) =
            self.install_commit(pending)?;
        let welcome = self.build_welcome(
            &schedule,
            new_context,
            frame.confirmation_tag.clone(),
            &path_secrets,
            &targets,
        )?;
        debug!(member = targets[0].1.as_u32(), "added member");
        Ok((welcome, frame))
    }

    /// Remove the member at `removed`, blanking its leaf and path
    pub fn remove_member(&mut self, removed: LeafIndex) -> Result<AuthenticatedCommit> {
        if removed == self.own_leaf {
            return Err(MlsError::InvalidLeafNode {
                reason: "cannot remove own leaf".to_string(),
            });
        }
        let pending = self.build_commit(vec![Proposal::Remove { removed }])?;
        let (frame, _, _, _, _) = self.install_commit(pending)?;
        debug!(member = removed.as_u32(), "removed member");
        Ok(frame)
    }

    /// Refresh this member's leaf and path
    pub fn update(&mut self) -> Result<AuthenticatedCommit> {
        let pending = self.build_commit(Vec::new())?;
        let (frame, _, _, _, _) = self.install_commit(pending)?;
        debug!("refreshed own path");
        Ok(frame)
    }

    /// Apply a commit produced by another member
    pub fn process_commit(&mut self, frame: &AuthenticatedCommit) -> Result<()> {
        if frame.group_id != self.group_id {
            return Err(MlsError::Codec(CodecError::malformed(
                "commit addresses a different group",
            )));
        }
        if frame.epoch != self.epoch {
            return Err(MlsError::EpochClosed {
                commit_epoch: frame.epoch,
                current_epoch: self.epoch,
            });
        }
        if frame.sender == self.own_leaf {
            return Err(MlsError::InvalidLeafNode {
                reason: "cannot process own commit".to_string(),
            });
        }
        let sender_leaf = self
            .tree
            .leaf(frame.sender)?
            .ok_or(MlsError::BlankSenderLeaf {
                index: frame.sender.as_u32(),
            })?;
        let current_context = self.group_context()?.to_wire()?;
        frame.verify(self.suite, &sender_leaf.signature_key, &current_context)?;

        let mut diff = self.tree.diff();
        let (_, added_refs) = self.apply_proposals(&mut diff, &frame.commit.proposals)?;
        if diff.leaf(self.own_leaf)?.is_none() {
            return Err(MlsError::OwnLeafNotFound);
        }

        let (commit_secret, new_node_keys) = match &frame.commit.path {
            Some(path) => {
                let application = treekem::apply_update_path(
                    self.suite,
                    &mut diff,
                    frame.sender,
                    self.own_leaf,
                    path,
                    &self.private_keys,
                    &self.group_id,
                    &current_context,
                )?;
                (application.commit_secret, application.node_private_keys)
            }
            None => (Secret::zero(self.suite.hash_len()), Vec::new()),
        };

        let tbs = AuthenticatedCommit::tbs_bytes(
            &frame.group_id,
            frame.epoch,
            frame.sender,
            &frame.commit,
            &current_context,
        )?;
        let new_confirmed = key_schedule::next_confirmed_transcript_hash(
            self.suite,
            &self.interim_transcript_hash,
            &tbs,
            &frame.signature,
        );
        let new_context = GroupContext {
            version: ProtocolVersion::Mls10,
            cipher_suite: self.suite,
            group_id: self.group_id.clone(),
            epoch: self.epoch + 1,
            tree_hash: tree_hash(self.suite, &diff)?,
            confirmed_transcript_hash: new_confirmed.clone(),
            extensions: self.extensions.clone(),
        };
        let schedule = key_schedule::advance(
            self.suite,
            &self.epoch_secrets.init_secret,
            &commit_secret,
            &new_context.to_wire()?,
        )?;
        let expected_tag = key_schedule::confirmation_tag(
            self.suite,
            &schedule.epoch_secrets.confirmation_key,
            &new_confirmed,
        )?;
        if expected_tag != frame.confirmation_tag {
            return Err(MlsError::InvalidConfirmationTag);
        }

        // Keys to drop: every node the commit blanked or replaced, i.e.
        // the sender's refreshed path plus the paths of removed members.
        let old_leaf_count = self.tree.leaf_count();
        let new_leaf_count = diff.leaf_count();
        let new_tree_size = math::tree_size(new_leaf_count);
        let path_capacity = old_leaf_count.max(new_leaf_count);
        let mut stale: BTreeSet<u32> = math::direct_path(frame.sender, new_leaf_count)?
            .into_iter()
            .map(|p| p.node().as_u32())
            .collect();
        for proposal in &frame.commit.proposals {
            if let Proposal::Remove { removed } = proposal {
                for p in math::direct_path(*removed, path_capacity)? {
                    stale.insert(p.node().as_u32());
                }
            }
        }

        // Every check has passed; make the transition.
        let staged = diff.stage();
        self.tree.merge(staged)?;
        self.private_keys
            .retain(|&index, _| index < new_tree_size && !stale.contains(&index));
        for (index, key) in new_node_keys {
            self.private_keys.insert(index.node().as_u32(), key);
        }
        self.epoch += 1;
        self.epoch_secrets = schedule.epoch_secrets;
        self.confirmed_transcript_hash = new_confirmed;
        self.interim_transcript_hash = key_schedule::next_interim_transcript_hash(
            self.suite,
            &self.confirmed_transcript_hash,
            &frame.confirmation_tag,
        );
        for hash_ref in added_refs {
            self.used_key_packages.insert(hash_ref);
        }
        debug!(epoch = self.epoch, sender = frame.sender.as_u32(), "processed commit");
        Ok(())
    }

    /// Join a group from a welcome addressed to the given key package
    pub fn process_welcome(
        suite: CipherSuite,
        bundle: &KeyPackageBundle,
        welcome: &Welcome,
    ) -> Result<Self> {
        suite.ensure_supported()?;
        if welcome.cipher_suite != suite {
            return Err(MlsError::Crypto(CryptoError::UnsupportedSuite {
                suite: welcome.cipher_suite.as_u16(),
            }));
        }

        let own_ref = bundle.key_package.hash_ref()?;
        let entry = welcome
            .secrets
            .iter()
            .find(|candidate| candidate.new_member == own_ref)
            .ok_or(MlsError::NoMatchingGroupSecrets)?;
        let secrets_bytes = hpke::open(
            suite,
            &bundle.init_private_key,
            &entry.encrypted_group_secrets,
            b"",
            b"",
        )?;
        let group_secrets = GroupSecrets::from_wire(&secrets_bytes)?;

        let welcome_secret =
            key_schedule::welcome_secret_from_joiner(suite, &group_secrets.joiner_secret)?;
        let (key, nonce) = key_schedule::welcome_key_nonce(suite, &welcome_secret)?;
        let info_bytes = aead::open(
            suite,
            key.as_slice(),
            nonce.as_slice(),
            b"",
            &welcome.encrypted_group_info,
        )?;
        let group_info = GroupInfo::from_wire(&info_bytes)?;
        let context = group_info.group_context.clone();

        let tree = import_ratchet_tree(group_info.tree.clone())?;
        if tree_hash(suite, &tree)? != context.tree_hash {
            return Err(MlsError::Codec(CodecError::malformed(
                "welcomed tree does not match the context tree hash",
            )));
        }
        // Validate every leaf the committer handed us.
        for (index, slot) in tree.leaves() {
            if let Some(leaf) = slot {
                match leaf.source {
                    crate::leaf_node::LeafNodeSource::KeyPackage(_) => {
                        leaf.verify(suite, None)?
                    }
                    _ => leaf.verify(suite, Some((&context.group_id, index)))?,
                }
            }
        }

        let own_leaf = tree
            .leaves()
            .find(|(_, slot)| {
                slot.map(|leaf| {
                    leaf.encryption_key == bundle.key_package.leaf_node.encryption_key
                })
                .unwrap_or(false)
            })
            .map(|(index, _)| index)
            .ok_or(MlsError::OwnLeafNotFound)?;

        let signer_leaf = tree
            .leaf(group_info.signer)?
            .ok_or(MlsError::BlankSenderLeaf {
                index: group_info.signer.as_u32(),
            })?;
        group_info.verify(suite, &signer_leaf.signature_key)?;

        let schedule = key_schedule::from_joiner_secret(
            suite,
            group_secrets.joiner_secret.clone(),
            &context.to_wire()?,
        )?;
        let expected_tag = key_schedule::confirmation_tag(
            suite,
            &schedule.epoch_secrets.confirmation_key,
            &context.confirmed_transcript_hash,
        )?;
        if expected_tag != group_info.confirmation_tag {
            return Err(MlsError::InvalidConfirmationTag);
        }

        let mut private_keys = BTreeMap::new();
        private_keys.insert(
            own_leaf.node().as_u32(),
            bundle.encryption_private_key.clone(),
        );
        if let Some(path_secret) = group_secrets.path_secret.clone() {
            let start = math::common_ancestor(group_info.signer, own_leaf, tree.leaf_count())?;
            for (index, key) in treekem::derive_path_keys_from_secret(
                suite,
                &tree,
                own_leaf,
                start,
                path_secret,
            )? {
                private_keys.insert(index.node().as_u32(), key);
            }
        }

        let interim_transcript_hash = key_schedule::next_interim_transcript_hash(
            suite,
            &context.confirmed_transcript_hash,
            &group_info.confirmation_tag,
        );

        info!(
            group_id = %hex::encode(&context.group_id),
            epoch = context.epoch,
            "joined group from welcome"
        );
        Ok(Self {
            suite,
            group_id: context.group_id.clone(),
            epoch: context.epoch,
            tree,
            extensions: context.extensions.clone(),
            own_leaf,
            signature_private_key: bundle.signature_private_key.clone(),
            private_keys,
            epoch_secrets: schedule.epoch_secrets,
            confirmed_transcript_hash: context.confirmed_transcript_hash.clone(),
            interim_transcript_hash,
            used_key_packages: BTreeSet::new(),
        })
    }

    /// Serialize the state that must survive a session
    pub fn save(&self) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        self.suite.encode(&mut w)?;
        w.write_bytes32(&self.group_id)?;
        w.write_u64(self.epoch);
        self.extensions.encode(&mut w)?;

        let nodes = export_ratchet_tree(&self.tree);
        let count = u32::try_from(nodes.len())
            .map_err(|_| CodecError::malformed("tree exceeds u32 slot count"))?;
        w.write_u32(count);
        for slot in &nodes {
            slot.encode(&mut w)?;
        }

        w.write_bytes8(&self.confirmed_transcript_hash)?;
        w.write_bytes8(&self.interim_transcript_hash)?;
        self.epoch_secrets.epoch_secret.encode(&mut w)?;
        self.epoch_secrets.init_secret.encode(&mut w)?;
        w.write_u32(self.own_leaf.as_u32());
        self.signature_private_key.encode(&mut w)?;

        let key_count = u32::try_from(self.private_keys.len())
            .map_err(|_| CodecError::malformed("private key map exceeds u32 count"))?;
        w.write_u32(key_count);
        for (index, key) in &self.private_keys {
            w.write_u32(*index);
            key.encode(&mut w)?;
        }

        let used: Vec<Vec<u8>> = self.used_key_packages.iter().cloned().collect();
        used.encode(&mut w)?;
        Ok(w.into_bytes())
    }

    /// Rebuild a handle from [`MlsGroup::save`] output
    pub fn resume(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let suite = CipherSuite::decode(&mut r)?;
        let group_id = r.read_bytes32()?.to_vec();
        let epoch = r.read_u64()?;
        let extensions = Extensions::decode(&mut r)?;

        let count = r.read_u32()? as usize;
        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(Option::<crate::node::TreeNode>::decode(&mut r)?);
        }
        let tree = import_ratchet_tree(nodes)?;

        let confirmed_transcript_hash = r.read_bytes8()?.to_vec();
        let interim_transcript_hash = r.read_bytes8()?.to_vec();
        let epoch_secret = Secret::decode(&mut r)?;
        let init_secret = Secret::decode(&mut r)?;
        let own_leaf = LeafIndex::new(r.read_u32()?);
        let signature_private_key = SignaturePrivateKey::decode(&mut r)?;

        let key_count = r.read_u32()? as usize;
        let mut private_keys = BTreeMap::new();
        for _ in 0..key_count {
            let index = r.read_u32()?;
            private_keys.insert(index, HpkePrivateKey::decode(&mut r)?);
        }
        let used: Vec<Vec<u8>> = Vec::decode(&mut r)?;
        r.finish()?;

        if tree.leaf(own_leaf)?.is_none() {
            return Err(MlsError::OwnLeafNotFound);
        }
        let mut epoch_secrets = EpochSecrets::from_epoch_secret(suite, epoch_secret)?;
        epoch_secrets.init_secret = init_secret;

        Ok(Self {
            suite,
            group_id,
            epoch,
            tree,
            extensions,
            own_leaf,
            signature_private_key,
            private_keys,
            epoch_secrets,
            confirmed_transcript_hash,
            interim_transcript_hash,
            used_key_packages: used.into_iter().collect(),
        })
    }
}
