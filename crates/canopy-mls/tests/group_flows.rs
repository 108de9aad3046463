#![allow(clippy::unwrap_used)]

//! End-to-end group flows: create, add, welcome, update, remove, and the
//! failure paths that must leave state untouched.

use canopy_mls::{
    CipherSuite, Credential, Extensions, KeyPackageBundle, LeafIndex, Lifetime, MlsError,
    MlsGroup,
};
use rand::rngs::OsRng;

const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

fn bundle(identity: &[u8]) -> KeyPackageBundle {
    KeyPackageBundle::generate(
        SUITE,
        Credential::basic(identity.to_vec()),
        Lifetime::unbounded(),
        Extensions::empty(),
        &mut OsRng,
    )
    .unwrap()
}

fn new_group(identity: &[u8]) -> MlsGroup {
    MlsGroup::create_group(
        SUITE,
        &bundle(identity),
        b"canopy-test-group".to_vec(),
        Extensions::empty(),
    )
    .unwrap()
}

#[test]
fn two_member_group_converges() {
    let mut alice = new_group(b"alice");
    assert_eq!(alice.current_epoch(), 0);
    assert_eq!(alice.current_members().len(), 1);

    let bob_bundle = bundle(b"bob");
    let (welcome, _commit) = alice.add_member(&bob_bundle.key_package).unwrap();
    assert_eq!(alice.current_epoch(), 1);

    let bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();
    assert_eq!(bob.current_epoch(), 1);
    assert_eq!(bob.current_members().len(), 2);

    let alice_export = alice.export_secret("nostr", b"", 32).unwrap();
    let bob_export = bob.export_secret("nostr", b"", 32).unwrap();
    assert_eq!(alice_export, bob_export);
    assert_eq!(alice_export.len(), 32);
}

#[test]
fn members_are_listed_with_credentials() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    alice.add_member(&bob_bundle.key_package).unwrap();

    let members = alice.current_members();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0].index, LeafIndex::new(0));
    assert_eq!(members[0].credential, Credential::basic(b"alice".to_vec()));
    assert_eq!(members[1].credential, Credential::basic(b"bob".to_vec()));
}

#[test]
fn third_member_sees_existing_commits() {
    let mut alice = new_group(b"alice");

    let bob_bundle = bundle(b"bob");
    let (bob_welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &bob_welcome).unwrap();

    let carol_bundle = bundle(b"carol");
    let (carol_welcome, commit) = alice.add_member(&carol_bundle.key_package).unwrap();
    bob.process_commit(&commit).unwrap();
    let carol = MlsGroup::process_welcome(SUITE, &carol_bundle, &carol_welcome).unwrap();

    assert_eq!(alice.current_epoch(), 2);
    assert_eq!(bob.current_epoch(), 2);
    assert_eq!(carol.current_epoch(), 2);
    for group in [&alice, &bob, &carol] {
        assert_eq!(group.current_members().len(), 3);
    }

    let reference = alice.export_secret("nostr", b"session", 32).unwrap();
    assert_eq!(bob.export_secret("nostr", b"session", 32).unwrap(), reference);
    assert_eq!(
        carol.export_secret("nostr", b"session", 32).unwrap(),
        reference
    );
}

#[test]
fn update_refreshes_secrets_for_everyone() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let before = alice.export_secret("nostr", b"", 32).unwrap();
    let commit = bob.update().unwrap();
    alice.process_commit(&commit).unwrap();

    let after_alice = alice.export_secret("nostr", b"", 32).unwrap();
    let after_bob = bob.export_secret("nostr", b"", 32).unwrap();
    assert_eq!(after_alice, after_bob);
    assert_ne!(after_alice, before);
}

#[test]
fn remove_blanks_leaf_and_path() {
    let mut alice = new_group(b"alice");

    let mut others: Vec<MlsGroup> = Vec::new();
    for name in [b"bob".as_slice(), b"carol", b"dave"] {
        let member_bundle = bundle(name);
        let (welcome, commit) = alice.add_member(&member_bundle.key_package).unwrap();
        for other in others.iter_mut() {
            other.process_commit(&commit).unwrap();
        }
        others.push(MlsGroup::process_welcome(SUITE, &member_bundle, &welcome).unwrap());
    }
    let mut carol = others.remove(1);
    assert_eq!(carol.own_leaf_index(), LeafIndex::new(2));

    // Carol removes Alice (leaf 0): the leaf and the untouched part of its
    // direct path stay blank after Carol's own path refresh.
    let commit = carol.remove_member(LeafIndex::new(0)).unwrap();
    assert_eq!(carol.current_members().len(), 3);
    assert!(carol
        .current_members()
        .iter()
        .all(|member| member.index != LeafIndex::new(0)));

    let mut bob = others.remove(0);
    bob.process_commit(&commit).unwrap();
    assert_eq!(
        bob.export_secret("nostr", b"", 32).unwrap(),
        carol.export_secret("nostr", b"", 32).unwrap()
    );

    // Alice cannot process the commit that removed her.
    assert_eq!(
        alice.process_commit(&commit),
        Err(MlsError::OwnLeafNotFound)
    );
}

#[test]
fn commits_from_closed_epochs_are_rejected() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let first = bob.update().unwrap();
    alice.process_commit(&first).unwrap();

    // Replaying the same commit hits the closed epoch.
    assert!(matches!(
        alice.process_commit(&first),
        Err(MlsError::EpochClosed { .. })
    ));

    // A second commit built against the closed epoch is also rejected.
    let mut stale_bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();
    let stale = stale_bob.update().unwrap();
    assert!(matches!(
        alice.process_commit(&stale),
        Err(MlsError::EpochClosed { .. })
    ));
}

#[test]
fn reused_key_package_is_rejected() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    alice.add_member(&bob_bundle.key_package).unwrap();
    assert_eq!(
        alice.add_member(&bob_bundle.key_package).map(|_| ()),
        Err(MlsError::ReusedKeyPackage)
    );
}

#[test]
fn tampered_commit_leaves_state_unchanged() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let mut commit = bob.update().unwrap();
    commit.signature[0] ^= 0x01;

    let export_before = alice.export_secret("nostr", b"", 32).unwrap();
    let epoch_before = alice.current_epoch();
    assert!(alice.process_commit(&commit).is_err());
    assert_eq!(alice.current_epoch(), epoch_before);
    assert_eq!(alice.export_secret("nostr", b"", 32).unwrap(), export_before);
}

#[test]
fn tampered_confirmation_tag_is_rejected() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let mut commit = bob.update().unwrap();
    commit.confirmation_tag[0] ^= 0x01;
    assert_eq!(
        alice.process_commit(&commit),
        Err(MlsError::InvalidConfirmationTag)
    );
}

#[test]
fn welcome_for_someone_else_is_rejected() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();

    let mallory_bundle = bundle(b"mallory");
    assert!(matches!(
        MlsGroup::process_welcome(SUITE, &mallory_bundle, &welcome),
        Err(MlsError::NoMatchingGroupSecrets)
    ));
}

#[test]
fn saved_state_resumes_into_a_working_handle() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let saved = alice.save().unwrap();
    let mut resumed = MlsGroup::resume(&saved).unwrap();
    assert_eq!(resumed.current_epoch(), alice.current_epoch());
    assert_eq!(
        resumed.export_secret("nostr", b"", 32).unwrap(),
        alice.export_secret("nostr", b"", 32).unwrap()
    );

    // The resumed handle keeps participating in the protocol.
    let commit = bob.update().unwrap();
    resumed.process_commit(&commit).unwrap();
    assert_eq!(
        resumed.export_secret("nostr", b"", 32).unwrap(),
        bob.export_secret("nostr", b"", 32).unwrap()
    );
}

#[test]
fn epochs_leave_no_secret_trail() {
    let mut alice = new_group(b"alice");
    let bob_bundle = bundle(b"bob");
    let (welcome, _) = alice.add_member(&bob_bundle.key_package).unwrap();
    let mut bob = MlsGroup::process_welcome(SUITE, &bob_bundle, &welcome).unwrap();

    let mut exports = Vec::new();
    exports.push(alice.export_secret("nostr", b"", 32).unwrap());
    for _ in 0..3 {
        let commit = alice.update().unwrap();
        bob.process_commit(&commit).unwrap();
        exports.push(alice.export_secret("nostr", b"", 32).unwrap());
    }
    // Every epoch exports a distinct secret.
    for (i, a) in exports.iter().enumerate() {
        for b in exports.iter().skip(i + 1) {
            assert_ne!(a, b);
        }
    }
}
