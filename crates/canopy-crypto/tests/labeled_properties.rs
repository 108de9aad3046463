#![allow(clippy::unwrap_used)]

//! Property tests for the labeled constructions.

use canopy_crypto::{kdf, sign, CipherSuite};
use proptest::prelude::*;
use rand::rngs::OsRng;

const SUITE: CipherSuite = CipherSuite::MLS_128_DHKEMX25519_AES128GCM_SHA256_Ed25519;

fn labels() -> impl Strategy<Value = String> {
    proptest::collection::vec(97u8..123, 1..16).prop_map(|bytes| {
        String::from_utf8(bytes).unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn sign_verify_holds_for_any_label_and_content(
        content in proptest::collection::vec(any::<u8>(), 0..256),
        label in labels(),
    ) {
        let pair = sign::generate_key_pair(SUITE, &mut OsRng).unwrap();
        let signature = sign::sign_with_label(SUITE, &pair.private, &label, &content).unwrap();
        prop_assert!(
            sign::verify_with_label(SUITE, &pair.public, &label, &content, &signature).is_ok()
        );
        // Any other label must fail.
        let other = format!("{label}x");
        prop_assert!(
            sign::verify_with_label(SUITE, &pair.public, &other, &content, &signature).is_err()
        );
    }

    #[test]
    fn expand_produces_exact_lengths(
        length in 1usize..255,
        label in labels(),
        context in proptest::collection::vec(any::<u8>(), 0..64),
    ) {
        let secret = vec![9u8; 32];
        let out = kdf::expand_with_label(SUITE, &secret, &label, &context, length).unwrap();
        prop_assert_eq!(out.len(), length);
    }

    #[test]
    fn derivations_are_deterministic(
        secret in proptest::collection::vec(any::<u8>(), 32..33),
        label in labels(),
    ) {
        let a = kdf::derive_secret(SUITE, &secret, &label).unwrap();
        let b = kdf::derive_secret(SUITE, &secret, &label).unwrap();
        prop_assert_eq!(a, b);
    }
}
