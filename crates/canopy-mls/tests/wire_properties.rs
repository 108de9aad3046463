#![allow(clippy::unwrap_used)]

//! Property tests: protocol structures survive the wire.

use canopy_codec::{WireDecode, WireEncode};
use canopy_mls::{Credential, Extension, Extensions};
use proptest::prelude::*;

proptest! {
    #[test]
    fn basic_credential_round_trips(identity in proptest::collection::vec(any::<u8>(), 0..64)) {
        let credential = Credential::basic(identity);
        let bytes = credential.to_wire().unwrap();
        prop_assert_eq!(Credential::from_wire(&bytes).unwrap(), credential);
    }

    #[test]
    fn x509_credential_round_trips(
        chain in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..32), 0..4)
    ) {
        let credential = Credential::X509 { chain };
        let bytes = credential.to_wire().unwrap();
        prop_assert_eq!(Credential::from_wire(&bytes).unwrap(), credential);
    }

    #[test]
    fn extension_lists_round_trip(
        raw in proptest::collection::vec(
            (any::<u16>(), proptest::collection::vec(any::<u8>(), 0..32)),
            0..8,
        )
    ) {
        let extensions = Extensions::new(
            raw.into_iter()
                .map(|(extension_type, extension_data)| Extension {
                    extension_type,
                    extension_data,
                })
                .collect(),
        );
        let bytes = extensions.to_wire().unwrap();
        prop_assert_eq!(Extensions::from_wire(&bytes).unwrap(), extensions);
    }

    #[test]
    fn truncated_credentials_never_decode(identity in proptest::collection::vec(any::<u8>(), 1..64)) {
        let credential = Credential::basic(identity);
        let bytes = credential.to_wire().unwrap();
        prop_assert!(Credential::from_wire(&bytes[..bytes.len() - 1]).is_err());
    }
}
