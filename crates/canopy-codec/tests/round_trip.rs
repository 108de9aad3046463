#![allow(clippy::unwrap_used)]

//! Property tests: every primitive decodes back to itself, and any
//! truncation or extension of a valid encoding is rejected.

use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};
use proptest::prelude::*;

proptest! {
    #[test]
    fn u64_round_trip(value: u64) {
        let bytes = value.to_wire().unwrap();
        prop_assert_eq!(u64::from_wire(&bytes).unwrap(), value);
    }

    #[test]
    fn bytes16_round_trip(data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut w = WireWriter::new();
        w.write_bytes16(&data).unwrap();
        let bytes = w.into_bytes();

        let mut r = WireReader::new(&bytes);
        prop_assert_eq!(r.read_bytes16().unwrap(), &data[..]);
        prop_assert!(r.finish().is_ok());
    }

    #[test]
    fn sequence_round_trip(items in proptest::collection::vec(any::<u32>(), 0..64)) {
        let bytes = items.to_wire().unwrap();
        prop_assert_eq!(Vec::<u32>::from_wire(&bytes).unwrap(), items);
    }

    #[test]
    fn truncation_always_fails(items in proptest::collection::vec(any::<u32>(), 1..32)) {
        let bytes = items.to_wire().unwrap();
        // Chop one byte off the end: the decode must fail, never return a
        // shortened sequence.
        let truncated = &bytes[..bytes.len() - 1];
        prop_assert!(Vec::<u32>::from_wire(truncated).is_err());
    }

    #[test]
    fn trailing_byte_always_fails(items in proptest::collection::vec(any::<u32>(), 0..32), extra: u8) {
        let mut bytes = items.to_wire().unwrap();
        bytes.push(extra);
        prop_assert!(Vec::<u32>::from_wire(&bytes).is_err());
    }
}
