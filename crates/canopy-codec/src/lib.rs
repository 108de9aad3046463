//! Canopy wire codec
//!
//! Length-prefixed big-endian serialization used uniformly by every protocol
//! structure (leaf nodes, key packages, update paths, signed content). The
//! format has four primitives:
//!
//! - fixed-width unsigned integers (`u8`..`u64`), big-endian, no padding
//! - variable byte strings behind a `u8`/`u16`/`u32` length prefix chosen
//!   per call site
//! - sequences: a `u32` element count followed by concatenated encodings
//! - tagged unions: a discriminator (usually `u16`) followed by the variant
//!   payload
//!
//! Decoding is strict: truncation, over-length fields, unknown
//! discriminators, and trailing bytes all fail with
//! [`CodecError::MalformedWire`].

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{CodecError, Result};
pub use reader::WireReader;
pub use writer::WireWriter;

/// Types that can be written to the wire format
pub trait WireEncode {
    /// Append the encoding of `self` to the writer
    fn encode(&self, w: &mut WireWriter) -> Result<()>;

    /// Encode `self` into a fresh byte vector
    fn to_wire(&self) -> Result<Vec<u8>> {
        let mut w = WireWriter::new();
        self.encode(&mut w)?;
        Ok(w.into_bytes())
    }
}

/// Types that can be read back from the wire format
pub trait WireDecode: Sized {
    /// Decode one value, advancing the reader past it
    fn decode(r: &mut WireReader<'_>) -> Result<Self>;

    /// Decode a value that must span the whole input
    fn from_wire(bytes: &[u8]) -> Result<Self> {
        let mut r = WireReader::new(bytes);
        let value = Self::decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

impl WireEncode for u8 {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u8(*self);
        Ok(())
    }
}

impl WireDecode for u8 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        r.read_u8()
    }
}

impl WireEncode for u16 {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u16(*self);
        Ok(())
    }
}

impl WireDecode for u16 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        r.read_u16()
    }
}

impl WireEncode for u32 {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u32(*self);
        Ok(())
    }
}

impl WireDecode for u32 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        r.read_u32()
    }
}

impl WireEncode for u64 {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        w.write_u64(*self);
        Ok(())
    }
}

impl WireDecode for u64 {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        r.read_u64()
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        let count = u32::try_from(self.len())
            .map_err(|_| CodecError::malformed("sequence exceeds u32 element count"))?;
        w.write_u32(count);
        for item in self {
            item.encode(w)?;
        }
        Ok(())
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        let count = r.read_u32()? as usize;
        // An element encodes to at least one byte, so the count can never
        // exceed the remaining input.
        if count > r.remaining() {
            return Err(CodecError::malformed(format!(
                "sequence count {count} exceeds remaining input"
            )));
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(T::decode(r)?);
        }
        Ok(items)
    }
}

impl<T: WireEncode> WireEncode for Option<T> {
    fn encode(&self, w: &mut WireWriter) -> Result<()> {
        match self {
            None => {
                w.write_u8(0);
                Ok(())
            }
            Some(value) => {
                w.write_u8(1);
                value.encode(w)
            }
        }
    }
}

impl<T: WireDecode> WireDecode for Option<T> {
    fn decode(r: &mut WireReader<'_>) -> Result<Self> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(r)?)),
            other => Err(CodecError::malformed(format!(
                "invalid presence octet {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Pair {
        a: u16,
        b: Vec<u8>,
    }

    impl WireEncode for Pair {
        fn encode(&self, w: &mut WireWriter) -> Result<()> {
            w.write_u16(self.a);
            w.write_bytes16(&self.b)
        }
    }

    impl WireDecode for Pair {
        fn decode(r: &mut WireReader<'_>) -> Result<Self> {
            let a = r.read_u16()?;
            let b = r.read_bytes16()?.to_vec();
            Ok(Pair { a, b })
        }
    }

    #[test]
    fn struct_round_trip() {
        let pair = Pair {
            a: 7,
            b: vec![1, 2, 3],
        };
        let bytes = pair.to_wire().unwrap();
        assert_eq!(Pair::from_wire(&bytes).unwrap(), pair);
    }

    #[test]
    fn sequence_round_trip() {
        let items = vec![
            Pair { a: 1, b: vec![] },
            Pair { a: 2, b: vec![9] },
        ];
        let bytes = items.to_wire().unwrap();
        assert_eq!(Vec::<Pair>::from_wire(&bytes).unwrap(), items);
    }

    #[test]
    fn option_round_trip() {
        let present: Option<u32> = Some(42);
        let absent: Option<u32> = None;
        assert_eq!(
            Option::<u32>::from_wire(&present.to_wire().unwrap()).unwrap(),
            present
        );
        assert_eq!(
            Option::<u32>::from_wire(&absent.to_wire().unwrap()).unwrap(),
            absent
        );
    }

    #[test]
    fn trailing_bytes_fail_whole_input_decode() {
        let mut bytes = 3u16.to_wire().unwrap();
        bytes.push(0xff);
        assert!(u16::from_wire(&bytes).is_err());
    }

    #[test]
    fn absurd_sequence_count_is_rejected() {
        // Count claims 2^32-1 elements over a three-byte payload.
        let bytes = [0xff, 0xff, 0xff, 0xff, 1, 2, 3];
        assert!(Vec::<u8>::from_wire(&bytes).is_err());
    }
}
