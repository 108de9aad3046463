//! Extension lists
//!
//! Extensions are opaque `(type, data)` pairs; the core only interprets
//! the `last_resort` marker on key packages.

use canopy_codec::{WireDecode, WireEncode, WireReader, WireWriter};

/// Marks a key package as reusable by joiners
pub const EXTENSION_LAST_RESORT: u16 = 0x000a;

/// Protocol versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ProtocolVersion {
    /// MLS 1.0
    Mls10 = 1,
}

impl ProtocolVersion {
    /// Wire identifier of the version
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl WireEncode for ProtocolVersion {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_u16(self.as_u16());
        Ok(())
    }
}

impl WireDecode for ProtocolVersion {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        match r.read_u16()? {
            1 => Ok(ProtocolVersion::Mls10),
            other => Err(canopy_codec::CodecError::malformed(format!(
                "unknown protocol version {other}"
            ))),
        }
    }
}

/// A single opaque extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    /// Registered extension type
    pub extension_type: u16,
    /// Uninterpreted payload
    pub extension_data: Vec<u8>,
}

impl WireEncode for Extension {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        w.write_u16(self.extension_type);
        w.write_bytes32(&self.extension_data)
    }
}

impl WireDecode for Extension {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        let extension_type = r.read_u16()?;
        let extension_data = r.read_bytes32()?.to_vec();
        Ok(Self {
            extension_type,
            extension_data,
        })
    }
}

/// An ordered extension list
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extensions(Vec<Extension>);

impl Extensions {
    /// The empty list
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Wrap a list of extensions
    pub fn new(extensions: Vec<Extension>) -> Self {
        Self(extensions)
    }

    /// Whether an extension of the given type is present
    pub fn contains(&self, extension_type: u16) -> bool {
        self.0.iter().any(|e| e.extension_type == extension_type)
    }

    /// Payload of the first extension of the given type
    pub fn get(&self, extension_type: u16) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|e| e.extension_type == extension_type)
            .map(|e| e.extension_data.as_slice())
    }

    /// Append an extension
    pub fn push(&mut self, extension: Extension) {
        self.0.push(extension);
    }

    /// Iterate the list in order
    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.0.iter()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl WireEncode for Extensions {
    fn encode(&self, w: &mut WireWriter) -> canopy_codec::Result<()> {
        self.0.encode(w)
    }
}

impl WireDecode for Extensions {
    fn decode(r: &mut WireReader<'_>) -> canopy_codec::Result<Self> {
        Ok(Self(Vec::<Extension>::decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_type() {
        let mut extensions = Extensions::empty();
        extensions.push(Extension {
            extension_type: EXTENSION_LAST_RESORT,
            extension_data: vec![],
        });
        assert!(extensions.contains(EXTENSION_LAST_RESORT));
        assert!(!extensions.contains(0x0001));
        assert_eq!(extensions.get(EXTENSION_LAST_RESORT), Some(&[][..]));
    }

    #[test]
    fn round_trip() {
        let extensions = Extensions::new(vec![Extension {
            extension_type: 7,
            extension_data: vec![1, 2, 3],
        }]);
        let bytes = extensions.to_wire().unwrap();
        assert_eq!(Extensions::from_wire(&bytes).unwrap(), extensions);
    }
}
