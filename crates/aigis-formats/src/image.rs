//! ALIG raw image
//!
//! Pixel formats are not decoded. The object owns every byte from its tag to
//! the end of the enclosing window and writes them back unchanged.

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};

/// Opaque ALIG image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    bytes: Vec<u8>,
}

impl RawImage {
    /// Take the remaining bytes of the reader's window
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let tag = reader.peek_tag()?;
        if &tag != b"ALIG" {
            return Err(Error::UnknownMagic {
                tag,
                position: reader.position(),
            });
        }
        let bytes = reader.read_bytes(reader.remaining())?.to_vec();
        Ok(Self { bytes })
    }

    /// Write the image bytes
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.write_bytes(&self.bytes);
        Ok(())
    }

    /// Version byte following the tag
    pub fn version(&self) -> Option<u8> {
        self.bytes.get(4).copied()
    }

    /// Encoded bytes, tag included
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Encoded size
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a parsed image, which holds at least its tag
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

crate::impl_al_format!(RawImage, reader => RawImage::parse(reader));
