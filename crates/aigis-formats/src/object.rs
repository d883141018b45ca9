//! Tag dispatch over the closed set of AL* object types
//!
//! Every object starts with a four-byte ASCII tag. [`AlObject::parse`] peeks
//! the tag, looks it up in [`TAGS`] and hands the cursor to the matching
//! format with the base offset rebased to the object start.

use crate::archive::{Archive, V2Layout};
use crate::allz::Allz;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::image::RawImage;
use crate::patch::PatchContext;
use crate::schema::RecordSchema;
use crate::table::Table;
use crate::texture::Texture;
use futures::future::{BoxFuture, FutureExt};
use tracing::debug;

/// Object type selected by a four-byte tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Magic {
    /// `ALAR` archive container
    Archive,
    /// `ALLZ` bit-packed compressed container
    Compressed,
    /// `ALRD` record schema
    RecordSchema,
    /// `ALTB` typed table
    Table,
    /// `ALTX` texture wrapper
    Texture,
    /// `ALIG` raw image
    RawImage,
}

/// Dispatch table keyed on the four-byte tag
pub const TAGS: [([u8; 4], Magic); 6] = [
    (*b"ALAR", Magic::Archive),
    (*b"ALLZ", Magic::Compressed),
    (*b"ALRD", Magic::RecordSchema),
    (*b"ALTB", Magic::Table),
    (*b"ALTX", Magic::Texture),
    (*b"ALIG", Magic::RawImage),
];

impl Magic {
    /// Look up a tag
    pub fn from_tag(tag: [u8; 4]) -> Option<Self> {
        TAGS.iter().find(|(t, _)| *t == tag).map(|(_, m)| *m)
    }

    /// The four tag bytes
    pub fn tag(self) -> [u8; 4] {
        TAGS.iter()
            .find(|(_, m)| *m == self)
            .map_or([0; 4], |(t, _)| *t)
    }

    /// Tag as text
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Archive => "ALAR",
            Self::Compressed => "ALLZ",
            Self::RecordSchema => "ALRD",
            Self::Table => "ALTB",
            Self::Texture => "ALTX",
            Self::RawImage => "ALIG",
        }
    }
}

/// Options that select between layouts the data cannot distinguish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Header/TOC layout used for ALAR version 2
    pub alar_v2_layout: V2Layout,
}

/// A parsed AL* object
#[derive(Debug, Clone, PartialEq)]
pub enum AlObject {
    /// `ALAR`
    Archive(Archive),
    /// `ALLZ`
    Compressed(Allz),
    /// `ALRD`
    RecordSchema(RecordSchema),
    /// `ALTB`
    Table(Table),
    /// `ALTX`
    Texture(Texture),
    /// `ALIG`
    RawImage(RawImage),
}

impl AlObject {
    /// Parse the object at the reader's position with default options
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        Self::parse_with(reader, &ParseOptions::default())
    }

    /// Parse the object at the reader's position
    pub fn parse_with(reader: &mut ByteReader<'_>, options: &ParseOptions) -> Result<Self> {
        let position = reader.position();
        let tag = reader.peek_tag()?;
        let magic = Magic::from_tag(tag).ok_or(Error::UnknownMagic { tag, position })?;
        debug!("parsing {} at 0x{:X}", magic.as_str(), position);

        reader.with_base(|r| {
            Ok(match magic {
                Magic::Archive => Self::Archive(Archive::parse(r, options)?),
                Magic::Compressed => Self::Compressed(Allz::parse(r, options)?),
                Magic::RecordSchema => Self::RecordSchema(RecordSchema::parse(r)?),
                Magic::Table => Self::Table(Table::parse(r)?),
                Magic::Texture => Self::Texture(Texture::parse(r, options)?),
                Magic::RawImage => Self::RawImage(RawImage::parse(r)?),
            })
        })
    }

    /// Parse a whole buffer
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(&mut ByteReader::new(data))
    }

    /// Write the object at the writer's position, rebasing for its offsets
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        writer.with_base(|w| match self {
            Self::Archive(archive) => archive.write(w),
            Self::Compressed(allz) => allz.write(w),
            Self::RecordSchema(schema) => schema.write(w),
            Self::Table(table) => table.write(w),
            Self::Texture(texture) => texture.write(w),
            Self::RawImage(image) => image.write(w),
        })
    }

    /// Serialize into a fresh buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ByteWriter::new();
        self.write(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Object type
    pub fn magic(&self) -> Magic {
        match self {
            Self::Archive(_) => Magic::Archive,
            Self::Compressed(_) => Magic::Compressed,
            Self::RecordSchema(_) => Magic::RecordSchema,
            Self::Table(_) => Magic::Table,
            Self::Texture(_) => Magic::Texture,
            Self::RawImage(_) => Magic::RawImage,
        }
    }

    /// Produce a translated copy; `self` is left untouched
    pub fn patch<'a>(&'a self, context: &'a PatchContext) -> BoxFuture<'a, Result<Self>> {
        async move {
            Ok(match self {
                Self::Archive(archive) => Self::Archive(archive.patch(context).await?),
                Self::Compressed(allz) => Self::Compressed(allz.patch(context).await?),
                Self::Table(table) => Self::Table(table.patch(context)?),
                Self::RecordSchema(_) | Self::Texture(_) | Self::RawImage(_) => self.clone(),
            })
        }
        .boxed()
    }
}

impl crate::AlFormat for AlObject {
    fn parse(data: &[u8]) -> Result<Self> {
        Self::from_bytes(data)
    }

    fn build(&self) -> Result<Vec<u8>> {
        self.to_bytes()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_tag_table_is_bijective() {
        for (tag, magic) in TAGS {
            assert_eq!(Magic::from_tag(tag), Some(magic));
            assert_eq!(magic.tag(), tag);
            assert_eq!(magic.as_str().as_bytes(), &tag);
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let data = *b"ALFT\x00\x00\x00\x00";
        let err = AlObject::from_bytes(&data).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(matches!(err, Error::UnknownMagic { position: 0, .. }));
    }

    #[test]
    fn test_short_buffer_is_truncation() {
        let err = AlObject::from_bytes(b"AL").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
    }

    #[test]
    fn test_raw_image_dispatch() {
        let data = b"ALIG\x00\x00\x00\x00pixels".to_vec();
        let object = AlObject::from_bytes(&data).unwrap();
        assert_eq!(object.magic(), Magic::RawImage);
        assert_eq!(object.to_bytes().unwrap(), data);
    }
}
