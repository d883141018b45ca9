//! ALTX texture wrapper
//!
//! ```text
//! "ALTX" | version u8 (0) | form u8 | count u16 | image offset u32
//! frame table bytes up to the image offset
//! form 0x00: nested ALIG object
//! form 0x0e: width u16 | height u16 | external name NUL
//! ```
//!
//! The frame table is kept as stored; textures carry no translatable text.

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::image::RawImage;
use crate::object::{AlObject, ParseOptions};
use binrw::{BinRead, BinWrite};

/// Only supported ALTX version
pub const ALTX_VERSION: u8 = 0;

/// Form holding an embedded ALIG
pub const FORM_EMBEDDED: u8 = 0x00;

/// Form referring to an external image by name
pub const FORM_EXTERNAL: u8 = 0x0E;

/// Fixed 12-byte ALTX header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = b"ALTX")]
#[bw(little, magic = b"ALTX")]
pub struct TextureHeader {
    /// Must be 0
    pub version: u8,
    /// 0x00 or 0x0e
    pub form: u8,
    /// Frame count
    pub count: u16,
    /// Offset of the image data
    pub image_offset: u32,
}

impl TextureHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    /// Check version and form
    pub fn validate(&self) -> Result<()> {
        if self.version != ALTX_VERSION {
            return Err(Error::UnsupportedVersion {
                format: "ALTX",
                version: self.version,
            });
        }
        if self.form != FORM_EMBEDDED && self.form != FORM_EXTERNAL {
            return Err(Error::UnsupportedForm {
                format: "ALTX",
                form: self.form,
            });
        }
        if (self.image_offset as usize) < Self::SIZE {
            return Err(Error::layout(
                "ALTX",
                format!("image offset 0x{:X} inside the header", self.image_offset),
            ));
        }
        Ok(())
    }
}

/// Image data of a texture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextureImage {
    /// Pixels stored in a nested ALIG
    Embedded(RawImage),
    /// Reference to an image shipped elsewhere
    External {
        /// Width in pixels
        width: u16,
        /// Height in pixels
        height: u16,
        /// Referenced image name
        name: Vec<u8>,
        /// Bytes after the name terminator
        trailer: Vec<u8>,
    },
}

/// Parsed ALTX object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    /// Fixed header
    pub header: TextureHeader,
    /// Frame table bytes between the header and the image
    pub frames: Vec<u8>,
    /// Image data
    pub image: TextureImage,
}

impl Texture {
    /// Parse at the reader's position; the image offset is relative to its base
    pub fn parse(reader: &mut ByteReader<'_>, options: &ParseOptions) -> Result<Self> {
        let header: TextureHeader = reader.read_struct()?;
        header.validate()?;

        let frames_len = header.image_offset as usize - TextureHeader::SIZE;
        let frames = reader.read_bytes(frames_len)?.to_vec();

        let image = if header.form == FORM_EMBEDDED {
            match AlObject::parse_with(reader, options)? {
                AlObject::RawImage(image) => TextureImage::Embedded(image),
                other => {
                    return Err(Error::layout(
                        "ALTX",
                        format!("embedded image is {}, expected ALIG", other.magic().as_str()),
                    ));
                }
            }
        } else {
            let width = reader.read_u16()?;
            let height = reader.read_u16()?;
            let name = reader.read_cstr(None)?.to_vec();
            let trailer = reader.read_bytes(reader.remaining())?.to_vec();
            TextureImage::External {
                width,
                height,
                name,
                trailer,
            }
        };

        Ok(Self {
            header,
            frames,
            image,
        })
    }

    /// Write at the writer's position
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let image_offset = TextureHeader::SIZE + self.frames.len();
        let image_offset = u32::try_from(image_offset)
            .map_err(|_| Error::layout("ALTX", "frame table exceeds 4 GiB"))?;
        writer.write_struct(&TextureHeader {
            image_offset,
            ..self.header
        })?;
        writer.write_bytes(&self.frames);

        match &self.image {
            TextureImage::Embedded(image) => writer.with_base(|w| image.write(w)),
            TextureImage::External {
                width,
                height,
                name,
                trailer,
            } => {
                writer.write_u16(*width);
                writer.write_u16(*height);
                writer.write_cstr(name);
                writer.write_bytes(trailer);
                Ok(())
            }
        }
    }

    /// External image name, for form 0x0e
    pub fn external_name(&self) -> Option<String> {
        match &self.image {
            TextureImage::External { name, .. } => {
                Some(String::from_utf8_lossy(name).into_owned())
            }
            TextureImage::Embedded(_) => None,
        }
    }
}

crate::impl_al_format!(Texture, reader => Texture::parse(reader, &ParseOptions::default()));
