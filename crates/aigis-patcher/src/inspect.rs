//! Object tree summaries for the `inspect` and `verify` commands.

use aigis_formats::archive::{ArchiveEntry, EntryPayload};
use aigis_formats::schema::RecordField;
use aigis_formats::texture::TextureImage;
use aigis_formats::{AlObject, Error, ParseOptions, parse_with, serialize};
use serde::Serialize;
use std::fmt;

/// Serializable outline of an object graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "format")]
pub enum Summary {
    /// Archive and its entries in TOC order
    #[serde(rename = "ALAR")]
    Archive {
        /// Version byte
        version: u8,
        /// Entries
        entries: Vec<EntrySummary>,
    },
    /// Compressed container
    #[serde(rename = "ALLZ")]
    Compressed {
        /// Length, offset and literal control widths
        widths: [u8; 3],
        /// Decompressed size from the header
        size: u32,
        /// Whether the stored bytes are written back verbatim
        original: bool,
        /// Wrapped object
        inner: Box<Summary>,
    },
    /// Standalone record schema
    #[serde(rename = "ALRD")]
    RecordSchema {
        /// Fields in row order
        fields: Vec<FieldSummary>,
    },
    /// Table
    #[serde(rename = "ALTB")]
    Table {
        /// Optional-section bits
        form: u8,
        /// Row count
        rows: usize,
        /// Bytes per row
        stride: u32,
        /// Schema fields
        fields: Vec<FieldSummary>,
        /// Pool strings referenced by rows
        strings: usize,
        /// Name from the footer
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Texture wrapper
    #[serde(rename = "ALTX")]
    Texture {
        /// 0x00 embedded, 0x0e external
        form: u8,
        /// Frame count
        frames: u16,
        /// Image data
        image: ImageSummary,
    },
    /// Opaque image
    #[serde(rename = "ALIG")]
    RawImage {
        /// Version byte after the tag
        version: Option<u8>,
        /// Bytes including the tag
        size: usize,
    },
}

/// One archive entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    /// Stored index
    pub index: u16,
    /// File name
    pub name: String,
    /// Payload address
    pub address: u32,
    /// Payload size
    pub size: u32,
    /// Byte count of a text entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<usize>,
    /// Nested object of a non-text entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Summary>,
}

/// One schema field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    /// Primary name
    pub name: String,
    /// Offset inside a row
    pub offset: u16,
    /// Raw type code
    pub type_code: u8,
}

/// Texture image data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ImageSummary {
    /// Nested ALIG
    Embedded {
        /// ALIG bytes
        size: usize,
    },
    /// Image shipped elsewhere
    External {
        /// Referenced name
        name: String,
        /// Width in pixels
        width: u16,
        /// Height in pixels
        height: u16,
    },
}

fn fields(fields: &[RecordField]) -> Vec<FieldSummary> {
    fields
        .iter()
        .map(|field| FieldSummary {
            name: field.name(),
            offset: field.offset,
            type_code: field.type_code,
        })
        .collect()
}

impl EntrySummary {
    fn of(entry: &ArchiveEntry) -> Self {
        let (text, object) = match &entry.payload {
            EntryPayload::Text(bytes) => (Some(bytes.len()), None),
            EntryPayload::Object(object) => (None, Some(Summary::of(object))),
        };
        Self {
            index: entry.index,
            name: entry.filename(),
            address: entry.address,
            size: entry.size,
            text,
            object,
        }
    }
}

impl Summary {
    /// Outline of an object graph
    pub fn of(object: &AlObject) -> Self {
        match object {
            AlObject::Archive(archive) => Self::Archive {
                version: archive.version(),
                entries: archive.entries.iter().map(EntrySummary::of).collect(),
            },
            AlObject::Compressed(allz) => Self::Compressed {
                widths: [
                    allz.header.minbits_length,
                    allz.header.minbits_offset,
                    allz.header.minbits_literal,
                ],
                size: allz.header.size,
                original: allz.is_original(),
                inner: Box::new(Self::of(&allz.inner)),
            },
            AlObject::RecordSchema(schema) => Self::RecordSchema {
                fields: fields(&schema.fields),
            },
            AlObject::Table(table) => Self::Table {
                form: table.header.form,
                rows: table.rows.len(),
                stride: table.header.stride,
                fields: fields(&table.schema.fields),
                strings: table.strings().len(),
                name: table
                    .footer
                    .as_ref()
                    .map(|footer| String::from_utf8_lossy(&footer.name).into_owned()),
            },
            AlObject::Texture(texture) => Self::Texture {
                form: texture.header.form,
                frames: texture.header.count,
                image: match &texture.image {
                    TextureImage::Embedded(image) => ImageSummary::Embedded { size: image.len() },
                    TextureImage::External {
                        width,
                        height,
                        name,
                        ..
                    } => ImageSummary::External {
                        name: String::from_utf8_lossy(name).into_owned(),
                        width: *width,
                        height: *height,
                    },
                },
            },
            AlObject::RawImage(image) => Self::RawImage {
                version: image.version(),
                size: image.len(),
            },
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Self::Archive { version, entries } => {
                writeln!(f, "{indent}ALAR v{version}, {} entries", entries.len())?;
                for entry in entries {
                    write!(
                        f,
                        "{indent}  [{}] {} @0x{:X} ({} bytes)",
                        entry.index, entry.name, entry.address, entry.size
                    )?;
                    match (&entry.text, &entry.object) {
                        (_, Some(object)) => {
                            writeln!(f)?;
                            object.write_tree(f, depth + 2)?;
                        }
                        (Some(len), None) => writeln!(f, " text, {len} bytes")?,
                        (None, None) => writeln!(f)?,
                    }
                }
                Ok(())
            }
            Self::Compressed {
                widths,
                size,
                original,
                inner,
            } => {
                writeln!(
                    f,
                    "{indent}ALLZ widths {}/{}/{}, {size} bytes{}",
                    widths[0],
                    widths[1],
                    widths[2],
                    if *original { "" } else { ", re-encoded" }
                )?;
                inner.write_tree(f, depth + 1)
            }
            Self::RecordSchema { fields } => {
                writeln!(f, "{indent}ALRD, {} fields", fields.len())?;
                write_fields(f, &indent, fields)
            }
            Self::Table {
                form,
                rows,
                stride,
                fields,
                strings,
                name,
            } => {
                write!(
                    f,
                    "{indent}ALTB form 0x{form:02X}, {rows} rows of {stride} bytes, {strings} strings"
                )?;
                match name {
                    Some(name) => writeln!(f, ", name {name}")?,
                    None => writeln!(f)?,
                }
                write_fields(f, &indent, fields)
            }
            Self::Texture {
                form,
                frames,
                image,
            } => match image {
                ImageSummary::Embedded { size } => writeln!(
                    f,
                    "{indent}ALTX form 0x{form:02X}, {frames} frames, embedded image of {size} bytes"
                ),
                ImageSummary::External {
                    name,
                    width,
                    height,
                } => writeln!(
                    f,
                    "{indent}ALTX form 0x{form:02X}, {frames} frames, external {name} {width}x{height}"
                ),
            },
            Self::RawImage { version, size } => match version {
                Some(version) => writeln!(f, "{indent}ALIG v{version}, {size} bytes"),
                None => writeln!(f, "{indent}ALIG, {size} bytes"),
            },
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, indent: &str, fields: &[FieldSummary]) -> fmt::Result {
    for field in fields {
        writeln!(
            f,
            "{indent}  {} @{} type {}",
            field.name, field.offset, field.type_code
        )?;
    }
    Ok(())
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

/// Parse `data` and check that serializing reproduces it exactly
pub fn verify_bytes(data: &[u8], options: &ParseOptions) -> aigis_formats::Result<AlObject> {
    let object = parse_with(data, options)?;
    let rebuilt = serialize(&object)?;
    if rebuilt != data {
        let offset = data
            .iter()
            .zip(&rebuilt)
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| data.len().min(rebuilt.len()));
        return Err(Error::RoundTripMismatch {
            offset,
            expected: data.len(),
            actual: rebuilt.len(),
        });
    }
    Ok(object)
}
