//! ALAR archive container
//!
//! An archive is a table of contents of named entries, each pointing at a
//! byte range that holds either plain text (`.txt`, `.lua`) or a nested AL*
//! object. Two versions exist; they share [`ArchiveEntry`] and differ only in
//! header fields and where names are stored:
//!
//! | Version | Names | Record |
//! |---------|-------|--------|
//! | 2 | 36-byte region in front of each payload | 16 bytes |
//! | 3 | inline after each record, 4-aligned | 18 bytes + name |
//!
//! Entry addresses are relative to the archive start. Writing lays the data
//! out again and recomputes every address and size.
//!
//! # Example
//!
//! ```rust
//! use aigis_formats::archive::{Archive, ArchiveEntry, EntryPayload, V2Header, V2Layout};
//! use aigis_formats::AlFormat;
//!
//! let archive = Archive::v2(
//!     V2Header::new(V2Layout::Extended),
//!     vec![ArchiveEntry::new(0, "readme.txt", EntryPayload::Text(b"hi!!".to_vec()), 4)],
//! );
//! let bytes = archive.build()?;
//! let parsed = Archive::from_bytes(&bytes)?;
//! assert_eq!(parsed.entry("readme.txt").map(|e| e.size), Some(4));
//! # Ok::<(), aigis_formats::Error>(())
//! ```

mod entry;
mod v2;
mod v3;

pub use entry::{ArchiveEntry, EntryPayload};
pub use v2::{V2Header, V2Layout};
pub use v3::V3Header;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::object::ParseOptions;
use crate::patch::PatchContext;
use futures::future::join_all;
use tracing::debug;

/// Reserved record bytes for version 2 entries
pub const V2_RESERVED_LEN: usize = v2::RESERVED_LEN;

/// Reserved record bytes for version 3 entries
pub const V3_RESERVED_LEN: usize = v3::RESERVED_LEN;

/// Version-specific header of an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveHeader {
    /// Version 2
    V2(V2Header),
    /// Version 3
    V3(V3Header),
}

impl ArchiveHeader {
    /// Version byte
    pub fn version(&self) -> u8 {
        match self {
            Self::V2(_) => 2,
            Self::V3(_) => 3,
        }
    }
}

/// Parsed ALAR object
#[derive(Debug, Clone, PartialEq)]
pub struct Archive {
    /// Version-specific header
    pub header: ArchiveHeader,
    /// Entries in table-of-contents order
    pub entries: Vec<ArchiveEntry>,
}

impl Archive {
    /// Version 2 archive
    pub fn v2(header: V2Header, entries: Vec<ArchiveEntry>) -> Self {
        Self {
            header: ArchiveHeader::V2(header),
            entries,
        }
    }

    /// Version 3 archive
    pub fn v3(header: V3Header, entries: Vec<ArchiveEntry>) -> Self {
        Self {
            header: ArchiveHeader::V3(header),
            entries,
        }
    }

    /// Parse at the reader's position, which is the archive base
    pub fn parse(reader: &mut ByteReader<'_>, options: &ParseOptions) -> Result<Self> {
        let version = reader.u8_at(reader.position() + 4)?;
        let (header, records) = match version {
            2 => {
                let (header, records) = v2::parse_toc(reader, options.alar_v2_layout)?;
                (ArchiveHeader::V2(header), records)
            }
            3 => {
                let (header, records) = v3::parse_toc(reader)?;
                (ArchiveHeader::V3(header), records)
            }
            version => {
                return Err(Error::UnsupportedVersion {
                    format: "ALAR",
                    version,
                });
            }
        };
        debug!("ALAR v{version} with {} entries", records.len());

        let mut end = reader.position();
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            end = end.max(reader.base_offset() + record.address as usize + record.size as usize);
            entries.push(ArchiveEntry::load(reader, record, options)?);
        }
        reader.jump_to(end);

        Ok(Self { header, entries })
    }

    /// Write at the writer's position
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        match &self.header {
            ArchiveHeader::V2(header) => v2::write(writer, header, &self.entries),
            ArchiveHeader::V3(header) => v3::write(writer, header, &self.entries),
        }
    }

    /// Entry by file name
    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.name == name.as_bytes())
    }

    /// Version byte
    pub fn version(&self) -> u8 {
        self.header.version()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Patch every entry concurrently under its own child scope
    ///
    /// Entries come back in table-of-contents order whatever order their
    /// patches finish in.
    pub async fn patch(&self, context: &PatchContext) -> Result<Self> {
        let patched = join_all(self.entries.iter().map(|entry| entry.patch(context))).await;
        let entries = patched.into_iter().collect::<Result<Vec<_>>>()?;
        debug!("patched {} entries under {}", entries.len(), context.path());
        Ok(Self {
            header: self.header.clone(),
            entries,
        })
    }
}

fn offset_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::layout("ALAR", "archive exceeds 4 GiB"))
}

crate::impl_al_format!(Archive, reader => Archive::parse(reader, &ParseOptions::default()));
