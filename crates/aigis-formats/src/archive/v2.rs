//! ALAR version 2
//!
//! File names live out of band: each payload is preceded by a 36-byte region
//! holding two zero bytes and the NUL-padded name, so a name is found at
//! `address - 0x22`.

use super::entry::{ArchiveEntry, TocRecord};
use super::offset_u32;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use binrw::{BinRead, BinWrite};

/// Bytes reserved in front of each payload for its name
pub const NAME_REGION: usize = 36;

/// Distance from a payload address back to its name
const NAME_OFFSET: usize = 0x22;

/// Reserved bytes at the end of a v2 record
pub const RESERVED_LEN: usize = 4;

/// Header and record layout of a version 2 archive
///
/// Two layouts exist and the data does not say which one a file uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum V2Layout {
    /// `unk1 u8, count u16, unk2 u32, unk3 u32`; records start at 16
    #[default]
    Extended,
    /// `unk1 u8, count u16`; records start at 8
    Compact,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
#[brw(little)]
struct V2Record {
    index: u16,
    flags: u16,
    address: u32,
    size: u32,
    reserved: [u8; RESERVED_LEN],
}

impl V2Record {
    const SIZE: usize = 16;
}

/// Version 2 header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct V2Header {
    /// Layout the header was read with
    pub layout: V2Layout,
    /// Byte after the version
    pub unk1: u8,
    /// First extended word, 0 for the compact layout
    pub unk2: u32,
    /// Second extended word, 0 for the compact layout
    pub unk3: u32,
}

impl V2Header {
    /// Empty header for building an archive
    pub fn new(layout: V2Layout) -> Self {
        Self {
            layout,
            unk1: 0,
            unk2: 0,
            unk3: 0,
        }
    }
}

pub(super) fn parse_toc(
    reader: &mut ByteReader<'_>,
    layout: V2Layout,
) -> Result<(V2Header, Vec<TocRecord>)> {
    reader.seek(5)?;
    let unk1 = reader.read_u8()?;
    let count = reader.read_u16()?;
    let (unk2, unk3) = match layout {
        V2Layout::Extended => (reader.read_u32()?, reader.read_u32()?),
        V2Layout::Compact => (0, 0),
    };

    let mut records = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let record: V2Record = reader.read_struct()?;
        let address = record.address as usize;
        if address < NAME_REGION {
            return Err(Error::layout(
                "ALAR",
                format!("v2 entry {} at 0x{address:X} leaves no room for its name", record.index),
            ));
        }
        let name = reader
            .cstr_at(reader.base_offset() + address - NAME_OFFSET, Some(NAME_OFFSET))?
            .to_vec();

        records.push(TocRecord {
            index: record.index,
            flags: record.flags,
            address: record.address,
            size: record.size,
            reserved: record.reserved.to_vec(),
            name,
        });
    }

    Ok((
        V2Header {
            layout,
            unk1,
            unk2,
            unk3,
        },
        records,
    ))
}

pub(super) fn write(
    writer: &mut ByteWriter,
    header: &V2Header,
    entries: &[ArchiveEntry],
) -> Result<()> {
    let count = u16::try_from(entries.len())
        .map_err(|_| Error::layout("ALAR", format!("{} entries exceed 65535", entries.len())))?;

    writer.write_bytes(b"ALAR");
    writer.write_u8(2);
    writer.write_u8(header.unk1);
    writer.write_u16(count);
    if header.layout == V2Layout::Extended {
        writer.write_u32(header.unk2);
        writer.write_u32(header.unk3);
    }

    // Records are filled in behind the data cursor once each size is known
    let mut record_position = writer.position();
    writer.jump_to(record_position + entries.len() * V2Record::SIZE);

    for entry in entries {
        if entry.name.len() >= NAME_OFFSET {
            return Err(Error::layout(
                "ALAR",
                format!("v2 entry name {} exceeds {} bytes", entry.filename(), NAME_OFFSET - 1),
            ));
        }
        writer.write_bytes(&[0, 0]);
        writer.write_bytes(&entry.name);
        writer.pad(NAME_OFFSET - entry.name.len());

        let start = writer.relative_position();
        entry.write_payload(writer)?;
        writer.align(4);
        let end = writer.position();

        let record = V2Record {
            index: entry.index,
            flags: entry.flags,
            address: offset_u32(start)?,
            size: offset_u32(writer.relative_position() - start)?,
            reserved: entry.reserved_array()?,
        };
        writer.jump_to(record_position);
        writer.write_struct(&record)?;
        record_position = writer.position();
        writer.jump_to(end);
    }

    Ok(())
}
