//! ALAR version 3
//!
//! ```text
//! "ALAR" | 3 | reserved u8 | count u16 | unk0 u16 | unk1 u16 | reserved [4]
//! | data offset u16 | toc offsets [u16; count] | align 4
//! record: index u16 | flags u16 | address u32 | size u32 | reserved [6]
//!         | name NUL | align 4
//! ```

use super::entry::{ArchiveEntry, TocRecord};
use super::offset_u32;
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use binrw::{BinRead, BinWrite};

/// Reserved bytes at the end of a v3 record
pub const RESERVED_LEN: usize = 6;

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
#[brw(little)]
struct V3Record {
    index: u16,
    flags: u16,
    address: u32,
    size: u32,
    reserved: [u8; RESERVED_LEN],
}

/// Version 3 header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct V3Header {
    /// Byte after the version
    pub reserved: u8,
    /// Unidentified
    pub unk0: u16,
    /// Unidentified
    pub unk1: u16,
    /// Reserved bytes before the data offset
    pub reserved2: [u8; 4],
    /// Where the data region starts, relative to the archive
    pub data_offset: u16,
    /// One value per entry, preserved as stored
    pub toc_offsets: Vec<u16>,
}

pub(super) fn parse_toc(reader: &mut ByteReader<'_>) -> Result<(V3Header, Vec<TocRecord>)> {
    reader.seek(5)?;
    let reserved = reader.read_u8()?;
    let count = reader.read_u16()?;
    let unk0 = reader.read_u16()?;
    let unk1 = reader.read_u16()?;
    let reserved2 = reader.read_array()?;
    let data_offset = reader.read_u16()?;
    let toc_offsets = (0..count)
        .map(|_| reader.read_u16())
        .collect::<Result<Vec<_>>>()?;
    reader.align(4);

    let mut records = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let record: V3Record = reader.read_struct()?;
        let name = reader.read_cstr(None)?.to_vec();
        reader.align(4);
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
        V3Header {
            reserved,
            unk0,
            unk1,
            reserved2,
            data_offset,
            toc_offsets,
        },
        records,
    ))
}

pub(super) fn write(
    writer: &mut ByteWriter,
    header: &V3Header,
    entries: &[ArchiveEntry],
) -> Result<()> {
    if header.toc_offsets.len() != entries.len() {
        return Err(Error::layout(
            "ALAR",
            format!(
                "{} toc offsets for {} entries",
                header.toc_offsets.len(),
                entries.len()
            ),
        ));
    }
    let count = u16::try_from(entries.len())
        .map_err(|_| Error::layout("ALAR", format!("{} entries exceed 65535", entries.len())))?;

    writer.write_bytes(b"ALAR");
    writer.write_u8(3);
    writer.write_u8(header.reserved);
    writer.write_u16(count);
    writer.write_u16(header.unk0);
    writer.write_u16(header.unk1);
    writer.write_bytes(&header.reserved2);
    writer.write_u16(header.data_offset);
    for offset in &header.toc_offsets {
        writer.write_u16(*offset);
    }
    writer.align(4);

    let mut record_positions = Vec::with_capacity(entries.len());
    for entry in entries {
        record_positions.push(writer.position());
        writer.write_struct(&V3Record {
            index: entry.index,
            flags: entry.flags,
            address: 0,
            size: 0,
            reserved: entry.reserved_array()?,
        })?;
        writer.write_cstr(&entry.name);
        writer.align(4);
    }

    let data_offset = usize::from(header.data_offset);
    if writer.relative_position() > data_offset {
        return Err(Error::Misaligned {
            section: "ALAR v3 data",
            expected: data_offset,
            actual: writer.relative_position(),
        });
    }
    writer.pad(data_offset - writer.relative_position());

    for (entry, record_position) in entries.iter().zip(record_positions) {
        writer.align(4);
        let start = writer.relative_position();
        entry.write_payload(writer)?;
        let size = writer.relative_position() - start;
        writer.write_u32_at(record_position + 4, offset_u32(start)?);
        writer.write_u32_at(record_position + 8, offset_u32(size)?);
    }

    Ok(())
}
