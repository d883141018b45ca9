//! ALTB typed table
//!
//! ```text
//! "ALTB" | version u8 | form u8 | count u16 | header len u16 | entry offset u16 | stride u32
//! [form & 0x04] strings size u32 | strings start u32
//! [form & 0x08] names start u32
//! [form & 0x10] label [u8; 4]
//! ALRD schema | align 4
//! rows: count * stride bytes | align 4
//! [strings start != 0] string pool | align 4
//! [names start != 0] 1u32 | name len u8 | name | align 4
//! ```
//!
//! Offsets are relative to the table start. The header length field must
//! match the form: only forms 0x04, 0x10, 0x14 and 0x1e are known.

mod pool;
mod row;

pub use pool::StringPool;
pub use row::{FieldValue, Row};

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::patch::PatchContext;
use crate::schema::{FieldType, RecordSchema};
use binrw::{BinRead, BinWrite};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Only supported ALTB version
pub const ALTB_VERSION: u8 = 1;

/// Form bit: string pool present
pub const FORM_STRINGS: u8 = 0x04;
/// Form bit: name footer present
pub const FORM_NAMES: u8 = 0x08;
/// Form bit: 4-byte label present
pub const FORM_LABEL: u8 = 0x10;

/// Known forms and the header length each implies
pub const FORM_HEADER_LEN: [(u8, u16); 4] = [(0x04, 0x18), (0x10, 0x14), (0x14, 0x1C), (0x1E, 0x20)];

/// Fixed 16-byte ALTB header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = b"ALTB")]
#[bw(little, magic = b"ALTB")]
pub struct TableHeader {
    /// Format version, must be 1
    pub version: u8,
    /// Optional-section bit field
    pub form: u8,
    /// Row count
    pub count: u16,
    /// Header length including optional fields
    pub header_len: u16,
    /// Offset of the first row
    pub entry_offset: u16,
    /// Bytes per row
    pub stride: u32,
}

impl TableHeader {
    /// Check version, form and header length
    pub fn validate(&self) -> Result<()> {
        if self.version != ALTB_VERSION {
            return Err(Error::UnsupportedVersion {
                format: "ALTB",
                version: self.version,
            });
        }
        let expected = FORM_HEADER_LEN
            .iter()
            .find(|(form, _)| *form == self.form)
            .map(|(_, len)| *len)
            .ok_or(Error::UnsupportedForm {
                format: "ALTB",
                form: self.form,
            })?;
        if self.header_len != expected {
            return Err(Error::HeaderMismatch {
                format: "ALTB",
                field: "header_len",
                expected: u64::from(expected),
                actual: u64::from(self.header_len),
            });
        }
        Ok(())
    }

    /// Whether a form bit is set
    pub fn has(&self, bit: u8) -> bool {
        self.form & bit != 0
    }
}

/// String pool location fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct PoolLocation {
    /// Section size in bytes
    pub size: u32,
    /// Section offset, 0 when the table has no pool
    pub start: u32,
}

/// Trailing name footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFooter {
    /// Must be 1
    pub marker: u32,
    /// Table name
    pub name: Vec<u8>,
}

impl NameFooter {
    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let marker = reader.read_u32()?;
        if marker != 1 {
            return Err(Error::HeaderMismatch {
                format: "ALTB",
                field: "name footer marker",
                expected: 1,
                actual: u64::from(marker),
            });
        }
        let len = reader.read_u8()?;
        let name = reader.read_bytes(usize::from(len))?.to_vec();
        reader.align(4);
        Ok(Self { marker, name })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let len = u8::try_from(self.name.len())
            .map_err(|_| Error::layout("ALTB", "table name longer than 255 bytes"))?;
        writer.write_u32(self.marker);
        writer.write_u8(len);
        writer.write_bytes(&self.name);
        writer.align(4);
        Ok(())
    }
}

/// Parsed ALTB object
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Fixed header; `count` is recomputed on write
    pub header: TableHeader,
    /// Present when the form has the strings bit
    pub pool_location: Option<PoolLocation>,
    /// Present when the form has the names bit
    pub names_start: Option<u32>,
    /// Present when the form has the label bit
    pub label: Option<[u8; 4]>,
    /// Row layout
    pub schema: RecordSchema,
    /// Rows in stored order
    pub rows: Vec<Row>,
    /// String pool, when `pool_location.start` is nonzero
    pub pool: Option<StringPool>,
    /// Name footer, when `names_start` is nonzero
    pub footer: Option<NameFooter>,
}

fn misaligned(section: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::Misaligned {
            section,
            expected,
            actual,
        });
    }
    Ok(())
}

impl Table {
    /// Parse at the reader's position; offsets are relative to its base
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let base = reader.base_offset();
        let header: TableHeader = reader.read_struct()?;
        header.validate()?;

        let pool_location = if header.has(FORM_STRINGS) {
            Some(reader.read_struct::<PoolLocation>()?)
        } else {
            None
        };
        let names_start = if header.has(FORM_NAMES) {
            Some(reader.read_u32()?)
        } else {
            None
        };
        let label = if header.has(FORM_LABEL) {
            Some(reader.read_array::<4>()?)
        } else {
            None
        };

        let schema = RecordSchema::parse(reader)?;
        reader.align(4);
        misaligned(
            "rows",
            usize::from(header.entry_offset),
            reader.relative_position(),
        )?;

        let stride = header.stride as usize;
        let rows = (0..header.count)
            .map(|_| Row::parse(reader, &schema.fields, stride))
            .collect::<Result<Vec<_>>>()?;
        reader.align(4);

        let pool = match pool_location {
            Some(location) if location.start != 0 => {
                misaligned(
                    "string pool",
                    location.start as usize,
                    reader.relative_position(),
                )?;
                let bytes = reader.read_bytes(location.size as usize)?.to_vec();
                reader.align(4);
                Some(StringPool::from_bytes(bytes))
            }
            _ => None,
        };

        let footer = match names_start {
            Some(start) if start != 0 => Some(NameFooter::parse(reader)?),
            _ => None,
        };

        debug!(
            "ALTB at 0x{:X}: form 0x{:02X}, {} rows of {} bytes, {} fields",
            base,
            header.form,
            rows.len(),
            stride,
            schema.fields.len()
        );

        Ok(Self {
            header,
            pool_location,
            names_start,
            label,
            schema,
            rows,
            pool,
            footer,
        })
    }

    /// Write at the writer's position
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let count = u16::try_from(self.rows.len())
            .map_err(|_| Error::layout("ALTB", format!("{} rows exceed 65535", self.rows.len())))?;
        writer.write_struct(&TableHeader {
            count,
            ..self.header
        })?;
        if let Some(location) = &self.pool_location {
            writer.write_struct(location)?;
        }
        if let Some(names_start) = self.names_start {
            writer.write_u32(names_start);
        }
        if let Some(label) = &self.label {
            writer.write_bytes(label);
        }

        self.schema.write(writer)?;
        writer.align(4);
        misaligned(
            "rows",
            usize::from(self.header.entry_offset),
            writer.relative_position(),
        )?;

        for row in &self.rows {
            let bytes = row.encode(&self.schema.fields)?;
            if bytes.len() != self.header.stride as usize {
                return Err(Error::layout(
                    "ALTB",
                    format!("row of {} bytes, stride is {}", bytes.len(), self.header.stride),
                ));
            }
            writer.write_bytes(&bytes);
        }
        writer.align(4);

        if let (Some(pool), Some(location)) = (&self.pool, &self.pool_location) {
            misaligned(
                "string pool",
                location.start as usize,
                writer.relative_position(),
            )?;
            writer.write_bytes(pool.as_bytes());
            writer.align(4);
        }

        if let Some(footer) = &self.footer {
            footer.write(writer)?;
        }
        Ok(())
    }

    /// Index of a field by primary name
    pub fn column(&self, name: &str) -> Option<usize> {
        self.schema
            .fields
            .iter()
            .position(|f| f.name_primary == name.as_bytes())
    }

    /// String referenced by a row value, if the value is a nonzero pool offset
    pub fn string(&self, value: FieldValue) -> Option<&[u8]> {
        let offset = value.string_offset().filter(|&o| o > 0)?;
        self.pool.as_ref()?.get(offset as u32)
    }

    /// Referenced strings in row order, decoded lossily
    pub fn strings(&self) -> Vec<String> {
        self.rows
            .iter()
            .flat_map(|row| row.values.iter())
            .filter_map(|value| self.string(*value))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Distinct nonzero string pool offsets referenced by any row, ascending
    pub fn referenced_offsets(&self) -> Result<BTreeSet<u32>> {
        let mut offsets = BTreeSet::new();
        for row in &self.rows {
            for value in &row.values {
                match value.string_offset() {
                    Some(0) | None => {}
                    Some(offset) => {
                        let offset = u32::try_from(offset).map_err(|_| {
                            Error::Translation(format!("negative string offset {offset}"))
                        })?;
                        offsets.insert(offset);
                    }
                }
            }
        }
        Ok(offsets)
    }

    /// Translate the string pool and remap every row reference
    ///
    /// Referenced pool entries are re-emitted in ascending original offset
    /// order, each through the context's translation; new offsets accumulate
    /// from 1. Offset 0 stays 0. The pool size field follows the new pool, and
    /// a names offset past the pool moves by the change in aligned pool size.
    pub fn patch(&self, context: &PatchContext) -> Result<Self> {
        let (Some(pool), Some(location)) = (&self.pool, &self.pool_location) else {
            return Ok(self.clone());
        };

        let referenced = self.referenced_offsets()?;
        let mut translated = Vec::with_capacity(referenced.len());
        for &offset in &referenced {
            let source = pool.entry(offset)?;
            let text = match std::str::from_utf8(source) {
                Ok(text) => context.translate(text).into_bytes(),
                Err(_) => source.to_vec(),
            };
            translated.push(text);
        }

        let (new_pool, new_offsets) = StringPool::build(&translated)?;
        let remap: HashMap<i32, i32> = referenced
            .iter()
            .zip(&new_offsets)
            .map(|(&old, &new)| (old as i32, new as i32))
            .collect();

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let values = row
                    .values
                    .iter()
                    .zip(&self.schema.fields)
                    .map(|(value, field)| match (*value, field.field_type()) {
                        (FieldValue::StringRef(old), Ok(FieldType::StringRef)) if old != 0 => {
                            FieldValue::StringRef(remap.get(&old).copied().unwrap_or(old))
                        }
                        (other, _) => other,
                    })
                    .collect();
                row.replace(&self.schema.fields, values)
            })
            .collect::<Result<Vec<_>>>()?;

        let new_size = u32::try_from(new_pool.len())
            .map_err(|_| Error::layout("ALTB", "string pool exceeds 4 GiB"))?;
        let aligned = |size: u32| (location.start + size).next_multiple_of(4);
        let old_end = aligned(location.size);
        let new_end = aligned(new_size);
        let names_start = self.names_start.map(|start| {
            if start != 0 && start >= old_end {
                start - old_end + new_end
            } else {
                start
            }
        });

        debug!(
            "patched {} of {} ALTB strings, pool {} -> {} bytes",
            referenced.len(),
            pool.entries().count(),
            location.size,
            new_size
        );

        Ok(Self {
            pool_location: Some(PoolLocation {
                size: new_size,
                start: location.start,
            }),
            names_start,
            rows,
            pool: Some(new_pool),
            ..self.clone()
        })
    }
}

crate::impl_al_format!(Table, reader => Table::parse(reader));
