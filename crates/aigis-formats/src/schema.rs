//! ALRD record schema
//!
//! ```text
//! "ALRD" | reserved u16 | count u8 | reserved u8 | size u16
//! field: offset u16 | type u8 | padding u8 | primary len u8 | secondary len u8
//!        | primary NUL | secondary NUL | align 4 | padding zeros | align 4
//! ```
//!
//! The schema carries no values. It describes where each typed field sits
//! inside an ALTB row.

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use binrw::{BinRead, BinWrite};

/// Value type of a table field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Code 1: signed 32-bit integer
    Int32,
    /// Code 4: 32-bit float
    Float32,
    /// Code 5: unsigned byte
    Byte,
    /// Code 32: signed 32-bit string pool offset
    StringRef,
    /// Codes 9 and 97: present in the schema, no value is read or written
    Opaque(u8),
}

impl FieldType {
    /// Interpret a schema type code
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Self::Int32),
            4 => Ok(Self::Float32),
            5 => Ok(Self::Byte),
            32 => Ok(Self::StringRef),
            9 | 97 => Ok(Self::Opaque(code)),
            other => Err(Error::UnknownFieldType(other)),
        }
    }

    /// Schema type code
    pub fn code(self) -> u8 {
        match self {
            Self::Int32 => 1,
            Self::Float32 => 4,
            Self::Byte => 5,
            Self::StringRef => 32,
            Self::Opaque(code) => code,
        }
    }

    /// Bytes occupied inside a row
    pub fn width(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 | Self::StringRef => 4,
            Self::Byte => 1,
            Self::Opaque(_) => 0,
        }
    }
}

/// Fixed ALRD header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = b"ALRD")]
#[bw(little, magic = b"ALRD")]
pub struct SchemaHeader {
    /// Written as 1 by the game tools
    pub reserved: u16,
    /// Number of fields
    pub count: u8,
    /// Always zero in observed files
    pub reserved2: u8,
    /// `count * 4` in observed files, otherwise unused
    pub size: u16,
}

/// One named, typed field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    /// Byte offset inside a row
    pub offset: u16,
    /// Raw type code, see [`FieldType`]
    pub type_code: u8,
    /// Zero bytes emitted after the names
    pub padding: u8,
    /// Primary (English) field name
    pub name_primary: Vec<u8>,
    /// Secondary (Japanese) field name
    pub name_secondary: Vec<u8>,
}

impl RecordField {
    /// Typed view of the type code
    pub fn field_type(&self) -> Result<FieldType> {
        FieldType::from_code(self.type_code)
    }

    /// Primary name as text
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name_primary).into_owned()
    }

    fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let offset = reader.read_u16()?;
        let type_code = reader.read_u8()?;
        let padding = reader.read_u8()?;
        let len_primary = reader.read_u8()?;
        let len_secondary = reader.read_u8()?;

        let name_primary = reader.read_cstr(Some(usize::from(len_primary)))?.to_vec();
        let name_secondary = reader.read_cstr(Some(usize::from(len_secondary)))?.to_vec();
        reader.align(4);
        reader.seek(isize::from(padding))?;
        reader.align(4);

        Ok(Self {
            offset,
            type_code,
            padding,
            name_primary,
            name_secondary,
        })
    }

    fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let name_len = |name: &[u8]| {
            u8::try_from(name.len()).map_err(|_| {
                Error::layout(
                    "ALRD",
                    format!("field name of {} bytes exceeds 255", name.len()),
                )
            })
        };

        writer.write_u16(self.offset);
        writer.write_u8(self.type_code);
        writer.write_u8(self.padding);
        writer.write_u8(name_len(&self.name_primary)?);
        writer.write_u8(name_len(&self.name_secondary)?);
        writer.write_cstr(&self.name_primary);
        writer.write_cstr(&self.name_secondary);
        writer.align(4);
        writer.pad(usize::from(self.padding));
        writer.align(4);
        Ok(())
    }
}

/// Parsed ALRD object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    /// Header as parsed; `count` is recomputed on write
    pub header: SchemaHeader,
    /// Fields in row layout order
    pub fields: Vec<RecordField>,
}

impl RecordSchema {
    /// Parse at the reader's position
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let header: SchemaHeader = reader.read_struct()?;
        let fields = (0..header.count)
            .map(|_| RecordField::parse(reader))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { header, fields })
    }

    /// Write at the writer's position
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        let count = u8::try_from(self.fields.len()).map_err(|_| {
            Error::layout("ALRD", format!("{} fields exceed 255", self.fields.len()))
        })?;
        writer.write_struct(&SchemaHeader {
            count,
            ..self.header
        })?;
        for field in &self.fields {
            field.write(writer)?;
        }
        Ok(())
    }

    /// Field by primary name
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name_primary == name.as_bytes())
    }
}

crate::impl_al_format!(RecordSchema, reader => RecordSchema::parse(reader));
