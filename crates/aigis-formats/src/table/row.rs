//! ALTB rows and typed field values

use crate::cursor::ByteReader;
use crate::error::{Error, Result};
use crate::schema::{FieldType, RecordField};

/// One decoded field value
#[derive(Debug, Clone, Copy)]
pub enum FieldValue {
    /// Type 1
    Int(i32),
    /// Type 4
    Float(f32),
    /// Type 5
    Byte(u8),
    /// Type 32: offset into the string pool, 0 for none
    StringRef(i32),
    /// Types 9 and 97 carry no value
    Opaque,
}

// Bit equality so NaN payloads compare equal to themselves
impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) | (Self::StringRef(a), Self::StringRef(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Byte(a), Self::Byte(b)) => a == b,
            (Self::Opaque, Self::Opaque) => true,
            _ => false,
        }
    }
}

impl FieldValue {
    /// Read a value of `field_type` at an absolute position
    pub fn read_at(reader: &ByteReader<'_>, position: usize, field_type: FieldType) -> Result<Self> {
        Ok(match field_type {
            FieldType::Int32 => Self::Int(reader.i32_at(position)?),
            FieldType::Float32 => Self::Float(reader.f32_at(position)?),
            FieldType::Byte => Self::Byte(reader.u8_at(position)?),
            FieldType::StringRef => Self::StringRef(reader.i32_at(position)?),
            FieldType::Opaque(_) => Self::Opaque,
        })
    }

    fn encode(self, out: &mut [u8]) {
        match self {
            Self::Int(v) | Self::StringRef(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
            Self::Float(v) => out[..4].copy_from_slice(&v.to_le_bytes()),
            Self::Byte(v) => out[0] = v,
            Self::Opaque => {}
        }
    }

    /// Pool offset of a string reference
    pub fn string_offset(self) -> Option<i32> {
        match self {
            Self::StringRef(offset) => Some(offset),
            _ => None,
        }
    }
}

/// One table row: its stored bytes and the values decoded from them
///
/// Writing overlays `values` onto the stored bytes, so bytes not covered by a
/// typed field are reproduced as parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    raw: Vec<u8>,
    /// One value per schema field, in schema order
    pub values: Vec<FieldValue>,
}

fn check_span(field: &RecordField, field_type: FieldType, stride: usize) -> Result<()> {
    let end = usize::from(field.offset) + field_type.width();
    if end > stride {
        return Err(Error::layout(
            "ALTB",
            format!(
                "field {} at offset {} overruns the {stride}-byte row",
                field.name(),
                field.offset
            ),
        ));
    }
    Ok(())
}

impl Row {
    /// Decode the row of `stride` bytes at the reader's position and advance past it
    pub fn parse(reader: &mut ByteReader<'_>, fields: &[RecordField], stride: usize) -> Result<Self> {
        let start = reader.position();
        let mut values = Vec::with_capacity(fields.len());
        for field in fields {
            let field_type = field.field_type()?;
            check_span(field, field_type, stride)?;
            values.push(FieldValue::read_at(
                reader,
                start + usize::from(field.offset),
                field_type,
            )?);
        }
        let raw = reader.read_bytes(stride)?.to_vec();
        Ok(Self { raw, values })
    }

    /// Build a row image of `stride` zero bytes holding `values`
    pub fn new(stride: usize, values: Vec<FieldValue>) -> Self {
        Self {
            raw: vec![0; stride],
            values,
        }
    }

    /// Encoded row bytes
    pub fn encode(&self, fields: &[RecordField]) -> Result<Vec<u8>> {
        if fields.len() != self.values.len() {
            return Err(Error::layout(
                "ALTB",
                format!(
                    "row holds {} values for {} fields",
                    self.values.len(),
                    fields.len()
                ),
            ));
        }
        let mut out = self.raw.clone();
        for (field, value) in fields.iter().zip(&self.values) {
            let field_type = field.field_type()?;
            check_span(field, field_type, out.len())?;
            value.encode(&mut out[usize::from(field.offset)..]);
        }
        Ok(out)
    }

    /// Copy of this row holding `values`, laid over the same stored bytes
    pub fn replace(&self, fields: &[RecordField], values: Vec<FieldValue>) -> Result<Self> {
        let mut row = Self {
            raw: self.raw.clone(),
            values,
        };
        row.raw = row.encode(fields)?;
        Ok(row)
    }
}
