//! Archive entries shared by both ALAR versions

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};
use crate::object::{AlObject, ParseOptions};
use crate::patch::{FailurePolicy, PatchContext};
use tracing::warn;

/// Extensions stored as raw text instead of nested objects
const TEXT_EXTENSIONS: [&[u8]; 2] = [b"txt", b"lua"];

/// Table-of-contents fields common to both versions
#[derive(Debug, Clone)]
pub(super) struct TocRecord {
    pub index: u16,
    pub flags: u16,
    pub address: u32,
    pub size: u32,
    pub reserved: Vec<u8>,
    pub name: Vec<u8>,
}

/// Content of an archive entry
#[derive(Debug, Clone, PartialEq)]
pub enum EntryPayload {
    /// `.txt` / `.lua` bytes, never dispatched
    Text(Vec<u8>),
    /// Nested AL* object
    Object(Box<AlObject>),
}

/// One named entry of an ALAR archive
///
/// `address` and `size` are the values read from the table of contents; the
/// writer recomputes both from where the payload lands.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    /// Entry index as stored
    pub index: u16,
    /// Unidentified record field, preserved
    pub flags: u16,
    /// Payload address relative to the archive start
    pub address: u32,
    /// Payload size
    pub size: u32,
    /// Reserved record bytes (4 for v2, 6 for v3)
    pub reserved: Vec<u8>,
    /// Entry file name
    pub name: Vec<u8>,
    /// Entry content
    pub payload: EntryPayload,
    /// Bytes inside the entry's range after the parsed payload
    pub tail: Vec<u8>,
}

impl ArchiveEntry {
    /// New entry for writing; `reserved` is sized for the target version
    pub fn new(
        index: u16,
        name: impl Into<Vec<u8>>,
        payload: EntryPayload,
        reserved: usize,
    ) -> Self {
        Self {
            index,
            flags: 0,
            address: 0,
            size: 0,
            reserved: vec![0; reserved],
            name: name.into(),
            payload,
            tail: Vec::new(),
        }
    }

    /// Whether a file name selects raw text storage
    pub fn is_text_name(name: &[u8]) -> bool {
        name.iter()
            .rposition(|&b| b == b'.')
            .is_some_and(|dot| TEXT_EXTENSIONS.contains(&&name[dot + 1..]))
    }

    /// File name as text
    pub fn filename(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Nested object, if the entry is not text
    pub fn object(&self) -> Option<&AlObject> {
        match &self.payload {
            EntryPayload::Object(object) => Some(object),
            EntryPayload::Text(_) => None,
        }
    }

    /// Read the payload a record points at
    pub(super) fn load(
        reader: &ByteReader<'_>,
        record: TocRecord,
        options: &ParseOptions,
    ) -> Result<Self> {
        let start = reader.base_offset() + record.address as usize;
        let mut window = reader.window(start, record.size as usize)?;

        let (payload, tail) = if Self::is_text_name(&record.name) {
            let text = window.read_bytes(window.remaining())?.to_vec();
            (EntryPayload::Text(text), Vec::new())
        } else {
            let object = AlObject::parse_with(&mut window, options)?;
            let tail = window.read_bytes(window.remaining())?.to_vec();
            (EntryPayload::Object(Box::new(object)), tail)
        };

        Ok(Self {
            index: record.index,
            flags: record.flags,
            address: record.address,
            size: record.size,
            reserved: record.reserved,
            name: record.name,
            payload,
            tail,
        })
    }

    /// Write the payload followed by the preserved tail
    pub(super) fn write_payload(&self, writer: &mut ByteWriter) -> Result<()> {
        match &self.payload {
            EntryPayload::Text(text) => writer.write_bytes(text),
            EntryPayload::Object(object) => object.write(writer)?,
        }
        writer.write_bytes(&self.tail);
        Ok(())
    }

    /// Reserved bytes as a fixed array for a version's record
    pub(super) fn reserved_array<const N: usize>(&self) -> Result<[u8; N]> {
        self.reserved.as_slice().try_into().map_err(|_| {
            Error::layout(
                "ALAR",
                format!(
                    "entry {} has {} reserved bytes, expected {N}",
                    self.filename(),
                    self.reserved.len()
                ),
            )
        })
    }

    /// Patch the nested object under the child scope named by this entry
    pub(super) async fn patch(&self, context: &PatchContext) -> Result<Self> {
        let EntryPayload::Object(object) = &self.payload else {
            return Ok(self.clone());
        };
        let name = self.filename();

        let patched = match context.child(&name).await {
            Ok(child) => object.patch(&child).await,
            Err(err) => Err(err),
        };

        match patched {
            Ok(patched) => Ok(Self {
                index: self.index,
                flags: self.flags,
                address: self.address,
                size: self.size,
                reserved: self.reserved.clone(),
                name: self.name.clone(),
                payload: EntryPayload::Object(Box::new(patched)),
                tail: self.tail.clone(),
            }),
            Err(source) => match context.policy() {
                FailurePolicy::Propagate => Err(Error::Patch {
                    path: context.child_path(&name),
                    source: Box::new(source),
                }),
                FailurePolicy::KeepOriginal => {
                    warn!("keeping original {}: {source}", context.child_path(&name));
                    Ok(self.clone())
                }
            },
        }
    }
}
