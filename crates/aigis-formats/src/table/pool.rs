//! ALTB string pool section
//!
//! A leading reserved NUL followed by NUL-terminated strings. Rows refer to a
//! string by its byte offset from the section start, so offset 0 means "no
//! string" and the first real entry sits at offset 1.

use crate::error::{Error, Result};

/// String pool bytes as stored in the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringPool {
    bytes: Vec<u8>,
}

impl Default for StringPool {
    fn default() -> Self {
        Self { bytes: vec![0] }
    }
}

impl StringPool {
    /// Wrap a raw section
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Build a pool from strings in emission order, returning each offset
    pub fn build<I, S>(strings: I) -> Result<(Self, Vec<u32>)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut pool = Self::default();
        let mut offsets = Vec::new();
        for s in strings {
            offsets.push(pool.push(s.as_ref())?);
        }
        Ok((pool, offsets))
    }

    /// Append a string, returning its offset
    pub fn push(&mut self, s: &[u8]) -> Result<u32> {
        if s.contains(&0) {
            return Err(Error::Translation(format!(
                "string with an embedded NUL cannot be pooled: {:?}",
                String::from_utf8_lossy(s)
            )));
        }
        let offset = self.len_u32()?;
        self.bytes.extend_from_slice(s);
        self.bytes.push(0);
        Ok(offset)
    }

    fn len_u32(&self) -> Result<u32> {
        u32::try_from(self.bytes.len())
            .map_err(|_| Error::layout("ALTB", "string pool exceeds 4 GiB"))
    }

    /// Section bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Section size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the section holds no bytes at all
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// String starting at `offset`, read up to its terminator
    pub fn get(&self, offset: u32) -> Option<&[u8]> {
        let tail = self.bytes.get(offset as usize..)?;
        let end = tail.iter().position(|&b| b == 0)?;
        Some(&tail[..end])
    }

    /// String that starts exactly at `offset`
    ///
    /// Offsets into the middle of a string are rejected, since remapping them
    /// would detach them from the entry they share bytes with.
    pub fn entry(&self, offset: u32) -> Result<&[u8]> {
        let index = offset as usize;
        let starts_entry = index > 0 && self.bytes.get(index - 1) == Some(&0);
        match self.get(offset) {
            Some(s) if starts_entry => Ok(s),
            Some(_) => Err(Error::Translation(format!(
                "string offset {offset} points inside a pool entry"
            ))),
            None => Err(Error::Translation(format!(
                "string offset {offset} is outside the {}-byte pool",
                self.bytes.len()
            ))),
        }
    }

    /// All entries as `(offset, bytes)` in emission order
    pub fn entries(&self) -> impl Iterator<Item = (u32, &[u8])> {
        let mut offset = 1usize;
        std::iter::from_fn(move || {
            let tail = self.bytes.get(offset..)?;
            let len = tail.iter().position(|&b| b == 0)?;
            let entry = (offset as u32, &tail[..len]);
            offset += len + 1;
            Some(entry)
        })
    }
}
