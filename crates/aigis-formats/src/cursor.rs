//! Positioned byte cursors over AL* data
//!
//! [`ByteReader`] and [`ByteWriter`] track a `position` and a `base_offset`.
//! Offsets stored inside an object are relative to the position where that
//! object starts, so nested parsing and writing rebase the cursor with
//! [`ByteReader::with_base`] / [`ByteWriter::with_base`] and restore the
//! previous base on exit.
//!
//! All multi-byte integers are little-endian.

use crate::error::{Error, Result};
use binrw::io::Cursor;
use binrw::{BinRead, BinWrite};

/// Read cursor over a borrowed buffer
///
/// The readable range ends at `end`, which is the buffer length unless the
/// reader was created with [`ByteReader::window`].
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
    base_offset: usize,
    end: usize,
}

macro_rules! read_le {
    ($($name:ident, $at:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "` and advance")]
            pub fn $name(&mut self) -> Result<$ty> {
                let value = self.$at(self.position)?;
                self.position += std::mem::size_of::<$ty>();
                Ok(value)
            }

            #[doc = concat!("Read a little-endian `", stringify!($ty), "` at an absolute position")]
            pub fn $at(&self, position: usize) -> Result<$ty> {
                let bytes = self.bytes_at(position, std::mem::size_of::<$ty>())?;
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(bytes);
                Ok(<$ty>::from_le_bytes(raw))
            }
        )*
    };
}

impl<'a> ByteReader<'a> {
    /// Create a reader at position 0 with base offset 0
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            base_offset: 0,
            end: data.len(),
        }
    }

    /// Reader restricted to `[start, start + len)`, positioned and based at `start`
    pub fn window(&self, start: usize, len: usize) -> Result<Self> {
        let end = start.checked_add(len).filter(|&end| end <= self.end);
        match end {
            Some(end) => Ok(Self {
                data: self.data,
                position: start,
                base_offset: start,
                end,
            }),
            None => Err(Error::Truncated {
                position: start,
                needed: len,
                available: self.end.saturating_sub(start),
            }),
        }
    }

    /// Current absolute position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Base offset of the object currently being parsed
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Position relative to the base offset
    pub fn relative_position(&self) -> usize {
        self.position - self.base_offset
    }

    /// End bound of the readable range
    pub fn end(&self) -> usize {
        self.end
    }

    /// Bytes between the position and the end bound
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.position)
    }

    /// Whether the position has reached the end bound
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute position
    pub fn jump_to(&mut self, position: usize) {
        self.position = position;
    }

    /// Move relative to the current position
    pub fn seek(&mut self, delta: isize) -> Result<()> {
        self.position = self
            .position
            .checked_add_signed(delta)
            .ok_or_else(|| Error::Truncated {
                position: self.position,
                needed: delta.unsigned_abs(),
                available: self.position,
            })?;
        Ok(())
    }

    /// Advance to the next multiple of `block` (cursor only, nothing is read)
    pub fn align(&mut self, block: usize) {
        let rem = self.position % block;
        if rem != 0 {
            self.position += block - rem;
        }
    }

    /// Run `f` with the base offset set to the current position
    pub fn with_base<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.base_offset;
        self.base_offset = self.position;
        let result = f(self);
        self.base_offset = saved;
        result
    }

    /// Borrow `len` bytes at an absolute position
    pub fn bytes_at(&self, position: usize, len: usize) -> Result<&'a [u8]> {
        let available = self.end.saturating_sub(position);
        if position > self.end || len > available {
            return Err(Error::Truncated {
                position,
                needed: len,
                available,
            });
        }
        Ok(&self.data[position..position + len])
    }

    /// Borrow `len` bytes and advance
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.bytes_at(self.position, len)?;
        self.position += len;
        Ok(bytes)
    }

    /// Read a fixed-size array and advance
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Peek the four-byte tag at the current position
    pub fn peek_tag(&self) -> Result<[u8; 4]> {
        let mut tag = [0u8; 4];
        tag.copy_from_slice(self.bytes_at(self.position, 4)?);
        Ok(tag)
    }

    read_le! {
        read_u8, u8_at, u8;
        read_i8, i8_at, i8;
        read_u16, u16_at, u16;
        read_i16, i16_at, i16;
        read_u32, u32_at, u32;
        read_i32, i32_at, i32;
        read_u64, u64_at, u64;
        read_i64, i64_at, i64;
        read_f32, f32_at, f32;
        read_f64, f64_at, f64;
    }

    /// Null-terminated string at an absolute position, without moving
    ///
    /// Scans at most `max_len` bytes when given. Running into the end bound
    /// before a terminator or the limit is a truncation.
    pub fn cstr_at(&self, position: usize, max_len: Option<usize>) -> Result<&'a [u8]> {
        let available = self.end.saturating_sub(position);
        let limit = max_len.map_or(available, |max| max.min(available));
        let scan = self.bytes_at(position, limit)?;

        if let Some(len) = scan.iter().position(|&b| b == 0) {
            return Ok(&scan[..len]);
        }
        if max_len.is_some_and(|max| max <= available) {
            return Ok(scan);
        }
        Err(Error::Truncated {
            position,
            needed: limit + 1,
            available,
        })
    }

    /// Null-terminated string; advances past the terminator
    pub fn read_cstr(&mut self, max_len: Option<usize>) -> Result<&'a [u8]> {
        let s = self.cstr_at(self.position, max_len)?;
        self.position += s.len() + 1;
        Ok(s)
    }

    /// Decode a fixed little-endian header struct and advance past it
    pub fn read_struct<T>(&mut self) -> Result<T>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let start = self.position;
        let slice = &self.data[start.min(self.end)..self.end];
        let mut cursor = Cursor::new(slice);
        let value = T::read_options(&mut cursor, binrw::Endian::Little, ())
            .map_err(|e| Error::from_binrw(e, start, slice.len()))?;
        self.position = start + cursor.position() as usize;
        Ok(value)
    }
}

/// Growable write cursor
///
/// Writing past the current length zero-fills the gap, so a writer can jump
/// ahead to a data region and come back to fill a table.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    data: Vec<u8>,
    position: usize,
    base_offset: usize,
}

macro_rules! write_le {
    ($($name:ident, $at:ident, $ty:ty;)*) => {
        $(
            #[doc = concat!("Write a little-endian `", stringify!($ty), "` and advance")]
            pub fn $name(&mut self, value: $ty) {
                self.write_bytes(&value.to_le_bytes());
            }

            #[doc = concat!("Write a little-endian `", stringify!($ty), "` at an absolute position")]
            pub fn $at(&mut self, position: usize, value: $ty) {
                self.write_bytes_at(position, &value.to_le_bytes());
            }
        )*
    };
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current absolute position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Base offset of the object currently being written
    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    /// Position relative to the base offset
    pub fn relative_position(&self) -> usize {
        self.position - self.base_offset
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Move to an absolute position
    pub fn jump_to(&mut self, position: usize) {
        self.position = position;
    }

    /// Emit zeros up to the next multiple of `block`
    pub fn align(&mut self, block: usize) {
        let rem = self.position % block;
        if rem != 0 {
            self.pad(block - rem);
        }
    }

    /// Emit `count` zero bytes
    pub fn pad(&mut self, count: usize) {
        let end = self.position + count;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].fill(0);
        self.position = end;
    }

    /// Run `f` with the base offset set to the current position
    pub fn with_base<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let saved = self.base_offset;
        self.base_offset = self.position;
        let result = f(self);
        self.base_offset = saved;
        result
    }

    /// Write bytes and advance
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_bytes_at(self.position, bytes);
        self.position += bytes.len();
    }

    /// Write bytes at an absolute position without moving
    pub fn write_bytes_at(&mut self, position: usize, bytes: &[u8]) {
        let end = position + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[position..end].copy_from_slice(bytes);
    }

    /// Write bytes followed by a NUL terminator
    pub fn write_cstr(&mut self, bytes: &[u8]) {
        self.write_bytes(bytes);
        self.write_u8(0);
    }

    write_le! {
        write_u8, write_u8_at, u8;
        write_i8, write_i8_at, i8;
        write_u16, write_u16_at, u16;
        write_i16, write_i16_at, i16;
        write_u32, write_u32_at, u32;
        write_i32, write_i32_at, i32;
        write_u64, write_u64_at, u64;
        write_i64, write_i64_at, i64;
        write_f32, write_f32_at, f32;
        write_f64, write_f64_at, f64;
    }

    /// Encode a fixed little-endian header struct and advance past it
    pub fn write_struct<T>(&mut self, value: &T) -> Result<()>
    where
        T: for<'b> BinWrite<Args<'b> = ()>,
    {
        let mut cursor = Cursor::new(Vec::new());
        value
            .write_options(&mut cursor, binrw::Endian::Little, ())
            .map_err(Error::BinRw)?;
        self.write_bytes(&cursor.into_inner());
        Ok(())
    }

    /// Consume the writer and return the written bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// View the written bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_read_integers_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0xFF, 0xFF, 0xFF, 0xFF];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(reader.read_u16().unwrap(), 0x0403);
        assert_eq!(reader.read_i32().unwrap(), -1);
        assert_eq!(reader.position(), 8);
        assert_eq!(reader.u32_at(0).unwrap(), 0x0403_0201);
        assert_eq!(reader.position(), 8, "absolute reads must not move");
    }

    #[test]
    fn test_read_past_end_is_truncation() {
        let data = [0u8; 3];
        let mut reader = ByteReader::new(&data);
        let err = reader.read_u32().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
    }

    #[test]
    fn test_positions_past_end_are_truncation() {
        let data = [0u8; 8];
        let reader = ByteReader::new(&data);
        let past = data.len() + 10;

        let err = reader.bytes_at(past, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
        let err = reader.cstr_at(past, Some(34)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
        assert!(reader.bytes_at(data.len(), 0).unwrap().is_empty());

        let window = reader.window(2, 4).unwrap();
        let err = window.bytes_at(7, 0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
    }

    #[test]
    fn test_align_reader_only_moves_cursor() {
        let data = [0u8; 16];
        let mut reader = ByteReader::new(&data);
        reader.jump_to(5);
        reader.align(4);
        assert_eq!(reader.position(), 8);
        reader.align(4);
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_cstr_terminated() {
        let data = b"abc\0def\0";
        let mut reader = ByteReader::new(data);
        assert_eq!(reader.read_cstr(None).unwrap(), b"abc");
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_cstr(None).unwrap(), b"def");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_cstr_max_len_skips_terminator_slot() {
        let data = b"AB\0C\0";
        let mut reader = ByteReader::new(data);
        assert_eq!(reader.read_cstr(Some(2)).unwrap(), b"AB");
        assert_eq!(reader.position(), 3);
        assert_eq!(reader.read_cstr(Some(1)).unwrap(), b"C");
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn test_cstr_unterminated_is_truncation() {
        let data = b"abc";
        let reader = ByteReader::new(data);
        let err = reader.cstr_at(0, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Truncation);
    }

    #[test]
    fn test_window_bounds_reads() {
        let data = [1u8, 2, 3, 4, 5, 6];
        let reader = ByteReader::new(&data);
        let mut window = reader.window(2, 2).unwrap();
        assert_eq!(window.base_offset(), 2);
        assert_eq!(window.read_u8().unwrap(), 3);
        assert_eq!(window.remaining(), 1);
        assert!(window.read_u16().is_err());
        assert!(reader.window(4, 3).is_err());
    }

    #[test]
    fn test_with_base_restores_on_error() {
        let data = [0u8; 8];
        let mut reader = ByteReader::new(&data);
        reader.jump_to(4);
        let result: Result<()> = reader.with_base(|r| {
            assert_eq!(r.base_offset(), 4);
            r.read_u64().map(|_| ())
        });
        assert!(result.is_err());
        assert_eq!(reader.base_offset(), 0);
    }

    #[test]
    fn test_writer_jump_ahead_zero_fills() {
        let mut writer = ByteWriter::new();
        writer.jump_to(4);
        writer.write_u16(0xBEEF);
        writer.write_u32_at(0, 0x0102_0304);
        assert_eq!(writer.as_bytes(), &[4, 3, 2, 1, 0xEF, 0xBE]);
        assert_eq!(writer.position(), 6);
    }

    #[test]
    fn test_writer_align_emits_zeros() {
        let mut writer = ByteWriter::new();
        writer.write_u8(7);
        writer.align(4);
        assert_eq!(writer.into_bytes(), vec![7, 0, 0, 0]);
    }

    #[test]
    fn test_writer_with_base() {
        let mut writer = ByteWriter::new();
        writer.pad(6);
        writer
            .with_base(|w| {
                assert_eq!(w.base_offset(), 6);
                w.write_u8(1);
                assert_eq!(w.relative_position(), 1);
                Ok(())
            })
            .unwrap();
        assert_eq!(writer.base_offset(), 0);
    }

    proptest! {
        #[test]
        fn integers_written_are_read_back(a in any::<u32>(), b in any::<i16>(), c in any::<u64>(), f in any::<u32>()) {
            let mut writer = ByteWriter::new();
            writer.write_u32(a);
            writer.write_i16(b);
            writer.write_u64(c);
            writer.write_f32(f32::from_bits(f));
            let bytes = writer.into_bytes();

            let mut reader = ByteReader::new(&bytes);
            prop_assert_eq!(reader.read_u32().unwrap(), a);
            prop_assert_eq!(reader.read_i16().unwrap(), b);
            prop_assert_eq!(reader.read_u64().unwrap(), c);
            prop_assert_eq!(reader.read_f32().unwrap().to_bits(), f);
            prop_assert!(reader.is_empty());
        }
    }
}
