//! Bit-level access for the ALLZ codec
//!
//! Bits are consumed least-significant first. Whole bytes are pulled from the
//! underlying [`ByteReader`] only when a read needs more bits than are
//! buffered, which lets byte-aligned literal runs sit between control fields
//! in the same stream.
//!
//! Control codes are a unary prefix `u` (count of 1-bits before a 0-bit)
//! followed by `u + minbits` literal bits:
//!
//! ```text
//! value = bits                                  if u == 0
//! value = bits + (((1 << u) - 1) << minbits)    otherwise
//! ```

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, Result};

/// Widest single read the buffer supports
const MAX_READ_BITS: u32 = 32;

/// Minimum-width settings for the three control-code flavors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlWidths {
    /// Extra bits for match lengths
    pub length: u8,
    /// Extra bits for match offsets
    pub offset: u8,
    /// Extra bits for literal run lengths
    pub literal: u8,
}

/// Bit reader layered on a [`ByteReader`]
#[derive(Debug)]
pub struct BitReader<'r, 'a> {
    reader: &'r mut ByteReader<'a>,
    buffer: u64,
    remaining_bits: u32,
    widths: ControlWidths,
}

impl<'r, 'a> BitReader<'r, 'a> {
    /// Wrap a byte reader
    pub fn new(reader: &'r mut ByteReader<'a>, widths: ControlWidths) -> Self {
        Self {
            reader,
            buffer: 0,
            remaining_bits: 0,
            widths,
        }
    }

    /// Access the underlying byte reader between bit reads
    pub fn bytes(&mut self) -> &mut ByteReader<'a> {
        self.reader
    }

    /// Read `count` bits as an unsigned value
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        if count > MAX_READ_BITS {
            return Err(Error::Corrupt(format!(
                "bit field of {count} bits exceeds {MAX_READ_BITS}"
            )));
        }

        if count > self.remaining_bits {
            let needed = (count - self.remaining_bits).div_ceil(8);
            for i in 0..needed {
                let byte = u64::from(self.reader.read_u8()?);
                self.buffer |= byte << (self.remaining_bits + i * 8);
            }
            self.remaining_bits += needed * 8;
        }

        let mask = (1u64 << count) - 1;
        let bits = self.buffer & mask;
        self.buffer >>= count;
        self.remaining_bits -= count;
        Ok(bits)
    }

    /// Count consecutive 1-bits up to and including the terminating 0-bit
    pub fn read_unary(&mut self) -> Result<u32> {
        let mut count = 0;
        while self.read_bits(1)? == 1 {
            count += 1;
        }
        Ok(count)
    }

    /// Read a control code with `minbits` fixed bits
    pub fn read_control(&mut self, minbits: u8) -> Result<u64> {
        let unary = self.read_unary()?;
        let minbits = u32::from(minbits);
        let value = self.read_bits(unary + minbits)?;

        if unary > 0 {
            Ok(value + (((1u64 << unary) - 1) << minbits))
        } else {
            Ok(value)
        }
    }

    /// Match length: `3 + control(minbits_length)`
    pub fn read_length(&mut self) -> Result<usize> {
        Ok(3 + self.read_control(self.widths.length)? as usize)
    }

    /// Match offset: `-1 - control(minbits_offset)`
    pub fn read_offset(&mut self) -> Result<i64> {
        Ok(-1 - self.read_control(self.widths.offset)? as i64)
    }

    /// Literal run length: `1 + control(minbits_literal)`
    pub fn read_literal(&mut self) -> Result<usize> {
        Ok(1 + self.read_control(self.widths.literal)? as usize)
    }

    /// Buffered bits that were never consumed, if any are set
    pub fn leftover(&self) -> Option<u64> {
        (self.buffer != 0).then_some(self.buffer)
    }
}

/// Inverse of [`BitReader`], used by the ALLZ encoder
///
/// A byte slot is reserved in the output at the moment the reader would pull
/// it, so literal bytes written in between land where the reader expects them.
#[derive(Debug)]
pub struct BitWriter<'w> {
    writer: &'w mut ByteWriter,
    slots: Vec<usize>,
    used_bits: u32,
    widths: ControlWidths,
}

impl<'w> BitWriter<'w> {
    /// Wrap a byte writer
    pub fn new(writer: &'w mut ByteWriter, widths: ControlWidths) -> Self {
        Self {
            writer,
            slots: Vec::new(),
            used_bits: 0,
            widths,
        }
    }

    /// Access the underlying byte writer between bit writes
    pub fn bytes(&mut self) -> &mut ByteWriter {
        self.writer
    }

    fn free_bits(&self) -> u32 {
        (self.slots.len() as u32 * 8).saturating_sub(self.used_bits)
    }

    /// Write the low `count` bits of `value`
    pub fn write_bits(&mut self, value: u64, count: u32) -> Result<()> {
        if count > MAX_READ_BITS {
            return Err(Error::Corrupt(format!(
                "bit field of {count} bits exceeds {MAX_READ_BITS}"
            )));
        }

        let free = self.free_bits();
        if count > free {
            // Drop slots that are already full, then reserve what the reader pulls
            let full = (self.used_bits / 8) as usize;
            self.slots.drain(..full);
            self.used_bits -= full as u32 * 8;

            for _ in 0..(count - free).div_ceil(8) {
                self.slots.push(self.writer.position());
                self.writer.write_u8(0);
            }
        }

        for i in 0..count {
            if (value >> i) & 1 == 1 {
                let slot = self.slots[(self.used_bits / 8) as usize];
                let bit = self.used_bits % 8;
                let current = self.writer.as_bytes()[slot];
                self.writer.write_u8_at(slot, current | (1 << bit));
            }
            self.used_bits += 1;
        }
        Ok(())
    }

    /// Write `count` 1-bits followed by a 0-bit
    pub fn write_unary(&mut self, count: u32) -> Result<()> {
        for _ in 0..count {
            self.write_bits(1, 1)?;
        }
        self.write_bits(0, 1)
    }

    /// Write `value` as a control code with `minbits` fixed bits
    pub fn write_control(&mut self, value: u64, minbits: u8) -> Result<()> {
        let minbits = u32::from(minbits);
        let mut unary = 0u32;
        // Smallest unary prefix whose range contains the value
        while value >= ((1u64 << (unary + 1)) - 1) << minbits {
            unary += 1;
            if unary + minbits > MAX_READ_BITS {
                return Err(Error::Corrupt(format!(
                    "control value {value} does not fit in {MAX_READ_BITS} bits"
                )));
            }
        }
        let base = ((1u64 << unary) - 1) << minbits;
        self.write_unary(unary)?;
        self.write_bits(value - base, unary + minbits)
    }

    /// Match length (at least 3)
    pub fn write_length(&mut self, length: usize) -> Result<()> {
        let value = length
            .checked_sub(3)
            .ok_or_else(|| Error::Corrupt(format!("match length {length} below 3")))?;
        self.write_control(value as u64, self.widths.length)
    }

    /// Match distance back from the output end (at least 1)
    pub fn write_distance(&mut self, distance: usize) -> Result<()> {
        let value = distance
            .checked_sub(1)
            .ok_or_else(|| Error::Corrupt("match distance of 0".to_string()))?;
        self.write_control(value as u64, self.widths.offset)
    }

    /// Literal run length (at least 1)
    pub fn write_literal(&mut self, length: usize) -> Result<()> {
        let value = length
            .checked_sub(1)
            .ok_or_else(|| Error::Corrupt("empty literal run".to_string()))?;
        self.write_control(value as u64, self.widths.literal)
    }
}
