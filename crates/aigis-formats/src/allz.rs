//! ALLZ bit-packed LZ77 container
//!
//! ```text
//! "ALLZ" | version u8 | minbits length u8 | minbits offset u8 | minbits literal u8 | size u32
//! ```
//!
//! The body starts with a literal run and a pending match, then repeats
//! segments selected by a one-bit mode:
//!
//! - mode 0: literal run length, then the next match; the pending match is
//!   copied before the literal bytes, which sit between the run length and the
//!   next match's control bits
//! - mode 1: the next match; the pending match is copied
//!
//! Decoding stops as soon as the pending match (mode "word") or the pending
//! match plus a literal run (mode "literal") reaches the declared size.
//! Matches copy from `(offset + len) % len` against the growing output, so
//! source and destination may overlap.

use crate::bits::{BitReader, BitWriter, ControlWidths};
use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{Error, ErrorKind, Result};
use crate::object::{AlObject, ParseOptions};
use crate::patch::PatchContext;
use binrw::{BinRead, BinWrite};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Only supported ALLZ version
pub const ALLZ_VERSION: u8 = 1;

/// Shortest match the length control can express
pub const MIN_MATCH: usize = 3;

/// Candidates examined per position by the encoder's match finder
const MAX_CHAIN: usize = 64;

/// Fixed 12-byte ALLZ header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[br(little, magic = b"ALLZ")]
#[bw(little, magic = b"ALLZ")]
pub struct AllzHeader {
    /// Format version, must be 1
    pub version: u8,
    /// Fixed bits of the match length control
    pub minbits_length: u8,
    /// Fixed bits of the match offset control
    pub minbits_offset: u8,
    /// Fixed bits of the literal run control
    pub minbits_literal: u8,
    /// Decompressed size
    pub size: u32,
}

impl AllzHeader {
    /// Header size in bytes
    pub const SIZE: usize = 12;

    /// Header for `size` bytes of data with the given control widths
    pub fn new(widths: ControlWidths, size: u32) -> Self {
        Self {
            version: ALLZ_VERSION,
            minbits_length: widths.length,
            minbits_offset: widths.offset,
            minbits_literal: widths.literal,
            size,
        }
    }

    /// Check the version byte
    pub fn validate(&self) -> Result<()> {
        if self.version != ALLZ_VERSION {
            return Err(Error::UnsupportedVersion {
                format: "ALLZ",
                version: self.version,
            });
        }
        Ok(())
    }

    /// Control widths declared by the header
    pub fn widths(&self) -> ControlWidths {
        ControlWidths {
            length: self.minbits_length,
            offset: self.minbits_offset,
            literal: self.minbits_literal,
        }
    }
}

/// How the decoder loop reached the declared size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Finish {
    Word,
    Literal(usize),
}

fn overflow(err: Error) -> Error {
    if err.kind() == ErrorKind::Truncation {
        Error::Overflow
    } else {
        err
    }
}

fn copy_word(dst: &mut Vec<u8>, offset: i64, length: usize) -> Result<()> {
    for _ in 0..length {
        let len = dst.len() as i64;
        if len == 0 || offset + len < 0 {
            return Err(Error::Corrupt(format!(
                "match offset {offset} reaches before the start of {len} decoded bytes"
            )));
        }
        let index = ((offset + len) % len) as usize;
        dst.push(dst[index]);
    }
    Ok(())
}

fn check_fits(dst: &[u8], extra: usize, size: usize) -> Result<()> {
    if dst.len() + extra > size {
        return Err(Error::LengthMismatch {
            expected: size,
            actual: dst.len() + extra,
        });
    }
    Ok(())
}

/// Decode an ALLZ stream at the reader's position
///
/// On return the reader is positioned after the last byte the decoder
/// consumed.
pub fn decompress(reader: &mut ByteReader<'_>) -> Result<(AllzHeader, Vec<u8>)> {
    let header: AllzHeader = reader.read_struct()?;
    header.validate()?;

    let size = header.size as usize;
    let mut dst = Vec::with_capacity(size.min(1 << 24));
    let mut bits = BitReader::new(reader, header.widths());

    let literal = bits.read_literal()?;
    check_fits(&dst, literal, size)?;
    dst.extend_from_slice(bits.bytes().read_bytes(literal)?);
    let mut word_off = bits.read_offset()?;
    let mut word_len = bits.read_length()?;

    let finish = loop {
        if dst.len() + word_len >= size {
            break Finish::Word;
        }

        if bits.read_bits(1).map_err(overflow)? == 0 {
            let literal = bits.read_literal().map_err(overflow)?;
            if dst.len() + word_len + literal >= size {
                break Finish::Literal(literal);
            }

            let literal_at = bits.bytes().position();
            bits.bytes().jump_to(literal_at + literal);
            let next_off = bits.read_offset().map_err(overflow)?;
            let next_len = bits.read_length().map_err(overflow)?;
            copy_word(&mut dst, word_off, word_len)?;

            let control_at = bits.bytes().position();
            bits.bytes().jump_to(literal_at);
            dst.extend_from_slice(bits.bytes().read_bytes(literal).map_err(overflow)?);
            bits.bytes().jump_to(control_at);

            word_off = next_off;
            word_len = next_len;
        } else {
            let next_off = bits.read_offset().map_err(overflow)?;
            let next_len = bits.read_length().map_err(overflow)?;
            copy_word(&mut dst, word_off, word_len)?;
            word_off = next_off;
            word_len = next_len;
        }
    };

    check_fits(&dst, word_len, size)?;
    copy_word(&mut dst, word_off, word_len)?;
    if let Finish::Literal(literal) = finish {
        check_fits(&dst, literal, size)?;
        dst.extend_from_slice(bits.bytes().read_bytes(literal)?);
    }

    if dst.len() != size {
        return Err(Error::LengthMismatch {
            expected: size,
            actual: dst.len(),
        });
    }
    if let Some(leftover) = bits.leftover() {
        return Err(Error::LeftoverBits(leftover));
    }

    debug!("ALLZ decoded {} bytes ({:?} finish)", size, finish);
    Ok((header, dst))
}

/// Decode an ALLZ stream held in a buffer
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    decompress(&mut ByteReader::new(data)).map(|(_, data)| data)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal { start: usize, len: usize },
    Match { distance: usize, len: usize },
}

/// Hash-chain match finder over three-byte prefixes
struct MatchFinder<'d> {
    data: &'d [u8],
    head: HashMap<[u8; 3], usize>,
    prev: Vec<Option<usize>>,
}

impl<'d> MatchFinder<'d> {
    fn new(data: &'d [u8]) -> Self {
        Self {
            data,
            head: HashMap::new(),
            prev: vec![None; data.len()],
        }
    }

    fn key(&self, pos: usize) -> Option<[u8; 3]> {
        let bytes = self.data.get(pos..pos + MIN_MATCH)?;
        Some([bytes[0], bytes[1], bytes[2]])
    }

    fn insert(&mut self, pos: usize) {
        if let Some(key) = self.key(pos) {
            self.prev[pos] = self.head.insert(key, pos);
        }
    }

    /// Longest earlier match starting at `pos` as `(distance, length)`
    fn longest(&self, pos: usize) -> Option<(usize, usize)> {
        let key = self.key(pos)?;
        let mut candidate = self.head.get(&key).copied();
        let mut best: Option<(usize, usize)> = None;

        for _ in 0..MAX_CHAIN {
            let Some(start) = candidate else { break };
            // Overlapping copies are fine: the source may run into the output
            let len = self.data[pos..]
                .iter()
                .zip(&self.data[start..])
                .take_while(|(a, b)| a == b)
                .count();
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((pos - start, len));
            }
            candidate = self.prev[start];
        }

        best.filter(|&(_, len)| len >= MIN_MATCH)
    }
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut finder = MatchFinder::new(data);
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < data.len() {
        match finder.longest(pos) {
            Some((distance, len)) => {
                if pos > literal_start {
                    tokens.push(Token::Literal {
                        start: literal_start,
                        len: pos - literal_start,
                    });
                }
                tokens.push(Token::Match { distance, len });
                for p in pos..pos + len {
                    finder.insert(p);
                }
                pos += len;
                literal_start = pos;
            }
            None => {
                finder.insert(pos);
                pos += 1;
            }
        }
    }

    if literal_start < data.len() {
        tokens.push(Token::Literal {
            start: literal_start,
            len: data.len() - literal_start,
        });
    }
    tokens
}

/// Encode `data` as a complete ALLZ stream, header included
///
/// Returns `None` when the stream shape cannot describe the data: it must
/// open with a literal run followed by a match, so data without any repeated
/// three-byte sequence has no encoding.
pub fn compress(data: &[u8], widths: ControlWidths) -> Result<Option<Vec<u8>>> {
    let size = u32::try_from(data.len())
        .map_err(|_| Error::Corrupt(format!("{} bytes exceed the ALLZ size field", data.len())))?;

    let tokens = tokenize(data);
    let (first_literal, first_match) = match tokens.as_slice() {
        [Token::Literal { start, len }, Token::Match { distance, len: mlen }, ..] => {
            ((*start, *len), (*distance, *mlen))
        }
        _ => return Ok(None),
    };

    let mut out = ByteWriter::new();
    out.write_struct(&AllzHeader::new(widths, size))?;
    {
        let mut bits = BitWriter::new(&mut out, widths);

        bits.write_literal(first_literal.1)?;
        bits.bytes()
            .write_bytes(&data[first_literal.0..first_literal.0 + first_literal.1]);
        bits.write_distance(first_match.0)?;
        bits.write_length(first_match.1)?;

        let mut rest = tokens[2..].iter().peekable();
        while let Some(token) = rest.next() {
            match *token {
                Token::Match { distance, len } => {
                    bits.write_bits(1, 1)?;
                    bits.write_distance(distance)?;
                    bits.write_length(len)?;
                }
                Token::Literal { start, len } => {
                    bits.write_bits(0, 1)?;
                    bits.write_literal(len)?;
                    bits.bytes().write_bytes(&data[start..start + len]);
                    if let Some(&&Token::Match { distance, len }) = rest.peek() {
                        bits.write_distance(distance)?;
                        bits.write_length(len)?;
                        rest.next();
                    }
                }
            }
        }
    }

    Ok(Some(out.into_bytes()))
}

/// A parsed ALLZ container and the object it wraps
#[derive(Debug, Clone, PartialEq)]
pub struct Allz {
    /// Header as parsed
    pub header: AllzHeader,
    /// Decompressed nested object
    pub inner: Box<AlObject>,
    /// Exact source bytes, kept while the object is unmodified
    encoded: Option<Vec<u8>>,
}

impl Allz {
    /// Wrap an object; it is compressed when written
    pub fn new(inner: AlObject, widths: ControlWidths) -> Self {
        Self {
            header: AllzHeader::new(widths, 0),
            inner: Box::new(inner),
            encoded: None,
        }
    }

    /// Parse the container and dispatch its decompressed payload
    ///
    /// The container owns every byte up to the reader's end bound.
    pub fn parse(reader: &mut ByteReader<'_>, options: &ParseOptions) -> Result<Self> {
        let start = reader.position();
        let (header, data) = decompress(reader)?;

        let encoded = reader.bytes_at(start, reader.end() - start)?.to_vec();
        reader.jump_to(reader.end());

        let inner = AlObject::parse_with(&mut ByteReader::new(&data), options)?;
        Ok(Self {
            header,
            inner: Box::new(inner),
            encoded: Some(encoded),
        })
    }

    /// Whether writing reproduces the parsed bytes verbatim
    pub fn is_original(&self) -> bool {
        self.encoded.is_some()
    }

    /// Write the container
    ///
    /// A modified object is re-encoded with the original control widths. When
    /// no encoding exists the nested object is written without the wrapper.
    pub fn write(&self, writer: &mut ByteWriter) -> Result<()> {
        if let Some(encoded) = &self.encoded {
            writer.write_bytes(encoded);
            return Ok(());
        }

        let data = self.inner.to_bytes()?;
        match compress(&data, self.header.widths())? {
            Some(stream) => writer.write_bytes(&stream),
            None => {
                warn!(
                    "no ALLZ encoding for {} bytes of {}, writing it uncompressed",
                    data.len(),
                    self.inner.magic().as_str()
                );
                writer.write_bytes(&data);
            }
        }
        Ok(())
    }

    /// Patch the nested object
    pub async fn patch(&self, context: &PatchContext) -> Result<Self> {
        let inner = self.inner.patch(context).await?;
        if inner == *self.inner {
            return Ok(self.clone());
        }
        Ok(Self {
            header: self.header,
            inner: Box::new(inner),
            encoded: None,
        })
    }
}

crate::impl_al_format!(Allz, reader => Allz::parse(reader, &ParseOptions::default()));
