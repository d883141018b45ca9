//! Legacy transport codec for XML configuration payloads
//!
//! XML documents are delivered XOR-obfuscated with a single unknown key byte
//! and compressed with a byte-oriented LZ77 variant. This codec is unrelated
//! to the AL* object family and has its own error type.

mod cipher;
mod error;
mod lz;

pub use cipher::{KNOWN_PREFIXES, SCAN_WINDOW, apply_key, decode, find_key};
pub use error::{LegacyError, LegacyResult};
pub use lz::{MATCH_TABLE, decompress};

/// Decode, decompress and interpret an XML payload as UTF-8
pub fn decode_xml(data: &[u8]) -> LegacyResult<String> {
    let decoded = decode(data)?;
    let plain = decompress(&decoded)?;
    Ok(String::from_utf8(plain)?)
}
