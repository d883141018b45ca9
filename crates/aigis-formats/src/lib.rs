//! Parsers, writers and codecs for the AL* asset container family
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Pool offsets are stored as i32
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Format tags don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::float_cmp)] // Binary format requirements
#![allow(clippy::derive_partial_eq_without_eq)] // Binary format structs
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
#![allow(clippy::future_not_send)] // Threading requirements
//! Every object in the family starts with a four-byte tag that selects its
//! format. Objects nest: archives hold tables, textures and compressed
//! containers, compressed containers hold any other object.
//!
//! # Supported Formats
//!
//! - **ALAR**: archive of named entries, versions 2 and 3
//! - **ALLZ**: bit-packed LZ container around one nested object
//! - **ALRD**: record schema describing a table row
//! - **ALTB**: typed table with an optional string pool
//! - **ALTX**: texture wrapper, embedded or external image
//! - **ALIG**: raw image, carried opaquely
//! - **Legacy XML**: XOR-masked LZ transport encoding, see [`legacy`]
//!
//! # Design Principles
//!
//! - **Round-Trip Guarantee**: `serialize(parse(data)) == data` for every
//!   object that was not patched
//! - **Patch by Copy**: [`patch`] returns a new object graph and never
//!   changes its input
//! - **Explicit Options**: layout choices the data cannot express are passed
//!   in [`ParseOptions`], never kept in globals
//!
//! # Example
//!
//! ```rust
//! use aigis_formats::{parse, serialize};
//!
//! let data = b"ALIG\x02\x00\x00\x00\x01\x02\x03\x04".to_vec();
//! let object = parse(&data)?;
//! assert_eq!(serialize(&object)?, data);
//! # Ok::<(), aigis_formats::Error>(())
//! ```

#![warn(missing_docs)]

/// Implement [`AlFormat`] for a type with `write(&self, &mut ByteWriter)`
///
/// The parse expression runs with `$reader` bound to a fresh reader over the
/// input.
macro_rules! impl_al_format {
    ($ty:ty, $reader:ident => $parse:expr) => {
        impl $crate::AlFormat for $ty {
            fn parse(data: &[u8]) -> $crate::Result<Self> {
                let mut source = $crate::cursor::ByteReader::new(data);
                let $reader = &mut source;
                $parse
            }

            fn build(&self) -> $crate::Result<Vec<u8>> {
                let mut writer = $crate::cursor::ByteWriter::new();
                self.write(&mut writer)?;
                Ok(writer.into_bytes())
            }
        }
    };
}

pub(crate) use impl_al_format;

pub mod allz;
/// ALAR archive container
///
/// Archives bundle named entries behind a table of contents. Version 2 keeps
/// entry names in front of each payload, version 3 keeps them in the table.
/// Text entries stay raw bytes; everything else is a nested object.
///
/// See the [`archive`] module for the layouts of both versions.
pub mod archive;
pub mod bits;
pub mod cursor;
pub mod error;
pub mod image;
/// Legacy XML transport codec
///
/// XML responses are XOR-masked with a single-byte key and compressed with a
/// byte-oriented LZ scheme. The codec is independent of the tagged objects.
pub mod legacy;
pub mod object;
pub mod patch;
pub mod schema;
/// ALTB typed table with string pool remapping
pub mod table;
pub mod texture;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use error::{Error, ErrorKind, Result};
pub use object::{AlObject, Magic, ParseOptions};
pub use patch::{FailurePolicy, PatchContext, TranslationSource, TranslationTable};

/// Common trait implemented by every AL* format and by [`AlObject`]
pub trait AlFormat: Sized {
    /// Parse from bytes
    fn parse(data: &[u8]) -> Result<Self>;

    /// Build to bytes
    fn build(&self) -> Result<Vec<u8>>;

    /// Parse from bytes, callable where an inherent `parse` takes a cursor
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(data)
    }

    /// Verify round-trip correctness
    fn verify_round_trip(data: &[u8]) -> Result<()> {
        let parsed = Self::parse(data)?;
        let rebuilt = parsed.build()?;
        if data != rebuilt.as_slice() {
            let offset = data
                .iter()
                .zip(&rebuilt)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| data.len().min(rebuilt.len()));
            return Err(Error::RoundTripMismatch {
                offset,
                expected: data.len(),
                actual: rebuilt.len(),
            });
        }
        Ok(())
    }
}

/// Parse any AL* object with default options
pub fn parse(data: &[u8]) -> Result<AlObject> {
    AlObject::from_bytes(data)
}

/// Parse any AL* object
pub fn parse_with(data: &[u8], options: &ParseOptions) -> Result<AlObject> {
    AlObject::parse_with(&mut cursor::ByteReader::new(data), options)
}

/// Serialize an object graph
pub fn serialize(object: &AlObject) -> Result<Vec<u8>> {
    object.to_bytes()
}

/// Produce a translated copy of an object graph
pub async fn patch(object: &AlObject, context: &PatchContext) -> Result<AlObject> {
    object.patch(context).await
}
