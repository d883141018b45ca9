#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Stream codecs through the public API

mod fixtures;

use aigis_formats::allz::{self, AllzHeader};
use aigis_formats::bits::ControlWidths;
use aigis_formats::legacy::{self, LegacyError};
use aigis_formats::{Error, ErrorKind, parse};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn allz_header(version: u8, size: u32) -> Vec<u8> {
    let mut data = b"ALLZ".to_vec();
    data.extend_from_slice(&[version, 0, 0, 0]);
    data.extend_from_slice(&size.to_le_bytes());
    data
}

#[test]
fn allz_overlapping_match() {
    // Literal run of one 'A', then a match at distance 1 of length 3; the
    // minimum match length makes 4 the smallest size of such a stream
    let mut data = allz_header(1, 4);
    data.extend_from_slice(&[0x00, b'A']);
    assert_eq!(allz::decompress_bytes(&data).unwrap(), b"AAAA");

    // "AAAA" is no object tag, so dispatching the payload fails
    let err = parse(&data).unwrap_err();
    assert!(matches!(err, Error::UnknownMagic { tag, .. } if &tag == b"AAAA"));
}

#[test]
fn allz_header_checks() {
    let mut data = allz_header(2, 4);
    data.extend_from_slice(&[0x00, b'A']);
    let err = allz::decompress_bytes(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);

    // Stream ends long before the declared size
    let mut data = allz_header(1, 64);
    data.extend_from_slice(&[0x00, b'A']);
    assert!(allz::decompress_bytes(&data).is_err());

    let err = allz::decompress_bytes(b"ALLZ\x01").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Truncation);
}

#[test]
fn allz_encodes_table_with_any_widths() {
    let table = fixtures::table(0x1E);
    for widths in [
        ControlWidths::default(),
        ControlWidths {
            length: 2,
            offset: 4,
            literal: 3,
        },
    ] {
        let stream = allz::compress(&table, widths).unwrap().unwrap();
        assert_eq!(&stream[5..8], &[widths.length, widths.offset, widths.literal]);
        assert!(stream.len() > AllzHeader::SIZE);
        assert_eq!(allz::decompress_bytes(&stream).unwrap(), table);
    }
}

#[test]
fn allz_rejects_data_without_repeats() {
    assert_eq!(allz::compress(b"abcdef", ControlWidths::default()).unwrap(), None);
}

proptest! {
    #[test]
    fn allz_compress_inverts(
        seed in proptest::collection::vec(any::<u8>(), 1..64),
        repeats in 2usize..8,
    ) {
        let data: Vec<u8> = seed.iter().copied().cycle().take(seed.len() * repeats + 3).collect();
        if let Some(stream) = allz::compress(&data, ControlWidths::default()).unwrap() {
            prop_assert_eq!(allz::decompress_bytes(&stream).unwrap(), data);
        }
    }
}

/// Literal `head`, a 4-byte copy at distance 2, literal `tail`
fn legacy_stream(head: &[u8], tail: &[u8]) -> Vec<u8> {
    assert!(head.len() <= 60 && tail.len() <= 60);
    let size = head.len() + 4 + tail.len();
    let mut out = vec![size as u8];
    out.push(((head.len() - 1) as u8) << 2);
    out.extend_from_slice(head);
    out.extend_from_slice(&[0x01, 2]);
    out.push(((tail.len() - 1) as u8) << 2);
    out.extend_from_slice(tail);
    out
}

#[test]
fn legacy_xml_with_back_reference() {
    let mut stream = legacy_stream(b"<?xml version=\"1.0\"?><DA>ab", b"</DA>");
    assert_eq!(
        legacy::decompress(&stream).unwrap(),
        b"<?xml version=\"1.0\"?><DA>ababab</DA>"
    );

    legacy::apply_key(&mut stream, 0xA7);
    assert_eq!(legacy::find_key(&stream), Some(0xA7));
    assert_eq!(
        legacy::decode_xml(&stream).unwrap(),
        "<?xml version=\"1.0\"?><DA>ababab</DA>"
    );
}

#[test]
fn legacy_key_not_found() {
    let err = legacy::decode_xml(&[0u8; 200]).unwrap_err();
    assert!(matches!(err, LegacyError::KeyNotFound(100)));
    assert_eq!(err.kind(), ErrorKind::Format);
}
