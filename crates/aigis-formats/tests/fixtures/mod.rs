//! Hand-laid byte fixtures shared by the integration tests
#![allow(dead_code)]

/// Pool strings referenced by the fixture tables
pub const POOL: &[u8] = "\0剣\0盾\0".as_bytes();

/// Pool offsets referenced by the three fixture rows
pub const ROW_REFS: [u32; 3] = [1, 5, 1];

/// Bytes per fixture row
pub const STRIDE: u32 = 16;

/// Zero-pad to the next multiple of 4
pub fn align(data: &mut Vec<u8>) {
    data.resize(data.len().next_multiple_of(4), 0);
}

/// Append an ALRD schema: ID int, Name string, Rate float, Flag byte and a
/// valueless type-97 slot
pub fn schema(data: &mut Vec<u8>) {
    let fields: [(u16, u8, &str); 5] = [
        (0, 1, "ID"),
        (4, 32, "Name"),
        (8, 4, "Rate"),
        (12, 5, "Flag"),
        (13, 97, "Extra"),
    ];
    data.extend_from_slice(b"ALRD");
    data.extend_from_slice(&[1, 0, fields.len() as u8, 0]);
    data.extend_from_slice(&(fields.len() as u16 * 4).to_le_bytes());
    for (offset, code, name) in fields {
        data.extend_from_slice(&offset.to_le_bytes());
        data.extend_from_slice(&[code, 0, name.len() as u8, 0]);
        data.extend_from_slice(name.as_bytes());
        data.extend_from_slice(&[0, 0]);
        align(data);
    }
}

/// Standalone ALRD bytes
pub fn schema_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    schema(&mut data);
    data
}

/// ALTB of one of the four known forms with three rows
///
/// Rows carry `0xEE` filler after their last value. With a string pool the
/// rows reference `剣`, `盾`, `剣`.
pub fn table(form: u8) -> Vec<u8> {
    let header_len: usize = match form {
        0x04 => 0x18,
        0x10 => 0x14,
        0x14 => 0x1C,
        0x1E => 0x20,
        other => panic!("no fixture for form 0x{other:02X}"),
    };
    let has_pool = form & 0x04 != 0;
    let has_names = form & 0x08 != 0;

    let mut data = b"ALTB".to_vec();
    data.extend_from_slice(&[1, form]);
    data.extend_from_slice(&3u16.to_le_bytes());
    data.extend_from_slice(&(header_len as u16).to_le_bytes());
    let entry_offset_at = data.len();
    data.extend_from_slice(&[0, 0]);
    data.extend_from_slice(&STRIDE.to_le_bytes());
    let pool_at = data.len();
    if has_pool {
        data.extend_from_slice(&[0; 8]);
    }
    let names_at = data.len();
    if has_names {
        data.extend_from_slice(&[0; 4]);
    }
    if form & 0x10 != 0 {
        data.extend_from_slice(b"LBL0");
    }
    assert_eq!(data.len(), header_len);

    schema(&mut data);
    align(&mut data);
    let entry_offset = data.len() as u16;
    data[entry_offset_at..entry_offset_at + 2].copy_from_slice(&entry_offset.to_le_bytes());

    for (i, name) in ROW_REFS.iter().enumerate() {
        data.extend_from_slice(&(i as i32 + 1).to_le_bytes());
        data.extend_from_slice(&(if has_pool { *name } else { 0 }).to_le_bytes());
        data.extend_from_slice(&(i as f32 * 0.5).to_le_bytes());
        data.push(i as u8);
        data.extend_from_slice(&[0xEE; 3]);
    }
    align(&mut data);

    if has_pool {
        let start = data.len() as u32;
        data[pool_at..pool_at + 4].copy_from_slice(&(POOL.len() as u32).to_le_bytes());
        data[pool_at + 4..pool_at + 8].copy_from_slice(&start.to_le_bytes());
        data.extend_from_slice(POOL);
        align(&mut data);
    }

    if has_names {
        let start = data.len() as u32;
        data[names_at..names_at + 4].copy_from_slice(&start.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(9);
        data.extend_from_slice(b"UnitTable");
        align(&mut data);
    }

    data
}

/// ALTX with a frame table and an embedded ALIG
pub fn texture_embedded() -> Vec<u8> {
    let mut data = b"ALTX\x00\x00\x02\x00".to_vec();
    data.extend_from_slice(&20u32.to_le_bytes());
    data.extend_from_slice(&[0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0x40, 0x00]);
    data.extend_from_slice(b"ALIG\x03\x00\x00\x00");
    data.extend_from_slice(&[0x7F; 16]);
    data
}

/// ALTX referring to an external image
pub fn texture_external() -> Vec<u8> {
    let mut data = b"ALTX\x00\x0E\x01\x00".to_vec();
    data.extend_from_slice(&12u32.to_le_bytes());
    data.extend_from_slice(&512u16.to_le_bytes());
    data.extend_from_slice(&256u16.to_le_bytes());
    data.extend_from_slice(b"ui_frame.png\0\0\0\0");
    data
}

/// ALAR v3 laid out by hand: records packed after the toc offsets, payloads
/// from `data_offset` on, each at a 4-byte boundary
pub fn archive_v3(entries: &[(&str, Vec<u8>)], data_offset: u16) -> Vec<u8> {
    let count = entries.len() as u16;
    let mut data = b"ALAR\x03\x00".to_vec();
    data.extend_from_slice(&count.to_le_bytes());
    data.extend_from_slice(&0x0102u16.to_le_bytes());
    data.extend_from_slice(&0x0304u16.to_le_bytes());
    data.extend_from_slice(&[0; 4]);
    data.extend_from_slice(&data_offset.to_le_bytes());
    for i in 0..count {
        data.extend_from_slice(&(i * 0x10).to_le_bytes());
    }
    align(&mut data);

    let mut records = Vec::new();
    for (i, (name, _)) in entries.iter().enumerate() {
        records.push(data.len());
        data.extend_from_slice(&(i as u16).to_le_bytes());
        data.extend_from_slice(&[0; 16]);
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        align(&mut data);
    }

    assert!(data.len() <= usize::from(data_offset));
    data.resize(usize::from(data_offset), 0);
    for ((_, payload), record) in entries.iter().zip(records) {
        align(&mut data);
        let address = data.len() as u32;
        data.extend_from_slice(payload);
        data[record + 4..record + 8].copy_from_slice(&address.to_le_bytes());
        data[record + 8..record + 12].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    }
    data
}

/// ALAR v2, extended layout, laid out by hand
pub fn archive_v2(entries: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut data = b"ALAR\x02\x01".to_vec();
    data.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    data.extend_from_slice(&0x0Au32.to_le_bytes());
    data.extend_from_slice(&0x0Bu32.to_le_bytes());
    let records = data.len();
    data.resize(records + entries.len() * 16, 0);

    for (i, (name, payload)) in entries.iter().enumerate() {
        data.extend_from_slice(&[0, 0]);
        data.extend_from_slice(name.as_bytes());
        data.resize(data.len() + 34 - name.len(), 0);
        let address = data.len() as u32;
        data.extend_from_slice(payload);
        align(&mut data);
        let size = data.len() as u32 - address;

        let record = records + i * 16;
        data[record..record + 2].copy_from_slice(&(i as u16).to_le_bytes());
        data[record + 4..record + 8].copy_from_slice(&address.to_le_bytes());
        data[record + 8..record + 12].copy_from_slice(&size.to_le_bytes());
    }
    data
}
