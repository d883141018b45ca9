//! Single-byte XOR cipher with known-plaintext key recovery

use super::error::{LegacyError, LegacyResult};

/// Plaintext prefixes tried in order when searching for the key
pub const KNOWN_PREFIXES: [&[u8]; 2] = [b"<?xml version=\"", b"<DA>"];

/// Number of leading positions scanned for a prefix
pub const SCAN_WINDOW: usize = 100;

/// Recover the XOR key by matching pairwise byte distances against a known prefix
///
/// XOR with a single key preserves `a ^ b` between any two bytes, so a window
/// whose distances to its first byte equal the prefix's distances is the
/// prefix under some key, and that key is `prefix[0] ^ window[0]`.
pub fn find_key(data: &[u8]) -> Option<u8> {
    KNOWN_PREFIXES.iter().find_map(|prefix| {
        let first = prefix[0];
        (0..data.len().min(SCAN_WINDOW)).find_map(|i| {
            let window = data.get(i..i + prefix.len())?;
            let matches = window
                .iter()
                .zip(prefix.iter())
                .skip(1)
                .all(|(&b, &p)| window[0] ^ b == first ^ p);
            matches.then_some(first ^ window[0])
        })
    })
}

/// XOR every byte with `key`
pub fn apply_key(data: &mut [u8], key: u8) {
    for byte in data {
        *byte ^= key;
    }
}

/// Recover the key and return the decoded bytes
pub fn decode(data: &[u8]) -> LegacyResult<Vec<u8>> {
    let key = find_key(data).ok_or(LegacyError::KeyNotFound(data.len().min(SCAN_WINDOW)))?;
    let mut out = data.to_vec();
    apply_key(&mut out, key);
    Ok(out)
}
