//! Asset file list decoding.
//!
//! The game downloads a list mapping asset URL parts to file names. Every
//! byte is XOR-masked with [`FILELIST_KEY`]; the plain text is one record per
//! line:
//!
//! ```text
//! part1,part2,unk1,unk2,filename
//! ```
//!
//! Lines with any other number of fields are skipped. A URL part pair may be
//! listed more than once; every alias is kept in list order.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// XOR mask applied to every file list byte
pub const FILELIST_KEY: u8 = 0xEA ^ 0x30;

/// One file name recorded for a URL part pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileAlias {
    /// Asset file name, e.g. `Card.aar`
    pub filename: String,
    /// Third field, meaning unknown
    pub unk1: String,
    /// Fourth field, meaning unknown
    pub unk2: String,
}

/// Decoded file list keyed by `(part1, part2)`
#[derive(Debug, Clone, Default)]
pub struct FileList {
    entries: HashMap<(String, String), Vec<FileAlias>>,
}

/// Remove the XOR mask
pub fn unmask(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ FILELIST_KEY).collect()
}

impl FileList {
    /// Empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a masked file list
    pub fn decode(data: &[u8]) -> Self {
        let mut list = Self::new();
        list.ingest(data);
        list
    }

    /// Add the records of a masked file list, returning how many were added
    pub fn ingest(&mut self, data: &[u8]) -> usize {
        let plain = unmask(data);
        let text = String::from_utf8_lossy(&plain);

        let mut added = 0;
        for line in text.split('\n') {
            let fields: Vec<&str> = line.split(',').collect();
            let [part1, part2, unk1, unk2, filename] = fields.as_slice() else {
                continue;
            };
            self.entries
                .entry(((*part1).to_string(), (*part2).to_string()))
                .or_default()
                .push(FileAlias {
                    filename: (*filename).to_string(),
                    unk1: (*unk1).to_string(),
                    unk2: (*unk2).to_string(),
                });
            added += 1;
        }

        debug!("file list: {added} records, {} part pairs", self.entries.len());
        added
    }

    /// First alias of a URL part pair
    pub fn lookup(&self, part1: &str, part2: &str) -> Option<&FileAlias> {
        self.aliases(part1, part2).first()
    }

    /// Every alias of a URL part pair, in list order
    pub fn aliases(&self, part1: &str, part2: &str) -> &[FileAlias] {
        self.entries
            .get(&(part1.to_string(), part2.to_string()))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of part pairs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no record was decoded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
