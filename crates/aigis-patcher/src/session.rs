//! Response processing session.
//!
//! A [`Session`] holds everything learned while intercepting game traffic:
//! the decoded file list, decoded XML documents and the patched objects. Data
//! files are patched through the session's translation source; any failure
//! falls back to the unmodified response.
//!
//! # Example
//!
//! ```no_run
//! use aigis_patcher::{DirectorySource, Session};
//! use std::sync::Arc;
//!
//! # async fn run(list: Vec<u8>, asset: Vec<u8>) {
//! let session = Session::new(Arc::new(DirectorySource::new("patch")));
//! session
//!     .process_response("https://assets.millennium-war.net/1fp32igvpoxnb521p9dqypak5cal0xv0/list", list)
//!     .await;
//! let patched = session
//!     .process_response("https://assets.millennium-war.net/0a1b/2c3d", asset)
//!     .await;
//! # }
//! ```

use crate::filelist::FileList;
use crate::error::{PatcherError, PatcherResult};
use aigis_formats::{
    AlObject, FailurePolicy, ParseOptions, PatchContext, TranslationSource, legacy, parse_with,
    patch, serialize,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Path fragment identifying the file list download
pub const FILE_LIST_MARKER: &str = "1fp32igvpoxnb521p9dqypak5cal0xv0";

/// Host serving asset data files
pub const ASSET_HOST: &str = "assets.millennium-war.net";

/// Host serving XML documents
pub const XML_HOST: &str = "millennium-war.net";

/// What a response URL carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// The masked asset file list
    FileList,
    /// An asset data file addressed by two hex path parts
    DataFile {
        /// First path part
        part1: String,
        /// Leading hex digits of the second path part
        part2: String,
    },
    /// An XML document
    Xml,
    /// Anything else, passed through
    Other,
}

fn hex_prefix(segment: &str) -> &str {
    let end = segment
        .find(|c: char| !matches!(c, '0'..='9' | 'a'..='f'))
        .unwrap_or(segment.len());
    &segment[..end]
}

/// Classify a response URL
pub fn classify(url: &str) -> PatcherResult<UrlKind> {
    if url.contains(FILE_LIST_MARKER) {
        return Ok(UrlKind::FileList);
    }

    let parsed = Url::parse(url).map_err(|source| PatcherError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Ok(UrlKind::Other);
    }

    match parsed.host_str() {
        Some(ASSET_HOST) => {
            let mut segments = parsed.path_segments().into_iter().flatten();
            let part1 = segments.next().unwrap_or_default();
            let part2 = hex_prefix(segments.next().unwrap_or_default());
            if part1.is_empty() || hex_prefix(part1) != part1 || part2.is_empty() {
                return Ok(UrlKind::Other);
            }
            Ok(UrlKind::DataFile {
                part1: part1.to_string(),
                part2: part2.to_string(),
            })
        }
        Some(XML_HOST) => Ok(UrlKind::Xml),
        _ => Ok(UrlKind::Other),
    }
}

/// State shared by every processed response
pub struct Session {
    file_list: RwLock<FileList>,
    source: Arc<dyn TranslationSource>,
    policy: FailurePolicy,
    options: ParseOptions,
    patched: Mutex<HashMap<String, Arc<AlObject>>>,
    xml: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("file_list", &self.file_list.read().len())
            .field("policy", &self.policy)
            .field("options", &self.options)
            .field("patched", &self.patched.lock().len())
            .field("xml", &self.xml.lock().len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session translating through `source`
    pub fn new(source: Arc<dyn TranslationSource>) -> Self {
        Self {
            file_list: RwLock::new(FileList::new()),
            source,
            policy: FailurePolicy::default(),
            options: ParseOptions::default(),
            patched: Mutex::new(HashMap::new()),
            xml: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the failure policy for children of archives
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the parse options
    #[must_use]
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Add the records of a masked file list
    pub fn ingest_file_list(&self, data: &[u8]) -> usize {
        let added = self.file_list.write().ingest(data);
        info!("file list ingested: {added} records");
        added
    }

    /// File name recorded for a URL part pair
    pub fn filename(&self, part1: &str, part2: &str) -> Option<String> {
        self.file_list
            .read()
            .lookup(part1, part2)
            .map(|alias| alias.filename.clone())
    }

    /// Last patched object for a file name
    pub fn patched(&self, filename: &str) -> Option<Arc<AlObject>> {
        self.patched.lock().get(filename).cloned()
    }

    /// Decoded XML document of a URL
    pub fn xml_document(&self, url: &str) -> Option<String> {
        self.xml.lock().get(url).cloned()
    }

    /// Route a response by its URL and return the bytes to hand on
    pub async fn process_response(&self, url: &str, data: Vec<u8>) -> Vec<u8> {
        match classify(url) {
            Ok(UrlKind::FileList) => {
                self.ingest_file_list(&data);
                data
            }
            Ok(UrlKind::DataFile { part1, part2 }) => {
                self.process_data_file(&part1, &part2, data).await
            }
            Ok(UrlKind::Xml) => {
                self.process_xml(url, &data);
                data
            }
            Ok(UrlKind::Other) => data,
            Err(e) => {
                debug!("passing through response: {e}");
                data
            }
        }
    }

    /// Patch an asset data file, or return it unchanged
    ///
    /// Files missing from the file list or without translation data pass
    /// through. A failed patch logs a warning and passes the input through.
    pub async fn process_data_file(&self, part1: &str, part2: &str, data: Vec<u8>) -> Vec<u8> {
        let Some(filename) = self.filename(part1, part2) else {
            debug!("{part1}/{part2} is not in the file list");
            return data;
        };

        match self.patch_file(&filename, &data).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => data,
            Err(e) => {
                warn!("failed to patch {filename}, keeping the original: {e}");
                data
            }
        }
    }

    /// Patch `data` as `filename`; `None` when no translation data exists
    pub async fn patch_file(&self, filename: &str, data: &[u8]) -> PatcherResult<Option<Vec<u8>>> {
        let context = PatchContext::resolve(&self.source, filename, self.policy).await?;
        if context.is_identity() {
            debug!("no translations for {filename}");
            return Ok(None);
        }

        let object = parse_with(data, &self.options)?;
        let patched = patch(&object, &context).await?;
        let bytes = serialize(&patched)?;
        info!("patched {filename}: {} -> {} bytes", data.len(), bytes.len());

        self.patched
            .lock()
            .insert(filename.to_string(), Arc::new(patched));
        Ok(Some(bytes))
    }

    fn process_xml(&self, url: &str, data: &[u8]) {
        match legacy::decode_xml(data) {
            Ok(document) => {
                debug!("decoded {} bytes of XML from {url}", document.len());
                self.xml.lock().insert(url.to_string(), document);
            }
            Err(e) => warn!("error processing XML from {url}: {e}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::filelist::unmask;
    use aigis_formats::TranslationTable;
    use aigis_formats::patch::MemorySource;
    use pretty_assertions::assert_eq;

    /// Form 0x04 table with one string column referencing "剣"
    fn table_bytes() -> Vec<u8> {
        let mut data = b"ALTB\x01\x04\x01\x00\x18\x00".to_vec();
        data.extend_from_slice(&0x30u16.to_le_bytes());
        data.extend_from_slice(&4u32.to_le_bytes());
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&0x34u32.to_le_bytes());
        data.extend_from_slice(b"ALRD\x01\x00\x01\x00\x04\x00");
        data.extend_from_slice(&[0, 0, 32, 0, 4, 0]);
        data.extend_from_slice(b"Name\0\0\0\0");
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice("\0剣\0".as_bytes());
        data.extend_from_slice(&[0; 3]);
        data
    }

    fn session(source: MemorySource) -> Session {
        let session = Session::new(Arc::new(source));
        session.ingest_file_list(&unmask(b"0a1b,2c3d,0,0,Name.atb\n9f,8e,0,0,Plain.atb"));
        session
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("https://assets.millennium-war.net/1fp32igvpoxnb521p9dqypak5cal0xv0/x").unwrap(),
            UrlKind::FileList
        );
        assert_eq!(
            classify("http://assets.millennium-war.net/0a1b/2c3dzz").unwrap(),
            UrlKind::DataFile {
                part1: "0a1b".to_string(),
                part2: "2c3d".to_string()
            }
        );
        assert_eq!(
            classify("https://assets.millennium-war.net/xyz/2c3d").unwrap(),
            UrlKind::Other
        );
        assert_eq!(
            classify("https://millennium-war.net/2iofz514jeks1y44k7al2ostm43xj085").unwrap(),
            UrlKind::Xml
        );
        assert_eq!(classify("https://example.com/0a1b/2c3d").unwrap(), UrlKind::Other);
        assert!(classify("not a url").is_err());
    }

    #[test]
    fn test_table_fixture_parses() {
        let object = aigis_formats::parse(&table_bytes()).unwrap();
        assert_eq!(serialize(&object).unwrap(), table_bytes());
    }

    #[tokio::test]
    async fn test_data_file_patched() {
        let session = session(
            MemorySource::new()
                .with_table("Name.atb", TranslationTable::from_pairs([("剣", "Sword")])),
        );
        let out = session
            .process_response("https://assets.millennium-war.net/0a1b/2c3d", table_bytes())
            .await;
        assert_ne!(out, table_bytes());

        let AlObject::Table(table) = aigis_formats::parse(&out).unwrap() else {
            panic!("expected a table");
        };
        assert_eq!(table.strings(), vec!["Sword"]);
        assert!(session.patched("Name.atb").is_some());
    }

    #[tokio::test]
    async fn test_pass_through_cases() {
        let session = session(
            MemorySource::new()
                .with_table("Name.atb", TranslationTable::from_pairs([("剣", "Sword")])),
        );

        // Not in the file list
        let out = session.process_data_file("ffff", "0000", table_bytes()).await;
        assert_eq!(out, table_bytes());

        // In the file list, no translation data
        let out = session.process_data_file("9f", "8e", table_bytes()).await;
        assert_eq!(out, table_bytes());
        assert!(session.patched("Plain.atb").is_none());

        // Translation data, but the bytes are not an object
        let out = session.process_data_file("0a1b", "2c3d", b"garbage".to_vec()).await;
        assert_eq!(out, b"garbage");

        // Archive whose only entry points far past the end of the data
        let mut broken = b"ALAR\x02\x00\x01\x00".to_vec();
        broken.extend_from_slice(&[0; 12]);
        broken.extend_from_slice(&0xFFFF_0000u32.to_le_bytes());
        broken.extend_from_slice(&[4, 0, 0, 0, 0, 0, 0, 0]);
        let out = session.process_data_file("0a1b", "2c3d", broken.clone()).await;
        assert_eq!(out, broken);
    }

    #[tokio::test]
    async fn test_xml_documents_kept() {
        let session = session(MemorySource::new());
        let document = b"<DA><A>1</A></DA>";
        let mut payload = vec![document.len() as u8, ((document.len() - 1) as u8) << 2];
        payload.extend_from_slice(document);
        legacy::apply_key(&mut payload, 0x3C);

        let url = "https://millennium-war.net/2iofz514jeks1y44k7al2ostm43xj085";
        let out = session.process_response(url, payload.clone()).await;
        assert_eq!(out, payload);
        assert_eq!(session.xml_document(url).as_deref(), Some("<DA><A>1</A></DA>"));
    }
}
