//! Directory-backed translation source.
//!
//! A directory tree stands in for the translation archive: a directory is a
//! folder scope whose children resolve inside it, a file holds base64 text
//! that decodes to a translation table. The decoded bytes are read as UTF-8
//! with invalid sequences replaced.
//!
//! ```text
//! patch/
//! ├── Card.aar/            folder: entries of Card.aar resolve in here
//! │   └── CardName.atb     table for Card.aar/CardName.atb
//! └── SystemText.atb       table for a top-level file
//! ```

use crate::error::{PatcherError, PatcherResult};
use aigis_formats::patch::Resolution;
use aigis_formats::{TranslationSource, TranslationTable};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

type TableCache = Arc<Mutex<HashMap<PathBuf, Arc<TranslationTable>>>>;

/// Translation source reading a directory tree
///
/// Parsed tables are cached per path for the life of the source, shared by
/// every folder scope handed out from it.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    cache: TableCache,
}

/// Decode the text of a translation file
pub fn decode_table(text: &[u8], path: &Path) -> PatcherResult<TranslationTable> {
    let compact: Vec<u8> = text
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = general_purpose::STANDARD
        .decode(compact)
        .map_err(|source| PatcherError::TranslationDecode {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(TranslationTable::parse(&String::from_utf8_lossy(&bytes)))
}

/// Whether `name` stays inside the directory it is joined to
fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

impl DirectorySource {
    /// Source rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: TableCache::default(),
        }
    }

    /// Directory this scope reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of tables loaded so far
    pub fn cached_tables(&self) -> usize {
        self.cache.lock().len()
    }

    fn scope(&self, root: PathBuf) -> Self {
        Self {
            root,
            cache: Arc::clone(&self.cache),
        }
    }

    async fn load_table(&self, path: &Path) -> PatcherResult<Arc<TranslationTable>> {
        if let Some(table) = self.cache.lock().get(path) {
            return Ok(Arc::clone(table));
        }

        let text = tokio::fs::read(path)
            .await
            .map_err(|e| PatcherError::io(path, e))?;
        let table = Arc::new(decode_table(&text, path)?);
        debug!("loaded {} translations from {}", table.len(), path.display());

        // A concurrent load of the same path may have won; keep the first
        let mut cache = self.cache.lock();
        Ok(Arc::clone(
            cache.entry(path.to_path_buf()).or_insert(table),
        ))
    }

    async fn resolve_path(&self, name: &str) -> PatcherResult<Resolution> {
        if !is_plain_name(name) {
            warn!("ignoring translation lookup for unsafe name {name:?}");
            return Ok(Resolution::Missing);
        }

        let path = self.root.join(name);
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Resolution::Missing),
            Err(e) => return Err(PatcherError::io(path, e)),
        };

        // A folder wins over a table of the same name
        if metadata.is_dir() {
            Ok(Resolution::Folder(Arc::new(self.scope(path))))
        } else if metadata.is_file() {
            Ok(Resolution::Table(self.load_table(&path).await?))
        } else {
            Ok(Resolution::Missing)
        }
    }
}

#[async_trait]
impl TranslationSource for DirectorySource {
    async fn resolve(&self, name: &str) -> aigis_formats::Result<Resolution> {
        self.resolve_path(name)
            .await
            .map_err(|e| aigis_formats::Error::Translation(e.to_string()))
    }
}
