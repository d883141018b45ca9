//! Translation sources
//!
//! A source maps a scope path to either a nested folder, a translation table
//! or nothing. Implementations may load lazily; the engine only awaits them.

use super::TranslationTable;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// What a path resolves to inside a translation source
#[derive(Clone)]
pub enum Resolution {
    /// A folder scope; children resolve inside it
    Folder(Arc<dyn TranslationSource>),
    /// A translation table for the object itself
    Table(Arc<TranslationTable>),
    /// No translation data
    Missing,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(_) => f.write_str("Folder(..)"),
            Self::Table(table) => write!(f, "Table({} pairs)", table.len()),
            Self::Missing => f.write_str("Missing"),
        }
    }
}

/// Asynchronous lookup of translation data by name
///
/// A folder takes precedence over a table of the same name.
#[async_trait]
pub trait TranslationSource: Send + Sync {
    /// Resolve `name` within this scope
    async fn resolve(&self, name: &str) -> Result<Resolution>;
}

/// In-memory translation source
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    entries: HashMap<String, MemoryEntry>,
}

#[derive(Debug, Clone)]
enum MemoryEntry {
    Folder(Arc<MemorySource>),
    Table(Arc<TranslationTable>),
}

impl MemorySource {
    /// Empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table under `name`
    #[must_use]
    pub fn with_table(mut self, name: impl Into<String>, table: TranslationTable) -> Self {
        self.entries
            .insert(name.into(), MemoryEntry::Table(Arc::new(table)));
        self
    }

    /// Add a nested folder under `name`
    #[must_use]
    pub fn with_folder(mut self, name: impl Into<String>, folder: Self) -> Self {
        self.entries
            .insert(name.into(), MemoryEntry::Folder(Arc::new(folder)));
        self
    }
}

#[async_trait]
impl TranslationSource for MemorySource {
    async fn resolve(&self, name: &str) -> Result<Resolution> {
        Ok(match self.entries.get(name) {
            Some(MemoryEntry::Folder(folder)) => Resolution::Folder(folder.clone()),
            Some(MemoryEntry::Table(table)) => Resolution::Table(table.clone()),
            None => Resolution::Missing,
        })
    }
}
