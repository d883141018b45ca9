//! Per-object translation scope

use super::{Resolution, TranslationSource, TranslationTable};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Handling of a child object whose patch fails inside an archive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole archive patch
    #[default]
    Propagate,
    /// Keep the unpatched child and log a warning
    KeepOriginal,
}

/// Translation scope of one object in the patch walk
///
/// Holds the lookup for the object's own strings and, when the object's
/// path named a folder, the scope its children resolve in.
#[derive(Clone)]
pub struct PatchContext {
    path: String,
    table: Option<Arc<TranslationTable>>,
    scope: Option<Arc<dyn TranslationSource>>,
    policy: FailurePolicy,
}

impl fmt::Debug for PatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatchContext")
            .field("path", &self.path)
            .field("table", &self.table.as_ref().map(|t| t.len()))
            .field("scoped", &self.scope.is_some())
            .field("policy", &self.policy)
            .finish()
    }
}

impl PatchContext {
    /// Context that leaves every string unchanged
    pub fn identity(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            table: None,
            scope: None,
            policy: FailurePolicy::default(),
        }
    }

    /// Context translating through `table`
    pub fn with_table(path: impl Into<String>, table: Arc<TranslationTable>) -> Self {
        Self {
            table: Some(table),
            ..Self::identity(path)
        }
    }

    /// Context with `scope` as the folder its children resolve in
    pub fn with_scope(path: impl Into<String>, scope: Arc<dyn TranslationSource>) -> Self {
        Self {
            scope: Some(scope),
            ..Self::identity(path)
        }
    }

    /// Resolve `name` inside `source`
    pub async fn resolve(
        source: &Arc<dyn TranslationSource>,
        name: &str,
        policy: FailurePolicy,
    ) -> Result<Self> {
        Self::resolve_at(source, name, name.to_owned(), policy).await
    }

    async fn resolve_at(
        source: &Arc<dyn TranslationSource>,
        name: &str,
        path: String,
        policy: FailurePolicy,
    ) -> Result<Self> {
        let resolution = source.resolve(name).await?;
        debug!("resolved {path} to {resolution:?}");
        let context = match resolution {
            Resolution::Folder(scope) => Self::with_scope(path, scope),
            Resolution::Table(table) => Self::with_table(path, table),
            Resolution::Missing => Self::identity(path),
        };
        Ok(context.with_policy(policy))
    }

    /// Replace the failure policy
    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Context for a child named `name`
    ///
    /// Children resolve inside this context's folder scope; without one they
    /// get an identity context.
    pub async fn child(&self, name: &str) -> Result<Self> {
        let path = self.child_path(name);
        match &self.scope {
            Some(scope) => Self::resolve_at(scope, name, path, self.policy).await,
            None => Ok(Self::identity(path).with_policy(self.policy)),
        }
    }

    /// Scope path of a child named `name`
    pub fn child_path(&self, name: &str) -> String {
        if self.path.is_empty() {
            name.to_owned()
        } else {
            format!("{}/{name}", self.path)
        }
    }

    /// Translate one string
    pub fn translate(&self, text: &str) -> String {
        self.table
            .as_ref()
            .map_or(text, |table| table.translate(text))
            .to_owned()
    }

    /// Whether this context can change anything
    pub fn is_identity(&self) -> bool {
        self.table.is_none() && self.scope.is_none()
    }

    /// Scope path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Failure policy
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }
}
