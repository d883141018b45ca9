//! Translation patcher for AL* game assets.
//!
//! This crate hosts the format engine from `aigis-formats`: it decodes the
//! asset file list, resolves translations from a directory tree and patches
//! intercepted responses.
//!
//! # Architecture
//!
//! - `filelist`: masked asset list mapping URL parts to file names
//! - `source`: directory-backed translation source with a table cache
//! - `session`: URL classification and per-response processing
//! - `inspect`: object tree summaries and round-trip verification
//! - `config`: command line arguments and validation
//!
//! # Example
//!
//! ```no_run
//! use aigis_patcher::{DirectorySource, Session};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     tracing_subscriber::fmt::init();
//!
//!     let session = Session::new(Arc::new(DirectorySource::new("patch")));
//!     let data = tokio::fs::read("Card.aar").await?;
//!     if let Some(patched) = session.patch_file("Card.aar", &data).await? {
//!         tokio::fs::write("Card.patched.aar", patched).await?;
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod filelist;
pub mod inspect;
pub mod session;
pub mod source;

pub use config::{Cli, Command};
pub use error::{ConfigError, PatcherError, PatcherResult};
pub use filelist::{FileAlias, FileList};
pub use inspect::{Summary, verify_bytes};
pub use session::{Session, UrlKind, classify};
pub use source::DirectorySource;
