//! Translation pipeline
//!
//! Patching walks an object graph and produces a translated copy. Each object
//! is patched under a [`PatchContext`] derived from its parent's scope and its
//! own name. Archives patch their entries concurrently and reassemble them in
//! table-of-contents order; tables rewrite their string pools; every other
//! object is copied unchanged.
//!
//! ```text
//! TranslationSource ── resolve(name) ──> Folder | Table | Missing
//!        │                                 │
//!   PatchContext::child(name) <────────────┘
//! ```

mod context;
mod source;
mod table;

pub use context::{FailurePolicy, PatchContext};
pub use source::{MemorySource, Resolution, TranslationSource};
pub use table::TranslationTable;
