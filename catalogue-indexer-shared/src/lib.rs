//! # Catalogue Indexer Shared
//!
//! Plain data types passed between the schema, repository and pipeline
//! crates: raw search hits and scroll pages as returned by the engine, the
//! exported records derived from them, and the batches handed to background
//! workers.

pub mod batch;
pub mod document;
pub mod scroll;

pub use batch::Batch;
pub use document::{DocumentIdentifier, ExportedRecord};
pub use scroll::{RawHit, ScrollPage, ScrollRequest};
