//! Error types for the catalogue indexer repository.

mod search_error;

pub use search_error::SearchError;
