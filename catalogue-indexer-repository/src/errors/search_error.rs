//! Search error types.
//!
//! This module defines the error types that can occur during search engine
//! operations.

use thiserror::Error;

/// Errors that can occur during search engine operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Search or scroll request execution failed.
    #[error("Query error: {0}")]
    QueryError(String),

    /// A scroll page came back without a continuation handle.
    #[error("Scroll cursor expired or missing: {0}")]
    CursorExpiredOrMissing(String),

    /// Bulk indexing request failed or had failures.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to create a physical index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to read or switch an index group alias.
    #[error("Alias error: {0}")]
    AliasError(String),

    /// The index group lock is held by someone else.
    #[error("Index group '{group}' is locked")]
    IndexLocked { group: String },

    /// Failed to acquire or release a lock for reasons other than contention.
    #[error("Lock error: {0}")]
    LockError(String),

    /// Failed to parse response from search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A bulk write was accepted but some documents were rejected.
    #[error("Bulk item failures: {message}")]
    BulkItemFailures { message: String, transient: bool },

    /// The named index or index group does not exist.
    #[error("No such index: {0}")]
    NoSuchIndex(String),
}

impl SearchError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::QueryError(msg.into())
    }

    /// Create a missing-cursor error.
    pub fn cursor_missing(msg: impl Into<String>) -> Self {
        Self::CursorExpiredOrMissing(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a bulk item failure error. `transient` is decided from the
    /// per-item statuses, never from the message text.
    pub fn item_failures(message: impl Into<String>, transient: bool) -> Self {
        Self::BulkItemFailures {
            message: message.into(),
            transient,
        }
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create an alias error.
    pub fn alias(msg: impl Into<String>) -> Self {
        Self::AliasError(msg.into())
    }

    /// Create an index-locked error.
    pub fn locked(group: impl Into<String>) -> Self {
        Self::IndexLocked {
            group: group.into(),
        }
    }

    /// Create a lock error.
    pub fn lock(msg: impl Into<String>) -> Self {
        Self::LockError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a no-such-index error.
    pub fn no_such_index(name: impl Into<String>) -> Self {
        Self::NoSuchIndex(name.into())
    }

    /// Whether retrying the same request may succeed.
    ///
    /// Connection failures are transient. Bulk failures are transient when the
    /// engine reports rate limiting, timeouts or unavailability. Item
    /// failures carry their own classification.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionError(_) => true,
            Self::BulkItemFailures { transient, .. } => *transient,
            Self::BulkIndexError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("rate limit")
                    || msg_lower.contains("timeout")
                    || msg_lower.contains("connection")
                    || msg_lower.contains("503")
                    || msg_lower.contains("429")
            }
            Self::QueryError(_)
            | Self::CursorExpiredOrMissing(_)
            | Self::IndexCreationError(_)
            | Self::AliasError(_)
            | Self::IndexLocked { .. }
            | Self::LockError(_)
            | Self::ParseError(_)
            | Self::NoSuchIndex(_) => false,
        }
    }
}
