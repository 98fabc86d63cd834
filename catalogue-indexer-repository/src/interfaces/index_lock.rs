//! Index group lock trait definition.

use async_trait::async_trait;

use crate::errors::SearchError;

/// Proof of holding an index group lock.
///
/// Returned by [`IndexLock::try_acquire`] and consumed by
/// [`IndexLock::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken {
    pub group: String,
    /// Unique per acquisition.
    pub owner: String,
    /// Engine concurrency control values of the lock document, when the lock
    /// is backed by one.
    pub seq_no: Option<i64>,
    pub primary_term: Option<i64>,
}

impl LockToken {
    pub fn new(group: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            owner: owner.into(),
            seq_no: None,
            primary_term: None,
        }
    }
}

/// Advisory mutual exclusion per index group.
///
/// Acquisition never waits: if the lock is held, `try_acquire` fails with
/// [`SearchError::IndexLocked`] straight away.
#[async_trait]
pub trait IndexLock: Send + Sync {
    async fn try_acquire(&self, group: &str) -> Result<LockToken, SearchError>;

    async fn release(&self, token: LockToken) -> Result<(), SearchError>;
}
