//! Index group management trait definition.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SearchError;

/// Manages the physical indices behind a logical index group.
///
/// A group is addressed through an alias that points at exactly one physical
/// index, its *current* index. New physical indices are created unaliased and
/// only become current through [`IndexGroupProvider::switch_alias`].
#[async_trait]
pub trait IndexGroupProvider: Send + Sync {
    /// Create a new, unaliased physical index for `group`.
    ///
    /// # Arguments
    ///
    /// * `group` - Logical index group name
    /// * `configuration` - Settings and mappings for the new index
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The real (versioned) name of the created index
    /// * `Err(SearchError::NoSuchIndex)` - If the group is unknown
    async fn create_index(&self, group: &str, configuration: &Value)
        -> Result<String, SearchError>;

    /// Real name of the index currently aliased by `group`.
    ///
    /// Fails if the alias is missing or points at more than one index.
    async fn current_index(&self, group: &str) -> Result<String, SearchError>;

    /// Atomically repoint `group` from `from` to `to`.
    ///
    /// Readers never observe the alias pointing at both or neither index.
    async fn switch_alias(&self, group: &str, from: &str, to: &str) -> Result<(), SearchError>;
}
