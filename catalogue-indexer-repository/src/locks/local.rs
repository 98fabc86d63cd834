//! In-process index group lock.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::{IndexLock, LockToken};

/// Index group locks held in memory.
///
/// Only excludes migrations running in the same process. Use
/// [`crate::OpenSearchLock`] when several processes may migrate the same
/// group.
#[derive(Debug, Default)]
pub struct LocalLockRegistry {
    held: Mutex<HashMap<String, String>>,
}

impl LocalLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_locked(&self, group: &str) -> bool {
        self.held
            .lock()
            .map(|held| held.contains_key(group))
            .unwrap_or(false)
    }
}

#[async_trait]
impl IndexLock for LocalLockRegistry {
    async fn try_acquire(&self, group: &str) -> Result<LockToken, SearchError> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| SearchError::lock(e.to_string()))?;

        if held.contains_key(group) {
            return Err(SearchError::locked(group));
        }

        let owner = Uuid::new_v4().to_string();
        held.insert(group.to_string(), owner.clone());

        debug!(group = %group, owner = %owner, "Acquired index group lock");
        Ok(LockToken::new(group, owner))
    }

    async fn release(&self, token: LockToken) -> Result<(), SearchError> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| SearchError::lock(e.to_string()))?;

        match held.get(&token.group) {
            Some(owner) if *owner == token.owner => {
                held.remove(&token.group);
                debug!(group = %token.group, "Released index group lock");
                Ok(())
            }
            Some(_) => Err(SearchError::lock(format!(
                "lock on '{}' is held by another owner",
                token.group
            ))),
            None => Err(SearchError::lock(format!(
                "lock on '{}' is not held",
                token.group
            ))),
        }
    }
}
