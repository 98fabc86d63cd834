//! Index group lock backed by an OpenSearch document.
//!
//! Holding the lock for a group means a document with the group's name exists
//! in the lock index. Creation uses create-only semantics, so a second
//! acquisition gets a 409 and fails immediately.

use async_trait::async_trait;
use chrono::Utc;
use opensearch::{params::Refresh, CreateParts, DeleteParts, OpenSearch};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::{IndexLock, LockToken};
use crate::opensearch::OpenSearchClient;

/// Index holding one document per locked group.
pub const LOCK_INDEX: &str = "catalogue-indexer-locks";

/// Advisory lock shared by every process talking to the same cluster.
///
/// A process that dies while holding the lock leaves the document behind; it
/// has to be deleted by an operator.
pub struct OpenSearchLock {
    client: OpenSearch,
}

impl OpenSearchLock {
    pub fn new(client: &OpenSearchClient) -> Self {
        Self {
            client: client.inner().clone(),
        }
    }
}

#[async_trait]
impl IndexLock for OpenSearchLock {
    async fn try_acquire(&self, group: &str) -> Result<LockToken, SearchError> {
        let owner = Uuid::new_v4().to_string();

        let response = self
            .client
            .create(CreateParts::IndexId(LOCK_INDEX, group))
            .refresh(Refresh::True)
            .body(json!({
                "owner": owner,
                "acquired_at": Utc::now().to_rfc3339(),
            }))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 409 {
            debug!(group = %group, "Index group lock already held");
            return Err(SearchError::locked(group));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Lock acquisition failed");
            return Err(SearchError::lock(format!(
                "Acquiring lock on {} failed with status {}: {}",
                group, status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        info!(group = %group, owner = %owner, "Acquired index group lock");

        Ok(LockToken {
            group: group.to_string(),
            owner,
            seq_no: body.get("_seq_no").and_then(|v| v.as_i64()),
            primary_term: body.get("_primary_term").and_then(|v| v.as_i64()),
        })
    }

    async fn release(&self, token: LockToken) -> Result<(), SearchError> {
        let mut request = self
            .client
            .delete(DeleteParts::IndexId(LOCK_INDEX, &token.group))
            .refresh(Refresh::True);

        // Only delete the document this acquisition created.
        if let (Some(seq_no), Some(primary_term)) = (token.seq_no, token.primary_term) {
            request = request.if_seq_no(seq_no).if_primary_term(primary_term);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Lock release failed");
            return Err(SearchError::lock(format!(
                "Releasing lock on {} failed with status {}: {}",
                token.group, status, error_body
            )));
        }

        info!(group = %token.group, owner = %token.owner, "Released index group lock");
        Ok(())
    }
}
