//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchEngineClient`
//! and `IndexGroupProvider` using the OpenSearch Rust client.

use async_trait::async_trait;
use chrono::Utc;
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::response::Response,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesGetAliasParts},
    BulkParts, OpenSearch, ScrollParts, SearchParts,
};
use serde_json::Value;
use tracing::{debug, error, info, instrument};
use url::Url;
use uuid::Uuid;

use crate::errors::SearchError;
use crate::interfaces::{IndexGroupProvider, SearchEngineClient};
use crate::opensearch::queries;
use crate::types::{BulkIndexSummary, BulkItemFailure};
use catalogue_indexer_shared::{ExportedRecord, ScrollPage, ScrollRequest};

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// let client = OpenSearchClient::new("http://localhost:9200", vec!["govuk".to_string()]).await?;
///
/// let current = client.current_index("govuk").await?;
/// let page = client
///     .open_scroll(&ScrollRequest::new(vec![current], queries::build_match_all_query(), 50))
///     .await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_groups: Vec<String>,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_groups` - Names of the index groups this client may manage
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchError)` - If connection setup fails
    pub async fn new(url: &str, index_groups: Vec<String>) -> Result<Self, SearchError> {
        let parsed_url = Url::parse(url).map_err(|e| SearchError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index_groups = ?index_groups,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_groups,
        })
    }

    pub(crate) fn inner(&self) -> &OpenSearch {
        &self.client
    }

    fn ensure_known_group(&self, group: &str) -> Result<(), SearchError> {
        if self.index_groups.iter().any(|g| g == group) {
            Ok(())
        } else {
            Err(SearchError::no_such_index(group))
        }
    }

    /// Read a scroll response, treating 404 as an expired cursor.
    async fn read_scroll_page(response: Response) -> Result<ScrollPage, SearchError> {
        let status = response.status_code();
        if status.as_u16() == 404 {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::cursor_missing(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Scroll request failed");
            return Err(SearchError::query(format!(
                "Scroll failed with status {}: {}",
                status, body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        ScrollPage::from_response(&body).map_err(|e| SearchError::parse(e.to_string()))
    }

    /// Summarise a bulk response body.
    fn parse_bulk_response(body: &Value, total: usize) -> BulkIndexSummary {
        let mut summary = BulkIndexSummary {
            total,
            ..Default::default()
        };

        let items = body
            .get("items")
            .and_then(|i| i.as_array())
            .map(|a| a.as_slice())
            .unwrap_or_default();

        for item in items {
            let Some(result) = item.get("index") else {
                continue;
            };
            let status = result
                .get("status")
                .and_then(|s| s.as_u64())
                .and_then(|s| u16::try_from(s).ok())
                .unwrap_or(0);
            let id = result
                .get("_id")
                .and_then(|i| i.as_str())
                .unwrap_or_default()
                .to_string();

            match status {
                200..=299 => summary.indexed += 1,
                409 => summary.version_conflicts += 1,
                _ => {
                    let reason = result
                        .pointer("/error/reason")
                        .and_then(|r| r.as_str())
                        .unwrap_or("unknown error");
                    summary.failed.push(BulkItemFailure::new(id, status, reason));
                }
            }
        }

        summary
    }
}

#[async_trait]
impl SearchEngineClient for OpenSearchClient {
    #[instrument(skip(self, request), fields(indices = ?request.index_names))]
    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError> {
        let indices: Vec<&str> = request.index_names.iter().map(String::as_str).collect();

        let response = self
            .client
            .search(SearchParts::Index(&indices))
            .scroll(&request.ttl)
            .size(request.page_size as i64)
            .version(true)
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(SearchError::no_such_index(request.index_names.join(",")));
        }

        let page = Self::read_scroll_page(response).await?;
        debug!(total = page.total, hits = page.hits.len(), "Opened scroll cursor");
        Ok(page)
    }

    async fn continue_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage, SearchError> {
        let response = self
            .client
            .scroll(ScrollParts::None)
            .body(queries::build_scroll_continuation(scroll_id, ttl))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        Self::read_scroll_page(response).await
    }

    async fn bulk_index_versioned(
        &self,
        index: &str,
        records: &[ExportedRecord],
    ) -> Result<BulkIndexSummary, SearchError> {
        if records.is_empty() {
            return Ok(BulkIndexSummary::default());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(records.len() * 2);
        for record in records {
            body.push(queries::build_bulk_index_action(index, &record.identifier).into());
            body.push(record.document.clone().into());
        }

        let response = self
            .client
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SearchError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let response_body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let summary = Self::parse_bulk_response(&response_body, records.len());
        debug!(
            index = %index,
            indexed = summary.indexed,
            version_conflicts = summary.version_conflicts,
            failed = summary.failed.len(),
            "Bulk write completed"
        );
        Ok(summary)
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let health: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;
        let status = health
            .get("status")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown");

        debug!(status = %status, "OpenSearch cluster status");
        Ok(status == "green" || status == "yellow")
    }
}

#[async_trait]
impl IndexGroupProvider for OpenSearchClient {
    #[instrument(skip(self, configuration))]
    async fn create_index(
        &self,
        group: &str,
        configuration: &Value,
    ) -> Result<String, SearchError> {
        self.ensure_known_group(group)?;

        let name = queries::build_index_name(group, Utc::now(), Uuid::new_v4());

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&name))
            .body(configuration.clone())
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index creation failed");
            return Err(SearchError::index_creation(format!(
                "Creating {} failed with status {}: {}",
                name, status, error_body
            )));
        }

        info!(group = %group, index = %name, "Created index");
        Ok(name)
    }

    async fn current_index(&self, group: &str) -> Result<String, SearchError> {
        self.ensure_known_group(group)?;

        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[group]))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Err(SearchError::no_such_index(group));
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchError::alias(format!(
                "Alias lookup for {} failed with status {}: {}",
                group, status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::parse(e.to_string()))?;

        let indices: Vec<&String> = body
            .as_object()
            .map(|o| o.keys().collect())
            .unwrap_or_default();

        match indices.as_slice() {
            [index] => Ok((*index).clone()),
            [] => Err(SearchError::no_such_index(group)),
            many => Err(SearchError::alias(format!(
                "Alias {} points at {} indices",
                group,
                many.len()
            ))),
        }
    }

    #[instrument(skip(self))]
    async fn switch_alias(&self, group: &str, from: &str, to: &str) -> Result<(), SearchError> {
        self.ensure_known_group(group)?;

        let response = self
            .client
            .indices()
            .update_aliases()
            .body(queries::build_alias_switch(group, from, to))
            .send()
            .await
            .map_err(|e| SearchError::connection(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Alias switch failed");
            return Err(SearchError::alias(format!(
                "Switching {} from {} to {} failed with status {}: {}",
                group, from, to, status, error_body
            )));
        }

        info!(group = %group, from = %from, to = %to, "Switched index group alias");
        Ok(())
    }
}
