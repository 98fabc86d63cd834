//! Wire shapes for cursor-based export.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long the engine should hold a scroll cursor open.
///
/// Older engines measure the scroll timeout from the start of the scan rather
/// than from the last page fetch, so this is set well above the expected time
/// between two page requests.
pub const DEFAULT_SCROLL_TTL: &str = "60m";

/// A single hit as returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type", default)]
    pub doc_type: Option<String>,
    #[serde(rename = "_version", default)]
    pub version: Option<i64>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

/// One page of a scroll.
///
/// `scroll_id` is optional here so that a missing handle can be reported as a
/// cursor error by the caller instead of failing deserialisation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrollPage {
    pub scroll_id: Option<String>,
    /// Total number of hits the engine declared for the query.
    pub total: u64,
    pub hits: Vec<RawHit>,
}

impl ScrollPage {
    pub fn new(scroll_id: Option<String>, total: u64, hits: Vec<RawHit>) -> Self {
        Self {
            scroll_id,
            total,
            hits,
        }
    }

    /// Parse a search or scroll response body.
    ///
    /// Accepts both the bare-number `hits.total` of older engines and the
    /// `{ "value": n, "relation": "eq" }` form.
    pub fn from_response(body: &Value) -> Result<Self, serde_json::Error> {
        let scroll_id = body
            .get("_scroll_id")
            .and_then(|s| s.as_str())
            .map(|s| s.to_string());

        let total = match body.pointer("/hits/total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(obj @ Value::Object(_)) => obj.get("value").and_then(|v| v.as_u64()).unwrap_or(0),
            _ => 0,
        };

        let hits = match body.pointer("/hits/hits") {
            Some(hits) => Vec::<RawHit>::deserialize(hits)?,
            None => Vec::new(),
        };

        Ok(Self {
            scroll_id,
            total,
            hits,
        })
    }
}

/// Request that opens a scroll cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollRequest {
    /// One or more source index names.
    pub index_names: Vec<String>,
    /// Query body sent with the opening request.
    pub body: Value,
    /// Page size. Interpreted per shard by the engine, so a page may hold a
    /// multiple of this many hits.
    pub page_size: usize,
    /// Cursor time-to-live, in engine duration syntax (e.g. `60m`).
    pub ttl: String,
}

impl ScrollRequest {
    pub fn new(index_names: Vec<String>, body: Value, page_size: usize) -> Self {
        Self {
            index_names,
            body,
            page_size,
            ttl: DEFAULT_SCROLL_TTL.to_string(),
        }
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }
}
