//! Exported document records.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::scroll::RawHit;

/// Identity of a document as stored in the engine.
///
/// The version is used for external versioned writes so that a stale copy of
/// a document never overwrites a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentIdentifier {
    #[serde(rename = "_id")]
    pub id: String,
    /// Mapping type. Absent on engines without mapping types.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// One hit pulled out of a source index, ready to be re-indexed elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRecord {
    pub identifier: DocumentIdentifier,
    pub document: Value,
}

impl ExportedRecord {
    pub fn new(identifier: DocumentIdentifier, document: Value) -> Self {
        Self {
            identifier,
            document,
        }
    }
}

impl From<RawHit> for ExportedRecord {
    fn from(hit: RawHit) -> Self {
        Self {
            identifier: DocumentIdentifier {
                id: hit.id,
                doc_type: hit.doc_type,
                version: hit.version,
            },
            document: hit.source,
        }
    }
}
