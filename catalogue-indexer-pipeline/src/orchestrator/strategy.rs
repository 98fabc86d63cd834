//! Query selection for each kind of update run.

use serde_json::Value;

use catalogue_indexer_repository::opensearch::queries::{
    build_match_all_query, build_terms_query,
};

/// Field holding a document's content format.
pub const FORMAT_FIELD: &str = "format";

/// Decides which documents an update run exports.
///
/// Variants differ only in their query; batching and dispatch are shared.
pub trait UpdateStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Search body selecting the documents to export.
    fn search_body(&self) -> Value;
}

/// Re-export every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullResync;

impl UpdateStrategy for FullResync {
    fn name(&self) -> &str {
        "full_resync"
    }

    fn search_body(&self) -> Value {
        build_match_all_query()
    }
}

/// Refresh popularity data.
///
/// Unless `process_all` is set, only documents in formats handled by the
/// batch pipeline are exported; the rest are kept current by the
/// incremental sync path.
#[derive(Debug, Clone, Default)]
pub struct PopularityRefresh {
    pub process_all: bool,
    pub migrated_formats: Vec<String>,
}

impl PopularityRefresh {
    pub fn new(process_all: bool, migrated_formats: Vec<String>) -> Self {
        Self {
            process_all,
            migrated_formats,
        }
    }
}

impl UpdateStrategy for PopularityRefresh {
    fn name(&self) -> &str {
        "popularity_refresh"
    }

    fn search_body(&self) -> Value {
        if self.process_all {
            build_match_all_query()
        } else {
            build_terms_query(FORMAT_FIELD, &self.migrated_formats)
        }
    }
}
