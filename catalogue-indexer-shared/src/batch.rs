//! Units of background work.

use serde::{Deserialize, Serialize};

use crate::document::ExportedRecord;

/// A bounded group of records dispatched together to a background worker.
///
/// Batch boundaries only control throughput; nothing downstream relies on the
/// order of records across batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub records: Vec<ExportedRecord>,
    /// Physical index the worker writes into.
    pub destination_index: String,
}

impl Batch {
    pub fn new(records: Vec<ExportedRecord>, destination_index: impl Into<String>) -> Self {
        Self {
            records,
            destination_index: destination_index.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
