//! Result types for search engine write operations.

/// One document rejected by a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    pub id: String,
    /// HTTP status the engine reported for this item.
    pub status: u16,
    pub reason: String,
}

impl BulkItemFailure {
    pub fn new(id: impl Into<String>, status: u16, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Whether the engine rejected this item for load or availability reasons.
    pub fn is_transient(&self) -> bool {
        matches!(self.status, 429 | 502 | 503 | 504)
    }
}

/// Outcome of one versioned bulk write.
///
/// Version conflicts are counted separately from failures: a conflict means
/// the destination already holds the same or a newer version of the
/// document, which is the expected outcome when two passes overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkIndexSummary {
    /// Number of items in the request.
    pub total: usize,
    /// Documents written.
    pub indexed: usize,
    /// Documents skipped because the destination version was not older.
    pub version_conflicts: usize,
    /// Documents that failed.
    pub failed: Vec<BulkItemFailure>,
}

impl BulkIndexSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// True when there are failures and every one of them is transient.
    pub fn only_transient_failures(&self) -> bool {
        !self.failed.is_empty() && self.failed.iter().all(BulkItemFailure::is_transient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification_uses_status() {
        assert!(BulkItemFailure::new("/a", 429, "es_rejected_execution_exception").is_transient());
        assert!(BulkItemFailure::new("/a", 503, "unavailable").is_transient());
        assert!(!BulkItemFailure::new("/news/503-jobs", 400, "mapper_parsing_exception").is_transient());
    }

    #[test]
    fn test_mixed_failures_are_not_transient() {
        let summary = BulkIndexSummary {
            total: 2,
            failed: vec![
                BulkItemFailure::new("/a", 429, "rejected"),
                BulkItemFailure::new("/b", 400, "bad field"),
            ],
            ..Default::default()
        };
        assert!(!summary.only_transient_failures());
        assert!(!BulkIndexSummary::default().only_transient_failures());
    }
}
