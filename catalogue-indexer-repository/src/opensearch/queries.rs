//! OpenSearch request body builders.
//!
//! This module provides functions to build the query and action bodies used
//! by re-indexing: export queries, bulk actions, alias switches and new
//! index names.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use catalogue_indexer_shared::DocumentIdentifier;

/// Query matching every document.
///
/// Sorted by `_doc`, the cheapest order for scrolling.
pub fn build_match_all_query() -> Value {
    json!({
        "query": { "match_all": {} },
        "sort": ["_doc"]
    })
}

/// Query matching documents whose `field` holds any of `values`.
pub fn build_terms_query(field: &str, values: &[String]) -> Value {
    json!({
        "query": {
            "terms": { field: values }
        },
        "sort": ["_doc"]
    })
}

/// Body of a scroll continuation request.
pub fn build_scroll_continuation(scroll_id: &str, ttl: &str) -> Value {
    json!({
        "scroll": ttl,
        "scroll_id": scroll_id
    })
}

/// Action line of a bulk index request.
///
/// Documents with a known version are written with external versioning so a
/// stale copy never replaces a newer one.
pub fn build_bulk_index_action(index: &str, identifier: &DocumentIdentifier) -> Value {
    match identifier.version {
        Some(version) => json!({
            "index": {
                "_index": index,
                "_id": identifier.id,
                "version": version,
                "version_type": "external"
            }
        }),
        None => json!({
            "index": {
                "_index": index,
                "_id": identifier.id
            }
        }),
    }
}

/// Single `_aliases` request moving `alias` from one index to another.
///
/// Both actions are applied atomically by the engine.
pub fn build_alias_switch(alias: &str, from: &str, to: &str) -> Value {
    json!({
        "actions": [
            { "remove": { "index": from, "alias": alias } },
            { "add": { "index": to, "alias": alias } }
        ]
    })
}

/// Real name for a new physical index in `group`.
///
/// Index names must be lowercase, hence the `t` separator.
pub fn build_index_name(group: &str, now: DateTime<Utc>, id: Uuid) -> String {
    format!("{}-{}-{}", group, now.format("%Y-%m-%dt%H-%M-%S"), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_match_all_query() {
        let query = build_match_all_query();

        assert!(query["query"]["match_all"].is_object());
        assert_eq!(query["sort"][0], "_doc");
    }

    #[test]
    fn test_build_terms_query() {
        let formats = vec!["answer".to_string(), "guide".to_string()];
        let query = build_terms_query("format", &formats);

        let terms = query["query"]["terms"]["format"].as_array().unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0], "answer");
    }

    #[test]
    fn test_build_bulk_index_action_with_version() {
        let identifier = DocumentIdentifier {
            id: "/cheese".to_string(),
            doc_type: Some("edition".to_string()),
            version: Some(15),
        };

        let action = build_bulk_index_action("govuk-new", &identifier);

        assert_eq!(action["index"]["_index"], "govuk-new");
        assert_eq!(action["index"]["_id"], "/cheese");
        assert_eq!(action["index"]["version"], 15);
        assert_eq!(action["index"]["version_type"], "external");
    }

    #[test]
    fn test_build_bulk_index_action_without_version() {
        let identifier = DocumentIdentifier {
            id: "/cheese".to_string(),
            doc_type: None,
            version: None,
        };

        let action = build_bulk_index_action("govuk-new", &identifier);

        assert!(action["index"].get("version").is_none());
        assert!(action["index"].get("version_type").is_none());
    }

    #[test]
    fn test_build_alias_switch() {
        let body = build_alias_switch("govuk", "govuk-old", "govuk-new");

        let actions = body["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["remove"]["index"], "govuk-old");
        assert_eq!(actions[1]["add"]["index"], "govuk-new");
        assert_eq!(actions[1]["add"]["alias"], "govuk");
    }

    #[test]
    fn test_build_index_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();

        assert_eq!(
            build_index_name("govuk", now, id),
            "govuk-2024-03-05t14-07-09-550e8400-e29b-41d4-a716-446655440000"
        );
    }
}
