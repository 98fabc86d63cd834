//! Index creation body for a content index group.
//!
//! Combines the merged field definitions with the compiled synonym sets into
//! the settings and mappings sent when a new physical index is created.

use serde_json::{json, Map, Value};

use crate::config::SchemaConfig;
use crate::errors::SchemaError;
use crate::merger::CombinedSchema;
use crate::synonyms::{compile_synonyms, CompiledSynonyms};

/// Name of the index-time synonym token filter.
pub const INDEX_SYNONYM_FILTER: &str = "index_synonym";

/// Name of the search-time synonym token filter.
pub const SEARCH_SYNONYM_FILTER: &str = "search_synonym";

const INDEX_ANALYZER: &str = "with_index_synonyms";
const SEARCH_ANALYZER: &str = "with_search_synonyms";

/// Shard layout for newly created indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSettings {
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            number_of_shards: 3,
            number_of_replicas: 1,
        }
    }
}

/// A fully validated schema for one index group.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    pub combined: CombinedSchema,
    pub synonyms: CompiledSynonyms,
    pub settings: IndexSettings,
}

impl IndexSchema {
    /// Merge the configured document types, compile synonyms, and check that
    /// every field type has a known mapping.
    pub fn build(config: &SchemaConfig) -> Result<Self, SchemaError> {
        let combined = CombinedSchema::merge(&config.document_types)?;
        let synonyms = compile_synonyms(&config.synonyms)?;

        for field in combined.field_definitions().values() {
            if field_mapping(&field.field_type).is_none() {
                return Err(SchemaError::unknown_field_type(
                    &field.name,
                    &field.field_type,
                ));
            }
        }

        Ok(Self {
            combined,
            synonyms,
            settings: IndexSettings::default(),
        })
    }

    pub fn with_settings(mut self, settings: IndexSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Settings and mappings for the index creation request.
    pub fn index_configuration(&self) -> Value {
        let mut properties = Map::new();
        for (name, field) in self.combined.field_definitions() {
            if let Some(mapping) = field_mapping(&field.field_type) {
                properties.insert(name.clone(), mapping);
            }
        }

        json!({
            "settings": {
                "number_of_shards": self.settings.number_of_shards,
                "number_of_replicas": self.settings.number_of_replicas,
                "analysis": {
                    "filter": {
                        INDEX_SYNONYM_FILTER: self.synonyms.index.filter_config(),
                        SEARCH_SYNONYM_FILTER: self.synonyms.search.filter_config(),
                    },
                    "analyzer": {
                        INDEX_ANALYZER: {
                            "type": "custom",
                            "tokenizer": "standard",
                            "filter": ["lowercase", INDEX_SYNONYM_FILTER, "porter_stem"]
                        },
                        SEARCH_ANALYZER: {
                            "type": "custom",
                            "tokenizer": "standard",
                            "filter": ["lowercase", SEARCH_SYNONYM_FILTER, "porter_stem"]
                        }
                    }
                }
            },
            "mappings": {
                "dynamic": "strict",
                "properties": properties
            }
        })
    }
}

/// Mapping for a field type identifier, or `None` if the identifier is
/// unknown.
pub fn field_mapping(field_type: &str) -> Option<Value> {
    let mapping = match field_type {
        "identifier" | "identifiers" => json!({ "type": "keyword" }),
        "text" => json!({ "type": "text" }),
        "searchable_text" => json!({
            "type": "text",
            "analyzer": INDEX_ANALYZER,
            "search_analyzer": SEARCH_ANALYZER
        }),
        "searchable_sortable_text" => json!({
            "type": "text",
            "analyzer": INDEX_ANALYZER,
            "search_analyzer": SEARCH_ANALYZER,
            "fields": {
                "sort": { "type": "keyword", "ignore_above": 256 }
            }
        }),
        "date" => json!({ "type": "date" }),
        "boolean" => json!({ "type": "boolean" }),
        "integer" | "long" => json!({ "type": "long" }),
        "float" => json!({ "type": "float" }),
        "opaque_object" => json!({ "type": "object", "enabled": false }),
        _ => return None,
    };
    Some(mapping)
}
