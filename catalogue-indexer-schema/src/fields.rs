//! Field definitions declared by document-type schemas.

use serde::{Deserialize, Serialize};

/// A label/value pair offered by filter UIs for a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpansionEntry {
    pub label: String,
    pub value: String,
}

impl ExpansionEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A single field as declared by one document type, or as merged across
/// several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Type identifier, e.g. `identifier`, `searchable_text`, `date`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Whether searches may filter on this field.
    #[serde(default)]
    pub filterable: bool,
    #[serde(default, rename = "expanded_search_result_fields")]
    pub expansions: Vec<ExpansionEntry>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            filterable: false,
            expansions: Vec::new(),
        }
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn with_expansions(mut self, expansions: Vec<ExpansionEntry>) -> Self {
        self.expansions = expansions;
        self
    }
}

/// The schema fragment contributed by one document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTypeSchema {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl DocumentTypeSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}
