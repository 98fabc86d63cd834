//! Merging of document-type schemas into one index schema.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::errors::SchemaError;
use crate::fields::{DocumentTypeSchema, FieldDefinition};

/// Field definitions and filter allow-list shared by every document type
/// stored in one index group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedSchema {
    field_definitions: BTreeMap<String, FieldDefinition>,
    allowed_filter_fields: BTreeSet<String>,
}

impl CombinedSchema {
    /// Merge the given document-type schemas.
    ///
    /// A field declared by several document types keeps its (identical) type
    /// and gets the union of all expansion entries, in first-seen order. It is
    /// filterable if any document type declares it filterable.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::FieldTypeConflict`] if two declarations of the
    /// same field disagree on its type.
    pub fn merge(document_types: &[DocumentTypeSchema]) -> Result<Self, SchemaError> {
        let mut field_definitions: BTreeMap<String, FieldDefinition> = BTreeMap::new();

        for document_type in document_types {
            for field in &document_type.fields {
                match field_definitions.entry(field.name.clone()) {
                    Entry::Vacant(slot) => {
                        let mut merged = field.clone();
                        merged.expansions.clear();
                        extend_unique(&mut merged, field);
                        slot.insert(merged);
                    }
                    Entry::Occupied(mut slot) => {
                        let existing = slot.get_mut();
                        if existing.field_type != field.field_type {
                            return Err(SchemaError::field_type_conflict(
                                &field.name,
                                &existing.field_type,
                                &field.field_type,
                            ));
                        }
                        existing.filterable |= field.filterable;
                        extend_unique(existing, field);
                    }
                }
            }
        }

        let allowed_filter_fields = field_definitions
            .values()
            .filter(|f| f.filterable)
            .map(|f| f.name.clone())
            .collect();

        debug!(
            document_types = document_types.len(),
            fields = field_definitions.len(),
            "Merged document type schemas"
        );

        Ok(Self {
            field_definitions,
            allowed_filter_fields,
        })
    }

    pub fn field_definitions(&self) -> &BTreeMap<String, FieldDefinition> {
        &self.field_definitions
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_definitions.get(name)
    }

    pub fn allowed_filter_fields(&self) -> &BTreeSet<String> {
        &self.allowed_filter_fields
    }

    pub fn is_filterable(&self, name: &str) -> bool {
        self.allowed_filter_fields.contains(name)
    }
}

fn extend_unique(target: &mut FieldDefinition, source: &FieldDefinition) {
    for entry in &source.expansions {
        if !target.expansions.contains(entry) {
            target.expansions.push(entry.clone());
        }
    }
}
