//! # Catalogue Indexer Schema
//!
//! Builds the configuration of a content index from per-document-type schema
//! fragments and synonym directives.
//!
//! - [`CombinedSchema`] merges field definitions across document types and
//!   derives the filter allow-list.
//! - [`compile_synonyms`] turns synonym directives into index-time and
//!   search-time synonym sets.
//! - [`IndexSchema`] ties both together and renders the index creation body.

pub mod config;
pub mod errors;
pub mod fields;
pub mod index_config;
pub mod merger;
pub mod synonyms;

pub use config::SchemaConfig;
pub use errors::SchemaError;
pub use fields::{DocumentTypeSchema, ExpansionEntry, FieldDefinition};
pub use index_config::{IndexSchema, IndexSettings};
pub use merger::CombinedSchema;
pub use synonyms::{compile_synonyms, CompiledSynonyms, SynonymDirective, SynonymScope, SynonymSet};
