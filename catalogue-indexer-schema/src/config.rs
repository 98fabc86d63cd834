//! Loading of schema configuration from disk.
//!
//! Expected layout:
//!
//! ```text
//! <dir>/document_types/*.json   one DocumentTypeSchema per file
//! <dir>/synonyms.json           list of synonym directives (optional)
//! ```

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::info;

use crate::errors::SchemaError;
use crate::fields::DocumentTypeSchema;
use crate::synonyms::SynonymDirective;

const DOCUMENT_TYPES_DIR: &str = "document_types";
const SYNONYMS_FILE: &str = "synonyms.json";

/// Raw schema configuration, as read from its source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaConfig {
    pub document_types: Vec<DocumentTypeSchema>,
    pub synonyms: Vec<SynonymDirective>,
}

impl SchemaConfig {
    pub fn new(document_types: Vec<DocumentTypeSchema>, synonyms: Vec<SynonymDirective>) -> Self {
        Self {
            document_types,
            synonyms,
        }
    }

    /// Read the configuration from `dir`.
    ///
    /// Document type files are read in file name order so that expansion
    /// entries merge deterministically.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let types_dir = dir.join(DOCUMENT_TYPES_DIR);

        let entries = fs::read_dir(&types_dir).map_err(|source| SchemaError::Io {
            path: types_dir.display().to_string(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| SchemaError::Io {
                path: types_dir.display().to_string(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();

        let document_types = paths
            .iter()
            .map(|path| read_json::<DocumentTypeSchema>(path))
            .collect::<Result<Vec<_>, _>>()?;

        let synonyms_path = dir.join(SYNONYMS_FILE);
        let synonyms = if synonyms_path.exists() {
            read_json::<Vec<SynonymDirective>>(&synonyms_path)?
        } else {
            Vec::new()
        };

        info!(
            dir = %dir.display(),
            document_types = document_types.len(),
            synonyms = synonyms.len(),
            "Loaded schema configuration"
        );

        Ok(Self {
            document_types,
            synonyms,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SchemaError> {
    let contents = fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents)
        .map_err(|e| SchemaError::parse(path.display().to_string(), e.to_string()))
}
