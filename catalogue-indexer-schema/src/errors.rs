//! Schema configuration errors.
//!
//! All of these are fatal at load time: no partially merged schema is ever
//! returned alongside one.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    /// The same field is declared with different types by two document types.
    #[error("Field '{field}' declared as '{existing}' and '{conflicting}'")]
    FieldTypeConflict {
        field: String,
        existing: String,
        conflicting: String,
    },

    /// A field uses a type identifier with no known index mapping.
    #[error("Unknown field type '{field_type}' for field '{field}'")]
    UnknownFieldType { field: String, field_type: String },

    /// A synonym directive is malformed or reuses a term.
    #[error("Invalid synonym config: {0}")]
    InvalidSynonymConfig(String),

    /// Failed to read a configuration file.
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse a configuration file.
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },
}

impl SchemaError {
    pub fn field_type_conflict(
        field: impl Into<String>,
        existing: impl Into<String>,
        conflicting: impl Into<String>,
    ) -> Self {
        Self::FieldTypeConflict {
            field: field.into(),
            existing: existing.into(),
            conflicting: conflicting.into(),
        }
    }

    pub fn unknown_field_type(field: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self::UnknownFieldType {
            field: field.into(),
            field_type: field_type.into(),
        }
    }

    pub fn invalid_synonyms(msg: impl Into<String>) -> Self {
        Self::InvalidSynonymConfig(msg.into())
    }

    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error comes from the configuration content itself rather
    /// than from reading it.
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Io { .. })
    }
}
