//! Error types for schema conversion

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConvertError>;

/// A schema description that could not be turned into JSON Schema.
///
/// Every variant carries the path of the offending node, written as
/// `$`, `$.shape.name`, `$.options[1]` and so on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConvertError {
    #[error("{path}: expected a schema description, found {found}")]
    NotASchema { path: String, found: &'static str },

    #[error("{path}: schema description has no \"type\"")]
    MissingType { path: String },

    #[error("{path}: unknown schema type \"{ty}\"")]
    UnknownType { path: String, ty: String },

    #[error("{path}: invalid \"{field}\": {reason}")]
    InvalidField {
        path: String,
        field: String,
        reason: String,
    },
}

impl ConvertError {
    pub fn invalid_field(
        path: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConvertError::InvalidField {
            path: path.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Path of the node the error refers to.
    pub fn path(&self) -> &str {
        match self {
            ConvertError::NotASchema { path, .. }
            | ConvertError::MissingType { path }
            | ConvertError::UnknownType { path, .. }
            | ConvertError::InvalidField { path, .. } => path,
        }
    }
}
