//! Error types for document parsing and traversal.

use thiserror::Error;

/// Errors raised while parsing or querying a structured document.
///
/// All variants carry owned strings so the error can be cloned and re-raised
/// by callers that remember a failure (see [`crate::search::SearchCursor`]).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    /// The bytes are not well-formed XML.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// A path expression could not be parsed or uses an unknown prefix.
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A required element was not found.
    #[error("Missing element at '{path}'")]
    MissingElement { path: String },

    /// A required attribute was not found on the matched element.
    #[error("Missing attribute '{attribute}' at '{path}'")]
    MissingAttribute { path: String, attribute: String },

    /// An element's text could not be converted to the requested type.
    #[error("Invalid value '{value}' at '{path}': {reason}")]
    InvalidValue {
        path: String,
        value: String,
        reason: String,
    },
}

impl DocumentError {
    pub(crate) fn xml(message: impl Into<String>) -> Self {
        DocumentError::Xml(message.into())
    }

    pub(crate) fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        DocumentError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(e: quick_xml::Error) -> Self {
        DocumentError::Xml(e.to_string())
    }
}
