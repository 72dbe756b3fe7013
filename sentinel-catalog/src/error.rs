//! Error types for catalog operations.

use thiserror::Error;

use crate::document::DocumentError;
use crate::search::ProcessingLevel;
use crate::transport::TransportError;

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Underlying reason for a search or fetch failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The transport failed to deliver a document.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A delivered document lacked an expected element or value.
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// The catalog's answers are inconsistent with each other.
    #[error("{0}")]
    Protocol(String),
}

/// Errors that can occur while searching the catalog, building tile
/// descriptors, or resolving resource paths.
///
/// Every variant carries the query, link or resource path involved so the
/// failure can be acted on without consulting logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// A filter set was rendered before a product type was configured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A filter value was rejected.
    #[error("Invalid filter '{name}': {reason}")]
    InvalidFilter { name: String, reason: String },

    /// Search initialization or a page refresh failed.
    #[error("Catalog search failed for query '{query}'{}: {cause}", describe_link(.link))]
    Search {
        query: String,
        link: Option<String>,
        #[source]
        cause: FailureCause,
    },

    /// A manifest or resource could not be fetched.
    #[error("Failed to fetch {resource}: {cause}")]
    Fetch {
        resource: String,
        #[source]
        cause: FailureCause,
    },

    /// Zero or several image files match a band request.
    #[error("Band '{band}' not found for {level}: {candidates} matching files")]
    BandNotFound {
        level: ProcessingLevel,
        band: String,
        candidates: usize,
    },

    /// Zero or several quality-indicator files match a request.
    #[error("Quality file '{code}' not found for {level}: {candidates} matching files")]
    QualityFileNotFound {
        level: ProcessingLevel,
        code: String,
        candidates: usize,
    },

    /// A manifest declares no tile metadata document.
    #[error("No tile metadata declared in {level} manifest {manifest}")]
    MetadataNotFound {
        level: ProcessingLevel,
        manifest: String,
    },

    /// A matched pair of catalog entries lacks a required field.
    #[error("Cannot build tile descriptor for '{key}': {source}")]
    Descriptor {
        key: String,
        #[source]
        source: DocumentError,
    },

    /// A resolution was requested before any descriptor was loaded.
    #[error("No tile descriptor loaded")]
    NotLoaded,
}

fn describe_link(link: &Option<String>) -> String {
    link.as_deref()
        .map(|l| format!(" (link {})", l))
        .unwrap_or_default()
}

impl CatalogError {
    pub(crate) fn search(query: &str, link: Option<&str>, cause: impl Into<FailureCause>) -> Self {
        CatalogError::Search {
            query: query.to_string(),
            link: link.map(str::to_string),
            cause: cause.into(),
        }
    }

    pub(crate) fn fetch(resource: impl Into<String>, cause: impl Into<FailureCause>) -> Self {
        CatalogError::Fetch {
            resource: resource.into(),
            cause: cause.into(),
        }
    }

    pub(crate) fn invalid_filter(name: &str, reason: impl Into<String>) -> Self {
        CatalogError::InvalidFilter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_error_display_with_link() {
        let err = CatalogError::search(
            "platformname:Sentinel-2",
            Some("https://catalog.example/search?start=10"),
            TransportError::Http("connection reset".to_string()),
        );
        let msg = err.to_string();
        assert!(msg.contains("platformname:Sentinel-2"));
        assert!(msg.contains("start=10"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_search_error_display_without_link() {
        let err = CatalogError::search("q", None, FailureCause::Protocol("short page".to_string()));
        assert_eq!(err.to_string(), "Catalog search failed for query 'q': short page");
    }

    #[test]
    fn test_band_not_found_display() {
        let err = CatalogError::BandNotFound {
            level: ProcessingLevel::Primary,
            band: "B13".to_string(),
            candidates: 0,
        };
        assert_eq!(
            err.to_string(),
            "Band 'B13' not found for primary level: 0 matching files"
        );
    }

    #[test]
    fn test_fetch_error_source_chain() {
        use std::error::Error;

        let err = CatalogError::fetch(
            "/Products('a')/Nodes('b')/Nodes('manifest.safe')/$value",
            TransportError::Status {
                url: "u".to_string(),
                status: 500,
            },
        );
        assert!(err.source().is_some());
        assert!(err.to_string().contains("manifest.safe"));
    }
}
