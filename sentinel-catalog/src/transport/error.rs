//! Transport error types.

use thiserror::Error;

use crate::document::DocumentError;

/// Errors surfaced by a catalog transport.
///
/// Timeouts and connection failures from the underlying HTTP client are
/// reported as [`TransportError::Http`]; retry policy, if any, belongs to the
/// client, not to the callers of the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The catalog answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// A request URL could not be built.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The response body is not a well-formed document.
    #[error("Malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: DocumentError,
    },
}
