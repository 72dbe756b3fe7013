//! Catalog transport.
//!
//! [`CatalogTransport`] is the seam between the catalog logic and the
//! network. The search cursor and the manifest navigator only ever talk to
//! this trait; [`ODataTransport`] implements it over any [`HttpClient`],
//! with [`ReqwestClient`] as the production client.
//!
//! ```ignore
//! use sentinel_catalog::config::CatalogConfig;
//! use sentinel_catalog::transport::ODataTransport;
//!
//! let transport = ODataTransport::from_config(&CatalogConfig::default())?;
//! ```

mod error;
mod http;
mod odata;

use std::sync::Arc;

use crate::document::Document;

pub use error::TransportError;
pub use http::{HttpClient, ReqwestClient};
pub use odata::ODataTransport;

#[cfg(test)]
pub use http::tests::MockHttpClient;
#[cfg(test)]
pub use tests::MockTransport;

/// Requests against a remote catalog.
///
/// All methods block until a response or failure. Non-success statuses,
/// timeouts and unparseable bodies are reported as [`TransportError`].
pub trait CatalogTransport {
    /// Runs a search. `query` is the rendered filter string, sent verbatim.
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Document, TransportError>;

    /// Fetches a next-page link exactly as returned by a previous response.
    fn follow(&self, link: &str) -> Result<Document, TransportError>;

    /// Fetches and parses a resource such as a manifest.
    fn fetch(&self, resource_path: &str) -> Result<Document, TransportError>;

    /// Fetches a resource as raw bytes, e.g. a band image.
    fn fetch_bytes(&self, resource_path: &str) -> Result<Vec<u8>, TransportError>;
}

impl<T: CatalogTransport + ?Sized> CatalogTransport for &T {
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Document, TransportError> {
        (**self).search(query, offset, page_size)
    }

    fn follow(&self, link: &str) -> Result<Document, TransportError> {
        (**self).follow(link)
    }

    fn fetch(&self, resource_path: &str) -> Result<Document, TransportError> {
        (**self).fetch(resource_path)
    }

    fn fetch_bytes(&self, resource_path: &str) -> Result<Vec<u8>, TransportError> {
        (**self).fetch_bytes(resource_path)
    }
}

impl<T: CatalogTransport + ?Sized> CatalogTransport for Arc<T> {
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Document, TransportError> {
        (**self).search(query, offset, page_size)
    }

    fn follow(&self, link: &str) -> Result<Document, TransportError> {
        (**self).follow(link)
    }

    fn fetch(&self, resource_path: &str) -> Result<Document, TransportError> {
        (**self).fetch(resource_path)
    }

    fn fetch_bytes(&self, resource_path: &str) -> Result<Vec<u8>, TransportError> {
        (**self).fetch_bytes(resource_path)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// One recorded transport call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Search { query: String, offset: usize, page_size: usize },
        Follow(String),
        Fetch(String),
        FetchBytes(String),
    }

    /// Scripted transport for unit tests.
    ///
    /// Search responses are keyed by offset, links and resource paths by
    /// their literal string. Unscripted requests fail with HTTP 404.
    #[derive(Default)]
    pub struct MockTransport {
        searches: HashMap<usize, Result<String, TransportError>>,
        links: HashMap<String, Result<String, TransportError>>,
        resources: HashMap<String, Result<Vec<u8>, TransportError>>,
        calls: Mutex<Vec<Call>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_search_page(mut self, offset: usize, xml: impl Into<String>) -> Self {
            self.searches.insert(offset, Ok(xml.into()));
            self
        }

        pub fn with_search_error(mut self, offset: usize, error: TransportError) -> Self {
            self.searches.insert(offset, Err(error));
            self
        }

        pub fn with_link(mut self, link: &str, xml: impl Into<String>) -> Self {
            self.links.insert(link.to_string(), Ok(xml.into()));
            self
        }

        pub fn with_link_error(mut self, link: &str, error: TransportError) -> Self {
            self.links.insert(link.to_string(), Err(error));
            self
        }

        pub fn with_resource(mut self, path: &str, body: impl Into<Vec<u8>>) -> Self {
            self.resources.insert(path.to_string(), Ok(body.into()));
            self
        }

        pub fn with_resource_error(mut self, path: &str, error: TransportError) -> Self {
            self.resources.insert(path.to_string(), Err(error));
            self
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }

        fn not_found(url: &str) -> TransportError {
            TransportError::Status {
                url: url.to_string(),
                status: 404,
            }
        }

        fn parse(url: &str, xml: &[u8]) -> Result<Document, TransportError> {
            Document::parse(xml).map_err(|source| TransportError::Malformed {
                url: url.to_string(),
                source,
            })
        }
    }

    impl CatalogTransport for MockTransport {
        fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Document, TransportError> {
            self.record(Call::Search {
                query: query.to_string(),
                offset,
                page_size,
            });
            let url = format!("search?start={}", offset);
            match self.searches.get(&offset) {
                Some(Ok(xml)) => Self::parse(&url, xml.as_bytes()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(Self::not_found(&url)),
            }
        }

        fn follow(&self, link: &str) -> Result<Document, TransportError> {
            self.record(Call::Follow(link.to_string()));
            match self.links.get(link) {
                Some(Ok(xml)) => Self::parse(link, xml.as_bytes()),
                Some(Err(e)) => Err(e.clone()),
                None => Err(Self::not_found(link)),
            }
        }

        fn fetch(&self, resource_path: &str) -> Result<Document, TransportError> {
            self.record(Call::Fetch(resource_path.to_string()));
            match self.resources.get(resource_path) {
                Some(Ok(body)) => Self::parse(resource_path, body),
                Some(Err(e)) => Err(e.clone()),
                None => Err(Self::not_found(resource_path)),
            }
        }

        fn fetch_bytes(&self, resource_path: &str) -> Result<Vec<u8>, TransportError> {
            self.record(Call::FetchBytes(resource_path.to_string()));
            match self.resources.get(resource_path) {
                Some(result) => result.clone(),
                None => Err(Self::not_found(resource_path)),
            }
        }
    }

    #[test]
    fn test_blanket_impls_delegate() {
        let mock = Arc::new(MockTransport::new().with_resource("/a", "<a/>"));

        let by_ref: &MockTransport = &mock;
        assert!(by_ref.fetch("/a").is_ok());
        assert!(CatalogTransport::fetch(&mock, "/a").is_ok());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_unscripted_request_is_not_found() {
        let mock = MockTransport::new();
        let result = mock.follow("https://catalog.example/next");
        assert!(matches!(result, Err(TransportError::Status { status: 404, .. })));
        assert_eq!(
            mock.calls(),
            vec![Call::Follow("https://catalog.example/next".to_string())]
        );
    }
}
