//! OData/OpenSearch transport over an [`HttpClient`].
//!
//! # URL Patterns
//!
//! - search: `{base}/search?start={offset}&rows={page_size}&q={query}`
//! - resource: `{base}{odata_path}{resource_path}`
//! - follow: the link exactly as the catalog returned it

use reqwest::Url;
use tracing::debug;

use crate::config::CatalogConfig;
use crate::document::Document;

use super::error::TransportError;
use super::http::{HttpClient, ReqwestClient};
use super::CatalogTransport;

/// Catalog transport for Copernicus-style OData hubs.
pub struct ODataTransport<C: HttpClient> {
    http_client: C,
    config: CatalogConfig,
}

impl ODataTransport<ReqwestClient> {
    /// Creates a transport backed by a reqwest client built from `config`.
    pub fn from_config(config: &CatalogConfig) -> Result<Self, TransportError> {
        Ok(Self::new(ReqwestClient::new(config)?, config))
    }
}

impl<C: HttpClient> ODataTransport<C> {
    /// Creates a transport using the given HTTP client.
    pub fn new(http_client: C, config: &CatalogConfig) -> Self {
        Self {
            http_client,
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Builds the search URL, percent-encoding the query.
    pub fn search_url(
        &self,
        query: &str,
        offset: usize,
        page_size: usize,
    ) -> Result<String, TransportError> {
        let base = self.config.search_url();
        Url::parse_with_params(
            &base,
            &[
                ("start", offset.to_string()),
                ("rows", page_size.to_string()),
                ("q", query.to_string()),
            ],
        )
        .map(|url| url.to_string())
        .map_err(|e| TransportError::InvalidUrl {
            url: base,
            reason: e.to_string(),
        })
    }

    /// Builds the URL of an OData resource path.
    pub fn resource_url(&self, resource_path: &str) -> String {
        self.config.odata_url(resource_path)
    }

    fn get_document(&self, url: &str) -> Result<Document, TransportError> {
        let body = self.http_client.get(url)?;
        debug!(url, bytes = body.len(), "Fetched catalog document");
        Document::parse(&body).map_err(|source| TransportError::Malformed {
            url: url.to_string(),
            source,
        })
    }
}

impl<C: HttpClient> CatalogTransport for ODataTransport<C> {
    fn search(&self, query: &str, offset: usize, page_size: usize) -> Result<Document, TransportError> {
        let url = self.search_url(query, offset, page_size)?;
        self.get_document(&url)
    }

    fn follow(&self, link: &str) -> Result<Document, TransportError> {
        self.get_document(link)
    }

    fn fetch(&self, resource_path: &str) -> Result<Document, TransportError> {
        self.get_document(&self.resource_url(resource_path))
    }

    fn fetch_bytes(&self, resource_path: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.resource_url(resource_path);
        let body = self.http_client.get(&url)?;
        debug!(url = %url, bytes = body.len(), "Fetched catalog resource");
        Ok(body)
    }
}
