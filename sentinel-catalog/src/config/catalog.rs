//! Catalog connection settings.

use std::fmt;
use std::time::Duration;

/// Default catalog endpoint.
pub const DEFAULT_BASE_URL: &str = "https://apihub.copernicus.eu/apihub";

/// Default path of the OData service below the base URL.
pub const DEFAULT_ODATA_PATH: &str = "/odata/v1";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of entries requested per search page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page size the catalog accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("sentinel-catalog/", env!("CARGO_PKG_VERSION"));

/// Basic-auth credentials for the catalog.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for talking to the catalog.
///
/// Passed by reference to the transport constructor; nothing in the crate
/// reads credentials or endpoints from global state.
///
/// # Example
///
/// ```
/// use sentinel_catalog::config::{CatalogConfig, Credentials};
///
/// let config = CatalogConfig::default()
///     .with_credentials(Credentials::new("user", "secret"))
///     .with_page_size(50);
///
/// assert_eq!(config.page_size, 50);
/// assert_eq!(config.odata_url("/Products('x')/$value"),
///            "https://apihub.copernicus.eu/apihub/odata/v1/Products('x')/$value");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Catalog endpoint, without trailing slash.
    pub base_url: String,

    /// Path of the OData service below `base_url`.
    pub odata_path: String,

    /// Credentials, if the catalog requires authentication.
    pub credentials: Option<Credentials>,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Entries requested per search page.
    pub page_size: usize,

    /// User agent header value.
    pub user_agent: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            odata_path: DEFAULT_ODATA_PATH.to_string(),
            credentials: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CatalogConfig {
    /// Create a configuration for a catalog at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Set the catalog endpoint. A trailing slash is removed.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the OData service path.
    pub fn with_odata_path(mut self, odata_path: impl Into<String>) -> Self {
        self.odata_path = odata_path.into();
        self
    }

    /// Set the credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// URL of the full-text search endpoint.
    pub fn search_url(&self) -> String {
        format!("{}/search", self.base_url)
    }

    /// URL of an OData resource path such as `/Products('uuid')/$value`.
    pub fn odata_url(&self, resource_path: &str) -> String {
        format!("{}{}{}", self.base_url, self.odata_path, resource_path)
    }
}
