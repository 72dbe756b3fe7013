//! Structured document reader.
//!
//! [`Document`] wraps one parsed XML element together with the namespace
//! prefixes used to resolve path expressions against it. Catalog search
//! pages, individual catalog entries, product manifests and tile metadata
//! are all read through this one type.
//!
//! # Constructors
//!
//! - [`Document::parse`] builds a reader from raw bytes and discovers the
//!   namespace prefixes declared in them. Unprefixed names in paths follow
//!   the default namespace in scope at each element, so a default declared
//!   on some nested element only affects that element's subtree.
//! - [`Document::node`] / [`Document::all`] return sub-documents that share
//!   the parent's namespace mapping.
//! - [`Document::with_namespaces`] replaces the mapping, for callers that
//!   need to address a document with prefixes of their own choosing. The
//!   mapping's `""` binding then decides what unprefixed names mean.
//!
//! # Example
//!
//! ```
//! use sentinel_catalog::document::Document;
//!
//! let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"
//!                    xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/">
//!     <opensearch:totalResults>1</opensearch:totalResults>
//!     <entry><title>S2A_MSIL2A_T19HBD</title></entry>
//! </feed>"#;
//!
//! let doc = Document::parse(xml.as_bytes()).unwrap();
//! assert_eq!(doc.value_as::<u64>("opensearch:totalResults").unwrap(), Some(1));
//! assert_eq!(doc.all("entry").unwrap().len(), 1);
//! ```

mod element;
mod error;
mod path;

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

pub use element::Namespaces;
pub use error::DocumentError;

use element::Element;
use path::{DefaultNamespace, ElementPath};

/// An immutable, cheaply cloneable view over one element of a parsed
/// XML document.
#[derive(Debug, Clone)]
pub struct Document {
    root: Arc<Element>,
    namespaces: Arc<Namespaces>,
    defaults: DefaultNamespace,
}

impl Document {
    /// Parses a complete XML document.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        let (root, namespaces) = element::parse(bytes)?;
        Ok(Self {
            root,
            namespaces: Arc::new(namespaces),
            defaults: DefaultNamespace::InScope,
        })
    }

    /// Returns the same element addressed through a different prefix mapping.
    pub fn with_namespaces(self, namespaces: Namespaces) -> Self {
        Self {
            root: self.root,
            namespaces: Arc::new(namespaces),
            defaults: DefaultNamespace::Mapped,
        }
    }

    /// Local name of the root element.
    pub fn name(&self) -> &str {
        &self.root.name
    }

    /// Namespace URI of the root element.
    pub fn namespace(&self) -> Option<&str> {
        self.root.namespace.as_deref()
    }

    /// Text content of the root element.
    pub fn text(&self) -> &str {
        &self.root.text
    }

    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Text of the first element matching `path`.
    pub fn value(&self, path: &str) -> Result<Option<&str>, DocumentError> {
        Ok(self.first(path)?.map(|e| e.text.as_str()))
    }

    /// Text of the first element matching `path`, failing if nothing matches.
    pub fn required_value(&self, path: &str) -> Result<&str, DocumentError> {
        self.value(path)?
            .ok_or_else(|| DocumentError::MissingElement {
                path: path.to_string(),
            })
    }

    /// Text of the first element matching `path`, converted with [`FromStr`].
    pub fn value_as<T>(&self, path: &str) -> Result<Option<T>, DocumentError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.value(path)? {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| DocumentError::InvalidValue {
                    path: path.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Attribute `attribute` of the first element matching `path`.
    ///
    /// Returns `Ok(None)` when no element matches or the element lacks the
    /// attribute. Unprefixed attribute names match attributes without a
    /// namespace.
    pub fn attribute(&self, path: &str, attribute: &str) -> Result<Option<&str>, DocumentError> {
        let Some(element) = self.first(path)? else {
            return Ok(None);
        };
        let (namespace, local) = match attribute.split_once(':') {
            Some((prefix, local)) => {
                let uri = self.namespaces.get(prefix).ok_or_else(|| {
                    DocumentError::invalid_path(
                        path,
                        format!("unknown namespace prefix '{}'", prefix),
                    )
                })?;
                (Some(uri), local)
            }
            None => (None, attribute),
        };
        Ok(element.attribute(namespace, local))
    }

    /// Sub-document rooted at the first element matching `path`.
    pub fn node(&self, path: &str) -> Result<Option<Document>, DocumentError> {
        let path = ElementPath::parse(path)?;
        Ok(path
            .select(&self.root, &self.namespaces, self.defaults)?
            .into_iter()
            .next()
            .map(|e| self.subdocument(e)))
    }

    /// Sub-documents for every element matching `path`, in document order.
    pub fn all(&self, path: &str) -> Result<Vec<Document>, DocumentError> {
        let path = ElementPath::parse(path)?;
        Ok(path
            .select(&self.root, &self.namespaces, self.defaults)?
            .into_iter()
            .map(|e| self.subdocument(e))
            .collect())
    }

    fn first(&self, path: &str) -> Result<Option<&Element>, DocumentError> {
        let path = ElementPath::parse(path)?;
        Ok(path
            .select(&self.root, &self.namespaces, self.defaults)?
            .into_iter()
            .next()
            .map(|e| &**e))
    }

    fn subdocument(&self, element: &Arc<Element>) -> Document {
        Document {
            root: Arc::clone(element),
            namespaces: Arc::clone(&self.namespaces),
            defaults: self.defaults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH_PAGE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns="http://www.w3.org/2005/Atom">
  <title>Sentinels Scientific Data Hub search results</title>
  <opensearch:totalResults>12</opensearch:totalResults>
  <link rel="self" type="application/atom+xml" href="https://apihub.example/search?start=0&amp;rows=10"/>
  <link rel="next" type="application/atom+xml" href="https://apihub.example/search?start=10&amp;rows=10"/>
  <entry>
    <title>S2B_MSIL2A_20210519T142729_N0300_R053_T19HBD_20210519T163959</title>
    <int name="orbitnumber">21879</int>
    <double name="cloudcoverpercentage">4.5</double>
    <str name="uuid">6f2a9c1e-1111-2222-3333-444455556666</str>
  </entry>
</feed>"#;

    fn page() -> Document {
        Document::parse(SEARCH_PAGE.as_bytes()).unwrap()
    }

    #[test]
    fn test_namespaces_discovered_from_bytes() {
        let doc = page();
        assert_eq!(
            doc.namespaces().get("opensearch"),
            Some("http://a9.com/-/spec/opensearch/1.1/")
        );
        assert_eq!(
            doc.namespaces().default_namespace(),
            Some("http://www.w3.org/2005/Atom")
        );
        assert_eq!(doc.name(), "feed");
    }

    #[test]
    fn test_value_as_integer() {
        let doc = page();
        let total: Option<u64> = doc.value_as("opensearch:totalResults").unwrap();
        assert_eq!(total, Some(12));
    }

    #[test]
    fn test_value_as_reports_bad_conversion() {
        let doc = page();
        let result = doc.value_as::<u64>("title");
        match result {
            Err(DocumentError::InvalidValue { path, .. }) => assert_eq!(path, "title"),
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_attribute_with_predicate() {
        let doc = page();
        let href = doc.attribute("link[@rel='next']", "href").unwrap();
        assert_eq!(
            href,
            Some("https://apihub.example/search?start=10&rows=10")
        );
    }

    #[test]
    fn test_attribute_missing_node_is_none() {
        let doc = page();
        assert_eq!(doc.attribute("link[@rel='prev']", "href").unwrap(), None);
    }

    #[test]
    fn test_subdocument_shares_namespaces() {
        let doc = page();
        let entries = doc.all("entry").unwrap();
        assert_eq!(entries.len(), 1);

        let entry = &entries[0];
        assert_eq!(entry.name(), "entry");
        assert_eq!(
            entry.value("str[@name='uuid']").unwrap(),
            Some("6f2a9c1e-1111-2222-3333-444455556666")
        );
        assert_eq!(
            entry.value_as::<f64>("double[@name='cloudcoverpercentage']").unwrap(),
            Some(4.5)
        );
    }

    #[test]
    fn test_required_value_missing() {
        let doc = page();
        let result = doc.required_value("entry/str[@name='filename']");
        assert!(matches!(result, Err(DocumentError::MissingElement { .. })));
    }

    #[test]
    fn test_node_returns_first_match() {
        let doc = page();
        let link = doc.node("link").unwrap().unwrap();
        assert_eq!(link.attribute(".", "rel").unwrap(), Some("self"));
        assert!(doc.node("missing").unwrap().is_none());
    }

    #[test]
    fn test_with_namespaces_rebinds_prefixes() {
        let doc = page().with_namespaces(
            Namespaces::new()
                .with("atom", "http://www.w3.org/2005/Atom")
                .with("os", "http://a9.com/-/spec/opensearch/1.1/"),
        );
        assert_eq!(doc.value("os:totalResults").unwrap(), Some("12"));
        assert_eq!(doc.all("atom:entry").unwrap().len(), 1);
        // No default namespace any more, so unprefixed names miss.
        assert!(doc.all("entry").unwrap().is_empty());
    }

    #[test]
    fn test_nested_default_namespace_leaves_entries_readable() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>S2B_MSIL2A_20210519T142729_N0300_R053_T19HBD_20210519T163959</title>
    <extension xmlns="urn:vendor"><str name="uuid">wrong</str></extension>
    <str name="uuid">6f2a9c1e</str>
  </entry>
  <entry><title>second</title></entry>
</feed>"#;
        let doc = Document::parse(xml.as_bytes()).unwrap();
        assert_eq!(
            doc.namespaces().default_namespace(),
            Some("http://www.w3.org/2005/Atom")
        );

        let entries = doc.all("entry").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value("str[@name='uuid']").unwrap(), Some("6f2a9c1e"));
        assert_eq!(entries[1].value("title").unwrap(), Some("second"));
    }
}
