//! Remote resource paths.
//!
//! Every file inside a product is addressed as a chain of OData nodes:
//!
//! ```text
//! /Products('{uuid}')/Nodes('{container}')/Nodes('{segment}')/.../$value
//! ```
//!
//! Manifest, metadata and band paths are all produced by [`ResourcePath`]
//! so their formats cannot drift apart. Keys are rendered as OData string
//! literals, with embedded `'` doubled.

use std::borrow::Cow;
use std::fmt;

/// Name of the manifest inside a product container.
pub const MANIFEST_FILE: &str = "manifest.safe";

/// Extension of a product container name.
pub const CONTAINER_EXTENSION: &str = ".SAFE";

/// Path of one resource inside a product.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourcePath {
    product_id: String,
    segments: Vec<String>,
}

impl ResourcePath {
    /// The product itself.
    pub fn product(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            segments: Vec::new(),
        }
    }

    /// Appends one node.
    pub fn join(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Appends every segment of a slash-separated relative path.
    ///
    /// A leading `./` and empty segments are skipped, so manifest hrefs can
    /// be passed as they appear in the manifest.
    pub fn join_relative(mut self, relative: &str) -> Self {
        let relative = relative.strip_prefix("./").unwrap_or(relative);
        self.segments.extend(
            relative
                .split('/')
                .filter(|s| !s.is_empty() && *s != ".")
                .map(str::to_string),
        );
        self
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Final segment, usually a file name.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// The node path without the value suffix, usable for listings.
    pub fn node_path(&self) -> String {
        let mut path = format!("/Products('{}')", quote_key(&self.product_id));
        for segment in &self.segments {
            path.push_str("/Nodes('");
            path.push_str(&quote_key(segment));
            path.push_str("')");
        }
        path
    }

    /// The path of the resource content.
    pub fn render(&self) -> String {
        format!("{}/$value", self.node_path())
    }
}

fn quote_key(key: &str) -> Cow<'_, str> {
    if key.contains('\'') {
        Cow::Owned(key.replace('\'', "''"))
    } else {
        Cow::Borrowed(key)
    }
}

impl fmt::Display for ResourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
