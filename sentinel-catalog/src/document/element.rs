//! Owned element tree built from a quick-xml event stream.
//!
//! Element and attribute names are stored resolved: the namespace URI bound
//! to the prefix in scope at the point of declaration, plus the local name.
//! Each element also records the default namespace in scope where it sits,
//! which is what unprefixed path steps are matched against.
//!
//! While parsing, `xmlns:prefix` declarations are collected into a flat
//! prefix map for path expressions. The first declaration of a prefix wins,
//! so a nested redeclaration never changes how outer prefixes resolve. Only
//! a default namespace declared on the root element enters the map.

use std::collections::BTreeMap;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::error::DocumentError;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Prefix → namespace URI mapping. The default namespace uses the empty prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces {
    bindings: BTreeMap<String, String>,
}

impl Namespaces {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a binding. Use `""` for the default namespace.
    pub fn insert(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        self.bindings.insert(prefix.into(), uri.into());
    }

    /// Builder-style variant of [`Namespaces::insert`].
    pub fn with(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.insert(prefix, uri);
        self
    }

    /// Looks up the URI bound to `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// The default (unprefixed) namespace, if one was declared.
    pub fn default_namespace(&self) -> Option<&str> {
        self.get("")
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Records a binding discovered while parsing unless the prefix is
    /// already bound.
    fn declare(&mut self, prefix: &str, uri: &str) {
        self.bindings
            .entry(prefix.to_string())
            .or_insert_with(|| uri.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(prefix, uri)| (prefix.as_str(), uri.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attribute {
    pub namespace: Option<String>,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Element {
    pub namespace: Option<String>,
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub text: String,
    pub children: Vec<Arc<Element>>,
    /// Default namespace in scope at this element.
    pub default_namespace: Option<String>,
}

impl Element {
    /// Returns the value of an attribute by namespace and local name.
    pub fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }
}

/// Scoped prefix bindings used while the tree is being built.
struct Scope {
    bindings: Vec<(String, String)>,
    marks: Vec<usize>,
}

impl Scope {
    fn new() -> Self {
        Self {
            bindings: vec![("xml".to_string(), XML_NAMESPACE.to_string())],
            marks: Vec::new(),
        }
    }

    fn resolve(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|(p, _)| p == prefix)
            .map(|(_, uri)| uri.as_str())
    }

    fn enter(&mut self) {
        self.marks.push(self.bindings.len());
    }

    fn leave(&mut self) {
        if let Some(mark) = self.marks.pop() {
            self.bindings.truncate(mark);
        }
    }
}

fn split_qname(raw: &str) -> (Option<&str>, &str) {
    match raw.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, raw),
    }
}

/// Parses a complete document, returning the root element and the flat
/// prefix map of the namespaces declared in it.
pub(crate) fn parse(bytes: &[u8]) -> Result<(Arc<Element>, Namespaces), DocumentError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut namespaces = Namespaces::new();
    let mut scope = Scope::new();
    let mut open: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => {
                let is_root = open.is_empty() && root.is_none();
                let element = open_element(e, &mut scope, &mut namespaces, is_root)?;
                open.push(element);
            }
            Event::Empty(ref e) => {
                let is_root = open.is_empty() && root.is_none();
                let element = open_element(e, &mut scope, &mut namespaces, is_root)?;
                scope.leave();
                close_element(element, &mut open, &mut root)?;
            }
            Event::End(_) => {
                let element = open
                    .pop()
                    .ok_or_else(|| DocumentError::xml("unexpected closing tag"))?;
                scope.leave();
                close_element(element, &mut open, &mut root)?;
            }
            Event::Text(ref t) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(ref c) => {
                if let Some(current) = open.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(c.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !open.is_empty() {
        return Err(DocumentError::xml("unexpected end of document"));
    }

    root.map(|r| (Arc::new(r), namespaces))
        .ok_or_else(|| DocumentError::xml("document has no root element"))
}

fn open_element(
    start: &BytesStart<'_>,
    scope: &mut Scope,
    namespaces: &mut Namespaces,
    is_root: bool,
) -> Result<Element, DocumentError> {
    let raw_name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut raw_attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        raw_attributes.push((key, value));
    }

    // Declarations on this element are in scope for its own name.
    scope.enter();
    let mut attributes = Vec::new();
    for (key, value) in raw_attributes {
        if key == "xmlns" {
            if is_root && !value.is_empty() {
                namespaces.declare("", &value);
            }
            scope.bindings.push((String::new(), value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            namespaces.declare(prefix, &value);
            scope.bindings.push((prefix.to_string(), value));
        } else {
            attributes.push((key, value));
        }
    }

    // `xmlns=""` undeclares the default namespace.
    let default_namespace = scope
        .resolve("")
        .filter(|uri| !uri.is_empty())
        .map(str::to_string);

    let (prefix, local) = split_qname(&raw_name);
    let namespace = match prefix {
        Some(p) => Some(
            scope
                .resolve(p)
                .ok_or_else(|| DocumentError::xml(format!("unbound namespace prefix '{}'", p)))?
                .to_string(),
        ),
        None => default_namespace.clone(),
    };

    let attributes = attributes
        .into_iter()
        .map(|(key, value)| {
            let (prefix, local) = split_qname(&key);
            // Unprefixed attributes never take the default namespace.
            let namespace = match prefix {
                Some(p) => Some(
                    scope
                        .resolve(p)
                        .ok_or_else(|| {
                            DocumentError::xml(format!("unbound namespace prefix '{}'", p))
                        })?
                        .to_string(),
                ),
                None => None,
            };
            Ok(Attribute {
                namespace,
                name: local.to_string(),
                value,
            })
        })
        .collect::<Result<Vec<_>, DocumentError>>()?;

    Ok(Element {
        namespace,
        name: local.to_string(),
        attributes,
        text: String::new(),
        children: Vec::new(),
        default_namespace,
    })
}

fn close_element(
    element: Element,
    open: &mut [Element],
    root: &mut Option<Element>,
) -> Result<(), DocumentError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(Arc::new(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(DocumentError::xml("multiple root elements")),
    }
}
