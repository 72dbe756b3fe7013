//! Path expressions for selecting elements.
//!
//! A small subset of the XPath syntax understood by ElementTree-style
//! readers, evaluated relative to the current element:
//!
//! | Syntax | Meaning |
//! |---|---|
//! | `tag`, `prefix:tag` | child elements with the given name |
//! | `*` | all child elements |
//! | `.` | the current element |
//! | `a//b` | `b` elements anywhere below `a` |
//! | `tag[@attr]` | elements carrying `attr` |
//! | `tag[@attr='v']` | elements whose `attr` equals `v` |
//! | `tag[.='v']` | elements whose text equals `v` |
//! | `tag[child='v']` | elements with a `child` whose text equals `v` |
//!
//! Unprefixed element names follow [`DefaultNamespace`]: either the default
//! namespace in scope at each candidate element, as XML itself scopes it,
//! or the `""` binding of a caller-supplied mapping.

use std::collections::HashSet;
use std::sync::Arc;

use super::element::{Element, Namespaces};
use super::error::DocumentError;

/// How unprefixed element names in a path are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DefaultNamespace {
    /// The default namespace declared around each candidate element.
    InScope,
    /// The `""` binding of the prefix map, or no namespace without one.
    Mapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct QName {
    prefix: Option<String>,
    local: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    SelfNode,
    Any,
    Name(QName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    HasAttribute(QName),
    AttributeEquals(QName, String),
    TextEquals(String),
    ChildTextEquals(QName, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ElementPath {
    source: String,
    steps: Vec<Step>,
}

impl ElementPath {
    pub fn parse(path: &str) -> Result<Self, DocumentError> {
        if path.is_empty() {
            return Err(DocumentError::invalid_path(path, "empty path"));
        }
        if path.starts_with('/') {
            return Err(DocumentError::invalid_path(path, "absolute paths are not supported"));
        }

        let segments = split_top_level(path, '/')
            .ok_or_else(|| DocumentError::invalid_path(path, "unbalanced brackets or quotes"))?;

        let mut steps = Vec::new();
        let mut axis = Axis::Child;
        for (i, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                if axis == Axis::Descendant || i == segments.len() - 1 {
                    return Err(DocumentError::invalid_path(path, "empty step"));
                }
                axis = Axis::Descendant;
                continue;
            }
            steps.push(parse_step(path, segment, axis)?);
            axis = Axis::Child;
        }

        Ok(Self {
            source: path.to_string(),
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns every element matched by the path, in document order.
    pub fn select<'a>(
        &self,
        root: &'a Arc<Element>,
        namespaces: &Namespaces,
        defaults: DefaultNamespace,
    ) -> Result<Vec<&'a Arc<Element>>, DocumentError> {
        let resolver = Resolver {
            path: self,
            namespaces,
            defaults,
        };
        let mut current: Vec<&'a Arc<Element>> = vec![root];

        for step in &self.steps {
            let mut next: Vec<&'a Arc<Element>> = Vec::new();
            let mut seen: HashSet<*const Element> = HashSet::new();
            for node in current {
                let candidates: Vec<&'a Arc<Element>> = match (step.axis, &step.test) {
                    (Axis::Child, NodeTest::SelfNode) => vec![node],
                    (Axis::Child, _) => node.children.iter().collect(),
                    (Axis::Descendant, NodeTest::SelfNode) => {
                        let mut all = vec![node];
                        collect_descendants(node, &mut all);
                        all
                    }
                    (Axis::Descendant, _) => {
                        let mut all = Vec::new();
                        collect_descendants(node, &mut all);
                        all
                    }
                };

                for candidate in candidates {
                    if resolver.matches(step, candidate)?
                        && seen.insert(Arc::as_ptr(candidate))
                    {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }

        Ok(current)
    }
}

/// Resolves the names of one path against a prefix map.
struct Resolver<'p> {
    path: &'p ElementPath,
    namespaces: &'p Namespaces,
    defaults: DefaultNamespace,
}

impl Resolver<'_> {
    fn matches(&self, step: &Step, element: &Element) -> Result<bool, DocumentError> {
        let name_ok = match &step.test {
            NodeTest::SelfNode | NodeTest::Any => true,
            NodeTest::Name(qname) => self.name_matches(qname, element)?,
        };
        if !name_ok {
            return Ok(false);
        }

        for predicate in &step.predicates {
            let ok = match predicate {
                Predicate::HasAttribute(qname) => {
                    let ns = self.attribute_namespace(qname)?;
                    element.attribute(ns, &qname.local).is_some()
                }
                Predicate::AttributeEquals(qname, value) => {
                    let ns = self.attribute_namespace(qname)?;
                    element.attribute(ns, &qname.local) == Some(value.as_str())
                }
                Predicate::TextEquals(value) => element.text == *value,
                Predicate::ChildTextEquals(qname, value) => {
                    let mut found = false;
                    for child in &element.children {
                        if self.name_matches(qname, child)? && child.text == *value {
                            found = true;
                            break;
                        }
                    }
                    found
                }
            };
            if !ok {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn name_matches(&self, qname: &QName, element: &Element) -> Result<bool, DocumentError> {
        if element.name != qname.local {
            return Ok(false);
        }
        let expected = match &qname.prefix {
            Some(prefix) => Some(self.prefix(prefix)?),
            None => match self.defaults {
                DefaultNamespace::InScope => element.default_namespace.as_deref(),
                DefaultNamespace::Mapped => self.namespaces.default_namespace(),
            },
        };
        Ok(element.namespace.as_deref() == expected)
    }

    /// Unprefixed attribute names never take a default namespace.
    fn attribute_namespace(&self, qname: &QName) -> Result<Option<&str>, DocumentError> {
        qname.prefix.as_deref().map(|p| self.prefix(p)).transpose()
    }

    fn prefix(&self, prefix: &str) -> Result<&str, DocumentError> {
        self.namespaces.get(prefix).ok_or_else(|| {
            DocumentError::invalid_path(
                &self.path.source,
                format!("unknown namespace prefix '{}'", prefix),
            )
        })
    }
}

fn collect_descendants<'a>(node: &'a Arc<Element>, out: &mut Vec<&'a Arc<Element>>) {
    for child in &node.children {
        out.push(child);
        collect_descendants(child, out);
    }
}

/// Splits on `sep` outside of brackets and quotes. Returns `None` when
/// brackets or quotes are unbalanced.
fn split_top_level(input: &str, sep: char) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth = depth.checked_sub(1)?,
                c if c == sep && depth == 0 => {
                    parts.push(&input[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }

    if depth != 0 || quote.is_some() {
        return None;
    }
    parts.push(&input[start..]);
    Some(parts)
}

fn parse_qname(path: &str, raw: &str) -> Result<QName, DocumentError> {
    let valid = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
    };
    let (prefix, local) = match raw.split_once(':') {
        Some((p, l)) => (Some(p), l),
        None => (None, raw),
    };
    if !valid(local) || prefix.is_some_and(|p| !valid(p)) {
        return Err(DocumentError::invalid_path(
            path,
            format!("invalid name '{}'", raw),
        ));
    }
    Ok(QName {
        prefix: prefix.map(str::to_string),
        local: local.to_string(),
    })
}

fn parse_literal(path: &str, raw: &str) -> Result<String, DocumentError> {
    let raw = raw.trim();
    let quoted = raw.len() >= 2
        && ((raw.starts_with('\'') && raw.ends_with('\''))
            || (raw.starts_with('"') && raw.ends_with('"')));
    if !quoted {
        return Err(DocumentError::invalid_path(
            path,
            format!("expected quoted literal, found '{}'", raw),
        ));
    }
    Ok(raw[1..raw.len() - 1].to_string())
}

fn parse_predicate(path: &str, raw: &str) -> Result<Predicate, DocumentError> {
    let raw = raw.trim();
    match split_top_level(raw, '=').filter(|parts| parts.len() <= 2) {
        Some(parts) if parts.len() == 2 => {
            let lhs = parts[0].trim();
            let value = parse_literal(path, parts[1])?;
            if lhs == "." {
                Ok(Predicate::TextEquals(value))
            } else if let Some(attr) = lhs.strip_prefix('@') {
                Ok(Predicate::AttributeEquals(parse_qname(path, attr)?, value))
            } else {
                Ok(Predicate::ChildTextEquals(parse_qname(path, lhs)?, value))
            }
        }
        Some(_) => match raw.strip_prefix('@') {
            Some(attr) => Ok(Predicate::HasAttribute(parse_qname(path, attr)?)),
            None => Err(DocumentError::invalid_path(
                path,
                format!("unsupported predicate '[{}]'", raw),
            )),
        },
        None => Err(DocumentError::invalid_path(
            path,
            format!("malformed predicate '[{}]'", raw),
        )),
    }
}

fn parse_step(path: &str, segment: &str, axis: Axis) -> Result<Step, DocumentError> {
    let (head, mut rest) = match segment.find('[') {
        Some(i) => (&segment[..i], &segment[i..]),
        None => (segment, ""),
    };

    let test = match head {
        "." => NodeTest::SelfNode,
        "*" => NodeTest::Any,
        ".." => {
            return Err(DocumentError::invalid_path(
                path,
                "parent steps are not supported",
            ))
        }
        name => NodeTest::Name(parse_qname(path, name)?),
    };

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(DocumentError::invalid_path(
                path,
                format!("unexpected '{}'", rest),
            ));
        }
        let close = find_predicate_end(rest)
            .ok_or_else(|| DocumentError::invalid_path(path, "unterminated predicate"))?;
        predicates.push(parse_predicate(path, &rest[1..close])?);
        rest = &rest[close + 1..];
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

/// Index of the `]` closing the predicate that opens at index 0.
fn find_predicate_end(input: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                ']' => return Some(i),
                _ => {}
            },
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::element::parse;

    fn select_names(xml: &str, path: &str) -> Vec<String> {
        let (root, ns) = parse(xml.as_bytes()).unwrap();
        ElementPath::parse(path)
            .unwrap()
            .select(&root, &ns, DefaultNamespace::InScope)
            .unwrap()
            .iter()
            .map(|e| format!("{}:{}", e.name, e.text))
            .collect()
    }

    const FEED: &str = r#"<feed xmlns="urn:atom" xmlns:os="urn:os">
        <os:totalResults>2</os:totalResults>
        <link rel="self" href="a"/>
        <link rel="next" href="b"/>
        <entry><title>one</title><str name="processinglevel">Level-2A</str></entry>
        <entry><title>two</title><str name="processinglevel">Level-1C</str></entry>
    </feed>"#;

    #[test]
    fn test_parse_rejects_malformed_paths() {
        assert!(ElementPath::parse("").is_err());
        assert!(ElementPath::parse("/feed").is_err());
        assert!(ElementPath::parse("a/").is_err());
        assert!(ElementPath::parse("a///b").is_err());
        assert!(ElementPath::parse("a[@b='c'").is_err());
        assert!(ElementPath::parse("a[@b=c]").is_err());
        assert!(ElementPath::parse("a/..").is_err());
    }

    #[test]
    fn test_select_prefixed_child() {
        assert_eq!(select_names(FEED, "os:totalResults"), vec!["totalResults:2"]);
    }

    #[test]
    fn test_select_attribute_predicate() {
        let (root, ns) = parse(FEED.as_bytes()).unwrap();
        let found = ElementPath::parse("link[@rel='next']")
            .unwrap()
            .select(&root, &ns, DefaultNamespace::InScope)
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attribute(None, "href"), Some("b"));
    }

    #[test]
    fn test_select_child_text_predicate() {
        let names = select_names(FEED, "entry[str='Level-1C']/title");
        assert_eq!(names, vec!["title:two"]);
    }

    #[test]
    fn test_select_text_predicate() {
        let names = select_names(FEED, "entry/str[.='Level-2A']");
        assert_eq!(names, vec!["str:Level-2A"]);
    }

    #[test]
    fn test_select_descendants() {
        let names = select_names(FEED, ".//title");
        assert_eq!(names, vec!["title:one", "title:two"]);
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        let (root, ns) = parse(FEED.as_bytes()).unwrap();
        let result = ElementPath::parse("nope:entry").unwrap().select(&root, &ns, DefaultNamespace::InScope);
        assert!(matches!(result, Err(DocumentError::InvalidPath { .. })));
    }

    #[test]
    fn test_unprefixed_name_does_not_match_other_namespace() {
        let xml = r#"<root xmlns:x="urn:x"><x:item>a</x:item><item>b</item></root>"#;
        assert_eq!(select_names(xml, "item"), vec!["item:b"]);
        assert_eq!(select_names(xml, "x:item"), vec!["item:a"]);
    }

    #[test]
    fn test_nested_default_namespace_is_scoped() {
        let xml = r#"<x:root xmlns:x="urn:x">
            <meta><wrap><extra xmlns="urn:extra"><item>hidden</item></extra></wrap></meta>
            <data><item>a</item><item>b</item></data>
        </x:root>"#;
        assert_eq!(select_names(xml, "data/item"), vec!["item:a", "item:b"]);
        assert_eq!(select_names(xml, "meta/wrap/extra/item"), vec!["item:hidden"]);
        assert_eq!(
            select_names(xml, ".//item"),
            vec!["item:hidden", "item:a", "item:b"]
        );
    }

    #[test]
    fn test_mapped_default_namespace() {
        let (root, _) = parse(FEED.as_bytes()).unwrap();
        let mapped = Namespaces::new().with("", "urn:atom");
        let path = ElementPath::parse("entry/title").unwrap();
        assert_eq!(
            path.select(&root, &mapped, DefaultNamespace::Mapped).unwrap().len(),
            2
        );
        assert!(path
            .select(&root, &Namespaces::new(), DefaultNamespace::Mapped)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_descendant_matches_are_not_duplicated() {
        let xml = r#"<a><b><b><c>1</c></b></b></a>"#;
        assert_eq!(select_names(xml, ".//b//c"), vec!["c:1"]);
    }
}
