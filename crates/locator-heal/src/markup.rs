//! Offline probe that resolves locators against a static markup snapshot.
//!
//! Start tags are parsed lexically; there is no DOM tree, so only
//! single-element selectors are understood. Descendant combinators, pseudo
//! classes and XPath axes report [`ProbeFailureReason::Unsupported`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use healkit_core_types::{Locator, LocatorKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::errors::{ProbeFailure, ProbeFailureReason};
use crate::probe::{ElementProbe, ProbeOutcome};

static START_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([A-Za-z][A-Za-z0-9:-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*/?>"#)
        .expect("start tag pattern compiles")
});

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
        .expect("attribute pattern compiles")
});

static XPATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^//([A-Za-z*][\w:-]*)(?:\[(.+)\])?$").expect("xpath pattern compiles"));

static XPATH_EQUALS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^@([\w:-]+)\s*=\s*(?:'([^']*)'|"([^"]*)")$"#).expect("xpath equals compiles")
});

static XPATH_CONTAINS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^contains\(\s*@([\w:-]+)\s*,\s*(?:'([^']*)'|"([^"]*)")\s*\)$"#)
        .expect("xpath contains compiles")
});

/// Element record produced by the lexical scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkupElement {
    /// Position among start tags, document order.
    pub index: usize,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
}

impl MarkupElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|list| list.split_whitespace().any(|token| token == class))
            .unwrap_or(false)
    }
}

/// Parse every start tag of `markup`. Tag and attribute names are lowercased.
pub fn parse_elements(markup: &str) -> Vec<MarkupElement> {
    START_TAG
        .captures_iter(markup)
        .enumerate()
        .map(|(index, caps)| {
            let mut attributes = BTreeMap::new();
            if let Some(raw) = caps.get(2) {
                for attr in ATTRIBUTE.captures_iter(raw.as_str()) {
                    let name = attr[1].to_ascii_lowercase();
                    let value = attr
                        .get(2)
                        .or_else(|| attr.get(3))
                        .or_else(|| attr.get(4))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    attributes.entry(name).or_insert(value);
                }
            }
            MarkupElement {
                index,
                tag: caps[1].to_ascii_lowercase(),
                attributes,
            }
        })
        .collect()
}

#[derive(Debug, PartialEq)]
enum Condition {
    Tag(String),
    AttrEquals(String, String),
    AttrContains(String, String),
    AttrPresent(String),
    HasClass(String),
    ClassEquals(String),
}

impl Condition {
    fn matches(&self, element: &MarkupElement) -> bool {
        match self {
            Condition::Tag(tag) => element.tag == *tag,
            Condition::AttrEquals(name, value) => element.attr(name) == Some(value.as_str()),
            Condition::AttrContains(name, value) => element
                .attr(name)
                .map(|actual| actual.contains(value.as_str()))
                .unwrap_or(false),
            Condition::AttrPresent(name) => element.attributes.contains_key(name),
            Condition::HasClass(class) => element.has_class(class),
            Condition::ClassEquals(list) => element.attr("class") == Some(list.as_str()),
        }
    }
}

type Query = Result<Vec<Condition>, ProbeFailure>;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn compile(locator: &Locator) -> Query {
    let value = locator.value.as_str();
    match locator.kind {
        LocatorKind::Id => Ok(vec![Condition::AttrEquals("id".into(), value.into())]),
        LocatorKind::Name => Ok(vec![Condition::AttrEquals("name".into(), value.into())]),
        LocatorKind::Class => {
            if value.split_whitespace().count() != 1 {
                return Err(ProbeFailure::unsupported(format!(
                    "class locator must be a single class name, got '{}'",
                    value
                )));
            }
            Ok(vec![Condition::HasClass(value.trim().into())])
        }
        LocatorKind::Css => compile_css(value),
        LocatorKind::Xpath => compile_xpath(value),
    }
}

fn compile_css(selector: &str) -> Query {
    let selector = selector.trim();
    let tokens: Vec<&str> = selector.split_whitespace().collect();
    if tokens.len() > 1 && tokens.iter().all(|t| t.chars().all(is_ident_char)) {
        // Combined class string scraped from a class attribute.
        return Ok(vec![Condition::ClassEquals(tokens.join(" "))]);
    }
    if selector.is_empty() || tokens.len() != 1 {
        return Err(ProbeFailure::unsupported(format!(
            "css selector '{}' is not a single compound selector",
            selector
        )));
    }

    let unsupported = || {
        ProbeFailure::unsupported(format!("css selector '{}' is not supported", selector))
    };

    let mut conditions = Vec::new();
    let mut rest = selector;

    let tag_len = rest
        .find(|c: char| !(is_ident_char(c) || c == '*'))
        .unwrap_or(rest.len());
    let tag = &rest[..tag_len];
    if !tag.is_empty() && tag != "*" {
        conditions.push(Condition::Tag(tag.to_ascii_lowercase()));
    }
    rest = &rest[tag_len..];

    while let Some(first) = rest.chars().next() {
        match first {
            '#' | '.' => {
                let body = &rest[1..];
                let len = body.find(|c: char| !is_ident_char(c)).unwrap_or(body.len());
                if len == 0 {
                    return Err(unsupported());
                }
                let name = body[..len].to_string();
                conditions.push(if first == '#' {
                    Condition::AttrEquals("id".into(), name)
                } else {
                    Condition::HasClass(name)
                });
                rest = &body[len..];
            }
            '[' => {
                let close = rest.find(']').ok_or_else(unsupported)?;
                let inner = &rest[1..close];
                conditions.push(attribute_condition(inner).ok_or_else(unsupported)?);
                rest = &rest[close + 1..];
            }
            _ => return Err(unsupported()),
        }
    }

    if conditions.is_empty() && tag != "*" {
        return Err(unsupported());
    }
    Ok(conditions)
}

fn attribute_condition(inner: &str) -> Option<Condition> {
    match inner.split_once('=') {
        None => {
            let name = inner.trim();
            (!name.is_empty() && name.chars().all(is_ident_char))
                .then(|| Condition::AttrPresent(name.to_ascii_lowercase()))
        }
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() || !name.chars().all(is_ident_char) {
                return None;
            }
            let value = value.trim();
            let unquoted = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .unwrap_or(value);
            Some(Condition::AttrEquals(
                name.to_ascii_lowercase(),
                unquoted.to_string(),
            ))
        }
    }
}

fn quoted_literal(caps: &regex::Captures<'_>) -> String {
    caps.get(2)
        .or_else(|| caps.get(3))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn compile_xpath(expression: &str) -> Query {
    let unsupported = || {
        ProbeFailure::unsupported(format!("xpath '{}' is not supported", expression))
    };
    let caps = XPATH.captures(expression.trim()).ok_or_else(unsupported)?;

    let mut conditions = Vec::new();
    let tag = &caps[1];
    if tag != "*" {
        conditions.push(Condition::Tag(tag.to_ascii_lowercase()));
    }

    if let Some(predicate) = caps.get(2).map(|m| m.as_str().trim()) {
        if let Some(eq) = XPATH_EQUALS.captures(predicate) {
            conditions.push(Condition::AttrEquals(
                eq[1].to_ascii_lowercase(),
                quoted_literal(&eq),
            ));
        } else if let Some(contains) = XPATH_CONTAINS.captures(predicate) {
            conditions.push(Condition::AttrContains(
                contains[1].to_ascii_lowercase(),
                quoted_literal(&contains),
            ));
        } else {
            return Err(unsupported());
        }
    }
    Ok(conditions)
}

/// [`ElementProbe`] over a fixed page snapshot.
#[derive(Debug, Clone)]
pub struct MarkupProbe {
    url: String,
    markup: String,
    elements: Vec<MarkupElement>,
}

impl MarkupProbe {
    pub fn new(url: impl Into<String>, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let elements = parse_elements(&markup);
        debug!(elements = elements.len(), "parsed markup snapshot");
        Self {
            url: url.into(),
            markup,
            elements,
        }
    }

    pub fn elements(&self) -> &[MarkupElement] {
        &self.elements
    }

    /// First element in document order matching `locator`.
    pub fn find(&self, locator: &Locator) -> Result<MarkupElement, ProbeFailure> {
        let conditions = compile(locator)?;
        self.elements
            .iter()
            .find(|element| conditions.iter().all(|c| c.matches(element)))
            .cloned()
            .ok_or_else(|| ProbeFailure::no_match(locator))
    }
}

#[async_trait]
impl ElementProbe for MarkupProbe {
    type Handle = MarkupElement;

    async fn probe(&self, locator: &Locator) -> ProbeOutcome<MarkupElement> {
        self.find(locator).into()
    }

    async fn current_url(&self) -> String {
        self.url.clone()
    }

    async fn page_source(&self) -> Result<String, ProbeFailure> {
        if self.markup.is_empty() {
            return Err(ProbeFailure::new(
                ProbeFailureReason::Driver,
                "page snapshot is empty",
            ));
        }
        Ok(self.markup.clone())
    }
}
