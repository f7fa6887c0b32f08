//! XML document tree
//!
//! A lightweight element tree built from `quick-xml` events, with namespace
//! prefixes resolved at parse time. The tree is the instance representation
//! consumed by validation and decoding, and the output of encoding.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::names::{NamespaceContext, QName};

/// XML element node
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Resolved element name
    pub name: QName,
    /// Attributes in document order (xmlns declarations excluded)
    pub attributes: IndexMap<QName, String>,
    /// Concatenated text content, if any
    pub text: Option<String>,
    /// Child elements in document order
    pub children: Vec<Element>,
    /// In-scope namespace declarations (inherited and own)
    pub namespaces: NamespaceContext,
}

impl Element {
    /// Create an empty element
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: IndexMap::new(),
            text: None,
            children: Vec::new(),
            namespaces: NamespaceContext::new(),
        }
    }

    /// Get the local name
    pub fn local_name(&self) -> &str {
        &self.name.local
    }

    /// Get the namespace
    pub fn namespace(&self) -> Option<&str> {
        self.name.namespace.as_deref()
    }

    /// Get an attribute value by local name, ignoring the namespace
    pub fn attribute(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name.local == local && name.namespace.is_none())
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute value by qualified name
    pub fn attribute_qname(&self, name: &QName) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Set an attribute value
    pub fn set_attribute(&mut self, name: QName, value: impl Into<String>) {
        self.attributes.insert(name, value.into());
    }

    /// Append a child element
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Append text content
    pub fn append_text(&mut self, text: &str) {
        match self.text {
            Some(ref mut existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Trimmed text content, None when empty or whitespace-only
    pub fn trimmed_text(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Find child elements by local name
    pub fn find_children<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Walk a slash-separated path of local names below this element
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        let mut current = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current = current.children.iter().find(|c| c.local_name() == segment)?;
        }
        Some(current)
    }

    /// Serialize this element to an XML string
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, None);
        out
    }

    fn write_into(&self, out: &mut String, parent_default: Option<&str>) {
        out.push('<');
        out.push_str(&self.name.local);

        if self.name.namespace.as_deref() != parent_default {
            if let Some(ns) = self.name.namespace.as_deref() {
                out.push_str(&format!(" xmlns=\"{}\"", escape_attribute(ns)));
            }
        }
        for (name, value) in &self.attributes {
            let written = match name.namespace.as_deref() {
                None => name.local.clone(),
                Some(ns) => match self.namespaces.prefix_for(ns) {
                    Some(prefix) => format!("{}:{}", prefix, name.local),
                    None => name.local.clone(),
                },
            };
            out.push_str(&format!(" {}=\"{}\"", written, escape_attribute(value)));
        }

        if self.children.is_empty() && self.trimmed_text().is_none() {
            out.push_str("/>");
            return;
        }

        out.push('>');
        if let Some(text) = self.trimmed_text() {
            out.push_str(&escape_text(text));
        }
        for child in &self.children {
            child.write_into(out, self.name.namespace.as_deref());
        }
        out.push_str("</");
        out.push_str(&self.name.local);
        out.push('>');
    }
}

fn escape_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    escape_text(value).replace('"', "&quot;")
}

/// Parsed XML document
#[derive(Debug, Clone)]
pub struct Document {
    /// Root element
    pub root: Element,
}

impl Document {
    /// Parse an XML document from a string
    pub fn from_str(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(start)) => {
                    let scope = stack
                        .last()
                        .map(|parent| parent.namespaces.clone())
                        .unwrap_or_default();
                    let element = parse_start(&start, scope)?;
                    stack.push(element);
                }
                Ok(Event::Empty(start)) => {
                    let scope = stack
                        .last()
                        .map(|parent| parent.namespaces.clone())
                        .unwrap_or_default();
                    let element = parse_start(&start, scope)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(element),
                        None => root = Some(element),
                    }
                }
                Ok(Event::End(_)) => {
                    let finished = stack
                        .pop()
                        .ok_or_else(|| Error::Xml("unbalanced end tag".to_string()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(finished),
                        None => root = Some(finished),
                    }
                }
                Ok(Event::Text(text)) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| Error::Xml(format!("invalid text content: {}", e)))?;
                        if !value.trim().is_empty() {
                            current.append_text(&value);
                        }
                    }
                }
                Ok(Event::CData(data)) => {
                    if let Some(current) = stack.last_mut() {
                        let value = String::from_utf8_lossy(data.as_ref()).into_owned();
                        current.append_text(&value);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "XML parse error at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {}
            }
            buf.clear();
        }

        match root {
            Some(root) => Ok(Self { root }),
            None => Err(Error::Xml("document has no root element".to_string())),
        }
    }

    /// Get the root element
    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn parse_start(start: &BytesStart, mut scope: NamespaceContext) -> Result<Element> {
    let raw_name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| Error::Xml(format!("invalid element name: {}", e)))?
        .to_string();

    // Collect declarations first so they apply to the element's own name
    let mut plain_attributes: Vec<(String, String)> = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::Xml(format!("invalid attribute: {}", e)))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("invalid attribute name: {}", e)))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("invalid attribute value: {}", e)))?
            .into_owned();

        if key == "xmlns" {
            scope.set_default(value);
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            scope.declare(prefix, value);
        } else {
            plain_attributes.push((key, value));
        }
    }

    let name = scope.resolve(&raw_name).map_err(|_| {
        Error::Xml(format!("undeclared namespace prefix in element '{}'", raw_name))
    })?;

    let mut element = Element::new(name);
    for (key, value) in plain_attributes {
        let attr_name = scope
            .resolve_attribute(&key)
            .map_err(|_| Error::Xml(format!("undeclared namespace prefix in attribute '{}'", key)))?;
        element.attributes.insert(attr_name, value);
    }
    element.namespaces = scope;
    Ok(element)
}
