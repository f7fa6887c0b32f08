//! Qualified names and namespace handling
//!
//! Qualified names are represented as a namespace URI plus a local part and
//! printed in the `{namespace}local` extended form. Prefixed names found in
//! documents are resolved through a [`NamespaceContext`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Qualified name - namespace URI plus local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<String>,
    /// Local name
    pub local: String,
}

impl QName {
    /// Create a QName without a namespace
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Create a QName with an optional namespace
    pub fn new(namespace: Option<impl Into<String>>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(Into::into),
            local: local.into(),
        }
    }

    /// Parse from the `{namespace}local` extended form
    pub fn from_extended(name: &str) -> Result<Self> {
        if let Some(rest) = name.strip_prefix('{') {
            let (namespace, local) = rest
                .split_once('}')
                .ok_or_else(|| Error::Value(format!("malformed extended name: '{}'", name)))?;
            if local.is_empty() {
                return Err(Error::Value(format!("empty local part in '{}'", name)));
            }
            Ok(Self::namespaced(namespace, local))
        } else {
            Ok(Self::local(name))
        }
    }

}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}

/// Namespace context for resolving prefixed names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    prefixes: HashMap<String, String>,
    default_namespace: Option<String>,
}

impl NamespaceContext {
    /// Create an empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a prefix mapping
    pub fn declare(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace
    pub fn set_default(&mut self, namespace: impl Into<String>) {
        self.default_namespace = Some(namespace.into());
    }

    /// Get the namespace bound to a prefix
    pub fn namespace_for(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }

    /// Get the default namespace
    pub fn default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate over declared prefix mappings
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }

    /// Resolve a possibly prefixed name into a QName
    ///
    /// Unprefixed names take the default namespace, if one is in scope.
    pub fn resolve(&self, name: &str) -> Result<QName> {
        if let Some((prefix, local)) = name.split_once(':') {
            let namespace = self
                .namespace_for(prefix)
                .ok_or_else(|| Error::Value(format!("unknown namespace prefix '{}'", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::new(self.default_namespace.clone(), name))
        }
    }

    /// Resolve an attribute-style name: unprefixed names stay in no namespace
    pub fn resolve_attribute(&self, name: &str) -> Result<QName> {
        if let Some((prefix, local)) = name.split_once(':') {
            let namespace = self
                .namespace_for(prefix)
                .ok_or_else(|| Error::Value(format!("unknown namespace prefix '{}'", prefix)))?;
            Ok(QName::namespaced(namespace, local))
        } else {
            Ok(QName::local(name))
        }
    }

    /// Find a declared prefix for a namespace
    pub fn prefix_for(&self, namespace: &str) -> Option<&str> {
        self.prefixes
            .iter()
            .find(|(_, ns)| ns.as_str() == namespace)
            .map(|(p, _)| p.as_str())
    }
}

static NCNAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}][A-Za-z_\u{C0}-\u{D6}\u{D8}-\u{F6}\u{F8}-\u{2FF}\u{370}-\u{37D}\u{37F}-\u{1FFF}\-.0-9\u{B7}]*$")
        .unwrap()
});

/// Check if a string is a valid NCName (non-colonized name)
pub fn is_ncname(name: &str) -> bool {
    NCNAME.is_match(name)
}

/// Check if a string is a valid QName lexical form
pub fn is_qname(name: &str) -> bool {
    match name.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(name),
    }
}

/// Validate an NCName, erroring on an invalid one
pub fn check_ncname(name: &str) -> Result<()> {
    if is_ncname(name) {
        Ok(())
    } else {
        Err(Error::Value(format!("invalid NCName: '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        let qname = QName::namespaced("http://example.com", "item");
        assert_eq!(qname.to_string(), "{http://example.com}item");
        assert_eq!(QName::local("item").to_string(), "item");
    }

    #[test]
    fn test_qname_from_extended() {
        let qname = QName::from_extended("{http://example.com}item").unwrap();
        assert_eq!(qname.namespace.as_deref(), Some("http://example.com"));
        assert_eq!(qname.local, "item");

        assert_eq!(QName::from_extended("item").unwrap(), QName::local("item"));
        assert!(QName::from_extended("{unterminated").is_err());
        assert!(QName::from_extended("{ns}").is_err());
    }

    #[test]
    fn test_namespace_context_resolve() {
        let mut ctx = NamespaceContext::new();
        ctx.declare("xs", "http://www.w3.org/2001/XMLSchema");
        ctx.set_default("http://example.com");

        let qname = ctx.resolve("xs:element").unwrap();
        assert_eq!(
            qname,
            QName::namespaced("http://www.w3.org/2001/XMLSchema", "element")
        );

        // Unprefixed elements use the default namespace
        assert_eq!(
            ctx.resolve("item").unwrap(),
            QName::namespaced("http://example.com", "item")
        );

        // Unprefixed attributes do not
        assert_eq!(ctx.resolve_attribute("id").unwrap(), QName::local("id"));

        assert!(ctx.resolve("unknown:item").is_err());
    }

    #[test]
    fn test_prefix_for() {
        let mut ctx = NamespaceContext::new();
        ctx.declare("tns", "http://example.com");
        assert_eq!(ctx.prefix_for("http://example.com"), Some("tns"));
        assert_eq!(ctx.prefix_for("http://other.com"), None);
    }

    #[test]
    fn test_ncname_validation() {
        assert!(is_ncname("element"));
        assert!(is_ncname("my-element.x_1"));
        assert!(!is_ncname(""));
        assert!(!is_ncname("123name"));
        assert!(!is_ncname("a:b"));

        assert!(is_qname("xs:element"));
        assert!(!is_qname(":element"));
        assert!(!is_qname("element:"));

        assert!(check_ncname("ok").is_ok());
        assert!(check_ncname("not ok").is_err());
    }
}
