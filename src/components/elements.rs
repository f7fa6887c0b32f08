//! Element declarations and element wildcards

use super::complex_types::XsdComplexType;
use super::simple_types::XsdSimpleType;
use super::{Category, Component, ComponentInfo};
use crate::names::QName;

/// How an element declaration refers to its type
#[derive(Debug, Clone)]
pub enum ElementTypeRef {
    /// Named type, resolved through the registry
    Named(QName),
    /// Inline anonymous simple type
    InlineSimple(Box<XsdSimpleType>),
    /// Inline anonymous complex type
    InlineComplex(Box<XsdComplexType>),
    /// No type given: anyType, accepts anything
    AnyType,
}

/// XSD element declaration
#[derive(Debug, Clone)]
pub struct XsdElement {
    /// Shared component state
    pub info: ComponentInfo,
    /// The element's type
    pub type_ref: ElementTypeRef,
    /// Whether xsi:nil="true" is accepted
    pub nillable: bool,
    /// Whether the element is abstract
    pub abstract_element: bool,
    /// Default value (simple content)
    pub default: Option<String>,
    /// Fixed value (simple content)
    pub fixed: Option<String>,
}

impl XsdElement {
    /// Create an element declaration
    pub fn new(info: ComponentInfo, type_ref: ElementTypeRef) -> Self {
        Self {
            info,
            type_ref,
            nillable: false,
            abstract_element: false,
            default: None,
            fixed: None,
        }
    }

    /// Create a global element with a named type
    pub fn global(name: QName, type_name: QName) -> Self {
        Self::new(ComponentInfo::global(name), ElementTypeRef::Named(type_name))
    }

    /// Create a local element declaration
    pub fn local(name: QName, type_ref: ElementTypeRef) -> Self {
        let mut info = ComponentInfo::local();
        info.name = Some(name);
        Self::new(info, type_ref)
    }

    /// Set nillable
    pub fn with_nillable(mut self, nillable: bool) -> Self {
        self.nillable = nillable;
        self
    }

    /// Set the default value
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Set the fixed value
    pub fn with_fixed(mut self, fixed: impl Into<String>) -> Self {
        self.fixed = Some(fixed.into());
        self
    }

    /// The effective value constraint: fixed wins over default
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }

    /// The declared name
    ///
    /// Element declarations always carry a name; references are resolved
    /// before a declaration is stored.
    pub fn qname(&self) -> &QName {
        self.info.name.as_ref().expect("element declaration has a name")
    }
}

impl Component for XsdElement {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Element
    }
}

/// Namespace constraint of a wildcard
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceConstraint {
    /// Any namespace (##any)
    Any,
    /// Any namespace other than the target namespace (##other)
    Other {
        /// The target namespace the wildcard excludes
        target: Option<String>,
    },
    /// An explicit list; None entries mean "no namespace"
    Items(Vec<Option<String>>),
}

impl NamespaceConstraint {
    /// Parse the `namespace` attribute of a wildcard
    pub fn parse(value: &str, target_namespace: Option<&str>) -> Self {
        match value {
            "##any" => Self::Any,
            "##other" => Self::Other {
                target: target_namespace.map(str::to_string),
            },
            _ => {
                let items = value
                    .split_whitespace()
                    .map(|token| match token {
                        "##local" => None,
                        "##targetNamespace" => target_namespace.map(str::to_string),
                        uri => Some(uri.to_string()),
                    })
                    .collect();
                Self::Items(items)
            }
        }
    }

    /// Check whether a namespace satisfies this constraint
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Other { target } => match namespace {
                None => false,
                Some(ns) => target.as_deref() != Some(ns),
            },
            Self::Items(items) => items.iter().any(|item| item.as_deref() == namespace),
        }
    }
}

/// How wildcard-matched content is validated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// A matching declaration must exist and validate
    #[default]
    Strict,
    /// Validate when a declaration is available
    Lax,
    /// Accept without validation
    Skip,
}

impl ProcessContents {
    /// Parse from the `processContents` attribute value
    pub fn from_value(s: &str) -> Option<Self> {
        match s {
            "strict" => Some(Self::Strict),
            "lax" => Some(Self::Lax),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Element wildcard (xs:any)
#[derive(Debug, Clone)]
pub struct XsdAnyElement {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// How matched elements are validated
    pub process_contents: ProcessContents,
}

impl Default for XsdAnyElement {
    fn default() -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
        }
    }
}

impl XsdAnyElement {
    /// Check whether this wildcard matches an element name
    pub fn matches(&self, name: &QName) -> bool {
        self.namespace.matches(name.namespace.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_value_constraint() {
        let elem = XsdElement::global(QName::local("e"), QName::local("T")).with_default("d");
        assert_eq!(elem.value_constraint(), Some("d"));

        let elem = XsdElement::global(QName::local("e"), QName::local("T"))
            .with_default("d")
            .with_fixed("f");
        assert_eq!(elem.value_constraint(), Some("f"));
    }

    #[test]
    fn test_namespace_constraint_any() {
        let constraint = NamespaceConstraint::parse("##any", Some("urn:t"));
        assert!(constraint.matches(Some("urn:other")));
        assert!(constraint.matches(None));
    }

    #[test]
    fn test_namespace_constraint_other() {
        let constraint = NamespaceConstraint::parse("##other", Some("urn:t"));
        assert!(constraint.matches(Some("urn:x")));
        assert!(!constraint.matches(Some("urn:t")));
        assert!(!constraint.matches(None));
    }

    #[test]
    fn test_namespace_constraint_items() {
        let constraint = NamespaceConstraint::parse("urn:a ##local", Some("urn:t"));
        assert!(constraint.matches(Some("urn:a")));
        assert!(constraint.matches(None));
        assert!(!constraint.matches(Some("urn:t")));

        let constraint = NamespaceConstraint::parse("##targetNamespace", Some("urn:t"));
        assert!(constraint.matches(Some("urn:t")));
        assert!(!constraint.matches(Some("urn:x")));
    }

    #[test]
    fn test_wildcard_match() {
        let wildcard = XsdAnyElement {
            namespace: NamespaceConstraint::parse("##other", Some("urn:t")),
            process_contents: ProcessContents::Lax,
        };
        assert!(wildcard.matches(&QName::namespaced("urn:x", "free")));
        assert!(!wildcard.matches(&QName::namespaced("urn:t", "claimed")));
    }

    #[test]
    fn test_process_contents_parse() {
        assert_eq!(ProcessContents::from_value("lax"), Some(ProcessContents::Lax));
        assert_eq!(ProcessContents::from_value("skip"), Some(ProcessContents::Skip));
        assert_eq!(ProcessContents::from_value("other"), None);
    }
}
