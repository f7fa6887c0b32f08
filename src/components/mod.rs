//! XSD schema components
//!
//! Every declaration and definition parsed from a schema document becomes a
//! component. Components share a [`ComponentInfo`] building block (name,
//! source node, owning document, scope, error list) by composition; the
//! variants themselves form a closed set per category.
//!
//! Cross-component references are registry keys (qualified names), never
//! direct links. They are resolved in the registry's second pass, which is
//! what lets content models reference themselves and each other freely.

pub mod attributes;
pub mod complex_types;
pub mod elements;
pub mod groups;
pub mod notations;
pub mod particles;
pub mod simple_types;

pub use attributes::{AttributeUse, XsdAnyAttribute, XsdAttribute, XsdAttributeGroup};
pub use complex_types::{ContentModel, DerivationMethod, XsdComplexType};
pub use elements::{ElementTypeRef, NamespaceConstraint, ProcessContents, XsdAnyElement, XsdElement};
pub use groups::{ModelType, Particle, XsdGroup};
pub use notations::XsdNotation;
pub use particles::{parse_occurs, Occurs};
pub use simple_types::{SimpleBase, SimpleTypeVariant, XsdSimpleType};

use std::fmt;
use std::sync::Arc;

use crate::documents::Element;
use crate::error::ParseError;
use crate::names::QName;

/// Component category, the registry's lookup axis next to the qualified name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Simple and complex type definitions
    Type,
    /// Element declarations
    Element,
    /// Attribute declarations
    Attribute,
    /// Model group definitions
    Group,
    /// Attribute group definitions
    AttributeGroup,
    /// Notation declarations
    Notation,
}

impl Category {
    /// Human-readable category name, used in diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Type => "type",
            Category::Element => "element",
            Category::Attribute => "attribute",
            Category::Group => "group",
            Category::AttributeGroup => "attributeGroup",
            Category::Notation => "notation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared component state
///
/// Global components carry a qualified name and live in the registry; local
/// components are anonymous and owned by their containing component. The
/// error list collects parse-time diagnostics and is never silently dropped.
#[derive(Debug, Clone, Default)]
pub struct ComponentInfo {
    /// Qualified name, None for anonymous/local components
    pub name: Option<QName>,
    /// Whether this component is a global declaration
    pub global: bool,
    /// Location of the declaring schema document
    pub schema_location: Option<String>,
    /// The originating schema node, for diagnostics only
    pub source: Option<Arc<Element>>,
    /// Parse-time diagnostics attached to this component
    pub errors: Vec<ParseError>,
}

impl ComponentInfo {
    /// Info for a global component
    pub fn global(name: QName) -> Self {
        Self {
            name: Some(name),
            global: true,
            ..Self::default()
        }
    }

    /// Info for an anonymous local component
    pub fn local() -> Self {
        Self::default()
    }

    /// Set the source node
    pub fn with_source(mut self, source: Arc<Element>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the owning schema location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.schema_location = Some(location.into());
        self
    }

    /// Record a parse error on this component
    pub fn push_error(&mut self, mut error: ParseError) {
        if error.component.is_none() {
            if let Some(ref name) = self.name {
                error = error.with_component(name.to_string());
            }
        }
        if error.location.is_none() {
            if let Some(ref location) = self.schema_location {
                error = error.with_location(location.clone());
            }
        }
        self.errors.push(error);
    }

    /// The component name as a display string, for diagnostics
    pub fn display_name(&self) -> String {
        match self.name {
            Some(ref name) => name.to_string(),
            None => "(anonymous)".to_string(),
        }
    }
}

/// Common accessors every component exposes
pub trait Component {
    /// Shared component state
    fn info(&self) -> &ComponentInfo;

    /// The component category
    fn category(&self) -> Category;

    /// Qualified name, None for anonymous components
    fn name(&self) -> Option<&QName> {
        self.info().name.as_ref()
    }

    /// Whether this is a global component
    fn is_global(&self) -> bool {
        self.info().global
    }

    /// Parse errors attached to this component
    fn errors(&self) -> &[ParseError] {
        &self.info().errors
    }

    /// Whether any parse errors are attached
    fn has_errors(&self) -> bool {
        !self.info().errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(Category::Type.to_string(), "type");
        assert_eq!(Category::AttributeGroup.to_string(), "attributeGroup");
    }

    #[test]
    fn test_component_info_error_context() {
        let mut info = ComponentInfo::global(QName::namespaced("urn:t", "Thing"))
            .with_location("schema.xsd");
        info.push_error(ParseError::new("bad attribute"));

        assert_eq!(info.errors.len(), 1);
        assert_eq!(info.errors[0].component.as_deref(), Some("{urn:t}Thing"));
        assert_eq!(info.errors[0].location.as_deref(), Some("schema.xsd"));
    }

    #[test]
    fn test_local_info_is_anonymous() {
        let info = ComponentInfo::local();
        assert!(!info.global);
        assert!(info.name.is_none());
        assert_eq!(info.display_name(), "(anonymous)");
    }
}
