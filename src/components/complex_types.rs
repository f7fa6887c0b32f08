//! Complex type definitions

use super::attributes::XsdAttributeGroup;
use super::groups::XsdGroup;
use super::{Category, Component, ComponentInfo};
use crate::names::QName;

/// Derivation method for complex types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Derived by restriction
    Restriction,
    /// Derived by extension
    Extension,
}

impl DerivationMethod {
    /// Parse from the derivation element's local tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "restriction" => Some(Self::Restriction),
            "extension" => Some(Self::Extension),
            _ => None,
        }
    }
}

impl std::fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Restriction => write!(f, "restriction"),
            Self::Extension => write!(f, "extension"),
        }
    }
}

/// The content of a complex type
#[derive(Debug, Clone)]
pub enum ContentModel {
    /// No children and no text
    Empty,
    /// Text-only content typed by a simple type (by name)
    Simple(QName),
    /// Child elements constrained by a model group
    Group(XsdGroup),
}

impl ContentModel {
    /// Get the model group, if the content is a group
    pub fn as_group(&self) -> Option<&XsdGroup> {
        match self {
            ContentModel::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Get the simple content type name, if any
    pub fn as_simple(&self) -> Option<&QName> {
        match self {
            ContentModel::Simple(name) => Some(name),
            _ => None,
        }
    }

    /// Check if the content model admits an element with no children
    pub fn is_emptiable(&self) -> bool {
        match self {
            ContentModel::Empty => true,
            ContentModel::Simple(_) => false,
            ContentModel::Group(group) => group.is_emptiable(),
        }
    }
}

/// XSD complex type definition
#[derive(Debug, Clone)]
pub struct XsdComplexType {
    /// Shared component state
    pub info: ComponentInfo,
    /// The content model
    pub content: ContentModel,
    /// Attribute declarations of this type
    pub attributes: XsdAttributeGroup,
    /// Base type name, for derived types
    pub base: Option<QName>,
    /// Derivation method, when derived
    pub derivation: Option<DerivationMethod>,
    /// Whether text may be interleaved with child elements
    pub mixed: bool,
    /// Whether the type is abstract
    pub abstract_type: bool,
}

impl XsdComplexType {
    /// Create a complex type with the given content
    pub fn new(info: ComponentInfo, content: ContentModel) -> Self {
        Self {
            info,
            content,
            attributes: XsdAttributeGroup::anonymous(),
            base: None,
            derivation: None,
            mixed: false,
            abstract_type: false,
        }
    }

    /// Create a named global complex type
    pub fn global(name: QName, content: ContentModel) -> Self {
        Self::new(ComponentInfo::global(name), content)
    }

    /// Create an anonymous local complex type
    pub fn local(content: ContentModel) -> Self {
        Self::new(ComponentInfo::local(), content)
    }

    /// Create an empty complex type
    pub fn empty(info: ComponentInfo) -> Self {
        Self::new(info, ContentModel::Empty)
    }

    /// Set the base type and derivation method
    pub fn with_base(mut self, base: QName, method: DerivationMethod) -> Self {
        self.base = Some(base);
        self.derivation = Some(method);
        self
    }

    /// Check if content is empty
    pub fn is_empty(&self) -> bool {
        matches!(self.content, ContentModel::Empty)
            || self.content.as_group().is_some_and(XsdGroup::is_empty)
    }

    /// Check if this type has simple (text-only) content
    pub fn has_simple_content(&self) -> bool {
        self.content.as_simple().is_some()
    }
}

impl Component for XsdComplexType {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::elements::{ElementTypeRef, XsdElement};
    use crate::components::groups::ModelType;
    use crate::components::particles::Occurs;

    #[test]
    fn test_empty_type() {
        let ct = XsdComplexType::empty(ComponentInfo::global(QName::local("Empty")));
        assert!(ct.is_empty());
        assert!(!ct.has_simple_content());
        assert!(ct.content.is_emptiable());
    }

    #[test]
    fn test_simple_content() {
        let ct = XsdComplexType::global(
            QName::local("Measure"),
            ContentModel::Simple(QName::local("decimal")),
        );
        assert!(ct.has_simple_content());
        assert!(!ct.content.is_emptiable());
        assert_eq!(ct.content.as_simple(), Some(&QName::local("decimal")));
    }

    #[test]
    fn test_group_content() {
        let mut group = XsdGroup::new(ModelType::Sequence);
        group.push_element(
            XsdElement::local(QName::local("child"), ElementTypeRef::AnyType),
            Occurs::once(),
        );
        let ct = XsdComplexType::global(QName::local("Parent"), ContentModel::Group(group));
        assert!(!ct.is_empty());
        assert!(ct.content.as_group().is_some());
    }

    #[test]
    fn test_derivation() {
        let ct = XsdComplexType::local(ContentModel::Empty)
            .with_base(QName::local("Base"), DerivationMethod::Extension);
        assert_eq!(ct.base, Some(QName::local("Base")));
        assert_eq!(ct.derivation, Some(DerivationMethod::Extension));
        assert_eq!(DerivationMethod::from_tag("restriction"), Some(DerivationMethod::Restriction));
        assert_eq!(DerivationMethod::from_tag("union"), None);
    }

    #[test]
    fn test_recursive_content_is_representable() {
        // A type whose content references itself by name builds without
        // eager embedding; the registry resolves the key later.
        let name = QName::local("Tree");
        let mut group = XsdGroup::new(ModelType::Sequence);
        group.push_element(
            XsdElement::local(
                QName::local("branch"),
                ElementTypeRef::Named(name.clone()),
            ),
            Occurs::zero_or_more(),
        );
        let ct = XsdComplexType::global(name.clone(), ContentModel::Group(group));
        let refs = ct.content.as_group().unwrap().referenced_names();
        assert!(refs.contains(&(Category::Type, name)));
    }
}
