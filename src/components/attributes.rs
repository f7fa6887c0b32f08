//! Attribute declarations and attribute groups

use indexmap::IndexMap;

use super::elements::{NamespaceConstraint, ProcessContents};
use super::simple_types::XsdSimpleType;
use super::{Category, Component, ComponentInfo};
use crate::error::{Error, Result};
use crate::names::QName;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// Attribute may be present (default)
    #[default]
    Optional,
    /// Attribute must be present
    Required,
    /// Attribute must not be present
    Prohibited,
}

impl AttributeUse {
    /// Parse from the `use` attribute value
    pub fn from_value(s: &str) -> Result<Self> {
        match s {
            "optional" => Ok(Self::Optional),
            "required" => Ok(Self::Required),
            "prohibited" => Ok(Self::Prohibited),
            _ => Err(Error::Value(format!("invalid attribute use: '{}'", s))),
        }
    }
}

/// XSD attribute declaration
#[derive(Debug, Clone)]
pub struct XsdAttribute {
    /// Shared component state
    pub info: ComponentInfo,
    /// Named type reference, resolved through the registry
    pub type_ref: Option<QName>,
    /// Inline anonymous simple type, when declared in place
    pub inline_type: Option<Box<XsdSimpleType>>,
    /// Reference to a global attribute declaration (`ref=`)
    pub reference: Option<QName>,
    /// Use mode
    pub use_mode: AttributeUse,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
}

impl XsdAttribute {
    /// Create an attribute declaration
    pub fn new(info: ComponentInfo) -> Self {
        Self {
            info,
            type_ref: None,
            inline_type: None,
            reference: None,
            use_mode: AttributeUse::default(),
            default: None,
            fixed: None,
        }
    }

    /// Create a global attribute with a named type
    pub fn global(name: QName, type_ref: QName) -> Self {
        let mut attr = Self::new(ComponentInfo::global(name));
        attr.type_ref = Some(type_ref);
        attr
    }

    /// Create a local attribute with a named type
    pub fn local(name: QName, type_ref: QName) -> Self {
        let mut info = ComponentInfo::local();
        info.name = Some(name);
        let mut attr = Self::new(info);
        attr.type_ref = Some(type_ref);
        attr
    }

    /// Set the use mode
    pub fn with_use(mut self, use_mode: AttributeUse) -> Self {
        self.use_mode = use_mode;
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

    /// Whether the attribute must be present
    pub fn is_required(&self) -> bool {
        self.use_mode == AttributeUse::Required
    }

    /// The effective value constraint: fixed wins over default
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }
}

impl Component for XsdAttribute {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Attribute
    }
}

/// Attribute wildcard (xs:anyAttribute)
#[derive(Debug, Clone)]
pub struct XsdAnyAttribute {
    /// Namespace constraint
    pub namespace: NamespaceConstraint,
    /// How matched attributes are validated
    pub process_contents: ProcessContents,
}

impl Default for XsdAnyAttribute {
    fn default() -> Self {
        Self {
            namespace: NamespaceConstraint::Any,
            process_contents: ProcessContents::Strict,
        }
    }
}

/// Attribute group: the attribute surface of a complex type or a named
/// reusable group definition
#[derive(Debug, Clone, Default)]
pub struct XsdAttributeGroup {
    /// Shared component state (anonymous for inline groups)
    pub info: ComponentInfo,
    /// Declared attributes, keyed by qualified name, in declaration order
    pub attributes: IndexMap<QName, XsdAttribute>,
    /// References to named attribute groups, resolved by the registry
    pub group_refs: Vec<QName>,
    /// Attribute wildcard, if declared
    pub any_attribute: Option<XsdAnyAttribute>,
}

impl XsdAttributeGroup {
    /// Create an anonymous attribute group
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Create a named attribute group definition
    pub fn named(name: QName) -> Self {
        Self {
            info: ComponentInfo::global(name),
            ..Self::default()
        }
    }

    /// Add an attribute declaration; a duplicate name is an error
    pub fn add_attribute(&mut self, attribute: XsdAttribute) -> Result<()> {
        let name = attribute
            .info
            .name
            .clone()
            .or_else(|| attribute.reference.clone())
            .ok_or_else(|| Error::Value("attribute declaration has no name".to_string()))?;
        if self.attributes.contains_key(&name) {
            return Err(Error::Value(format!(
                "duplicate attribute declaration '{}'",
                name
            )));
        }
        self.attributes.insert(name, attribute);
        Ok(())
    }

    /// Get a declared attribute by name
    pub fn get(&self, name: &QName) -> Option<&XsdAttribute> {
        self.attributes.get(name)
    }

    /// Iterate over declared attributes
    pub fn iter(&self) -> impl Iterator<Item = &XsdAttribute> {
        self.attributes.values()
    }

    /// Whether the group has any content at all
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.group_refs.is_empty() && self.any_attribute.is_none()
    }

    /// Names of required attributes
    pub fn required(&self) -> impl Iterator<Item = &QName> {
        self.attributes
            .iter()
            .filter(|(_, a)| a.is_required())
            .map(|(name, _)| name)
    }
}

impl Component for XsdAttributeGroup {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::AttributeGroup
    }
}
