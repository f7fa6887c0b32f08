//! Simple type definitions
//!
//! A simple type is one of four varieties: an atomic primitive, a list over
//! an item type, a union over member types, or a restriction of a base type
//! with additional facets. Referents are either registry keys (qualified
//! names, resolved after all documents are parsed) or inline anonymous types
//! owned by this definition.

use super::{Category, Component, ComponentInfo};
use crate::builtins::Primitive;
use crate::facets::Facet;
use crate::names::QName;

/// A reference to another simple type: by name, or declared in place
#[derive(Debug, Clone)]
pub enum SimpleBase {
    /// Named type, resolved through the registry
    Named(QName),
    /// Inline anonymous simple type
    Inline(Box<XsdSimpleType>),
}

impl SimpleBase {
    /// The referenced name, if this is a named reference
    pub fn name(&self) -> Option<&QName> {
        match self {
            SimpleBase::Named(name) => Some(name),
            SimpleBase::Inline(_) => None,
        }
    }
}

/// The variety of a simple type
#[derive(Debug, Clone)]
pub enum SimpleTypeVariant {
    /// Atomic type backed directly by a built-in primitive
    Atomic {
        /// The backing primitive
        primitive: &'static Primitive,
    },
    /// Whitespace-separated list of item values
    List {
        /// The item type
        item_type: SimpleBase,
    },
    /// Union of alternatives; the first matching member wins
    Union {
        /// Member types in declared order
        member_types: Vec<SimpleBase>,
    },
    /// Restriction of a base type with extra facets
    Restriction {
        /// The restricted base type
        base: SimpleBase,
        /// Facets declared at this derivation level
        facets: Vec<Facet>,
    },
}

/// XSD simple type definition
#[derive(Debug, Clone)]
pub struct XsdSimpleType {
    /// Shared component state
    pub info: ComponentInfo,
    /// The type's variety
    pub variant: SimpleTypeVariant,
}

impl XsdSimpleType {
    /// Create a global simple type
    pub fn global(name: QName, variant: SimpleTypeVariant) -> Self {
        Self {
            info: ComponentInfo::global(name),
            variant,
        }
    }

    /// Create an anonymous local simple type
    pub fn local(variant: SimpleTypeVariant) -> Self {
        Self {
            info: ComponentInfo::local(),
            variant,
        }
    }

    /// The base type name, for restrictions of named bases
    pub fn base_name(&self) -> Option<&QName> {
        match &self.variant {
            SimpleTypeVariant::Restriction { base, .. } => base.name(),
            _ => None,
        }
    }

    /// The facets declared at this level, for restrictions
    pub fn facets(&self) -> &[Facet] {
        match &self.variant {
            SimpleTypeVariant::Restriction { facets, .. } => facets,
            _ => &[],
        }
    }

    /// Names referenced by this type, recursively through inline types
    pub fn referenced_types(&self) -> Vec<QName> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut Vec<QName>) {
        let mut visit = |base: &SimpleBase| match base {
            SimpleBase::Named(name) => names.push(name.clone()),
            SimpleBase::Inline(inner) => inner.collect_references(names),
        };
        match &self.variant {
            SimpleTypeVariant::Atomic { .. } => {}
            SimpleTypeVariant::List { item_type } => visit(item_type),
            SimpleTypeVariant::Union { member_types } => member_types.iter().for_each(visit),
            SimpleTypeVariant::Restriction { base, .. } => visit(base),
        }
    }
}

impl Component for XsdSimpleType {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Type
    }
}
