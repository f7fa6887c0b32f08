//! Validation/decode/encode engine
//!
//! A recursive traversal that matches an instance tree (or a structured
//! value, for encode) against a resolved component. Each element visit walks
//! three states: matching the children against the content model, binding
//! attributes against the attribute group, and coercing text through the
//! simple type chain. The strictness mode and default-filling policy live in
//! the [`ValidationContext`](crate::validation::ValidationContext).

pub mod content;
mod decode;
mod encode;

pub use content::{match_content, names_match, ContentMatch, Matched};

use std::collections::HashSet;

use crate::components::{AttributeUse, XsdAnyAttribute, XsdAttribute, XsdAttributeGroup};
use crate::converters::ElementConverter;
use crate::names::QName;
use crate::registry::SchemaRegistry;

/// XML Schema Instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// The engine: a registry plus a converter strategy
///
/// Stateless apart from its borrows; every call is a pure function of
/// (instance, component, mode, registry), so one engine can serve many
/// threads once the registry is resolved.
pub struct Engine<'a> {
    /// The resolved registry
    pub registry: &'a SchemaRegistry,
    /// The converter shaping decoded content
    pub converter: &'a dyn ElementConverter,
    /// Emit `{namespace}local` keys instead of local names
    pub qualified_names: bool,
}

impl<'a> Engine<'a> {
    /// Create an engine over a registry and converter
    pub fn new(registry: &'a SchemaRegistry, converter: &'a dyn ElementConverter) -> Self {
        Self {
            registry,
            converter,
            qualified_names: false,
        }
    }

    /// Use extended `{namespace}local` keys in decoded output
    ///
    /// The default processes namespaces away, leaving bare local names.
    pub fn with_qualified_names(mut self, qualified: bool) -> Self {
        self.qualified_names = qualified;
        self
    }

    /// The output key for an instance name
    pub(crate) fn key(&self, name: &QName) -> String {
        if self.qualified_names {
            name.to_string()
        } else {
            name.local.clone()
        }
    }
}

/// One effective attribute use after reference and group resolution
#[derive(Debug)]
pub(crate) struct AttributeUseDecl<'a> {
    pub name: QName,
    pub decl: &'a XsdAttribute,
    pub use_mode: AttributeUse,
}

/// Flatten an attribute group into its effective attribute uses
///
/// Resolves `ref=` attributes and nested attributeGroup references through
/// the registry. Dangling references are skipped here; resolution already
/// reported them.
pub(crate) fn collect_attribute_uses<'a>(
    group: &'a XsdAttributeGroup,
    registry: &'a SchemaRegistry,
) -> (Vec<AttributeUseDecl<'a>>, Option<&'a XsdAnyAttribute>) {
    let mut uses: Vec<AttributeUseDecl<'a>> = Vec::new();
    let mut wildcard = group.any_attribute.as_ref();
    let mut seen_groups: HashSet<&QName> = HashSet::new();
    let mut stack: Vec<&'a XsdAttributeGroup> = vec![group];

    while let Some(current) = stack.pop() {
        for attribute in current.iter() {
            let resolved = match &attribute.reference {
                Some(reference) => match registry.lookup_attribute(reference) {
                    Some(global) => Some(AttributeUseDecl {
                        name: reference.clone(),
                        decl: global.as_ref(),
                        use_mode: attribute.use_mode,
                    }),
                    None => None,
                },
                None => attribute.info.name.clone().map(|name| AttributeUseDecl {
                    name,
                    decl: attribute,
                    use_mode: attribute.use_mode,
                }),
            };
            if let Some(resolved) = resolved {
                if !uses.iter().any(|u| u.name == resolved.name) {
                    uses.push(resolved);
                }
            }
        }
        if wildcard.is_none() {
            wildcard = current.any_attribute.as_ref();
        }
        for reference in &current.group_refs {
            if seen_groups.insert(reference) {
                if let Some(referenced) = registry.lookup_attribute_group(reference) {
                    stack.push(referenced.as_ref());
                }
            }
        }
    }

    (uses, wildcard)
}
