//! Notation declarations

use std::sync::Arc;

use super::{Category, Component, ComponentInfo};
use crate::documents::Element;
use crate::error::ParseError;
use crate::names::QName;

/// XSD notation declaration
///
/// Notations are always global, must be named and must carry a `public`
/// and/or `system` identifier. Grammar violations are recorded as parse
/// errors so the rest of the schema can still build.
#[derive(Debug, Clone)]
pub struct XsdNotation {
    /// Shared component state
    pub info: ComponentInfo,
    /// Public identifier
    pub public: Option<String>,
    /// System identifier
    pub system: Option<String>,
}

impl XsdNotation {
    /// Create a notation declaration
    pub fn new(name: QName) -> Self {
        Self {
            info: ComponentInfo::global(name),
            public: None,
            system: None,
        }
    }

    /// Set the public identifier
    pub fn with_public(mut self, public: impl Into<String>) -> Self {
        self.public = Some(public.into());
        self
    }

    /// Set the system identifier
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Parse a notation declaration from its schema node
    pub fn parse(
        node: &Element,
        target_namespace: Option<&str>,
        is_global: bool,
    ) -> Self {
        let name = node
            .attribute("name")
            .map(|local| QName::new(target_namespace, local));

        let mut info = match name {
            Some(name) => ComponentInfo::global(name),
            None => ComponentInfo::local(),
        };
        info.global = is_global;
        info.source = Some(Arc::new(node.clone()));

        let mut notation = Self {
            info,
            public: node.attribute("public").map(str::to_string),
            system: node.attribute("system").map(str::to_string),
        };

        if !is_global {
            notation
                .info
                .push_error(ParseError::new("a notation declaration must be global"));
        }
        if notation.info.name.is_none() {
            notation
                .info
                .push_error(ParseError::new("a notation must have a 'name'"));
        }
        if notation.public.is_none() && notation.system.is_none() {
            notation.info.push_error(ParseError::new(
                "a notation must have a 'public' or 'system' attribute",
            ));
        }
        for (attr, _) in &node.attributes {
            if attr.namespace.is_none()
                && !matches!(attr.local.as_str(), "id" | "name" | "public" | "system")
            {
                notation.info.push_error(ParseError::new(format!(
                    "wrong attribute '{}' for notation definition",
                    attr.local
                )));
            }
        }

        notation
    }
}

impl Component for XsdNotation {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Notation
    }
}
