//! Model groups and content-model particles
//!
//! A model group is a compositor (sequence, choice, all) over particles:
//! local element declarations, wildcards, nested groups and references to
//! named group definitions.

use super::elements::{XsdAnyElement, XsdElement};
use super::particles::Occurs;
use super::{Category, Component, ComponentInfo};
use crate::names::QName;

/// Model group compositor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    /// Ordered content
    #[default]
    Sequence,
    /// Exactly one alternative per occurrence
    Choice,
    /// Unordered content, element particles only
    All,
}

impl ModelType {
    /// Parse from the compositor's local tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "sequence" => Some(Self::Sequence),
            "choice" => Some(Self::Choice),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => write!(f, "sequence"),
            Self::Choice => write!(f, "choice"),
            Self::All => write!(f, "all"),
        }
    }
}

/// A particle of a content model
#[derive(Debug, Clone)]
pub enum Particle {
    /// Local element declaration with occurrence bounds
    Element {
        /// The declaration
        decl: Box<XsdElement>,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// Reference to a global element declaration
    ElementRef {
        /// Referenced element name
        name: QName,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// Element wildcard
    Any {
        /// The wildcard
        wildcard: XsdAnyElement,
        /// Occurrence bounds
        occurs: Occurs,
    },
    /// Nested model group
    Group(Box<XsdGroup>),
    /// Reference to a named model group definition
    GroupRef {
        /// Referenced group name
        name: QName,
        /// Occurrence bounds
        occurs: Occurs,
    },
}

impl Particle {
    /// The particle's occurrence bounds
    pub fn occurs(&self) -> Occurs {
        match self {
            Particle::Element { occurs, .. }
            | Particle::ElementRef { occurs, .. }
            | Particle::Any { occurs, .. }
            | Particle::GroupRef { occurs, .. } => *occurs,
            Particle::Group(group) => group.occurs,
        }
    }

    /// A display name for diagnostics
    pub fn display_name(&self) -> String {
        match self {
            Particle::Element { decl, .. } => decl.qname().to_string(),
            Particle::ElementRef { name, .. } | Particle::GroupRef { name, .. } => name.to_string(),
            Particle::Any { .. } => "xs:any".to_string(),
            Particle::Group(group) => format!("xs:{}", group.model),
        }
    }

    /// Whether this particle can match zero children
    pub fn is_emptiable(&self) -> bool {
        match self {
            Particle::Group(group) => group.is_emptiable(),
            other => other.occurs().is_emptiable(),
        }
    }
}

/// XSD model group
#[derive(Debug, Clone)]
pub struct XsdGroup {
    /// Shared component state (named for global group definitions)
    pub info: ComponentInfo,
    /// The compositor
    pub model: ModelType,
    /// Particles in declaration order
    pub particles: Vec<Particle>,
    /// Occurrence bounds of the group itself
    pub occurs: Occurs,
}

impl XsdGroup {
    /// Create an anonymous group
    pub fn new(model: ModelType) -> Self {
        Self {
            info: ComponentInfo::local(),
            model,
            particles: Vec::new(),
            occurs: Occurs::once(),
        }
    }

    /// Create a named global group definition
    pub fn named(name: QName, model: ModelType) -> Self {
        Self {
            info: ComponentInfo::global(name),
            model,
            particles: Vec::new(),
            occurs: Occurs::once(),
        }
    }

    /// Add a particle
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Add a local element particle
    pub fn push_element(&mut self, decl: XsdElement, occurs: Occurs) {
        self.particles.push(Particle::Element {
            decl: Box::new(decl),
            occurs,
        });
    }

    /// Check if the group has no particles
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Check if the group can match zero children
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.min == 0 || self.particles.is_empty() {
            return true;
        }
        match self.model {
            // A choice is emptiable if any branch is
            ModelType::Choice => self.particles.iter().any(Particle::is_emptiable),
            ModelType::Sequence | ModelType::All => {
                self.particles.iter().all(Particle::is_emptiable)
            }
        }
    }

    /// Qualified names referenced by this group, recursively
    pub fn referenced_names(&self) -> Vec<(Category, QName)> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut Vec<(Category, QName)>) {
        for particle in &self.particles {
            match particle {
                Particle::ElementRef { name, .. } => names.push((Category::Element, name.clone())),
                Particle::GroupRef { name, .. } => names.push((Category::Group, name.clone())),
                Particle::Element { decl, .. } => {
                    if let super::elements::ElementTypeRef::Named(type_name) = &decl.type_ref {
                        names.push((Category::Type, type_name.clone()));
                    }
                }
                Particle::Group(nested) => nested.collect_references(names),
                Particle::Any { .. } => {}
            }
        }
    }
}

impl Component for XsdGroup {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn category(&self) -> Category {
        Category::Group
    }
}
