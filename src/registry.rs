//! Global schema registry
//!
//! The registry holds every global component of an include/import/redefine
//! closure, keyed by category and qualified name. It is built in two phases:
//! documents are added one by one (pass 1 output), then `resolve()` turns
//! name references into checked links, detects derivation cycles, and
//! precomputes the effective constraints of every named simple type. After
//! `resolve()` the registry is read-only and safe to share across threads.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::builder::{SchemaDocument, TypeDef};
use crate::builtins::{Primitive, XsdValue};
use crate::components::{
    Category, Component, SimpleBase, SimpleTypeVariant, XsdAttribute, XsdAttributeGroup,
    XsdComplexType, XsdElement, XsdGroup, XsdNotation, XsdSimpleType,
};
use crate::error::{Error, NotBuiltError, ParseError, Result, ValidationError};
use crate::facets::{compose_restriction, EffectiveConstraints, WhiteSpace};
use crate::locations::normalize_location;
use crate::names::QName;
use crate::XSD_NAMESPACE;

/// A global type: built-in primitive, simple or complex definition
#[derive(Debug, Clone)]
pub enum XsdType {
    /// Built-in primitive from the XSD namespace
    Builtin(&'static Primitive),
    /// Simple type definition
    Simple(Arc<XsdSimpleType>),
    /// Complex type definition
    Complex(Arc<XsdComplexType>),
}

impl XsdType {
    /// Check if this is a simple type (built-ins included)
    pub fn is_simple(&self) -> bool {
        !matches!(self, XsdType::Complex(_))
    }

    /// Get the complex type definition, if any
    pub fn as_complex(&self) -> Option<&Arc<XsdComplexType>> {
        match self {
            XsdType::Complex(ct) => Some(ct),
            _ => None,
        }
    }
}

/// How the engine refers to a simple type: by name or inline definition
#[derive(Debug, Clone, Copy)]
pub enum SimpleHandle<'a> {
    /// A named type in the registry
    Named(&'a QName),
    /// An inline anonymous definition
    Inline(&'a XsdSimpleType),
}

/// The bottom of a restriction chain
#[derive(Debug, Clone)]
enum ChainRoot {
    Atomic(&'static Primitive),
    List(SimpleBase),
    Union(Vec<SimpleBase>),
}

/// A simple type resolved down to its primitive with composed constraints
#[derive(Debug)]
struct ResolvedChain {
    root: ChainRoot,
    constraints: EffectiveConstraints,
}

/// The global component registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    /// Global type definitions (built-ins included)
    pub types: IndexMap<QName, XsdType>,
    /// Global element declarations
    pub elements: IndexMap<QName, Arc<XsdElement>>,
    /// Global attribute declarations
    pub attributes: IndexMap<QName, Arc<XsdAttribute>>,
    /// Named model group definitions
    pub groups: IndexMap<QName, Arc<XsdGroup>>,
    /// Named attribute group definitions
    pub attribute_groups: IndexMap<QName, Arc<XsdAttributeGroup>>,
    /// Notation declarations
    pub notations: IndexMap<QName, XsdNotation>,
    /// Originals displaced by xs:redefine, reachable as redefined bases
    redefined_types: IndexMap<QName, XsdType>,
    /// Composed constraint chains of named simple types
    chains: HashMap<QName, Arc<ResolvedChain>>,
    /// Normalized locations already processed (document cycle guard)
    seen_locations: HashSet<String>,
    /// Errors collected while adding documents and resolving
    errors: Vec<Error>,
    built: bool,
}

impl SchemaRegistry {
    /// Create a registry pre-populated with the built-in types
    pub fn new() -> Self {
        let mut registry = Self::default();
        for primitive in crate::builtins::BUILTIN_TYPES {
            registry.types.insert(
                QName::namespaced(XSD_NAMESPACE, primitive.name),
                XsdType::Builtin(primitive),
            );
        }
        registry
    }

    /// Whether `resolve()` has completed
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// All errors collected so far
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    /// Check whether a normalized location was already processed
    ///
    /// Marks the location as seen. Returns true the first time.
    pub fn mark_location(&mut self, location: &str, base: Option<&str>) -> bool {
        let normalized = normalize_location(location, base);
        self.seen_locations.insert(normalized)
    }

    /// Add one parsed schema document's globals (pass 1 output)
    ///
    /// Returns the parse errors found for this document. Redefine directives
    /// expect their target document to have been added beforehand; the
    /// replaced originals stay reachable through [`Self::redefined_base`].
    pub fn add_document(&mut self, document: &SchemaDocument) -> Vec<ParseError> {
        let mut errors = document.all_errors();
        if self.built {
            errors.push(ParseError::new(
                "registry is already resolved and cannot accept new documents",
            ));
            return errors;
        }

        for ty in &document.types {
            self.register_type(ty, false, &mut errors);
        }
        for redefine in &document.redefines {
            for ty in &redefine.types {
                self.register_type(ty, true, &mut errors);
            }
            for group in &redefine.groups {
                if let Some(name) = group.name().cloned() {
                    self.groups.insert(name, Arc::new(group.clone()));
                }
            }
            for group in &redefine.attribute_groups {
                if let Some(name) = group.name().cloned() {
                    self.attribute_groups.insert(name, Arc::new(group.clone()));
                }
            }
        }

        for element in &document.elements {
            let Some(name) = element.name().cloned() else {
                continue;
            };
            if self.elements.contains_key(&name) {
                errors.push(duplicate_error(Category::Element, &name));
            } else {
                self.elements.insert(name, Arc::new(element.clone()));
            }
        }
        for attribute in &document.attributes {
            let Some(name) = attribute.name().cloned() else {
                continue;
            };
            if self.attributes.contains_key(&name) {
                errors.push(duplicate_error(Category::Attribute, &name));
            } else {
                self.attributes.insert(name, Arc::new(attribute.clone()));
            }
        }
        for group in &document.groups {
            let Some(name) = group.name().cloned() else {
                continue;
            };
            if self.groups.contains_key(&name) {
                errors.push(duplicate_error(Category::Group, &name));
            } else {
                self.groups.insert(name, Arc::new(group.clone()));
            }
        }
        for group in &document.attribute_groups {
            let Some(name) = group.name().cloned() else {
                continue;
            };
            if self.attribute_groups.contains_key(&name) {
                errors.push(duplicate_error(Category::AttributeGroup, &name));
            } else {
                self.attribute_groups.insert(name, Arc::new(group.clone()));
            }
        }
        for notation in &document.notations {
            let Some(name) = notation.name().cloned() else {
                continue;
            };
            if self.notations.contains_key(&name) {
                errors.push(duplicate_error(Category::Notation, &name));
            } else {
                self.notations.insert(name, notation.clone());
            }
        }

        self.errors
            .extend(errors.iter().cloned().map(Error::Parse));
        errors
    }

    fn register_type(&mut self, ty: &TypeDef, redefining: bool, errors: &mut Vec<ParseError>) {
        let Some(name) = ty.name().cloned() else {
            return;
        };
        let value = match ty {
            TypeDef::Simple(st) => XsdType::Simple(Arc::new(st.clone())),
            TypeDef::Complex(ct) => XsdType::Complex(Arc::new(ct.clone())),
        };
        match self.types.get(&name) {
            Some(_) if redefining => {
                let original = self.types.insert(name.clone(), value).expect("checked above");
                self.redefined_types.insert(name, original);
            }
            Some(_) => errors.push(duplicate_error(Category::Type, &name)),
            None => {
                if redefining {
                    errors.push(
                        ParseError::new("redefined component was not found in the loaded documents")
                            .with_component(name.to_string()),
                    );
                }
                self.types.insert(name, value);
            }
        }
    }

    // ========== Lookups ==========

    /// Look up a global type
    pub fn lookup_type(&self, name: &QName) -> Option<&XsdType> {
        self.types.get(name)
    }

    /// Look up a global element declaration
    pub fn lookup_element(&self, name: &QName) -> Option<&Arc<XsdElement>> {
        self.elements.get(name)
    }

    /// Look up a global attribute declaration
    pub fn lookup_attribute(&self, name: &QName) -> Option<&Arc<XsdAttribute>> {
        self.attributes.get(name)
    }

    /// Look up a named model group
    pub fn lookup_group(&self, name: &QName) -> Option<&Arc<XsdGroup>> {
        self.groups.get(name)
    }

    /// Look up a named attribute group
    pub fn lookup_attribute_group(&self, name: &QName) -> Option<&Arc<XsdAttributeGroup>> {
        self.attribute_groups.get(name)
    }

    /// Look up a notation declaration
    pub fn lookup_notation(&self, name: &QName) -> Option<&XsdNotation> {
        self.notations.get(name)
    }

    /// The original definition displaced by a redefine, if any
    pub fn redefined_base(&self, name: &QName) -> Option<&XsdType> {
        self.redefined_types.get(name)
    }

    // ========== Resolution (pass 2) ==========

    /// Resolve all name references and precompute simple type chains
    ///
    /// Unresolvable references are reported as [`NotBuiltError`]s attached to
    /// the referencing component; the rest of the registry stays usable.
    pub fn resolve(&mut self) -> &[Error] {
        if self.built {
            return &self.errors;
        }
        let before = self.errors.len();
        let mut errors: Vec<Error> = Vec::new();

        // Simple type chains: cycles, facet legality, effective constraints
        let simple_types: Vec<(QName, Arc<XsdSimpleType>)> = self
            .types
            .iter()
            .filter_map(|(name, ty)| match ty {
                XsdType::Simple(st) => Some((name.clone(), Arc::clone(st))),
                _ => None,
            })
            .collect();
        for (name, st) in &simple_types {
            let mut visiting = HashSet::new();
            visiting.insert(name.clone());
            match self.compose_chain(st, &mut visiting) {
                Ok((chain, parse_errors)) => {
                    errors.extend(parse_errors.into_iter().map(|e| {
                        Error::Parse(e.with_component(name.to_string()))
                    }));
                    self.chains.insert(name.clone(), Arc::new(chain));
                }
                Err(e) => errors.push(e),
            }
            for referenced in st.referenced_types() {
                if !self.types.contains_key(&referenced) {
                    errors.push(not_built(Category::Type, &referenced, name));
                }
            }
        }

        // Complex types: base chains and content model references
        let complex_types: Vec<(QName, Arc<XsdComplexType>)> = self
            .types
            .iter()
            .filter_map(|(name, ty)| match ty {
                XsdType::Complex(ct) => Some((name.clone(), Arc::clone(ct))),
                _ => None,
            })
            .collect();
        for (name, ct) in &complex_types {
            self.check_complex_derivation(name, &mut errors);
            self.check_complex_type(ct, name, &mut errors);
        }

        let elements: Vec<(QName, Arc<XsdElement>)> = self
            .elements
            .iter()
            .map(|(name, elem)| (name.clone(), Arc::clone(elem)))
            .collect();
        for (name, element) in &elements {
            self.check_element(element, name, &mut errors);
        }

        let groups: Vec<(QName, Arc<XsdGroup>)> = self
            .groups
            .iter()
            .map(|(name, group)| (name.clone(), Arc::clone(group)))
            .collect();
        for (name, group) in &groups {
            self.check_group(group, name, &mut errors);
        }

        let attribute_groups: Vec<(QName, Arc<XsdAttributeGroup>)> = self
            .attribute_groups
            .iter()
            .map(|(name, group)| (name.clone(), Arc::clone(group)))
            .collect();
        for (name, group) in &attribute_groups {
            self.check_attribute_group(group, name, &mut errors);
        }
        let attributes: Vec<(QName, Arc<XsdAttribute>)> = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.clone(), Arc::clone(attr)))
            .collect();
        for (name, attribute) in &attributes {
            self.check_attribute(attribute, name, &mut errors);
        }

        self.errors.extend(errors);
        self.built = true;
        &self.errors[before.min(self.errors.len())..]
    }

    fn check_complex_derivation(&self, name: &QName, errors: &mut Vec<Error>) {
        let mut visited = HashSet::new();
        let mut current = name.clone();
        loop {
            if !visited.insert(current.clone()) {
                errors.push(Error::Parse(
                    ParseError::new(format!(
                        "circular derivation detected for type '{}'",
                        name
                    ))
                    .with_component(name.to_string()),
                ));
                return;
            }
            match self.types.get(&current) {
                Some(XsdType::Complex(ct)) => match &ct.base {
                    Some(base) => current = base.clone(),
                    None => return,
                },
                Some(XsdType::Simple(st)) => match st.base_name() {
                    Some(base) => current = base.clone(),
                    None => return,
                },
                // Built-in reached or dangling (reported elsewhere)
                _ => return,
            }
        }
    }

    fn check_complex_type(&self, ct: &XsdComplexType, referrer: &QName, errors: &mut Vec<Error>) {
        if let Some(ref base) = ct.base {
            if !self.types.contains_key(base) && self.redefined_base(base).is_none() {
                errors.push(not_built(Category::Type, base, referrer));
            }
        }
        if let Some(group) = ct.content.as_group() {
            self.check_group(group, referrer, errors);
        }
        self.check_attribute_group(&ct.attributes, referrer, errors);
    }

    fn check_group(&self, group: &XsdGroup, referrer: &QName, errors: &mut Vec<Error>) {
        for (category, name) in group.referenced_names() {
            let found = match category {
                Category::Type => self.types.contains_key(&name),
                Category::Element => self.elements.contains_key(&name),
                Category::Group => self.groups.contains_key(&name),
                _ => true,
            };
            if !found {
                errors.push(not_built(category, &name, referrer));
            }
        }
        // Inline types of local element declarations
        for particle in &group.particles {
            match particle {
                crate::components::Particle::Element { decl, .. } => {
                    self.check_element(decl, referrer, errors)
                }
                crate::components::Particle::Group(nested) => {
                    self.check_group(nested, referrer, errors)
                }
                _ => {}
            }
        }
    }

    fn check_element(&self, element: &XsdElement, referrer: &QName, errors: &mut Vec<Error>) {
        match &element.type_ref {
            crate::components::ElementTypeRef::Named(type_name) => {
                if !self.types.contains_key(type_name) {
                    errors.push(not_built(Category::Type, type_name, referrer));
                }
            }
            crate::components::ElementTypeRef::InlineSimple(st) => {
                for referenced in st.referenced_types() {
                    if !self.types.contains_key(&referenced) {
                        errors.push(not_built(Category::Type, &referenced, referrer));
                    }
                }
            }
            crate::components::ElementTypeRef::InlineComplex(ct) => {
                self.check_complex_type(ct, referrer, errors);
            }
            crate::components::ElementTypeRef::AnyType => {}
        }
    }

    fn check_attribute(&self, attribute: &XsdAttribute, referrer: &QName, errors: &mut Vec<Error>) {
        if let Some(ref type_name) = attribute.type_ref {
            if !self.types.contains_key(type_name) {
                errors.push(not_built(Category::Type, type_name, referrer));
            }
        }
        if let Some(ref reference) = attribute.reference {
            if !self.attributes.contains_key(reference) {
                errors.push(not_built(Category::Attribute, reference, referrer));
            }
        }
        if let Some(ref inline) = attribute.inline_type {
            for referenced in inline.referenced_types() {
                if !self.types.contains_key(&referenced) {
                    errors.push(not_built(Category::Type, &referenced, referrer));
                }
            }
        }
    }

    fn check_attribute_group(
        &self,
        group: &XsdAttributeGroup,
        referrer: &QName,
        errors: &mut Vec<Error>,
    ) {
        for reference in &group.group_refs {
            if !self.attribute_groups.contains_key(reference) {
                errors.push(not_built(Category::AttributeGroup, reference, referrer));
            }
        }
        for attribute in group.iter() {
            self.check_attribute(attribute, referrer, errors);
        }
    }

    // ========== Simple type chain composition ==========

    fn compose_chain(
        &self,
        st: &XsdSimpleType,
        visiting: &mut HashSet<QName>,
    ) -> Result<(ResolvedChain, Vec<ParseError>)> {
        match &st.variant {
            SimpleTypeVariant::Atomic { primitive } => Ok((
                ResolvedChain {
                    root: ChainRoot::Atomic(primitive),
                    constraints: EffectiveConstraints::with_white_space(primitive.white_space),
                },
                Vec::new(),
            )),
            SimpleTypeVariant::List { item_type } => Ok((
                ResolvedChain {
                    root: ChainRoot::List(item_type.clone()),
                    constraints: EffectiveConstraints::with_white_space(WhiteSpace::Collapse),
                },
                Vec::new(),
            )),
            SimpleTypeVariant::Union { member_types } => Ok((
                ResolvedChain {
                    root: ChainRoot::Union(member_types.clone()),
                    constraints: EffectiveConstraints::with_white_space(WhiteSpace::Collapse),
                },
                Vec::new(),
            )),
            SimpleTypeVariant::Restriction { base, facets } => {
                let (base_chain, mut parse_errors) = self.base_chain(base, visiting)?;
                let (category, parse_bound): (_, Box<dyn Fn(&str) -> Result<XsdValue>>) =
                    match &base_chain.root {
                        ChainRoot::Atomic(primitive) => {
                            let primitive = *primitive;
                            (primitive.category, Box::new(move |v: &str| primitive.parse(v)))
                        }
                        // List and union restrictions take the string-ish facets
                        _ => (
                            crate::builtins::PrimitiveCategory::String,
                            Box::new(|v: &str| Ok(XsdValue::String(v.to_string()))),
                        ),
                    };
                let (constraints, errors) = compose_restriction(
                    &base_chain.constraints,
                    facets,
                    category,
                    parse_bound.as_ref(),
                );
                parse_errors.extend(errors);
                Ok((
                    ResolvedChain {
                        root: base_chain.root,
                        constraints,
                    },
                    parse_errors,
                ))
            }
        }
    }

    fn base_chain(
        &self,
        base: &SimpleBase,
        visiting: &mut HashSet<QName>,
    ) -> Result<(ResolvedChain, Vec<ParseError>)> {
        match base {
            SimpleBase::Inline(inner) => self.compose_chain(inner, visiting),
            SimpleBase::Named(name) => {
                if !visiting.insert(name.clone()) {
                    // A self-referential base inside a redefinition resolves
                    // against the displaced original
                    match self.redefined_base(name) {
                        Some(XsdType::Simple(original)) => {
                            let original = Arc::clone(original);
                            return self.compose_chain(&original, visiting);
                        }
                        Some(XsdType::Builtin(primitive)) => {
                            return Ok((
                                ResolvedChain {
                                    root: ChainRoot::Atomic(primitive),
                                    constraints: EffectiveConstraints::with_white_space(
                                        primitive.white_space,
                                    ),
                                },
                                Vec::new(),
                            ));
                        }
                        _ => {}
                    }
                    return Err(Error::Parse(
                        ParseError::new(format!(
                            "circular derivation detected through type '{}'",
                            name
                        ))
                        .with_component(name.to_string()),
                    ));
                }
                let result = match self.types.get(name) {
                    Some(XsdType::Builtin(primitive)) => Ok((
                        ResolvedChain {
                            root: ChainRoot::Atomic(primitive),
                            constraints: EffectiveConstraints::with_white_space(
                                primitive.white_space,
                            ),
                        },
                        Vec::new(),
                    )),
                    Some(XsdType::Simple(st)) => {
                        if let Some(cached) = self.chains.get(name) {
                            Ok((
                                ResolvedChain {
                                    root: cached.root.clone(),
                                    constraints: cached.constraints.clone(),
                                },
                                Vec::new(),
                            ))
                        } else {
                            let st = Arc::clone(st);
                            self.compose_chain(&st, visiting)
                        }
                    }
                    Some(XsdType::Complex(_)) => Err(Error::Parse(
                        ParseError::new(format!(
                            "'{}' is a complex type and cannot be the base of a simple type",
                            name
                        ))
                        .with_component(name.to_string()),
                    )),
                    None => Err(Error::NotBuilt(NotBuiltError::new(
                        name.to_string(),
                        Category::Type.as_str(),
                    ))),
                };
                visiting.remove(name);
                result
            }
        }
    }

    // ========== Value coercion ==========

    /// Decode a lexical value through a simple type
    ///
    /// Applies whitespace normalization and every facet in the derivation
    /// chain, innermost restriction first, then the primitive's
    /// lexical-to-value mapping.
    pub fn decode_simple(&self, handle: SimpleHandle<'_>, lexical: &str) -> Result<XsdValue> {
        match handle {
            SimpleHandle::Named(name) => {
                if let Some(chain) = self.chains.get(name) {
                    return self.decode_with_chain(chain, lexical);
                }
                match self.types.get(name) {
                    Some(XsdType::Builtin(primitive)) => primitive.parse(lexical),
                    Some(XsdType::Simple(st)) => {
                        let mut visiting = HashSet::new();
                        visiting.insert(name.clone());
                        let (chain, _) = self.compose_chain(st, &mut visiting)?;
                        self.decode_with_chain(&chain, lexical)
                    }
                    Some(XsdType::Complex(_)) => Err(Error::Decode(
                        ValidationError::new(format!(
                            "'{}' is a complex type, not usable for a text value",
                            name
                        ))
                        .with_component(name.to_string()),
                    )),
                    None => Err(Error::NotBuilt(NotBuiltError::new(
                        name.to_string(),
                        Category::Type.as_str(),
                    ))),
                }
            }
            SimpleHandle::Inline(st) => {
                let mut visiting = HashSet::new();
                let (chain, _) = self.compose_chain(st, &mut visiting)?;
                self.decode_with_chain(&chain, lexical)
            }
        }
    }

    fn decode_with_chain(&self, chain: &ResolvedChain, lexical: &str) -> Result<XsdValue> {
        let normalized = chain.constraints.effective_white_space().normalize(lexical);
        match &chain.root {
            ChainRoot::Atomic(primitive) => {
                let value = (primitive).parse(&normalized)?;
                chain.constraints.check(&normalized, &value)?;
                Ok(value)
            }
            ChainRoot::List(item_type) => {
                let items: Vec<&str> = if normalized.is_empty() {
                    Vec::new()
                } else {
                    normalized.split(' ').collect()
                };
                let mut values = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let value = self.decode_base(item_type, item).map_err(|e| {
                        Error::Decode(
                            ValidationError::new(format!(
                                "invalid list item at position {}",
                                index + 1
                            ))
                            .with_reason(e.to_string())
                            .with_value(*item),
                        )
                    })?;
                    values.push(value);
                }
                let value = XsdValue::List(values);
                chain.constraints.check(&normalized, &value)?;
                Ok(value)
            }
            ChainRoot::Union(member_types) => {
                chain
                    .constraints
                    .check(&normalized, &XsdValue::String(normalized.clone()))?;
                let mut last_error = None;
                for member in member_types {
                    match self.decode_base(member, &normalized) {
                        Ok(value) => return Ok(value),
                        Err(e) => last_error = Some(e),
                    }
                }
                Err(Error::Decode(
                    ValidationError::new("value does not match any member type of the union")
                        .with_reason(
                            last_error
                                .map(|e| e.to_string())
                                .unwrap_or_else(|| "union has no member types".to_string()),
                        )
                        .with_value(lexical),
                ))
            }
        }
    }

    fn decode_base(&self, base: &SimpleBase, lexical: &str) -> Result<XsdValue> {
        match base {
            SimpleBase::Named(name) => self.decode_simple(SimpleHandle::Named(name), lexical),
            SimpleBase::Inline(inner) => self.decode_simple(SimpleHandle::Inline(inner), lexical),
        }
    }

    /// Whether a named type exists and is simple
    pub fn is_simple_type(&self, name: &QName) -> bool {
        self.types.get(name).is_some_and(XsdType::is_simple)
    }
}

fn duplicate_error(category: Category, name: &QName) -> ParseError {
    ParseError::new(format!(
        "global {} '{}' is already defined by another schema document",
        category, name
    ))
    .with_component(name.to_string())
}

fn not_built(category: Category, name: &QName, referrer: &QName) -> Error {
    Error::NotBuilt(
        NotBuiltError::new(name.to_string(), category.as_str())
            .with_referrer(referrer.to_string()),
    )
}
