//! Schema document builder (pass 1)
//!
//! Parses one `xs:schema` document into its component set plus the
//! include/import/redefine directives the registry needs to assemble the
//! closure. Node-local grammar violations are recorded as parse errors on
//! the offending component and never abort sibling components; only a
//! structurally broken document (wrong root, unreadable XML) is fatal.

use std::sync::Arc;

use crate::builtins::builtin;
use crate::components::{
    parse_occurs, AttributeUse, ContentModel, DerivationMethod, ElementTypeRef, ModelType,
    NamespaceConstraint, Particle, ProcessContents, SimpleBase, SimpleTypeVariant, XsdAnyAttribute,
    XsdAnyElement, XsdAttribute, XsdAttributeGroup, XsdComplexType, XsdElement, XsdGroup,
    XsdNotation, XsdSimpleType,
};
use crate::components::{Component, ComponentInfo};
use crate::documents::{Document, Element};
use crate::error::{Error, ParseError, Result};
use crate::facets::{Facet, FacetKind};
use crate::names::QName;
use crate::XSD_NAMESPACE;

/// A global type definition parsed from a document
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// Simple type definition
    Simple(XsdSimpleType),
    /// Complex type definition
    Complex(XsdComplexType),
}

impl TypeDef {
    /// The definition's qualified name
    pub fn name(&self) -> Option<&QName> {
        match self {
            TypeDef::Simple(st) => st.name(),
            TypeDef::Complex(ct) => ct.name(),
        }
    }

    /// Parse errors attached to the definition
    pub fn errors(&self) -> &[ParseError] {
        match self {
            TypeDef::Simple(st) => st.errors(),
            TypeDef::Complex(ct) => ct.errors(),
        }
    }
}

/// An `xs:import` directive
#[derive(Debug, Clone)]
pub struct SchemaImport {
    /// Imported namespace
    pub namespace: Option<String>,
    /// Location hint, when given
    pub location: Option<String>,
}

/// An `xs:redefine` directive with its redefining components
#[derive(Debug)]
pub struct SchemaRedefine {
    /// Location of the redefined document
    pub location: String,
    /// Redefining type definitions
    pub types: Vec<TypeDef>,
    /// Redefining group definitions
    pub groups: Vec<XsdGroup>,
    /// Redefining attribute group definitions
    pub attribute_groups: Vec<XsdAttributeGroup>,
}

/// One parsed schema document: the output of pass 1
#[derive(Debug, Default)]
pub struct SchemaDocument {
    /// Target namespace
    pub target_namespace: Option<String>,
    /// Normalized source location, when known
    pub location: Option<String>,
    /// Whether local elements are namespace-qualified
    pub element_form_qualified: bool,
    /// Whether local attributes are namespace-qualified
    pub attribute_form_qualified: bool,
    /// Global type definitions
    pub types: Vec<TypeDef>,
    /// Global element declarations
    pub elements: Vec<XsdElement>,
    /// Global attribute declarations
    pub attributes: Vec<XsdAttribute>,
    /// Named model group definitions
    pub groups: Vec<XsdGroup>,
    /// Named attribute group definitions
    pub attribute_groups: Vec<XsdAttributeGroup>,
    /// Notation declarations
    pub notations: Vec<XsdNotation>,
    /// Include directives (schemaLocation values)
    pub includes: Vec<String>,
    /// Import directives
    pub imports: Vec<SchemaImport>,
    /// Redefine directives
    pub redefines: Vec<SchemaRedefine>,
    /// Document-level parse errors
    pub errors: Vec<ParseError>,
}

impl SchemaDocument {
    /// All parse errors: document-level plus per-component
    pub fn all_errors(&self) -> Vec<ParseError> {
        let mut errors = self.errors.clone();
        for ty in &self.types {
            errors.extend_from_slice(ty.errors());
        }
        for elem in &self.elements {
            errors.extend_from_slice(elem.errors());
        }
        for attr in &self.attributes {
            errors.extend_from_slice(attr.errors());
        }
        for group in &self.groups {
            errors.extend_from_slice(group.errors());
        }
        for group in &self.attribute_groups {
            errors.extend_from_slice(group.errors());
        }
        for notation in &self.notations {
            errors.extend_from_slice(notation.errors());
        }
        errors
    }
}

struct ParseCtx<'a> {
    target_namespace: Option<&'a str>,
    location: Option<&'a str>,
}

impl ParseCtx<'_> {
    fn global_name(&self, local: &str) -> QName {
        QName::new(self.target_namespace, local)
    }

    /// Resolve a QName-valued attribute such as `type` or `ref`
    ///
    /// Prefixed names resolve through the in-scope declarations. Unprefixed
    /// names use the default namespace when one is declared, otherwise the
    /// target namespace.
    fn resolve_reference(&self, node: &Element, value: &str) -> Result<QName> {
        if value.contains(':') {
            return node.namespaces.resolve(value);
        }
        match node.namespaces.default_namespace() {
            Some(ns) => Ok(QName::namespaced(ns, value)),
            None => Ok(QName::new(self.target_namespace, value)),
        }
    }

    fn info_for(&self, node: &Element, name: Option<QName>, global: bool) -> ComponentInfo {
        let mut info = ComponentInfo {
            name,
            global,
            ..ComponentInfo::default()
        };
        info.source = Some(Arc::new(node.clone()));
        if let Some(location) = self.location {
            info.schema_location = Some(location.to_string());
        }
        info
    }
}

fn is_xsd(node: &Element, local: &str) -> bool {
    node.local_name() == local
        && matches!(node.namespace(), Some(XSD_NAMESPACE) | None)
}

fn xsd_tag(node: &Element) -> Option<&str> {
    match node.namespace() {
        Some(XSD_NAMESPACE) | None => Some(node.local_name()),
        _ => None,
    }
}

fn check_attributes(node: &Element, allowed: &[&str], info: &mut ComponentInfo) {
    for (attr, _) in &node.attributes {
        if attr.namespace.is_none() && !allowed.contains(&attr.local.as_str()) {
            info.push_error(ParseError::new(format!(
                "wrong attribute '{}' for xs:{} declaration",
                attr.local,
                node.local_name()
            )));
        }
    }
}

/// Parse a schema document tree (pass 1)
pub fn parse_schema_document(doc: &Document, location: Option<&str>) -> Result<SchemaDocument> {
    let root = doc.root();
    if !is_xsd(root, "schema") {
        return Err(Error::Parse(
            ParseError::new(format!(
                "expected an xs:schema root element, found '{}'",
                root.name
            ))
            .with_location(location.unwrap_or("<string>")),
        ));
    }

    let mut schema = SchemaDocument {
        target_namespace: root.attribute("targetNamespace").map(str::to_string),
        location: location.map(str::to_string),
        element_form_qualified: root.attribute("elementFormDefault") == Some("qualified"),
        attribute_form_qualified: root.attribute("attributeFormDefault") == Some("qualified"),
        ..SchemaDocument::default()
    };

    for (attr, _) in &root.attributes {
        if attr.namespace.is_none()
            && !matches!(
                attr.local.as_str(),
                "targetNamespace"
                    | "elementFormDefault"
                    | "attributeFormDefault"
                    | "blockDefault"
                    | "finalDefault"
                    | "version"
                    | "id"
            )
        {
            schema.errors.push(
                ParseError::new(format!("wrong attribute '{}' for xs:schema", attr.local))
                    .with_location(location.unwrap_or("<string>")),
            );
        }
    }

    let ctx = ParseCtx {
        target_namespace: schema.target_namespace.as_deref(),
        location,
    };

    for child in &root.children {
        let Some(tag) = xsd_tag(child) else {
            // Foreign-namespace top-level elements are ignored
            continue;
        };
        match tag {
            "annotation" => {}
            "include" => match child.attribute("schemaLocation") {
                Some(loc) => schema.includes.push(loc.to_string()),
                None => schema.errors.push(ParseError::new(
                    "xs:include requires a 'schemaLocation' attribute",
                )),
            },
            "import" => schema.imports.push(SchemaImport {
                namespace: child.attribute("namespace").map(str::to_string),
                location: child.attribute("schemaLocation").map(str::to_string),
            }),
            "redefine" => match child.attribute("schemaLocation") {
                Some(loc) => {
                    let redefine = parse_redefine(child, loc, &ctx);
                    schema.redefines.push(redefine);
                }
                None => schema.errors.push(ParseError::new(
                    "xs:redefine requires a 'schemaLocation' attribute",
                )),
            },
            "simpleType" => schema
                .types
                .push(TypeDef::Simple(parse_simple_type(child, &ctx, true))),
            "complexType" => schema
                .types
                .push(TypeDef::Complex(parse_complex_type(child, &ctx, true))),
            "element" => schema.elements.push(parse_global_element(child, &ctx)),
            "attribute" => schema.attributes.push(parse_attribute(child, &ctx, true)),
            "group" => schema.groups.push(parse_named_group(child, &ctx)),
            "attributeGroup" => schema
                .attribute_groups
                .push(parse_named_attribute_group(child, &ctx)),
            "notation" => schema.notations.push(XsdNotation::parse(
                child,
                ctx.target_namespace,
                true,
            )),
            other => schema.errors.push(ParseError::new(format!(
                "unexpected top-level element 'xs:{}'",
                other
            ))),
        }
    }

    Ok(schema)
}

fn parse_redefine(node: &Element, location: &str, ctx: &ParseCtx) -> SchemaRedefine {
    let mut redefine = SchemaRedefine {
        location: location.to_string(),
        types: Vec::new(),
        groups: Vec::new(),
        attribute_groups: Vec::new(),
    };
    for child in &node.children {
        match xsd_tag(child) {
            Some("simpleType") => redefine
                .types
                .push(TypeDef::Simple(parse_simple_type(child, ctx, true))),
            Some("complexType") => redefine
                .types
                .push(TypeDef::Complex(parse_complex_type(child, ctx, true))),
            Some("group") => redefine.groups.push(parse_named_group(child, ctx)),
            Some("attributeGroup") => redefine
                .attribute_groups
                .push(parse_named_attribute_group(child, ctx)),
            _ => {}
        }
    }
    redefine
}

// =============================================================================
// Simple types
// =============================================================================

fn parse_simple_type(node: &Element, ctx: &ParseCtx, global: bool) -> XsdSimpleType {
    let name = node.attribute("name").map(|n| ctx.global_name(n));
    let mut info = ctx.info_for(node, name, global);

    if global && info.name.is_none() {
        info.push_error(ParseError::new("a global simpleType must have a 'name'"));
    }
    if !global && node.attribute("name").is_some() {
        info.push_error(ParseError::new("a local simpleType cannot have a 'name'"));
    }
    check_attributes(node, &["id", "name", "final"], &mut info);

    let derivation = node
        .children
        .iter()
        .find(|c| matches!(xsd_tag(c), Some("restriction" | "list" | "union")));

    let variant = match derivation {
        Some(child) => match xsd_tag(child) {
            Some("restriction") => parse_simple_restriction(child, ctx, &mut info),
            Some("list") => parse_list(child, ctx, &mut info),
            Some("union") => parse_union(child, ctx, &mut info),
            _ => unreachable!(),
        },
        None => {
            info.push_error(ParseError::new(
                "simpleType requires a restriction, list or union child",
            ));
            SimpleTypeVariant::Atomic {
                primitive: builtin("anySimpleType").expect("anySimpleType is built in"),
            }
        }
    };

    XsdSimpleType { info, variant }
}

fn parse_simple_restriction(
    node: &Element,
    ctx: &ParseCtx,
    info: &mut ComponentInfo,
) -> SimpleTypeVariant {
    let inline_base = node
        .children
        .iter()
        .find(|c| matches!(xsd_tag(c), Some("simpleType")));

    let base = match (node.attribute("base"), inline_base) {
        (Some(value), _) => match ctx.resolve_reference(node, value) {
            Ok(name) => SimpleBase::Named(name),
            Err(e) => {
                info.push_error(ParseError::new(e.to_string()));
                SimpleBase::Named(QName::namespaced(XSD_NAMESPACE, "anySimpleType"))
            }
        },
        (None, Some(inline)) => SimpleBase::Inline(Box::new(parse_simple_type(inline, ctx, false))),
        (None, None) => {
            info.push_error(ParseError::new(
                "restriction requires a 'base' attribute or an inline simpleType",
            ));
            SimpleBase::Named(QName::namespaced(XSD_NAMESPACE, "anySimpleType"))
        }
    };

    let mut facets = Vec::new();
    for child in &node.children {
        let Some(tag) = xsd_tag(child) else { continue };
        if matches!(tag, "annotation" | "simpleType") {
            continue;
        }
        match FacetKind::from_tag(tag) {
            Some(kind) => match child.attribute("value") {
                Some(value) => {
                    let mut facet = Facet::new(kind, value);
                    facet.fixed = child.attribute("fixed") == Some("true");
                    facets.push(facet);
                }
                None => info.push_error(ParseError::new(format!(
                    "facet 'xs:{}' requires a 'value' attribute",
                    tag
                ))),
            },
            None => info.push_error(ParseError::new(format!(
                "unexpected element 'xs:{}' in restriction",
                tag
            ))),
        }
    }

    SimpleTypeVariant::Restriction { base, facets }
}

fn parse_list(node: &Element, ctx: &ParseCtx, info: &mut ComponentInfo) -> SimpleTypeVariant {
    let inline = node
        .children
        .iter()
        .find(|c| matches!(xsd_tag(c), Some("simpleType")));

    let item_type = match (node.attribute("itemType"), inline) {
        (Some(value), _) => match ctx.resolve_reference(node, value) {
            Ok(name) => SimpleBase::Named(name),
            Err(e) => {
                info.push_error(ParseError::new(e.to_string()));
                SimpleBase::Named(QName::namespaced(XSD_NAMESPACE, "anySimpleType"))
            }
        },
        (None, Some(inner)) => SimpleBase::Inline(Box::new(parse_simple_type(inner, ctx, false))),
        (None, None) => {
            info.push_error(ParseError::new(
                "list requires an 'itemType' attribute or an inline simpleType",
            ));
            SimpleBase::Named(QName::namespaced(XSD_NAMESPACE, "anySimpleType"))
        }
    };

    SimpleTypeVariant::List { item_type }
}

fn parse_union(node: &Element, ctx: &ParseCtx, info: &mut ComponentInfo) -> SimpleTypeVariant {
    let mut member_types = Vec::new();

    if let Some(members) = node.attribute("memberTypes") {
        for token in members.split_whitespace() {
            match ctx.resolve_reference(node, token) {
                Ok(name) => member_types.push(SimpleBase::Named(name)),
                Err(e) => info.push_error(ParseError::new(e.to_string())),
            }
        }
    }
    for child in &node.children {
        if matches!(xsd_tag(child), Some("simpleType")) {
            member_types.push(SimpleBase::Inline(Box::new(parse_simple_type(
                child, ctx, false,
            ))));
        }
    }

    if member_types.is_empty() {
        info.push_error(ParseError::new("union requires at least one member type"));
    }

    SimpleTypeVariant::Union { member_types }
}

// =============================================================================
// Complex types
// =============================================================================

fn parse_complex_type(node: &Element, ctx: &ParseCtx, global: bool) -> XsdComplexType {
    let name = node.attribute("name").map(|n| ctx.global_name(n));
    let mut info = ctx.info_for(node, name, global);

    if global && info.name.is_none() {
        info.push_error(ParseError::new("a global complexType must have a 'name'"));
    }
    check_attributes(
        node,
        &["id", "name", "mixed", "abstract", "block", "final"],
        &mut info,
    );

    let mut ct = XsdComplexType::new(info, ContentModel::Empty);
    ct.mixed = node.attribute("mixed") == Some("true");
    ct.abstract_type = node.attribute("abstract") == Some("true");

    for child in &node.children {
        let Some(tag) = xsd_tag(child) else { continue };
        match tag {
            "annotation" => {}
            "sequence" | "choice" | "all" => {
                ct.content = ContentModel::Group(parse_group_body(child, ctx, &mut ct.info));
            }
            "group" => {
                if let Some(particle) = parse_group_ref(child, ctx, &mut ct.info) {
                    let mut wrapper = XsdGroup::new(ModelType::Sequence);
                    wrapper.push(particle);
                    ct.content = ContentModel::Group(wrapper);
                }
            }
            "simpleContent" => parse_simple_content(child, ctx, &mut ct),
            "complexContent" => parse_complex_content(child, ctx, &mut ct),
            "attribute" => {
                let attr = parse_attribute(child, ctx, false);
                if let Err(e) = ct.attributes.add_attribute(attr) {
                    ct.info.push_error(ParseError::new(e.to_string()));
                }
            }
            "attributeGroup" => parse_attribute_group_ref(child, ctx, &mut ct.attributes),
            "anyAttribute" => {
                ct.attributes.any_attribute = Some(parse_any_attribute(child, ctx));
            }
            other => ct.info.push_error(ParseError::new(format!(
                "unexpected element 'xs:{}' in complexType",
                other
            ))),
        }
    }

    ct
}

fn parse_simple_content(node: &Element, ctx: &ParseCtx, ct: &mut XsdComplexType) {
    let derivation = node.children.iter().find_map(|c| {
        xsd_tag(c)
            .and_then(DerivationMethod::from_tag)
            .map(|method| (c, method))
    });
    let Some((child, method)) = derivation else {
        ct.info.push_error(ParseError::new(
            "simpleContent requires an extension or restriction child",
        ));
        return;
    };

    match child.attribute("base") {
        Some(value) => match ctx.resolve_reference(child, value) {
            Ok(base) => {
                ct.content = ContentModel::Simple(base.clone());
                ct.base = Some(base);
                ct.derivation = Some(method);
            }
            Err(e) => ct.info.push_error(ParseError::new(e.to_string())),
        },
        None => ct.info.push_error(ParseError::new(format!(
            "simpleContent {} requires a 'base' attribute",
            method
        ))),
    }

    for grandchild in &child.children {
        match xsd_tag(grandchild) {
            Some("attribute") => {
                let attr = parse_attribute(grandchild, ctx, false);
                if let Err(e) = ct.attributes.add_attribute(attr) {
                    ct.info.push_error(ParseError::new(e.to_string()));
                }
            }
            Some("attributeGroup") => parse_attribute_group_ref(grandchild, ctx, &mut ct.attributes),
            Some("anyAttribute") => {
                ct.attributes.any_attribute = Some(parse_any_attribute(grandchild, ctx))
            }
            _ => {}
        }
    }
}

fn parse_complex_content(node: &Element, ctx: &ParseCtx, ct: &mut XsdComplexType) {
    if node.attribute("mixed") == Some("true") {
        ct.mixed = true;
    }

    let derivation = node.children.iter().find_map(|c| {
        xsd_tag(c)
            .and_then(DerivationMethod::from_tag)
            .map(|method| (c, method))
    });
    let Some((child, method)) = derivation else {
        ct.info.push_error(ParseError::new(
            "complexContent requires an extension or restriction child",
        ));
        return;
    };

    match child.attribute("base") {
        Some(value) => match ctx.resolve_reference(child, value) {
            Ok(base) => {
                ct.base = Some(base);
                ct.derivation = Some(method);
            }
            Err(e) => ct.info.push_error(ParseError::new(e.to_string())),
        },
        None => ct.info.push_error(ParseError::new(format!(
            "complexContent {} requires a 'base' attribute",
            method
        ))),
    }

    for grandchild in &child.children {
        match xsd_tag(grandchild) {
            Some("sequence" | "choice" | "all") => {
                ct.content = ContentModel::Group(parse_group_body(grandchild, ctx, &mut ct.info));
            }
            Some("group") => {
                if let Some(particle) = parse_group_ref(grandchild, ctx, &mut ct.info) {
                    let mut wrapper = XsdGroup::new(ModelType::Sequence);
                    wrapper.push(particle);
                    ct.content = ContentModel::Group(wrapper);
                }
            }
            Some("attribute") => {
                let attr = parse_attribute(grandchild, ctx, false);
                if let Err(e) = ct.attributes.add_attribute(attr) {
                    ct.info.push_error(ParseError::new(e.to_string()));
                }
            }
            Some("attributeGroup") => parse_attribute_group_ref(grandchild, ctx, &mut ct.attributes),
            Some("anyAttribute") => {
                ct.attributes.any_attribute = Some(parse_any_attribute(grandchild, ctx))
            }
            _ => {}
        }
    }
}

// =============================================================================
// Model groups
// =============================================================================

fn parse_group_body(node: &Element, ctx: &ParseCtx, info: &mut ComponentInfo) -> XsdGroup {
    let model = xsd_tag(node)
        .and_then(ModelType::from_tag)
        .unwrap_or_default();
    let mut group = XsdGroup::new(model);

    match parse_occurs(node.attribute("minOccurs"), node.attribute("maxOccurs")) {
        Ok(occurs) => group.occurs = occurs,
        Err(e) => info.push_error(ParseError::new(e.to_string())),
    }

    for child in &node.children {
        let Some(tag) = xsd_tag(child) else { continue };
        match tag {
            "annotation" => {}
            "element" => {
                if let Some(particle) = parse_element_particle(child, ctx, info) {
                    group.push(particle);
                }
            }
            "any" => {
                let occurs = particle_occurs(child, info);
                group.push(Particle::Any {
                    wildcard: parse_any_element(child, ctx),
                    occurs,
                });
            }
            "sequence" | "choice" | "all" => {
                if model == ModelType::All {
                    info.push_error(ParseError::new(
                        "an xs:all group can contain only element particles",
                    ));
                } else {
                    group.push(Particle::Group(Box::new(parse_group_body(child, ctx, info))));
                }
            }
            "group" => {
                if let Some(particle) = parse_group_ref(child, ctx, info) {
                    group.push(particle);
                }
            }
            other => info.push_error(ParseError::new(format!(
                "unexpected element 'xs:{}' in xs:{}",
                other, model
            ))),
        }
    }

    group
}

fn particle_occurs(node: &Element, info: &mut ComponentInfo) -> crate::components::Occurs {
    match parse_occurs(node.attribute("minOccurs"), node.attribute("maxOccurs")) {
        Ok(occurs) => occurs,
        Err(e) => {
            info.push_error(ParseError::new(e.to_string()));
            crate::components::Occurs::once()
        }
    }
}

fn parse_element_particle(
    node: &Element,
    ctx: &ParseCtx,
    info: &mut ComponentInfo,
) -> Option<Particle> {
    let occurs = particle_occurs(node, info);

    if let Some(reference) = node.attribute("ref") {
        return match ctx.resolve_reference(node, reference) {
            Ok(name) => Some(Particle::ElementRef { name, occurs }),
            Err(e) => {
                info.push_error(ParseError::new(e.to_string()));
                None
            }
        };
    }

    let decl = parse_element_declaration(node, ctx, false);
    Some(Particle::Element {
        decl: Box::new(decl),
        occurs,
    })
}

fn parse_group_ref(node: &Element, ctx: &ParseCtx, info: &mut ComponentInfo) -> Option<Particle> {
    let occurs = particle_occurs(node, info);
    match node.attribute("ref") {
        Some(reference) => match ctx.resolve_reference(node, reference) {
            Ok(name) => Some(Particle::GroupRef { name, occurs }),
            Err(e) => {
                info.push_error(ParseError::new(e.to_string()));
                None
            }
        },
        None => {
            info.push_error(ParseError::new(
                "a group reference requires a 'ref' attribute",
            ));
            None
        }
    }
}

fn parse_named_group(node: &Element, ctx: &ParseCtx) -> XsdGroup {
    let name = node.attribute("name").map(|n| ctx.global_name(n));
    let mut info = ctx.info_for(node, name, true);
    if info.name.is_none() {
        info.push_error(ParseError::new("a global group must have a 'name'"));
    }

    let body = node
        .children
        .iter()
        .find(|c| matches!(xsd_tag(c), Some("sequence" | "choice" | "all")));

    let mut group = match body {
        Some(body) => parse_group_body(body, ctx, &mut info),
        None => {
            info.push_error(ParseError::new(
                "a group definition requires a sequence, choice or all child",
            ));
            XsdGroup::new(ModelType::Sequence)
        }
    };
    group.info = info;
    group
}

// =============================================================================
// Elements
// =============================================================================

fn parse_global_element(node: &Element, ctx: &ParseCtx) -> XsdElement {
    parse_element_declaration(node, ctx, true)
}

fn parse_element_declaration(node: &Element, ctx: &ParseCtx, global: bool) -> XsdElement {
    let name = node.attribute("name").map(|n| {
        if global {
            ctx.global_name(n)
        } else {
            QName::local(n)
        }
    });
    let mut info = ctx.info_for(node, name, global);
    if info.name.is_none() {
        info.push_error(ParseError::new("an element declaration must have a 'name'"));
        info.name = Some(QName::local("_unnamed"));
    }
    check_attributes(
        node,
        &[
            "id", "name", "type", "default", "fixed", "nillable", "abstract", "form", "block",
            "final", "minOccurs", "maxOccurs",
        ],
        &mut info,
    );

    let inline_type = node.children.iter().find_map(|c| match xsd_tag(c) {
        Some("simpleType") => Some(ElementTypeRef::InlineSimple(Box::new(parse_simple_type(
            c, ctx, false,
        )))),
        Some("complexType") => Some(ElementTypeRef::InlineComplex(Box::new(parse_complex_type(
            c, ctx, false,
        )))),
        _ => None,
    });

    let type_ref = match (node.attribute("type"), inline_type) {
        (Some(value), None) => match ctx.resolve_reference(node, value) {
            Ok(name) => ElementTypeRef::Named(name),
            Err(e) => {
                info.push_error(ParseError::new(e.to_string()));
                ElementTypeRef::AnyType
            }
        },
        (Some(_), Some(inline)) => {
            info.push_error(ParseError::new(
                "an element cannot have both a 'type' attribute and an inline type",
            ));
            inline
        }
        (None, Some(inline)) => inline,
        (None, None) => ElementTypeRef::AnyType,
    };

    let mut element = XsdElement::new(info, type_ref);
    element.nillable = node.attribute("nillable") == Some("true");
    element.abstract_element = node.attribute("abstract") == Some("true");
    element.default = node.attribute("default").map(str::to_string);
    element.fixed = node.attribute("fixed").map(str::to_string);

    if element.default.is_some() && element.fixed.is_some() {
        element.info.push_error(ParseError::new(
            "an element cannot have both 'default' and 'fixed'",
        ));
    }

    element
}

// =============================================================================
// Attributes
// =============================================================================

fn parse_attribute(node: &Element, ctx: &ParseCtx, global: bool) -> XsdAttribute {
    let reference = node
        .attribute("ref")
        .and_then(|value| ctx.resolve_reference(node, value).ok());

    let name = node.attribute("name").map(|n| {
        if global {
            ctx.global_name(n)
        } else {
            QName::local(n)
        }
    });

    let mut info = ctx.info_for(node, name, global);
    if info.name.is_none() && reference.is_none() {
        info.push_error(ParseError::new(
            "an attribute declaration requires a 'name' or 'ref'",
        ));
    }
    check_attributes(
        node,
        &["id", "name", "ref", "type", "use", "default", "fixed", "form"],
        &mut info,
    );

    let mut attribute = XsdAttribute::new(info);
    attribute.reference = reference;

    if let Some(value) = node.attribute("type") {
        match ctx.resolve_reference(node, value) {
            Ok(name) => attribute.type_ref = Some(name),
            Err(e) => attribute.info.push_error(ParseError::new(e.to_string())),
        }
    }
    if let Some(inline) = node
        .children
        .iter()
        .find(|c| matches!(xsd_tag(c), Some("simpleType")))
    {
        if attribute.type_ref.is_some() {
            attribute.info.push_error(ParseError::new(
                "an attribute cannot have both a 'type' attribute and an inline type",
            ));
        }
        attribute.inline_type = Some(Box::new(parse_simple_type(inline, ctx, false)));
    }

    if let Some(value) = node.attribute("use") {
        if global {
            attribute
                .info
                .push_error(ParseError::new("a global attribute cannot have a 'use'"));
        }
        match AttributeUse::from_value(value) {
            Ok(use_mode) => attribute.use_mode = use_mode,
            Err(e) => attribute.info.push_error(ParseError::new(e.to_string())),
        }
    }

    attribute.default = node.attribute("default").map(str::to_string);
    attribute.fixed = node.attribute("fixed").map(str::to_string);
    if attribute.default.is_some() && attribute.fixed.is_some() {
        attribute.info.push_error(ParseError::new(
            "an attribute cannot have both 'default' and 'fixed'",
        ));
    }
    if attribute.default.is_some() && attribute.use_mode == AttributeUse::Required {
        attribute.info.push_error(ParseError::new(
            "a required attribute cannot have a 'default'",
        ));
    }

    attribute
}

fn parse_attribute_group_ref(node: &Element, ctx: &ParseCtx, group: &mut XsdAttributeGroup) {
    match node.attribute("ref") {
        Some(value) => match ctx.resolve_reference(node, value) {
            Ok(name) => group.group_refs.push(name),
            Err(e) => group.info.push_error(ParseError::new(e.to_string())),
        },
        None => group.info.push_error(ParseError::new(
            "an attributeGroup reference requires a 'ref' attribute",
        )),
    }
}

fn parse_named_attribute_group(node: &Element, ctx: &ParseCtx) -> XsdAttributeGroup {
    let name = node.attribute("name").map(|n| ctx.global_name(n));
    let mut info = ctx.info_for(node, name, true);
    if info.name.is_none() {
        info.push_error(ParseError::new("a global attributeGroup must have a 'name'"));
    }

    let mut group = XsdAttributeGroup {
        info,
        ..XsdAttributeGroup::default()
    };

    for child in &node.children {
        match xsd_tag(child) {
            Some("annotation") => {}
            Some("attribute") => {
                let attr = parse_attribute(child, ctx, false);
                if let Err(e) = group.add_attribute(attr) {
                    group.info.push_error(ParseError::new(e.to_string()));
                }
            }
            Some("attributeGroup") => {
                let refs = &mut group;
                parse_attribute_group_ref(child, ctx, refs);
            }
            Some("anyAttribute") => group.any_attribute = Some(parse_any_attribute(child, ctx)),
            Some(other) => group.info.push_error(ParseError::new(format!(
                "unexpected element 'xs:{}' in attributeGroup",
                other
            ))),
            None => {}
        }
    }

    group
}

// =============================================================================
// Wildcards
// =============================================================================

fn parse_any_element(node: &Element, ctx: &ParseCtx) -> XsdAnyElement {
    XsdAnyElement {
        namespace: NamespaceConstraint::parse(
            node.attribute("namespace").unwrap_or("##any"),
            ctx.target_namespace,
        ),
        process_contents: node
            .attribute("processContents")
            .and_then(ProcessContents::from_value)
            .unwrap_or_default(),
    }
}

fn parse_any_attribute(node: &Element, ctx: &ParseCtx) -> XsdAnyAttribute {
    XsdAnyAttribute {
        namespace: NamespaceConstraint::parse(
            node.attribute("namespace").unwrap_or("##any"),
            ctx.target_namespace,
        ),
        process_contents: node
            .attribute("processContents")
            .and_then(ProcessContents::from_value)
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Component;

    fn parse(xml: &str) -> SchemaDocument {
        let doc = Document::from_str(xml).unwrap();
        parse_schema_document(&doc, Some("test.xsd")).unwrap()
    }

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    #[test]
    fn test_wrong_root_is_fatal() {
        let doc = Document::from_str("<notASchema/>").unwrap();
        assert!(parse_schema_document(&doc, None).is_err());
    }

    #[test]
    fn test_empty_schema() {
        let schema = parse(&format!(
            r#"<xs:schema {} targetNamespace="urn:t"/>"#,
            XS
        ));
        assert_eq!(schema.target_namespace.as_deref(), Some("urn:t"));
        assert!(schema.all_errors().is_empty());
    }

    #[test]
    fn test_simple_type_restriction() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:simpleType name="Age">
                   <xs:restriction base="xs:integer">
                     <xs:minInclusive value="0"/>
                     <xs:maxInclusive value="130"/>
                   </xs:restriction>
                 </xs:simpleType>
               </xs:schema>"#,
            XS
        ));
        assert_eq!(schema.types.len(), 1);
        let TypeDef::Simple(st) = &schema.types[0] else {
            panic!("expected a simple type");
        };
        assert_eq!(st.name().unwrap().local, "Age");
        assert_eq!(st.facets().len(), 2);
        assert_eq!(
            st.base_name().unwrap(),
            &QName::namespaced(XSD_NAMESPACE, "integer")
        );
    }

    #[test]
    fn test_list_and_union() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:simpleType name="Numbers">
                   <xs:list itemType="xs:int"/>
                 </xs:simpleType>
                 <xs:simpleType name="IntOrName">
                   <xs:union memberTypes="xs:int xs:NCName"/>
                 </xs:simpleType>
               </xs:schema>"#,
            XS
        ));
        assert_eq!(schema.types.len(), 2);
        let TypeDef::Simple(list) = &schema.types[0] else {
            panic!()
        };
        assert!(matches!(list.variant, SimpleTypeVariant::List { .. }));
        let TypeDef::Simple(union) = &schema.types[1] else {
            panic!()
        };
        let SimpleTypeVariant::Union { member_types } = &union.variant else {
            panic!()
        };
        assert_eq!(member_types.len(), 2);
    }

    #[test]
    fn test_complex_type_with_sequence_and_attributes() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:complexType name="Person">
                   <xs:sequence>
                     <xs:element name="first" type="xs:string"/>
                     <xs:element name="last" type="xs:string"/>
                     <xs:element name="nick" type="xs:string" minOccurs="0" maxOccurs="3"/>
                   </xs:sequence>
                   <xs:attribute name="age" type="xs:integer" use="required"/>
                 </xs:complexType>
               </xs:schema>"#,
            XS
        ));
        let TypeDef::Complex(ct) = &schema.types[0] else {
            panic!()
        };
        let group = ct.content.as_group().unwrap();
        assert_eq!(group.model, ModelType::Sequence);
        assert_eq!(group.particles.len(), 3);
        assert_eq!(
            group.particles[2].occurs(),
            crate::components::Occurs::new(0, Some(3))
        );
        assert_eq!(ct.attributes.attributes.len(), 1);
        assert!(ct
            .attributes
            .get(&QName::local("age"))
            .unwrap()
            .is_required());
    }

    #[test]
    fn test_global_element_with_inline_type() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:element name="note">
                   <xs:complexType>
                     <xs:sequence>
                       <xs:element name="body" type="xs:string"/>
                     </xs:sequence>
                   </xs:complexType>
                 </xs:element>
               </xs:schema>"#,
            XS
        ));
        assert_eq!(schema.elements.len(), 1);
        assert!(matches!(
            schema.elements[0].type_ref,
            ElementTypeRef::InlineComplex(_)
        ));
    }

    #[test]
    fn test_directives() {
        let schema = parse(&format!(
            r#"<xs:schema {} targetNamespace="urn:t">
                 <xs:include schemaLocation="common.xsd"/>
                 <xs:import namespace="urn:other" schemaLocation="other.xsd"/>
                 <xs:redefine schemaLocation="base.xsd">
                   <xs:simpleType name="Size">
                     <xs:restriction base="Size">
                       <xs:maxInclusive value="10"/>
                     </xs:restriction>
                   </xs:simpleType>
                 </xs:redefine>
               </xs:schema>"#,
            XS
        ));
        assert_eq!(schema.includes, vec!["common.xsd".to_string()]);
        assert_eq!(schema.imports.len(), 1);
        assert_eq!(schema.imports[0].namespace.as_deref(), Some("urn:other"));
        assert_eq!(schema.redefines.len(), 1);
        assert_eq!(schema.redefines[0].types.len(), 1);
    }

    #[test]
    fn test_unknown_attribute_reported_not_fatal() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:simpleType name="T" bogus="1">
                   <xs:restriction base="xs:string"/>
                 </xs:simpleType>
               </xs:schema>"#,
            XS
        ));
        assert_eq!(schema.types.len(), 1);
        let errors = schema.all_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("wrong attribute 'bogus'"));
    }

    #[test]
    fn test_missing_facet_value_reported() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:simpleType name="T">
                   <xs:restriction base="xs:string">
                     <xs:maxLength/>
                   </xs:restriction>
                 </xs:simpleType>
               </xs:schema>"#,
            XS
        ));
        let errors = schema.all_errors();
        assert!(errors
            .iter()
            .any(|e| e.message.contains("requires a 'value'")));
    }

    #[test]
    fn test_element_default_and_fixed_conflict() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:element name="e" type="xs:string" default="a" fixed="b"/>
               </xs:schema>"#,
            XS
        ));
        assert!(schema.all_errors()[0]
            .message
            .contains("both 'default' and 'fixed'"));
    }

    #[test]
    fn test_all_group_rejects_nested_compositors() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:complexType name="T">
                   <xs:all>
                     <xs:element name="a" type="xs:string"/>
                     <xs:sequence/>
                   </xs:all>
                 </xs:complexType>
               </xs:schema>"#,
            XS
        ));
        assert!(schema
            .all_errors()
            .iter()
            .any(|e| e.message.contains("element particles")));
    }

    #[test]
    fn test_simple_content() {
        let schema = parse(&format!(
            r#"<xs:schema {}>
                 <xs:complexType name="Price">
                   <xs:simpleContent>
                     <xs:extension base="xs:decimal">
                       <xs:attribute name="currency" type="xs:string" use="required"/>
                     </xs:extension>
                   </xs:simpleContent>
                 </xs:complexType>
               </xs:schema>"#,
            XS
        ));
        let TypeDef::Complex(ct) = &schema.types[0] else {
            panic!()
        };
        assert!(ct.has_simple_content());
        assert_eq!(ct.derivation, Some(DerivationMethod::Extension));
        assert_eq!(ct.attributes.attributes.len(), 1);
    }

    #[test]
    fn test_wildcard_parsing() {
        let schema = parse(&format!(
            r###"<xs:schema {} targetNamespace="urn:t">
                 <xs:complexType name="Open">
                   <xs:sequence>
                     <xs:any namespace="##other" processContents="lax"
                             minOccurs="0" maxOccurs="unbounded"/>
                   </xs:sequence>
                 </xs:complexType>
               </xs:schema>"###,
            XS
        ));
        let TypeDef::Complex(ct) = &schema.types[0] else {
            panic!()
        };
        let group = ct.content.as_group().unwrap();
        let Particle::Any { wildcard, occurs } = &group.particles[0] else {
            panic!("expected a wildcard particle")
        };
        assert_eq!(wildcard.process_contents, ProcessContents::Lax);
        assert!(occurs.max.is_none());
        assert!(!wildcard.matches(&QName::namespaced("urn:t", "claimed")));
    }
}
