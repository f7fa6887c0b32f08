//! Instance decoding and validation
//!
//! Decoding walks the instance tree against a resolved element declaration
//! and produces a structured value through the converter. Validation is the
//! same traversal with the value discarded.

use serde_json::Value;

use super::content::{match_content, names_match, Matched};
use super::{collect_attribute_uses, Engine, XSI_NAMESPACE};
use crate::builtins::guess_value;
use crate::components::{
    AttributeUse, ContentModel, ElementTypeRef, ProcessContents, XsdAttribute, XsdComplexType,
    XsdElement,
};
use crate::converters::ElementData;
use crate::documents::Element;
use crate::error::{Error, NotBuiltError, Result, ValidationError};
use crate::facets::WhiteSpace;
use crate::names::QName;
use crate::registry::{SimpleHandle, XsdType};
use crate::validation::{ValidationContext, ValidationMode};

impl<'a> Engine<'a> {
    /// Decode an instance element against a declaration
    pub fn decode_element(
        &self,
        decl: &XsdElement,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        ctx.enter(node.name.local.clone())?;
        let result = self.decode_element_inner(decl, node, ctx);
        ctx.leave();
        result
    }

    /// Validate an instance element against a declaration
    pub fn validate_element(
        &self,
        decl: &XsdElement,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        self.decode_element(decl, node, ctx).map(|_| ())
    }

    fn decode_element_inner(
        &self,
        decl: &XsdElement,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        if let Some(nil) = node.attribute_qname(&QName::namespaced(XSI_NAMESPACE, "nil")) {
            if nil == "true" {
                if decl.nillable {
                    return Ok(Value::Null);
                }
                ctx.report(
                    ValidationError::new("element is not nillable")
                        .with_component_name(decl.qname()),
                )?;
            }
        }

        if ctx.mode == ValidationMode::Skip {
            return self.decode_untyped(node, ctx);
        }

        match &decl.type_ref {
            ElementTypeRef::Named(name) => match self.registry.lookup_type(name) {
                Some(XsdType::Complex(ct)) => {
                    let ct = ct.clone();
                    self.decode_complex(decl, &ct, node, ctx)
                }
                Some(_) => self.decode_simple_element(decl, SimpleHandle::Named(name), node, ctx),
                None => {
                    ctx.report_error(Error::NotBuilt(
                        NotBuiltError::new(name.to_string(), "type")
                            .with_referrer(decl.qname().to_string()),
                    ))?;
                    self.decode_untyped(node, ctx)
                }
            },
            ElementTypeRef::InlineSimple(st) => {
                self.decode_simple_element(decl, SimpleHandle::Inline(st), node, ctx)
            }
            ElementTypeRef::InlineComplex(ct) => self.decode_complex(decl, ct, node, ctx),
            ElementTypeRef::AnyType => self.decode_untyped(node, ctx),
        }
    }

    // ========== Simple-typed elements ==========

    fn decode_simple_element(
        &self,
        decl: &XsdElement,
        handle: SimpleHandle<'_>,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        if !node.children.is_empty() {
            ctx.report(
                ValidationError::new("an element with a simple type cannot have child elements")
                    .with_component_name(decl.qname()),
            )?;
        }
        for (name, _) in &node.attributes {
            if name.namespace.as_deref() != Some(XSI_NAMESPACE) {
                ctx.report(
                    ValidationError::new(format!(
                        "attribute '{}' is not allowed on a simple-typed element",
                        name
                    ))
                    .with_component_name(decl.qname()),
                )?;
            }
        }

        let text = self.effective_text(decl, node, ctx)?;
        let value = self.coerce_simple(handle, &text, decl.qname(), ctx)?;
        let data = ElementData::new(self.key(&node.name)).with_text(value);
        Ok(self.converter.element_decode(&data))
    }

    /// Text content after default substitution and fixed checking
    fn effective_text(
        &self,
        decl: &XsdElement,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<String> {
        let text = node.trimmed_text().unwrap_or("");
        if text.is_empty() {
            if ctx.use_defaults {
                if let Some(constraint) = decl.value_constraint() {
                    return Ok(constraint.to_string());
                }
            }
            return Ok(String::new());
        }
        if let Some(ref fixed) = decl.fixed {
            let collapsed = WhiteSpace::Collapse.normalize(text);
            if &collapsed != fixed {
                ctx.report(
                    ValidationError::new("value differs from the fixed value constraint")
                        .with_reason(format!("expected '{}'", fixed))
                        .with_value(collapsed)
                        .with_component_name(decl.qname()),
                )?;
            }
        }
        Ok(text.to_string())
    }

    fn coerce_simple(
        &self,
        handle: SimpleHandle<'_>,
        lexical: &str,
        component: &QName,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        match self.registry.decode_simple(handle, lexical) {
            Ok(value) => Ok(value.to_json()),
            Err(error) => {
                let error = attach_component(error, component);
                ctx.report_error(error)?;
                // Lax keeps going with a best-effort placeholder
                Ok(guess_value(lexical).to_json())
            }
        }
    }

    // ========== Complex-typed elements ==========

    fn decode_complex(
        &self,
        decl: &XsdElement,
        ct: &XsdComplexType,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        let mut data = ElementData::new(self.key(&node.name));
        data.attributes = self.bind_attributes(ct, node, ctx)?;

        match &ct.content {
            ContentModel::Simple(type_name) => {
                if !node.children.is_empty() {
                    ctx.report(
                        ValidationError::new(
                            "an element with simple content cannot have child elements",
                        )
                        .with_component(ct.info.display_name()),
                    )?;
                }
                let text = self.effective_text(decl, node, ctx)?;
                let value =
                    self.coerce_simple(SimpleHandle::Named(type_name), &text, decl.qname(), ctx)?;
                data.text = Some(value);
            }
            ContentModel::Empty => {
                for (index, child) in node.children.iter().enumerate() {
                    ctx.report_error(Error::Children(
                        crate::error::ChildrenValidationError::unexpected(
                            child.name.to_string(),
                            index,
                        ),
                    ))?;
                }
                if node.trimmed_text().is_some() {
                    ctx.report(
                        ValidationError::new("element content must be empty")
                            .with_component(ct.info.display_name()),
                    )?;
                }
            }
            ContentModel::Group(group) => {
                let matched = match_content(group, &node.children, self.registry);
                for error in matched.errors.iter().cloned() {
                    ctx.report_error(Error::Children(error))?;
                }

                for (index, child) in node.children.iter().enumerate() {
                    let value = match matched.matched(index) {
                        Some(Matched::Decl(child_decl)) => {
                            self.decode_element(child_decl, child, ctx)?
                        }
                        Some(Matched::Global(child_decl)) => {
                            self.decode_element(child_decl, child, ctx)?
                        }
                        Some(Matched::Wildcard(wildcard)) => {
                            self.decode_wildcard(wildcard.process_contents, child, ctx)?
                        }
                        // Unmatched children were already reported; keep them
                        // in the output so siblings stay inspectable
                        None => self.decode_untyped(child, ctx)?,
                    };
                    data.children.push((self.key(&child.name), value));
                }

                match node.trimmed_text() {
                    Some(text) if ct.mixed => {
                        data.text = Some(Value::String(text.to_string()));
                    }
                    Some(_) => {
                        ctx.report(
                            ValidationError::new(
                                "character content is not allowed in element-only content",
                            )
                            .with_component(ct.info.display_name()),
                        )?;
                    }
                    None => {}
                }
            }
        }

        Ok(self.converter.element_decode(&data))
    }

    fn decode_wildcard(
        &self,
        process_contents: ProcessContents,
        child: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        let declaration = self.registry.lookup_element(&child.name).cloned();
        match process_contents {
            ProcessContents::Skip => self.decode_untyped(child, ctx),
            ProcessContents::Lax => match declaration {
                Some(decl) => self.decode_element(&decl, child, ctx),
                None => self.decode_untyped(child, ctx),
            },
            ProcessContents::Strict => match declaration {
                Some(decl) => self.decode_element(&decl, child, ctx),
                None => {
                    ctx.report(ValidationError::new(format!(
                        "no declaration found for wildcard-matched element '{}'",
                        child.name
                    )))?;
                    self.decode_untyped(child, ctx)
                }
            },
        }
    }

    // ========== Attribute binding ==========

    fn bind_attributes(
        &self,
        ct: &XsdComplexType,
        node: &Element,
        ctx: &mut ValidationContext,
    ) -> Result<indexmap::IndexMap<String, Value>> {
        let (uses, wildcard) = collect_attribute_uses(&ct.attributes, self.registry);
        let mut bound = indexmap::IndexMap::new();

        for (name, raw) in &node.attributes {
            if name.namespace.as_deref() == Some(XSI_NAMESPACE) {
                continue;
            }
            let declared = uses.iter().find(|u| names_match(&u.name, name));
            match declared {
                Some(attr_use) => {
                    if attr_use.use_mode == AttributeUse::Prohibited {
                        ctx.report(
                            ValidationError::new(format!("attribute '{}' is prohibited", name))
                                .with_component(ct.info.display_name()),
                        )?;
                        continue;
                    }
                    let value = self.decode_attribute_value(attr_use.decl, raw, name, ctx)?;
                    bound.insert(self.key(name), value);
                }
                None => {
                    let admitted = wildcard
                        .map(|w| w.namespace.matches(name.namespace.as_deref()))
                        .unwrap_or(false);
                    if admitted {
                        bound.insert(self.key(name), guess_value(raw).to_json());
                    } else {
                        ctx.report(
                            ValidationError::new(format!("unexpected attribute '{}'", name))
                                .with_component(ct.info.display_name())
                                .with_value(raw.clone()),
                        )?;
                        bound.insert(self.key(name), guess_value(raw).to_json());
                    }
                }
            }
        }

        // Required and defaulted attributes that were not present
        for attr_use in &uses {
            if bound.contains_key(&self.key(&attr_use.name)) {
                continue;
            }
            match attr_use.use_mode {
                AttributeUse::Required => {
                    ctx.report(
                        ValidationError::new(format!(
                            "required attribute '{}' is missing",
                            attr_use.name
                        ))
                        .with_component(ct.info.display_name()),
                    )?;
                }
                AttributeUse::Optional if ctx.use_defaults => {
                    if let Some(constraint) = attr_use.decl.value_constraint() {
                        let value = self.decode_attribute_value(
                            attr_use.decl,
                            constraint,
                            &attr_use.name,
                            ctx,
                        )?;
                        bound.insert(self.key(&attr_use.name), value);
                    }
                }
                _ => {}
            }
        }

        Ok(bound)
    }

    fn decode_attribute_value(
        &self,
        decl: &XsdAttribute,
        raw: &str,
        name: &QName,
        ctx: &mut ValidationContext,
    ) -> Result<Value> {
        if let Some(ref fixed) = decl.fixed {
            let collapsed = WhiteSpace::Collapse.normalize(raw);
            if &collapsed != fixed {
                ctx.report(
                    ValidationError::new(format!(
                        "attribute '{}' differs from its fixed value",
                        name
                    ))
                    .with_reason(format!("expected '{}'", fixed))
                    .with_value(collapsed),
                )?;
            }
        }

        match (&decl.type_ref, &decl.inline_type) {
            (Some(type_name), _) => {
                self.coerce_simple(SimpleHandle::Named(type_name), raw, name, ctx)
            }
            (None, Some(inline)) => {
                self.coerce_simple(SimpleHandle::Inline(inline), raw, name, ctx)
            }
            (None, None) => Ok(guess_value(raw).to_json()),
        }
    }

    // ========== Untyped fallback ==========

    /// Schema-free decoding: structure walked, values best-guessed
    fn decode_untyped(&self, node: &Element, ctx: &mut ValidationContext) -> Result<Value> {
        let mut data = ElementData::new(self.key(&node.name));
        for (name, raw) in &node.attributes {
            if name.namespace.as_deref() == Some(XSI_NAMESPACE) {
                continue;
            }
            data.attributes
                .insert(self.key(name), guess_value(raw).to_json());
        }
        if let Some(text) = node.trimmed_text() {
            data.text = Some(guess_value(text).to_json());
        }
        for child in &node.children {
            ctx.enter(child.name.local.clone())?;
            let value = self.decode_untyped(child, ctx);
            ctx.leave();
            data.children.push((self.key(&child.name), value?));
        }
        Ok(self.converter.element_decode(&data))
    }
}

fn attach_component(error: Error, component: &QName) -> Error {
    match error {
        Error::Decode(e) if e.component.is_none() => {
            Error::Decode(e.with_component(component.to_string()))
        }
        Error::Validation(e) if e.component.is_none() => {
            Error::Validation(e.with_component(component.to_string()))
        }
        other => other,
    }
}
