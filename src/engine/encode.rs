//! Structured-value encoding
//!
//! Encode is the structural inverse of decode: a shaped value goes through
//! the converter back into the generic element shape, is validated against
//! the target component under the same strictness modes, and comes out as an
//! element tree with lexical forms re-derived through the canonical mapping
//! of each simple type chain.

use serde_json::Value;

use super::content::names_match;
use super::{collect_attribute_uses, Engine};
use crate::components::{
    AttributeUse, ContentModel, ElementTypeRef, ModelType, Particle, XsdComplexType, XsdElement,
    XsdGroup,
};
use crate::converters::ElementData;
use crate::documents::Element;
use crate::error::{ChildrenValidationError, Error, NotBuiltError, Result, ValidationError};
use crate::names::QName;
use crate::registry::{SimpleHandle, XsdType};
use crate::validation::{ValidationContext, ValidationMode};

impl<'a> Engine<'a> {
    /// Encode a shaped value into an element tree against a declaration
    pub fn encode_element(
        &self,
        decl: &XsdElement,
        value: &Value,
        ctx: &mut ValidationContext,
    ) -> Result<Element> {
        let tag = decl.qname().clone();
        ctx.enter(tag.local.clone())?;
        let data = self.converter.element_encode(value, &tag.local);
        let result = self.encode_data(decl, &tag, &data, ctx);
        ctx.leave();
        result
    }

    fn encode_data(
        &self,
        decl: &XsdElement,
        tag: &QName,
        data: &ElementData,
        ctx: &mut ValidationContext,
    ) -> Result<Element> {
        let mut element = Element::new(tag.clone());

        if ctx.mode == ValidationMode::Skip {
            self.encode_untyped_into(&mut element, data, ctx)?;
            return Ok(element);
        }

        match &decl.type_ref {
            ElementTypeRef::Named(name) => match self.registry.lookup_type(name) {
                Some(XsdType::Complex(ct)) => {
                    let ct = ct.clone();
                    self.encode_complex_into(&mut element, decl, &ct, data, ctx)?;
                }
                Some(_) => {
                    self.encode_simple_into(
                        &mut element,
                        decl,
                        SimpleHandle::Named(name),
                        data,
                        ctx,
                    )?;
                }
                None => {
                    ctx.report_error(Error::NotBuilt(
                        NotBuiltError::new(name.to_string(), "type")
                            .with_referrer(decl.qname().to_string()),
                    ))?;
                    self.encode_untyped_into(&mut element, data, ctx)?;
                }
            },
            ElementTypeRef::InlineSimple(st) => {
                self.encode_simple_into(&mut element, decl, SimpleHandle::Inline(st), data, ctx)?;
            }
            ElementTypeRef::InlineComplex(ct) => {
                self.encode_complex_into(&mut element, decl, ct, data, ctx)?;
            }
            ElementTypeRef::AnyType => {
                self.encode_untyped_into(&mut element, data, ctx)?;
            }
        }

        Ok(element)
    }

    // ========== Simple content ==========

    fn encode_simple_into(
        &self,
        element: &mut Element,
        decl: &XsdElement,
        handle: SimpleHandle<'_>,
        data: &ElementData,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        if !data.children.is_empty() {
            ctx.report(
                ValidationError::new("a simple-typed element cannot carry child values")
                    .with_component_name(decl.qname()),
            )?;
        }
        if !data.attributes.is_empty() {
            ctx.report(
                ValidationError::new("a simple-typed element cannot carry attribute values")
                    .with_component_name(decl.qname()),
            )?;
        }

        let raw = match &data.text {
            Some(value) => value_to_lexical(value)?,
            None => match decl.value_constraint() {
                Some(constraint) if ctx.use_defaults => constraint.to_string(),
                _ => String::new(),
            },
        };
        let lexical = self.canonical_simple(handle, &raw, decl.qname(), ctx)?;
        if let Some(ref fixed) = decl.fixed {
            if &lexical != fixed {
                ctx.report(
                    ValidationError::new("value differs from the fixed value constraint")
                        .with_reason(format!("expected '{}'", fixed))
                        .with_value(lexical.clone())
                        .with_component_name(decl.qname()),
                )?;
            }
        }
        if !lexical.is_empty() {
            element.append_text(&lexical);
        }
        Ok(())
    }

    /// Validate a lexical form through the type chain, returning its
    /// canonical lexical representation
    fn canonical_simple(
        &self,
        handle: SimpleHandle<'_>,
        raw: &str,
        component: &QName,
        ctx: &mut ValidationContext,
    ) -> Result<String> {
        match self.registry.decode_simple(handle, raw) {
            Ok(value) => Ok(value.canonical_lexical()),
            Err(error) => {
                let error = into_encode_error(error, component);
                ctx.report_error(error)?;
                Ok(raw.to_string())
            }
        }
    }

    // ========== Complex content ==========

    fn encode_complex_into(
        &self,
        element: &mut Element,
        decl: &XsdElement,
        ct: &XsdComplexType,
        data: &ElementData,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        self.encode_attributes_into(element, ct, data, ctx)?;

        match &ct.content {
            ContentModel::Simple(type_name) => {
                if !data.children.is_empty() {
                    ctx.report(
                        ValidationError::new(
                            "an element with simple content cannot carry child values",
                        )
                        .with_component(ct.info.display_name()),
                    )?;
                }
                let raw = match &data.text {
                    Some(value) => value_to_lexical(value)?,
                    None => String::new(),
                };
                let lexical =
                    self.canonical_simple(SimpleHandle::Named(type_name), &raw, decl.qname(), ctx)?;
                if !lexical.is_empty() {
                    element.append_text(&lexical);
                }
            }
            ContentModel::Empty => {
                if !data.children.is_empty() || data.text.is_some() {
                    ctx.report(
                        ValidationError::new("element content must be empty")
                            .with_component(ct.info.display_name()),
                    )?;
                }
            }
            ContentModel::Group(group) => {
                let mut children: Vec<(usize, &str, &Value, bool)> = data
                    .children
                    .iter()
                    .enumerate()
                    .map(|(i, (name, value))| (i, name.as_str(), value, false))
                    .collect();
                self.encode_group_into(element, group, &mut children, ctx)?;

                for (_, name, value, used) in &children {
                    if !*used {
                        ctx.report_error(Error::Children(ChildrenValidationError::unexpected(
                            name.to_string(),
                            element.children.len(),
                        )))?;
                        // Keep unexpected values in the tree best-effort
                        let child = self.encode_untyped_value(&QName::local(*name), value, ctx)?;
                        element.push_child(child);
                    }
                }

                if let Some(ref text) = data.text {
                    if ct.mixed {
                        element.append_text(&value_to_lexical(text)?);
                    } else {
                        ctx.report(
                            ValidationError::new(
                                "character content is not allowed in element-only content",
                            )
                            .with_component(ct.info.display_name()),
                        )?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Emit a group's children in declared order, consuming shaped values
    fn encode_group_into(
        &self,
        element: &mut Element,
        group: &XsdGroup,
        children: &mut Vec<(usize, &str, &Value, bool)>,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        for particle in &group.particles {
            match particle {
                Particle::Element { decl, occurs } => {
                    let count = self.encode_matching(
                        element,
                        decl,
                        decl.qname(),
                        children,
                        ctx,
                    )?;
                    self.check_occurs(&particle.display_name(), *occurs, count, group, ctx)?;
                }
                Particle::ElementRef { name, occurs } => {
                    match self.registry.lookup_element(name) {
                        Some(global) => {
                            let global = global.clone();
                            let count =
                                self.encode_matching(element, &global, name, children, ctx)?;
                            self.check_occurs(&particle.display_name(), *occurs, count, group, ctx)?;
                        }
                        None => {}
                    }
                }
                Particle::Any { wildcard, occurs } => {
                    let mut count = 0usize;
                    for entry in children.iter_mut() {
                        if entry.3 {
                            continue;
                        }
                        let name = QName::local(entry.1);
                        if wildcard.matches(&name) {
                            entry.3 = true;
                            count += 1;
                            let child = match self.registry.lookup_element(&name) {
                                Some(global) => {
                                    let global = global.clone();
                                    self.encode_element(&global, entry.2, ctx)?
                                }
                                None => self.encode_untyped_value(&name, entry.2, ctx)?,
                            };
                            element.push_child(child);
                        }
                    }
                    self.check_occurs("xs:any", *occurs, count, group, ctx)?;
                }
                Particle::Group(nested) => {
                    self.encode_group_into(element, nested, children, ctx)?;
                }
                Particle::GroupRef { name, .. } => {
                    if let Some(referenced) = self.registry.lookup_group(name) {
                        let referenced = referenced.clone();
                        self.encode_group_into(element, &referenced, children, ctx)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn encode_matching(
        &self,
        element: &mut Element,
        decl: &XsdElement,
        name: &QName,
        children: &mut Vec<(usize, &str, &Value, bool)>,
        ctx: &mut ValidationContext,
    ) -> Result<usize> {
        let mut count = 0usize;
        for entry in children.iter_mut() {
            if entry.3 || !names_match(name, &QName::local(entry.1)) {
                continue;
            }
            entry.3 = true;
            count += 1;
            let child = self.encode_element(decl, entry.2, ctx)?;
            element.push_child(child);
        }
        Ok(count)
    }

    fn check_occurs(
        &self,
        particle: &str,
        occurs: crate::components::Occurs,
        count: usize,
        group: &XsdGroup,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        // Choice alternatives are individually optional; the choice itself
        // is checked through the union of its alternatives
        let effective_min = if group.model == ModelType::Choice {
            0
        } else {
            occurs.min
        };
        if count < effective_min as usize || occurs.is_exceeded(count) {
            ctx.report_error(Error::Children(
                ChildrenValidationError::new(particle, occurs.min, occurs.max, count)
                    .at_index(count),
            ))?;
        }
        Ok(())
    }

    // ========== Attributes ==========

    fn encode_attributes_into(
        &self,
        element: &mut Element,
        ct: &XsdComplexType,
        data: &ElementData,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        let (uses, wildcard) = collect_attribute_uses(&ct.attributes, self.registry);

        for (name, value) in &data.attributes {
            let instance_name = QName::local(name.clone());
            let declared = uses.iter().find(|u| names_match(&u.name, &instance_name));
            let raw = value_to_lexical(value)?;
            match declared {
                Some(attr_use) => {
                    if attr_use.use_mode == AttributeUse::Prohibited {
                        ctx.report(
                            ValidationError::new(format!("attribute '{}' is prohibited", name))
                                .with_component(ct.info.display_name()),
                        )?;
                        continue;
                    }
                    let lexical = match (&attr_use.decl.type_ref, &attr_use.decl.inline_type) {
                        (Some(type_name), _) => self.canonical_simple(
                            SimpleHandle::Named(type_name),
                            &raw,
                            &attr_use.name,
                            ctx,
                        )?,
                        (None, Some(inline)) => self.canonical_simple(
                            SimpleHandle::Inline(inline),
                            &raw,
                            &attr_use.name,
                            ctx,
                        )?,
                        (None, None) => raw,
                    };
                    element.set_attribute(attr_use.name.clone(), lexical);
                }
                None => {
                    let admitted = wildcard
                        .map(|w| w.namespace.matches(instance_name.namespace.as_deref()))
                        .unwrap_or(false);
                    if !admitted {
                        ctx.report(
                            ValidationError::new(format!("unexpected attribute '{}'", name))
                                .with_component(ct.info.display_name()),
                        )?;
                    }
                    element.set_attribute(instance_name, raw);
                }
            }
        }

        for attr_use in &uses {
            if element.attribute_qname(&attr_use.name).is_some() {
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
                        element.set_attribute(attr_use.name.clone(), constraint.to_string());
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    // ========== Untyped fallback ==========

    fn encode_untyped_into(
        &self,
        element: &mut Element,
        data: &ElementData,
        ctx: &mut ValidationContext,
    ) -> Result<()> {
        for (name, value) in &data.attributes {
            element.set_attribute(QName::local(name.clone()), value_to_lexical(value)?);
        }
        if let Some(ref text) = data.text {
            element.append_text(&value_to_lexical(text)?);
        }
        for (name, value) in &data.children {
            let child = self.encode_untyped_value(&QName::local(name.clone()), value, ctx)?;
            element.push_child(child);
        }
        Ok(())
    }

    fn encode_untyped_value(
        &self,
        name: &QName,
        value: &Value,
        ctx: &mut ValidationContext,
    ) -> Result<Element> {
        ctx.enter(name.local.clone())?;
        let data = self.converter.element_encode(value, &name.local);
        let mut element = Element::new(name.clone());
        let result = self.encode_untyped_into(&mut element, &data, ctx);
        ctx.leave();
        result?;
        Ok(element)
    }

}

/// Derive the lexical form of a shaped scalar value
pub fn value_to_lexical(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(if *b { "true" } else { "false" }.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .map(value_to_lexical)
                .collect::<Result<_>>()?;
            Ok(parts.join(" "))
        }
        Value::Object(_) => Err(Error::Encode(
            ValidationError::new("cannot encode a structured value as simple content")
                .with_value(value.to_string()),
        )),
    }
}

fn into_encode_error(error: Error, component: &QName) -> Error {
    match error {
        Error::Decode(e) | Error::Validation(e) | Error::Encode(e) => {
            let e = if e.component.is_none() {
                e.with_component(component.to_string())
            } else {
                e
            };
            Error::Encode(e)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_to_lexical() {
        assert_eq!(value_to_lexical(&Value::Null).unwrap(), "");
        assert_eq!(value_to_lexical(&serde_json::json!("x")).unwrap(), "x");
        assert_eq!(value_to_lexical(&serde_json::json!(true)).unwrap(), "true");
        assert_eq!(value_to_lexical(&serde_json::json!(42)).unwrap(), "42");
        assert_eq!(
            value_to_lexical(&serde_json::json!([1, 2, 3])).unwrap(),
            "1 2 3"
        );
        assert!(value_to_lexical(&serde_json::json!({"a": 1})).is_err());
    }
}
