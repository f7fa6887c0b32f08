//! The public schema object
//!
//! [`XmlSchema`] ties the pieces together: it assembles the registry from one
//! or more schema documents (following include/import/redefine directives
//! against the filesystem and caller-supplied location hints), resolves it,
//! and exposes validate/decode/encode over instances. All I/O happens during
//! building; a built schema is immutable and shareable.

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;

use crate::builder::parse_schema_document;
use crate::converters::{DefaultConverter, ElementConverter};
use crate::documents::{Document, Element};
use crate::engine::Engine;
use crate::error::{Error, Result, ValidationError};
use crate::locations::normalize_location;
use crate::names::QName;
use crate::registry::SchemaRegistry;
use crate::validation::{ValidationContext, ValidationMode};

/// Namespace to schema-location hints, used to satisfy imports offline
pub type LocationMap = HashMap<String, String>;

/// Options for decoding
#[derive(Debug, Default)]
pub struct DecodeOptions<'c> {
    /// Strictness mode
    pub mode: ValidationMode,
    /// Fill declared defaults for absent optional attributes and empty
    /// elements (on by default)
    pub use_defaults: Option<bool>,
    /// Slash-separated path selecting the subelement to decode
    pub path: Option<String>,
    /// Emit `{namespace}local` keys instead of processing namespaces away
    pub qualified_names: bool,
    /// Converter strategy; the default converter when not given
    pub converter: Option<&'c dyn ElementConverter>,
}

/// Options for encoding
#[derive(Debug, Default)]
pub struct EncodeOptions<'c> {
    /// Strictness mode
    pub mode: ValidationMode,
    /// Fill declared defaults for absent optional attributes
    pub use_defaults: Option<bool>,
    /// Name of the target global element; the first one when not given
    pub element: Option<String>,
    /// Converter strategy; the default converter when not given
    pub converter: Option<&'c dyn ElementConverter>,
}

/// A built XML schema
#[derive(Debug)]
pub struct XmlSchema {
    registry: SchemaRegistry,
    /// Target namespace of the primary schema document
    pub target_namespace: Option<String>,
}

impl XmlSchema {
    /// Build a schema from XSD text, strict about schema errors
    pub fn from_str(source: &str) -> Result<Self> {
        XmlSchemaBuilder::new().source(source).build()
    }

    /// Build a schema from an XSD file, strict about schema errors
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        XmlSchemaBuilder::new().file(path)?.build()
    }

    /// Start a builder for multi-document or lax construction
    pub fn builder() -> XmlSchemaBuilder {
        XmlSchemaBuilder::new()
    }

    /// The resolved component registry
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Find the declaration for a document root element
    fn root_declaration(&self, name: &QName) -> Result<std::sync::Arc<crate::components::XsdElement>> {
        if let Some(decl) = self.registry.lookup_element(name) {
            return Ok(decl.clone());
        }
        // Tolerate a namespace mismatch when the local name is unambiguous
        let mut candidates = self
            .registry
            .elements
            .values()
            .filter(|decl| decl.qname().local == name.local);
        match (candidates.next(), candidates.next()) {
            (Some(decl), None) => Ok(decl.clone()),
            _ => Err(Error::Validation(
                ValidationError::new(format!(
                    "no global element declaration matches document root '{}'",
                    name
                ))
                .with_value(name.to_string()),
            )),
        }
    }

    /// Validate an XML string; the first violation is returned as an error
    pub fn validate(&self, xml: &str) -> Result<()> {
        let doc = Document::from_str(xml)?;
        self.validate_document(&doc)
    }

    /// Validate a parsed document
    pub fn validate_document(&self, doc: &Document) -> Result<()> {
        let decl = self.root_declaration(&doc.root.name)?;
        let converter = DefaultConverter::new();
        let engine = Engine::new(&self.registry, &converter);
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        engine.validate_element(&decl, &doc.root, &mut ctx)
    }

    /// Check validity without error details
    pub fn is_valid(&self, xml: &str) -> bool {
        self.validate(xml).is_ok()
    }

    /// Collect every validation error for an XML string, in document order
    pub fn iter_errors(&self, xml: &str) -> Result<Vec<ValidationError>> {
        let (_, errors) = self.decode(
            xml,
            &DecodeOptions {
                mode: ValidationMode::Lax,
                ..DecodeOptions::default()
            },
        )?;
        Ok(errors)
    }

    /// Decode an XML string into a structured value
    ///
    /// Under strict mode the error list is empty on success and the first
    /// violation aborts with an error. Under lax mode the list carries every
    /// violation in document order next to the best-effort value. Under skip
    /// mode the list is always empty.
    pub fn decode(
        &self,
        xml: &str,
        options: &DecodeOptions<'_>,
    ) -> Result<(Value, Vec<ValidationError>)> {
        let doc = Document::from_str(xml)?;
        self.decode_document(&doc, options)
    }

    /// Decode a parsed document
    pub fn decode_document(
        &self,
        doc: &Document,
        options: &DecodeOptions<'_>,
    ) -> Result<(Value, Vec<ValidationError>)> {
        let node = match options.path {
            Some(ref path) => doc.root.find_path(path).ok_or_else(|| {
                Error::Value(format!("path '{}' selects no element in the document", path))
            })?,
            None => &doc.root,
        };
        let decl = self.root_declaration(&node.name)?;

        let default_converter = DefaultConverter::new();
        let converter = options.converter.unwrap_or(&default_converter);
        let engine = Engine::new(&self.registry, converter)
            .with_qualified_names(options.qualified_names);
        let mut ctx = ValidationContext::new(options.mode)
            .with_use_defaults(options.use_defaults.unwrap_or(true));

        let value = engine.decode_element(&decl, node, &mut ctx)?;
        Ok((value, ctx.errors))
    }

    /// Decode an XML string and serialize the value to JSON text
    pub fn to_json(&self, xml: &str) -> Result<String> {
        let (value, _) = self.decode(xml, &DecodeOptions::default())?;
        serde_json::to_string(&value).map_err(|e| Error::Value(e.to_string()))
    }

    /// Encode a structured value into an element tree
    pub fn encode(
        &self,
        value: &Value,
        options: &EncodeOptions<'_>,
    ) -> Result<(Element, Vec<ValidationError>)> {
        let decl = match options.element {
            Some(ref name) => {
                let qname = QName::new(self.target_namespace.clone(), name.as_str());
                self.root_declaration(&qname)?
            }
            None => self
                .registry
                .elements
                .values()
                .next()
                .cloned()
                .ok_or_else(|| {
                    Error::Value("the schema declares no global elements".to_string())
                })?,
        };

        let default_converter = DefaultConverter::new();
        let converter = options.converter.unwrap_or(&default_converter);
        let engine = Engine::new(&self.registry, converter);
        let mut ctx = ValidationContext::new(options.mode)
            .with_use_defaults(options.use_defaults.unwrap_or(true));

        let element = engine.encode_element(&decl, value, &mut ctx)?;
        Ok((element, ctx.errors))
    }

    /// Encode JSON text into an XML string
    pub fn from_json(&self, json: &str, options: &EncodeOptions<'_>) -> Result<String> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::Value(e.to_string()))?;
        let (element, errors) = self.encode(&value, options)?;
        if options.mode == ValidationMode::Strict {
            if let Some(first) = errors.into_iter().next() {
                return Err(Error::Encode(first));
            }
        }
        Ok(element.to_xml())
    }
}

/// Builder assembling a schema from sources and location hints
#[derive(Debug, Default)]
pub struct XmlSchemaBuilder {
    sources: Vec<(String, Option<String>)>,
    locations: LocationMap,
    validation: ValidationMode,
}

impl XmlSchemaBuilder {
    /// Create an empty builder with strict build validation
    pub fn new() -> Self {
        Self::default()
    }

    /// Add inline XSD text
    pub fn source(mut self, text: &str) -> Self {
        self.sources.push((text.to_string(), None));
        self
    }

    /// Add an XSD file
    pub fn file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = read_schema_file(path)?;
        self.sources
            .push((text, Some(path.to_string_lossy().into_owned())));
        Ok(self)
    }

    /// Add a namespace to location hint used to satisfy imports
    pub fn location(mut self, namespace: &str, location: &str) -> Self {
        self.locations
            .insert(namespace.to_string(), location.to_string());
        self
    }

    /// Set the build validation mode
    ///
    /// Strict fails on any schema error; lax keeps the registry usable and
    /// leaves the errors inspectable through [`SchemaRegistry::errors`].
    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Parse all documents, follow directives, and resolve the registry
    pub fn build(self) -> Result<XmlSchema> {
        if self.sources.is_empty() {
            return Err(Error::Value("no schema sources were provided".to_string()));
        }

        let mut registry = SchemaRegistry::new();
        let mut target_namespace = None;

        for (index, (text, location)) in self.sources.iter().enumerate() {
            let namespace = add_source(
                &mut registry,
                text,
                location.as_deref(),
                &self.locations,
            )?;
            if index == 0 {
                target_namespace = namespace;
            }
        }

        registry.resolve();

        if self.validation == ValidationMode::Strict {
            if let Some(first) = registry.errors().first() {
                return Err(Error::Parse(crate::error::ParseError::new(
                    first.to_string(),
                )));
            }
        }

        Ok(XmlSchema {
            registry,
            target_namespace,
        })
    }
}

/// Parse one source, recursing into its directives, and add it
fn add_source(
    registry: &mut SchemaRegistry,
    text: &str,
    location: Option<&str>,
    hints: &LocationMap,
) -> Result<Option<String>> {
    if let Some(location) = location {
        if !registry.mark_location(location, None) {
            return Ok(None);
        }
    }

    let doc = Document::from_str(text)?;
    let parsed = parse_schema_document(&doc, location)?;
    let target_namespace = parsed.target_namespace.clone();

    // Load the closure before adding this document, so redefined targets
    // are present when the redefining components land
    for include in &parsed.includes {
        load_directive(registry, include, location, hints)?;
    }
    for import in &parsed.imports {
        let hint = import
            .location
            .clone()
            .or_else(|| import.namespace.as_ref().and_then(|ns| hints.get(ns).cloned()));
        if let Some(hint) = hint {
            load_directive(registry, &hint, location, hints)?;
        }
    }
    for redefine in &parsed.redefines {
        load_directive(registry, &redefine.location, location, hints)?;
    }

    registry.add_document(&parsed);
    Ok(target_namespace)
}

fn load_directive(
    registry: &mut SchemaRegistry,
    target: &str,
    base: Option<&str>,
    hints: &LocationMap,
) -> Result<()> {
    let resolved = normalize_location(target, base);
    if !registry.mark_location(&resolved, None) {
        return Ok(());
    }
    let text = read_schema_file(Path::new(&resolved))?;
    let doc = Document::from_str(&text)?;
    let parsed = parse_schema_document(&doc, Some(&resolved))?;

    for include in &parsed.includes {
        load_directive(registry, include, Some(&resolved), hints)?;
    }
    for import in &parsed.imports {
        let hint = import
            .location
            .clone()
            .or_else(|| import.namespace.as_ref().and_then(|ns| hints.get(ns).cloned()));
        if let Some(hint) = hint {
            load_directive(registry, &hint, Some(&resolved), hints)?;
        }
    }
    for redefine in &parsed.redefines {
        load_directive(registry, &redefine.location, Some(&resolved), hints)?;
    }

    registry.add_document(&parsed);
    Ok(())
}

fn read_schema_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::Resource(format!("cannot read schema '{}': {}", path.display(), e)))
}

/// Validate an XML string against a schema given as XSD text
///
/// Convenience wrapper building the schema on the fly.
pub fn validate(xml: &str, schema_source: &str) -> Result<()> {
    XmlSchema::from_str(schema_source)?.validate(xml)
}
