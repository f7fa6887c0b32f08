//! Converter interface
//!
//! The engine hands decoded content to a converter as a generic
//! [`ElementData`] shape (tag, ordered attributes, optional text, ordered
//! children) and receives the same shape back when encoding. Converters are
//! pure functions over that shape: they know nothing about the schema and
//! never call back into validation. All presentation-style decisions live
//! here, isolated from the engine.

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// The generic shape of one decoded element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementData {
    /// Element tag name
    pub tag: String,
    /// Decoded attribute values in document order
    pub attributes: IndexMap<String, Value>,
    /// Decoded text content, if any
    pub text: Option<Value>,
    /// Decoded children as ordered (name, value) pairs
    pub children: Vec<(String, Value)>,
}

impl ElementData {
    /// Create element data for a tag
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set the text value
    pub fn with_text(mut self, text: Value) -> Self {
        self.text = Some(text);
        self
    }

    /// Add an attribute value
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    /// Add a child value
    pub fn with_child(mut self, name: impl Into<String>, value: Value) -> Self {
        self.children.push((name.into(), value));
        self
    }

    /// Whether the element carries neither attributes nor children nor text
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty() && self.text.is_none()
    }
}

/// The converter contract
///
/// `element_decode` shapes decoded element data into the caller-facing value;
/// `element_encode` is its inverse. Both must be pure.
pub trait ElementConverter: std::fmt::Debug {
    /// Shape one element's decoded data into a value
    fn element_decode(&self, data: &ElementData) -> Value;

    /// Rebuild element data from a shaped value
    fn element_encode(&self, value: &Value, tag: &str) -> ElementData;

    /// Whether round-trips through this converter may lose information
    fn is_lossy(&self) -> bool {
        false
    }
}

/// The default converter
///
/// Attributes are prefixed with `@`, text content lives under `$`, repeated
/// children fold into arrays. Elements with neither attributes nor children
/// collapse to their text value.
#[derive(Debug, Clone)]
pub struct DefaultConverter {
    /// Prefix for attribute keys
    pub attr_prefix: String,
    /// Key for text content next to attributes or children
    pub text_key: String,
}

impl Default for DefaultConverter {
    fn default() -> Self {
        Self {
            attr_prefix: "@".to_string(),
            text_key: "$".to_string(),
        }
    }
}

impl DefaultConverter {
    /// Create the default converter
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElementConverter for DefaultConverter {
    fn element_decode(&self, data: &ElementData) -> Value {
        if data.attributes.is_empty() && data.children.is_empty() {
            return data.text.clone().unwrap_or(Value::Null);
        }

        let mut object = Map::new();
        for (name, value) in &data.attributes {
            object.insert(format!("{}{}", self.attr_prefix, name), value.clone());
        }
        if let Some(ref text) = data.text {
            object.insert(self.text_key.clone(), text.clone());
        }
        for (name, value) in &data.children {
            match object.get_mut(name) {
                Some(Value::Array(items)) => items.push(value.clone()),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value.clone()]);
                }
                None => {
                    object.insert(name.clone(), value.clone());
                }
            }
        }
        Value::Object(object)
    }

    fn element_encode(&self, value: &Value, tag: &str) -> ElementData {
        let mut data = ElementData::new(tag);
        match value {
            Value::Object(object) => {
                for (key, item) in object {
                    if key == &self.text_key {
                        data.text = Some(item.clone());
                    } else if let Some(name) = key.strip_prefix(&self.attr_prefix) {
                        data.attributes.insert(name.to_string(), item.clone());
                    } else {
                        match item {
                            Value::Array(items) => {
                                for entry in items {
                                    data.children.push((key.clone(), entry.clone()));
                                }
                            }
                            other => data.children.push((key.clone(), other.clone())),
                        }
                    }
                }
            }
            Value::Null => {}
            other => data.text = Some(other.clone()),
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_only_collapses() {
        let converter = DefaultConverter::new();
        let data = ElementData::new("name").with_text(json!("Alice"));
        assert_eq!(converter.element_decode(&data), json!("Alice"));
    }

    #[test]
    fn test_empty_element_is_null() {
        let converter = DefaultConverter::new();
        assert_eq!(converter.element_decode(&ElementData::new("e")), json!(null));
    }

    #[test]
    fn test_attributes_and_text() {
        let converter = DefaultConverter::new();
        let data = ElementData::new("price")
            .with_attribute("currency", json!("EUR"))
            .with_text(json!(10.5));
        assert_eq!(
            converter.element_decode(&data),
            json!({"@currency": "EUR", "$": 10.5})
        );
    }

    #[test]
    fn test_repeated_children_fold_to_array() {
        let converter = DefaultConverter::new();
        let data = ElementData::new("order")
            .with_child("item", json!("a"))
            .with_child("item", json!("b"))
            .with_child("note", json!("n"));
        assert_eq!(
            converter.element_decode(&data),
            json!({"item": ["a", "b"], "note": "n"})
        );
    }

    #[test]
    fn test_encode_inverts_decode() {
        let converter = DefaultConverter::new();
        let data = ElementData::new("order")
            .with_attribute("id", json!(7))
            .with_child("item", json!("a"))
            .with_child("item", json!("b"));

        let value = converter.element_decode(&data);
        let back = converter.element_encode(&value, "order");

        assert_eq!(back.attributes.get("id"), Some(&json!(7)));
        assert_eq!(
            back.children,
            vec![
                ("item".to_string(), json!("a")),
                ("item".to_string(), json!("b"))
            ]
        );
    }

    #[test]
    fn test_encode_scalar_becomes_text() {
        let converter = DefaultConverter::new();
        let data = converter.element_encode(&json!(42), "count");
        assert_eq!(data.text, Some(json!(42)));
        assert!(data.children.is_empty());
    }

    #[test]
    fn test_converter_is_pure_over_shape() {
        // Converting the same shape twice yields the same value
        let converter = DefaultConverter::new();
        let data = ElementData::new("x")
            .with_attribute("a", json!("1"))
            .with_child("c", json!(2));
        assert_eq!(
            converter.element_decode(&data),
            converter.element_decode(&data)
        );
    }
}
