//! # xsdkit
//!
//! Schema-driven XML validation, decoding and encoding for Rust.
//!
//! The crate parses XSD schema documents into a typed component model,
//! resolves references across included/imported/redefined documents into a
//! global registry, and uses the resolved registry to validate XML instances
//! and map them to and from structured data.
//!
//! ## Example
//!
//! ```rust
//! use xsdkit::XmlSchema;
//!
//! let schema = XmlSchema::from_str(r#"
//!     <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
//!       <xs:element name="greeting" type="xs:string"/>
//!     </xs:schema>"#).unwrap();
//!
//! assert!(schema.is_valid("<greeting>hello</greeting>"));
//! let json = schema.to_json("<greeting>hello</greeting>").unwrap();
//! assert_eq!(json, "\"hello\"");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;

pub mod locations;
pub mod names;

pub mod documents;

pub mod builtins;
pub mod facets;

pub mod components;

pub mod builder;
pub mod registry;

pub mod converters;
pub mod engine;
pub mod validation;

pub mod schema;

pub use error::{
    ChildrenValidationError, Error, NotBuiltError, ParseError, Result, ValidationError,
};
pub use names::QName;
pub use schema::{validate, DecodeOptions, EncodeOptions, LocationMap, XmlSchema, XmlSchemaBuilder};
pub use validation::ValidationMode;

/// Version of the xsdkit library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML Schema namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema Instance namespace
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
