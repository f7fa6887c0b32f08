//! Error types for xsdkit
//!
//! This module defines the whole error family used throughout the library:
//! schema parse errors, unresolved-reference errors and the validation error
//! kinds raised or collected while decoding and encoding instances.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::names::QName;

/// Result type alias using the xsdkit [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xsdkit operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema document violates an XSD grammar constraint
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A reference could not be resolved during registry resolution
    #[error("component not built: {0}")]
    NotBuilt(#[from] NotBuiltError),

    /// Instance does not conform to a component's constraints
    #[error("validation error: {0}")]
    Validation(ValidationError),

    /// Instance could not be decoded to a typed value
    #[error("decode error: {0}")]
    Decode(ValidationError),

    /// Value could not be encoded under the target component
    #[error("encode error: {0}")]
    Encode(ValidationError),

    /// Content model violation naming the expected particle
    #[error("children validation error: {0}")]
    Children(#[from] ChildrenValidationError),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Value error (invalid value for a type or argument)
    #[error("value error: {0}")]
    Value(String),

    /// Traversal depth limit exceeded
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

impl Error {
    /// Get the inner validation error for the instance-level kinds
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(e) | Error::Decode(e) | Error::Encode(e) => Some(e),
            Error::Children(e) => Some(&e.base),
            _ => None,
        }
    }

    /// Check if this error belongs to the instance-validation family
    pub fn is_validation(&self) -> bool {
        self.as_validation().is_some()
    }
}

/// XML Schema parsing error
///
/// Records a grammar violation found while building a schema component.
/// Parse errors are collected on the offending component and never abort
/// the build of sibling components.
#[derive(Debug, Clone, Serialize)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Qualified name of the offending component, when known
    pub component: Option<String>,
    /// Location of the schema document
    pub location: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
            location: None,
        }
    }

    /// Set the offending component
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the schema document location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref component) = self.component {
            write!(f, " (component {})", component)?;
        }
        if let Some(ref location) = self.location {
            write!(f, " [{}]", location)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// Unresolved reference error
///
/// Produced by registry resolution for every `ref`/`type`/`base`/`itemType`/
/// `memberTypes` name that does not map to a built component. The referencing
/// component is unusable but the rest of the registry remains valid.
#[derive(Debug, Clone, Serialize)]
pub struct NotBuiltError {
    /// The name that failed to resolve
    pub name: String,
    /// Component category the name was looked up in
    pub category: &'static str,
    /// The component holding the dangling reference
    pub referrer: Option<String>,
}

impl NotBuiltError {
    /// Create a new not-built error
    pub fn new(name: impl Into<String>, category: &'static str) -> Self {
        Self {
            name: name.into(),
            category,
            referrer: None,
        }
    }

    /// Set the referencing component
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }
}

impl fmt::Display for NotBuiltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' is not built", self.category, self.name)?;
        if let Some(ref referrer) = self.referrer {
            write!(f, " (referenced by {})", referrer)?;
        }
        Ok(())
    }
}

impl std::error::Error for NotBuiltError {}

/// Instance validation error with context
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Original reason for the failure
    pub reason: Option<String>,
    /// Path to the instance node that failed
    pub path: Option<String>,
    /// Schema component that raised the error
    pub component: Option<String>,
    /// Offending lexical value or node snippet
    pub value: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            reason: None,
            path: None,
            component: None,
            value: None,
        }
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the instance path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema component
    pub fn with_component(mut self, component: impl Into<String>) -> Self {
        self.component = Some(component.into());
        self
    }

    /// Set the qualified name of the schema component
    pub fn with_component_name(self, name: &QName) -> Self {
        self.with_component(name.to_string())
    }

    /// Set the offending value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }
        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }
        if let Some(ref component) = self.component {
            write!(f, "\n\nSchema component: {}", component)?;
        }
        if let Some(ref value) = self.value {
            write!(f, "\n\nValue: {}", value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Content model violation
///
/// Names the expected particle with its occurrence bounds and the observed
/// count, so callers can report exactly which child was missing or in excess.
#[derive(Debug, Clone, Serialize)]
pub struct ChildrenValidationError {
    /// Base validation error
    pub base: ValidationError,
    /// Name of the expected particle
    pub particle: String,
    /// Expected minimum occurrences
    pub min_occurs: u32,
    /// Expected maximum occurrences (None = unbounded)
    pub max_occurs: Option<u32>,
    /// Observed occurrence count
    pub observed: usize,
    /// Index of the first offending child, when applicable
    pub index: Option<usize>,
}

impl ChildrenValidationError {
    /// Create a new children validation error
    pub fn new(
        particle: impl Into<String>,
        min_occurs: u32,
        max_occurs: Option<u32>,
        observed: usize,
    ) -> Self {
        let particle = particle.into();
        let bounds = match max_occurs {
            Some(max) => format!("between {} and {}", min_occurs, max),
            None => format!("at least {}", min_occurs),
        };
        let base = ValidationError::new(format!(
            "invalid number of occurrences for particle '{}'",
            particle
        ))
        .with_reason(format!("expected {}, found {}", bounds, observed));

        Self {
            base,
            particle,
            min_occurs,
            max_occurs,
            observed,
            index: None,
        }
    }

    /// Error for a child the content model does not admit at all
    pub fn unexpected(particle: impl Into<String>, index: usize) -> Self {
        let particle = particle.into();
        let base = ValidationError::new(format!(
            "unexpected child element '{}'",
            particle
        ))
        .with_reason("the content model does not allow this element here");
        Self {
            base,
            particle,
            min_occurs: 0,
            max_occurs: Some(0),
            observed: 1,
            index: Some(index),
        }
    }

    /// Set the index of the offending child
    pub fn at_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the instance path on the inner error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.base = self.base.with_path(path);
        self
    }
}

impl fmt::Display for ChildrenValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.base.fmt(f)
    }
}

impl std::error::Error for ChildrenValidationError {}

impl From<ChildrenValidationError> for ValidationError {
    fn from(err: ChildrenValidationError) -> Self {
        err.base
    }
}
