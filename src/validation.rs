//! Validation modes and traversal contexts
//!
//! The three strictness modes govern what happens when the engine meets a
//! non-conforming value: strict fails fast, lax collects and keeps going with
//! a best-effort placeholder, skip suppresses validation entirely.

use crate::error::{Error, Result, ValidationError};

/// Default traversal depth limit
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Validation strictness mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// The first error aborts the whole operation
    #[default]
    Strict,
    /// Errors are collected in document order, traversal continues
    Lax,
    /// No validation at all; values pass through with best-guess typing
    Skip,
}

impl ValidationMode {
    /// Parse a mode name
    pub fn from_value(s: &str) -> Result<Self> {
        match s {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            _ => Err(Error::Value(format!(
                "invalid validation mode '{}': must be 'strict', 'lax' or 'skip'",
                s
            ))),
        }
    }

    /// The mode name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lax => "lax",
            Self::Skip => "skip",
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable state threaded through a validate/decode/encode traversal
#[derive(Debug)]
pub struct ValidationContext {
    /// Strictness mode
    pub mode: ValidationMode,
    /// Whether declared defaults fill in absent optional nodes
    pub use_defaults: bool,
    /// Errors collected under lax mode, in document order
    pub errors: Vec<ValidationError>,
    /// Current nesting level
    pub level: usize,
    /// Depth limit; exceeding it is a structural error, not a crash
    pub max_depth: usize,
    /// Instance path segments to the current node
    path: Vec<String>,
}

impl ValidationContext {
    /// Create a context with the given mode
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            use_defaults: true,
            errors: Vec::new(),
            level: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            path: Vec::new(),
        }
    }

    /// Set default filling
    pub fn with_use_defaults(mut self, use_defaults: bool) -> Self {
        self.use_defaults = use_defaults;
        self
    }

    /// Set the depth limit
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enter a child node; errors when the depth limit is exceeded
    pub fn enter(&mut self, segment: impl Into<String>) -> Result<()> {
        self.level += 1;
        self.path.push(segment.into());
        if self.level > self.max_depth {
            self.level -= 1;
            self.path.pop();
            return Err(Error::LimitExceeded(format!(
                "instance nesting exceeds the depth limit of {}",
                self.max_depth
            )));
        }
        Ok(())
    }

    /// Leave the current node
    pub fn leave(&mut self) {
        if self.level > 0 {
            self.level -= 1;
            self.path.pop();
        }
    }

    /// The instance path to the current node
    pub fn current_path(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.path.join("/"))
        }
    }

    /// Whether any errors were collected
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Handle a validation error according to the mode contract
    ///
    /// Strict propagates it, lax collects it and continues, skip drops it.
    pub fn report(&mut self, error: ValidationError) -> Result<()> {
        let error = match error.path {
            Some(_) => error,
            None => error.with_path(self.current_path()),
        };
        match self.mode {
            ValidationMode::Strict => Err(Error::Validation(error)),
            ValidationMode::Lax => {
                self.errors.push(error);
                Ok(())
            }
            ValidationMode::Skip => Ok(()),
        }
    }

    /// Route an engine-internal error through the mode contract
    ///
    /// Structural errors (depth limit) always propagate; validation-family
    /// errors follow [`Self::report`].
    pub fn report_error(&mut self, error: Error) -> Result<()> {
        match error {
            Error::Validation(e) | Error::Decode(e) | Error::Encode(e) => self.report(e),
            Error::Children(e) => self.report(e.into()),
            Error::NotBuilt(e) => self.report(
                ValidationError::new(format!("schema component is not usable: {}", e))
                    .with_component(e.name.clone()),
            ),
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!(
            ValidationMode::from_value("strict").unwrap(),
            ValidationMode::Strict
        );
        assert_eq!(ValidationMode::from_value("lax").unwrap(), ValidationMode::Lax);
        assert_eq!(ValidationMode::from_value("skip").unwrap(), ValidationMode::Skip);
        assert!(ValidationMode::from_value("other").is_err());
        assert_eq!(ValidationMode::Lax.to_string(), "lax");
    }

    #[test]
    fn test_report_strict_fails_fast() {
        let mut ctx = ValidationContext::new(ValidationMode::Strict);
        let result = ctx.report(ValidationError::new("bad value"));
        assert!(result.is_err());
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_report_lax_collects_in_order() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        ctx.report(ValidationError::new("first")).unwrap();
        ctx.report(ValidationError::new("second")).unwrap();
        assert_eq!(ctx.errors.len(), 2);
        assert_eq!(ctx.errors[0].message, "first");
        assert_eq!(ctx.errors[1].message, "second");
    }

    #[test]
    fn test_report_skip_suppresses() {
        let mut ctx = ValidationContext::new(ValidationMode::Skip);
        ctx.report(ValidationError::new("ignored")).unwrap();
        assert!(!ctx.has_errors());
    }

    #[test]
    fn test_paths() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        assert_eq!(ctx.current_path(), "/");
        ctx.enter("person").unwrap();
        ctx.enter("name").unwrap();
        assert_eq!(ctx.current_path(), "/person/name");
        ctx.leave();
        assert_eq!(ctx.current_path(), "/person");
    }

    #[test]
    fn test_error_paths_recorded() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        ctx.enter("order").unwrap();
        ctx.report(ValidationError::new("bad")).unwrap();
        assert_eq!(ctx.errors[0].path.as_deref(), Some("/order"));
    }

    #[test]
    fn test_depth_limit_is_structural() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax).with_max_depth(2);
        ctx.enter("a").unwrap();
        ctx.enter("b").unwrap();
        let err = ctx.enter("c").unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
        // Level is restored so the caller can continue siblings
        assert_eq!(ctx.level, 2);
    }

    #[test]
    fn test_report_error_structural_passthrough() {
        let mut ctx = ValidationContext::new(ValidationMode::Lax);
        let result = ctx.report_error(Error::LimitExceeded("too deep".to_string()));
        assert!(result.is_err());

        // Validation-family errors are collected instead
        ctx.report_error(Error::Decode(ValidationError::new("nope")))
            .unwrap();
        assert_eq!(ctx.errors.len(), 1);
    }
}
