//! Constraining facets and restriction composition
//!
//! Facets are collected lexically during schema parsing and composed into an
//! [`EffectiveConstraints`] set when a restriction chain is resolved against
//! its primitive category. Composition enforces the XSD restriction rules:
//! enumerations and patterns accumulate across derivation levels, bounds and
//! length limits may only narrow.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::builtins::{compare_values, PrimitiveCategory, XsdValue};
use crate::error::{Error, ParseError, Result, ValidationError};

/// White space handling modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WhiteSpace {
    /// Preserve all white space
    Preserve,
    /// Replace tabs, carriage returns and newlines with spaces
    Replace,
    /// Replace, then collapse runs of spaces and trim
    Collapse,
}

impl WhiteSpace {
    /// Parse from a facet value
    pub fn from_value(s: &str) -> Result<Self> {
        match s {
            "preserve" => Ok(WhiteSpace::Preserve),
            "replace" => Ok(WhiteSpace::Replace),
            "collapse" => Ok(WhiteSpace::Collapse),
            _ => Err(Error::Value(format!(
                "invalid whiteSpace value: '{}'",
                s
            ))),
        }
    }

    /// Normalize a string according to this mode
    pub fn normalize(&self, s: &str) -> String {
        match self {
            WhiteSpace::Preserve => s.to_string(),
            WhiteSpace::Replace => s.replace(['\t', '\n', '\r'], " "),
            WhiteSpace::Collapse => {
                let replaced = s.replace(['\t', '\n', '\r'], " ");
                let mut out = String::with_capacity(replaced.len());
                let mut previous_space = true;
                for c in replaced.chars() {
                    if c == ' ' {
                        if !previous_space {
                            out.push(' ');
                            previous_space = true;
                        }
                    } else {
                        out.push(c);
                        previous_space = false;
                    }
                }
                out.trim_end().to_string()
            }
        }
    }
}

/// The constraining facet kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FacetKind {
    /// Exact length
    Length,
    /// Minimum length
    MinLength,
    /// Maximum length
    MaxLength,
    /// Regular expression pattern
    Pattern,
    /// Enumerated value set
    Enumeration,
    /// White space normalization
    WhiteSpace,
    /// Inclusive upper bound
    MaxInclusive,
    /// Exclusive upper bound
    MaxExclusive,
    /// Inclusive lower bound
    MinInclusive,
    /// Exclusive lower bound
    MinExclusive,
    /// Maximum number of significant digits
    TotalDigits,
    /// Maximum number of fraction digits
    FractionDigits,
}

impl FacetKind {
    /// Parse from the facet element's local tag name
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "length" => Some(Self::Length),
            "minLength" => Some(Self::MinLength),
            "maxLength" => Some(Self::MaxLength),
            "pattern" => Some(Self::Pattern),
            "enumeration" => Some(Self::Enumeration),
            "whiteSpace" => Some(Self::WhiteSpace),
            "maxInclusive" => Some(Self::MaxInclusive),
            "maxExclusive" => Some(Self::MaxExclusive),
            "minInclusive" => Some(Self::MinInclusive),
            "minExclusive" => Some(Self::MinExclusive),
            "totalDigits" => Some(Self::TotalDigits),
            "fractionDigits" => Some(Self::FractionDigits),
            _ => None,
        }
    }

    /// The facet's tag name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::MinLength => "minLength",
            Self::MaxLength => "maxLength",
            Self::Pattern => "pattern",
            Self::Enumeration => "enumeration",
            Self::WhiteSpace => "whiteSpace",
            Self::MaxInclusive => "maxInclusive",
            Self::MaxExclusive => "maxExclusive",
            Self::MinInclusive => "minInclusive",
            Self::MinExclusive => "minExclusive",
            Self::TotalDigits => "totalDigits",
            Self::FractionDigits => "fractionDigits",
        }
    }

    /// Check if this is one of the four bound facets
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            Self::MaxInclusive | Self::MaxExclusive | Self::MinInclusive | Self::MinExclusive
        )
    }
}

impl std::fmt::Display for FacetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A facet as parsed from a schema document: kind plus lexical value
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    /// The facet kind
    pub kind: FacetKind,
    /// The facet's lexical value
    pub value: String,
    /// Whether the facet is fixed for further derivation
    pub fixed: bool,
}

impl Facet {
    /// Create a new facet
    pub fn new(kind: FacetKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            fixed: false,
        }
    }
}

static LEGAL_FACETS: Lazy<HashMap<PrimitiveCategory, Vec<FacetKind>>> = Lazy::new(|| {
    use FacetKind::*;
    let lengthy = vec![Length, MinLength, MaxLength, Pattern, Enumeration, WhiteSpace];
    let ordered = vec![
        Pattern,
        Enumeration,
        WhiteSpace,
        MaxInclusive,
        MaxExclusive,
        MinInclusive,
        MinExclusive,
    ];
    let mut decimal = ordered.clone();
    decimal.push(TotalDigits);
    decimal.push(FractionDigits);

    let mut map = HashMap::new();
    map.insert(PrimitiveCategory::String, lengthy.clone());
    map.insert(PrimitiveCategory::Boolean, vec![Pattern, WhiteSpace]);
    map.insert(PrimitiveCategory::Decimal, decimal);
    map.insert(PrimitiveCategory::Float, ordered.clone());
    map.insert(PrimitiveCategory::DateTime, ordered);
    map.insert(PrimitiveCategory::Binary, lengthy.clone());
    map.insert(PrimitiveCategory::AnyUri, lengthy.clone());
    map.insert(PrimitiveCategory::QName, lengthy);
    map
});

/// The admissible facet kinds for a primitive category
pub fn legal_facets(category: PrimitiveCategory) -> &'static [FacetKind] {
    LEGAL_FACETS
        .get(&category)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// A compiled pattern facet
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// The source expression
    pub source: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile a pattern, anchoring it as XSD requires
    pub fn compile(pattern: &str) -> Result<Self> {
        let anchored = format!("^(?:{})$", pattern);
        let regex = Regex::new(&anchored)
            .map_err(|e| Error::Value(format!("invalid pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check a value against the pattern
    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }
}

/// The effective constraint set of a restriction chain
///
/// One instance covers the whole derivation chain down to the primitive:
/// patterns and enumeration levels accumulate, everything else holds the
/// narrowest value seen.
#[derive(Debug, Clone, Default)]
pub struct EffectiveConstraints {
    /// Effective white space mode (strongest in the chain)
    pub white_space: Option<WhiteSpace>,
    /// Exact length
    pub length: Option<u32>,
    /// Minimum length
    pub min_length: Option<u32>,
    /// Maximum length
    pub max_length: Option<u32>,
    /// Patterns from every derivation level; all must match
    pub patterns: Vec<CompiledPattern>,
    /// Enumeration levels; the value must belong to each level's set
    pub enumerations: Vec<Vec<String>>,
    /// Inclusive lower bound
    pub min_inclusive: Option<XsdValue>,
    /// Exclusive lower bound
    pub min_exclusive: Option<XsdValue>,
    /// Inclusive upper bound
    pub max_inclusive: Option<XsdValue>,
    /// Exclusive upper bound
    pub max_exclusive: Option<XsdValue>,
    /// Maximum significant digits
    pub total_digits: Option<u32>,
    /// Maximum fraction digits
    pub fraction_digits: Option<u32>,
}

impl EffectiveConstraints {
    /// Constraints of an underived type with the given white space rule
    pub fn with_white_space(white_space: WhiteSpace) -> Self {
        Self {
            white_space: Some(white_space),
            ..Self::default()
        }
    }

    /// Effective white space, defaulting to collapse
    pub fn effective_white_space(&self) -> WhiteSpace {
        self.white_space.unwrap_or(WhiteSpace::Collapse)
    }

    fn lower_bound(&self) -> Option<(&XsdValue, bool)> {
        match (&self.min_inclusive, &self.min_exclusive) {
            (Some(v), _) => Some((v, false)),
            (None, Some(v)) => Some((v, true)),
            _ => None,
        }
    }

    fn upper_bound(&self) -> Option<(&XsdValue, bool)> {
        match (&self.max_inclusive, &self.max_exclusive) {
            (Some(v), _) => Some((v, false)),
            (None, Some(v)) => Some((v, true)),
            _ => None,
        }
    }

    /// Check a whitespace-normalized lexical form and its typed value
    pub fn check(&self, lexical: &str, value: &XsdValue) -> Result<()> {
        self.check_length(value_length(lexical, value))?;

        for pattern in &self.patterns {
            if !pattern.matches(lexical) {
                return Err(facet_violation(
                    FacetKind::Pattern,
                    lexical,
                    format!("value does not match pattern '{}'", pattern.source),
                ));
            }
        }

        for level in &self.enumerations {
            if !level.iter().any(|allowed| allowed == lexical) {
                return Err(facet_violation(
                    FacetKind::Enumeration,
                    lexical,
                    format!("value is not one of {:?}", level),
                ));
            }
        }

        self.check_bounds(lexical, value)?;
        self.check_digits(lexical, value)?;
        Ok(())
    }

    /// Check a length count against the length facets
    pub fn check_length(&self, count: usize) -> Result<()> {
        if let Some(length) = self.length {
            if count != length as usize {
                return Err(facet_violation(
                    FacetKind::Length,
                    &count.to_string(),
                    format!("length must be exactly {}, found {}", length, count),
                ));
            }
        }
        if let Some(min) = self.min_length {
            if count < min as usize {
                return Err(facet_violation(
                    FacetKind::MinLength,
                    &count.to_string(),
                    format!("length must be at least {}, found {}", min, count),
                ));
            }
        }
        if let Some(max) = self.max_length {
            if count > max as usize {
                return Err(facet_violation(
                    FacetKind::MaxLength,
                    &count.to_string(),
                    format!("length must be at most {}, found {}", max, count),
                ));
            }
        }
        Ok(())
    }

    fn check_bounds(&self, lexical: &str, value: &XsdValue) -> Result<()> {
        if let Some(ref bound) = self.min_inclusive {
            if compare_values(value, bound) == Some(Ordering::Less) {
                return Err(facet_violation(
                    FacetKind::MinInclusive,
                    lexical,
                    format!("value must be >= {}", bound.canonical_lexical()),
                ));
            }
        }
        if let Some(ref bound) = self.min_exclusive {
            if !matches!(compare_values(value, bound), Some(Ordering::Greater)) {
                return Err(facet_violation(
                    FacetKind::MinExclusive,
                    lexical,
                    format!("value must be > {}", bound.canonical_lexical()),
                ));
            }
        }
        if let Some(ref bound) = self.max_inclusive {
            if compare_values(value, bound) == Some(Ordering::Greater) {
                return Err(facet_violation(
                    FacetKind::MaxInclusive,
                    lexical,
                    format!("value must be <= {}", bound.canonical_lexical()),
                ));
            }
        }
        if let Some(ref bound) = self.max_exclusive {
            if !matches!(compare_values(value, bound), Some(Ordering::Less)) {
                return Err(facet_violation(
                    FacetKind::MaxExclusive,
                    lexical,
                    format!("value must be < {}", bound.canonical_lexical()),
                ));
            }
        }
        Ok(())
    }

    fn check_digits(&self, lexical: &str, value: &XsdValue) -> Result<()> {
        if let Some(total) = self.total_digits {
            let digits = significant_digits(value);
            if digits > total {
                return Err(facet_violation(
                    FacetKind::TotalDigits,
                    lexical,
                    format!("value has {} digits, at most {} allowed", digits, total),
                ));
            }
        }
        if let Some(fraction) = self.fraction_digits {
            let scale = fraction_scale(value);
            if scale > fraction {
                return Err(facet_violation(
                    FacetKind::FractionDigits,
                    lexical,
                    format!(
                        "value has {} fraction digits, at most {} allowed",
                        scale, fraction
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn value_length(lexical: &str, value: &XsdValue) -> usize {
    match value {
        XsdValue::HexBinary(data) | XsdValue::Base64Binary(data) => data.len(),
        XsdValue::List(items) => items.len(),
        _ => lexical.chars().count(),
    }
}

fn significant_digits(value: &XsdValue) -> u32 {
    match value {
        XsdValue::Integer(i) => {
            let abs = i.unsigned_abs();
            if abs == 0 {
                1
            } else {
                abs.ilog10() + 1
            }
        }
        XsdValue::Decimal(d) => d
            .normalize()
            .to_string()
            .chars()
            .filter(char::is_ascii_digit)
            .count() as u32,
        _ => 0,
    }
}

fn fraction_scale(value: &XsdValue) -> u32 {
    match value {
        XsdValue::Decimal(d) => d.normalize().scale(),
        _ => 0,
    }
}

fn facet_violation(kind: FacetKind, value: &str, reason: String) -> Error {
    Error::Validation(
        ValidationError::new(format!("value does not satisfy facet {}", kind))
            .with_reason(reason)
            .with_value(value),
    )
}

/// Compose one restriction level onto the base's effective constraints
///
/// Illegal facets for the category and widening attempts are reported as
/// parse errors; the returned constraints are still usable best-effort, with
/// the offending facets ignored.
pub fn compose_restriction(
    base: &EffectiveConstraints,
    facets: &[Facet],
    category: PrimitiveCategory,
    parse_bound: &dyn Fn(&str) -> Result<XsdValue>,
) -> (EffectiveConstraints, Vec<ParseError>) {
    let mut errors = Vec::new();
    let mut composed = base.clone();
    let legal = legal_facets(category);
    let mut enum_level: Vec<String> = Vec::new();

    for facet in facets {
        if !legal.contains(&facet.kind) {
            errors.push(ParseError::new(format!(
                "facet '{}' is not allowed for this type category",
                facet.kind
            )));
            continue;
        }

        match facet.kind {
            FacetKind::Enumeration => {
                let normalized = composed.effective_white_space().normalize(&facet.value);
                enum_level.push(normalized);
            }
            FacetKind::Pattern => match CompiledPattern::compile(&facet.value) {
                Ok(pattern) => composed.patterns.push(pattern),
                Err(e) => errors.push(ParseError::new(e.to_string())),
            },
            FacetKind::WhiteSpace => match WhiteSpace::from_value(&facet.value) {
                Ok(mode) => {
                    let current = composed.effective_white_space();
                    if mode < current {
                        errors.push(ParseError::new(format!(
                            "whiteSpace cannot be weakened from '{:?}'",
                            current
                        )));
                    } else {
                        composed.white_space = Some(mode);
                    }
                }
                Err(e) => errors.push(ParseError::new(e.to_string())),
            },
            FacetKind::Length | FacetKind::MinLength | FacetKind::MaxLength => {
                apply_length_facet(&mut composed, facet, &mut errors);
            }
            FacetKind::TotalDigits | FacetKind::FractionDigits => {
                apply_digits_facet(&mut composed, facet, &mut errors);
            }
            kind if kind.is_bound() => {
                apply_bound_facet(&mut composed, facet, parse_bound, &mut errors);
            }
            _ => unreachable!(),
        }
    }

    if !enum_level.is_empty() {
        composed.enumerations.push(enum_level);
    }

    (composed, errors)
}

fn parse_u32_facet(facet: &Facet, errors: &mut Vec<ParseError>) -> Option<u32> {
    match facet.value.parse::<u32>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ParseError::new(format!(
                "facet '{}' requires a non-negative integer value, found '{}'",
                facet.kind, facet.value
            )));
            None
        }
    }
}

fn apply_length_facet(
    constraints: &mut EffectiveConstraints,
    facet: &Facet,
    errors: &mut Vec<ParseError>,
) {
    let Some(value) = parse_u32_facet(facet, errors) else {
        return;
    };
    match facet.kind {
        FacetKind::Length => {
            if let Some(base_length) = constraints.length {
                if base_length != value {
                    errors.push(ParseError::new(format!(
                        "length cannot change from {} to {} in a restriction",
                        base_length, value
                    )));
                    return;
                }
            }
            constraints.length = Some(value);
        }
        FacetKind::MinLength => {
            if let Some(base_min) = constraints.min_length {
                if value < base_min {
                    errors.push(ParseError::new(format!(
                        "minLength cannot be widened from {} to {}",
                        base_min, value
                    )));
                    return;
                }
            }
            constraints.min_length = Some(value);
        }
        FacetKind::MaxLength => {
            if let Some(base_max) = constraints.max_length {
                if value > base_max {
                    errors.push(ParseError::new(format!(
                        "maxLength cannot be widened from {} to {}",
                        base_max, value
                    )));
                    return;
                }
            }
            constraints.max_length = Some(value);
        }
        _ => {}
    }
}

fn apply_digits_facet(
    constraints: &mut EffectiveConstraints,
    facet: &Facet,
    errors: &mut Vec<ParseError>,
) {
    let Some(value) = parse_u32_facet(facet, errors) else {
        return;
    };
    let slot = match facet.kind {
        FacetKind::TotalDigits => &mut constraints.total_digits,
        _ => &mut constraints.fraction_digits,
    };
    if let Some(base) = *slot {
        if value > base {
            errors.push(ParseError::new(format!(
                "{} cannot be widened from {} to {}",
                facet.kind, base, value
            )));
            return;
        }
    }
    *slot = Some(value);
}

fn apply_bound_facet(
    constraints: &mut EffectiveConstraints,
    facet: &Facet,
    parse_bound: &dyn Fn(&str) -> Result<XsdValue>,
    errors: &mut Vec<ParseError>,
) {
    let value = match parse_bound(&facet.value) {
        Ok(v) => v,
        Err(e) => {
            errors.push(ParseError::new(format!(
                "facet '{}' has an invalid value '{}': {}",
                facet.kind, facet.value, e
            )));
            return;
        }
    };

    let is_lower = matches!(facet.kind, FacetKind::MinInclusive | FacetKind::MinExclusive);
    if is_lower {
        if let Some((base_lower, _)) = constraints.lower_bound() {
            if compare_values(&value, base_lower) == Some(Ordering::Less) {
                errors.push(ParseError::new(format!(
                    "facet '{}' value {} widens the inherited lower bound {}",
                    facet.kind,
                    facet.value,
                    base_lower.canonical_lexical()
                )));
                return;
            }
        }
        if let Some((base_upper, _)) = constraints.upper_bound() {
            if compare_values(&value, base_upper) == Some(Ordering::Greater) {
                errors.push(ParseError::new(format!(
                    "facet '{}' value {} exceeds the inherited upper bound {}",
                    facet.kind,
                    facet.value,
                    base_upper.canonical_lexical()
                )));
                return;
            }
        }
        match facet.kind {
            FacetKind::MinInclusive => constraints.min_inclusive = Some(value),
            _ => constraints.min_exclusive = Some(value),
        }
    } else {
        if let Some((base_upper, _)) = constraints.upper_bound() {
            if compare_values(&value, base_upper) == Some(Ordering::Greater) {
                errors.push(ParseError::new(format!(
                    "facet '{}' value {} widens the inherited upper bound {}",
                    facet.kind,
                    facet.value,
                    base_upper.canonical_lexical()
                )));
                return;
            }
        }
        if let Some((base_lower, _)) = constraints.lower_bound() {
            if compare_values(&value, base_lower) == Some(Ordering::Less) {
                errors.push(ParseError::new(format!(
                    "facet '{}' value {} is below the inherited lower bound {}",
                    facet.kind,
                    facet.value,
                    base_lower.canonical_lexical()
                )));
                return;
            }
        }
        match facet.kind {
            FacetKind::MaxInclusive => constraints.max_inclusive = Some(value),
            _ => constraints.max_exclusive = Some(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::builtin;

    fn int_parser() -> impl Fn(&str) -> Result<XsdValue> {
        |v: &str| builtin("integer").unwrap().parse(v)
    }

    #[test]
    fn test_whitespace_normalize() {
        let text = "  hello\t\nworld  ";
        assert_eq!(WhiteSpace::Preserve.normalize(text), text);
        assert_eq!(WhiteSpace::Replace.normalize(text), "  hello  world  ");
        assert_eq!(WhiteSpace::Collapse.normalize(text), "hello world");
    }

    #[test]
    fn test_legal_facets_per_category() {
        assert!(legal_facets(PrimitiveCategory::String).contains(&FacetKind::MaxLength));
        assert!(!legal_facets(PrimitiveCategory::String).contains(&FacetKind::MinInclusive));
        assert!(legal_facets(PrimitiveCategory::Decimal).contains(&FacetKind::FractionDigits));
        assert!(!legal_facets(PrimitiveCategory::Float).contains(&FacetKind::TotalDigits));
        assert!(!legal_facets(PrimitiveCategory::Boolean).contains(&FacetKind::Enumeration));
        assert!(legal_facets(PrimitiveCategory::DateTime).contains(&FacetKind::MinInclusive));
    }

    #[test]
    fn test_illegal_facet_reports_parse_error() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let facets = vec![Facet::new(FacetKind::MinInclusive, "0")];
        let (_, errors) = compose_restriction(
            &base,
            &facets,
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("not allowed"));
    }

    #[test]
    fn test_bounds_compose_and_check() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let facets = vec![Facet::new(FacetKind::MinInclusive, "0")];
        let (constraints, errors) =
            compose_restriction(&base, &facets, PrimitiveCategory::Decimal, &int_parser());
        assert!(errors.is_empty());

        assert!(constraints.check("30", &XsdValue::Integer(30)).is_ok());
        let err = constraints.check("-5", &XsdValue::Integer(-5)).unwrap_err();
        assert!(err.to_string().contains("minInclusive"));
    }

    #[test]
    fn test_widening_bound_is_parse_error() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (level1, errors) = compose_restriction(
            &base,
            &[Facet::new(FacetKind::MinInclusive, "10")],
            PrimitiveCategory::Decimal,
            &int_parser(),
        );
        assert!(errors.is_empty());

        // Derived level tries to widen the lower bound back down
        let (level2, errors) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::MinInclusive, "5")],
            PrimitiveCategory::Decimal,
            &int_parser(),
        );
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("widens"));
        // The narrower inherited bound still holds
        assert!(level2.check("7", &XsdValue::Integer(7)).is_err());
    }

    #[test]
    fn test_crossing_bounds_is_parse_error() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (level1, _) = compose_restriction(
            &base,
            &[Facet::new(FacetKind::MaxInclusive, "10")],
            PrimitiveCategory::Decimal,
            &int_parser(),
        );
        let (_, errors) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::MinInclusive, "20")],
            PrimitiveCategory::Decimal,
            &int_parser(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_patterns_accumulate() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Preserve);
        let (level1, _) = compose_restriction(
            &base,
            &[Facet::new(FacetKind::Pattern, r"[a-z]+")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        let (level2, _) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::Pattern, r".{3}")],
            PrimitiveCategory::String,
            &int_parser(),
        );

        // Both levels' patterns apply
        assert!(level2
            .check("abc", &XsdValue::String("abc".to_string()))
            .is_ok());
        assert!(level2
            .check("ab", &XsdValue::String("ab".to_string()))
            .is_err());
        assert!(level2
            .check("ABC", &XsdValue::String("ABC".to_string()))
            .is_err());
    }

    #[test]
    fn test_enumerations_union_within_level_intersect_across() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (level1, _) = compose_restriction(
            &base,
            &[
                Facet::new(FacetKind::Enumeration, "red"),
                Facet::new(FacetKind::Enumeration, "green"),
                Facet::new(FacetKind::Enumeration, "blue"),
            ],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert!(level1
            .check("green", &XsdValue::String("green".to_string()))
            .is_ok());

        let (level2, _) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::Enumeration, "green")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert!(level2
            .check("green", &XsdValue::String("green".to_string()))
            .is_ok());
        // In level 1 but not level 2
        assert!(level2
            .check("red", &XsdValue::String("red".to_string()))
            .is_err());
    }

    #[test]
    fn test_length_narrowing() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Preserve);
        let (level1, errors) = compose_restriction(
            &base,
            &[Facet::new(FacetKind::MaxLength, "10")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert!(errors.is_empty());

        let (_, errors) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::MaxLength, "20")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert_eq!(errors.len(), 1);

        let (level2, errors) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::MaxLength, "5")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert!(errors.is_empty());
        assert!(level2
            .check("abcdef", &XsdValue::String("abcdef".to_string()))
            .is_err());
    }

    #[test]
    fn test_digit_facets() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (constraints, errors) = compose_restriction(
            &base,
            &[
                Facet::new(FacetKind::TotalDigits, "4"),
                Facet::new(FacetKind::FractionDigits, "2"),
            ],
            PrimitiveCategory::Decimal,
            &int_parser(),
        );
        assert!(errors.is_empty());

        use std::str::FromStr;
        let ok = XsdValue::Decimal(rust_decimal::Decimal::from_str("12.34").unwrap());
        assert!(constraints.check("12.34", &ok).is_ok());
        let too_many = XsdValue::Decimal(rust_decimal::Decimal::from_str("12345").unwrap());
        assert!(constraints.check("12345", &too_many).is_err());
        let too_fine = XsdValue::Decimal(rust_decimal::Decimal::from_str("1.234").unwrap());
        assert!(constraints.check("1.234", &too_fine).is_err());
    }

    #[test]
    fn test_whitespace_cannot_weaken() {
        let base = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (_, errors) = compose_restriction(
            &base,
            &[Facet::new(FacetKind::WhiteSpace, "preserve")],
            PrimitiveCategory::String,
            &int_parser(),
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_binary_length_counts_octets() {
        let mut constraints = EffectiveConstraints::default();
        constraints.length = Some(2);
        let value = XsdValue::HexBinary(vec![0x0A, 0xFF]);
        assert!(constraints.check("0AFF", &value).is_ok());
    }
}
