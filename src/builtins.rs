//! XSD built-in datatypes
//!
//! Each built-in primitive carries its category (which governs facet
//! legality), its whitespace rule and a lexical-to-value parser producing a
//! typed [`XsdValue`]. The canonical lexical mapping used by encoding is the
//! inverse of that parser.

use base64::Engine;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::{Error, Result, ValidationError};
use crate::facets::WhiteSpace;
use crate::names::{is_ncname, is_qname};

/// Primitive category of a built-in type, governing facet legality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveCategory {
    /// String-derived types
    String,
    /// xs:boolean
    Boolean,
    /// xs:decimal and the integer tower
    Decimal,
    /// xs:float and xs:double
    Float,
    /// Date/time/duration types
    DateTime,
    /// hexBinary and base64Binary
    Binary,
    /// xs:anyURI
    AnyUri,
    /// xs:QName and xs:NOTATION
    QName,
}

/// Typed value produced by decoding a lexical form
#[derive(Debug, Clone, PartialEq)]
pub enum XsdValue {
    /// String value
    String(String),
    /// Boolean value
    Boolean(bool),
    /// Integer value (the whole integer tower)
    Integer(i64),
    /// Decimal value
    Decimal(Decimal),
    /// Float/double value
    Float(f64),
    /// dateTime value with its collapsed lexical form
    DateTime {
        /// Parsed value, offset applied when present
        value: NaiveDateTime,
        /// Lexical form, kept for canonical output
        lexical: String,
    },
    /// date value with its collapsed lexical form
    Date {
        /// Parsed value
        value: NaiveDate,
        /// Lexical form
        lexical: String,
    },
    /// time value with its collapsed lexical form
    Time {
        /// Parsed value
        value: NaiveTime,
        /// Lexical form
        lexical: String,
    },
    /// duration, kept lexical
    Duration(String),
    /// Gregorian fragment (gYear, gYearMonth, gMonthDay, gDay, gMonth)
    Gregorian(String),
    /// hexBinary octets
    HexBinary(Vec<u8>),
    /// base64Binary octets
    Base64Binary(Vec<u8>),
    /// anyURI value
    Uri(String),
    /// QName lexical value
    QName(String),
    /// List of item values
    List(Vec<XsdValue>),
}

impl XsdValue {
    /// The canonical lexical representation of this value
    pub fn canonical_lexical(&self) -> String {
        match self {
            XsdValue::String(s) | XsdValue::Uri(s) | XsdValue::QName(s) => s.clone(),
            XsdValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            XsdValue::Integer(i) => i.to_string(),
            XsdValue::Decimal(d) => d.normalize().to_string(),
            XsdValue::Float(f) => {
                if f.is_nan() {
                    "NaN".to_string()
                } else if f.is_infinite() {
                    if *f > 0.0 { "INF" } else { "-INF" }.to_string()
                } else {
                    f.to_string()
                }
            }
            XsdValue::DateTime { lexical, .. }
            | XsdValue::Date { lexical, .. }
            | XsdValue::Time { lexical, .. } => lexical.clone(),
            XsdValue::Duration(s) | XsdValue::Gregorian(s) => s.clone(),
            XsdValue::HexBinary(data) => {
                data.iter().map(|b| format!("{:02X}", b)).collect::<String>()
            }
            XsdValue::Base64Binary(data) => {
                base64::engine::general_purpose::STANDARD.encode(data)
            }
            XsdValue::List(items) => items
                .iter()
                .map(XsdValue::canonical_lexical)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    /// Convert into a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Number, Value};
        match self {
            XsdValue::Boolean(b) => Value::Bool(*b),
            XsdValue::Integer(i) => Value::Number(Number::from(*i)),
            XsdValue::Decimal(d) => {
                let as_f64 = d.to_string().parse::<f64>().ok();
                match as_f64.and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::String(self.canonical_lexical()),
                }
            }
            XsdValue::Float(f) => match Number::from_f64(*f) {
                Some(n) => Value::Number(n),
                None => Value::String(self.canonical_lexical()),
            },
            XsdValue::List(items) => Value::Array(items.iter().map(XsdValue::to_json).collect()),
            other => Value::String(other.canonical_lexical()),
        }
    }
}

/// Compare two values of compatible kinds
///
/// Numeric kinds compare across Integer/Decimal/Float. Temporal kinds compare
/// within the same kind only.
pub fn compare_values(a: &XsdValue, b: &XsdValue) -> Option<Ordering> {
    use XsdValue::*;
    match (a, b) {
        (Integer(x), Integer(y)) => Some(x.cmp(y)),
        (Decimal(x), Decimal(y)) => Some(x.cmp(y)),
        (Integer(x), Decimal(y)) => Some(rust_decimal::Decimal::from(*x).cmp(y)),
        (Decimal(x), Integer(y)) => Some(x.cmp(&rust_decimal::Decimal::from(*y))),
        (Float(x), Float(y)) => x.partial_cmp(y),
        (Integer(x), Float(y)) => (*x as f64).partial_cmp(y),
        (Float(x), Integer(y)) => x.partial_cmp(&(*y as f64)),
        (Decimal(x), Float(y)) => x.to_string().parse::<f64>().ok()?.partial_cmp(y),
        (Float(x), Decimal(y)) => x.partial_cmp(&y.to_string().parse::<f64>().ok()?),
        (DateTime { value: x, .. }, DateTime { value: y, .. }) => Some(x.cmp(y)),
        (Date { value: x, .. }, Date { value: y, .. }) => Some(x.cmp(y)),
        (Time { value: x, .. }, Time { value: y, .. }) => Some(x.cmp(y)),
        (String(x), String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// A built-in XSD primitive type
pub struct Primitive {
    /// Local type name in the XSD namespace
    pub name: &'static str,
    /// Facet-legality category
    pub category: PrimitiveCategory,
    /// Whitespace rule applied before parsing
    pub white_space: WhiteSpace,
    parse: fn(&str) -> Result<XsdValue>,
}

impl std::fmt::Debug for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitive")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

impl Primitive {
    /// Parse a lexical value, applying this type's whitespace rule first
    pub fn parse(&self, lexical: &str) -> Result<XsdValue> {
        let normalized = self.white_space.normalize(lexical);
        (self.parse)(&normalized)
    }
}

fn decode_error(type_name: &str, value: &str, reason: impl Into<String>) -> Error {
    Error::Decode(
        ValidationError::new(format!("invalid value for xs:{}", type_name))
            .with_reason(reason)
            .with_value(value),
    )
}

fn parse_string(v: &str) -> Result<XsdValue> {
    Ok(XsdValue::String(v.to_string()))
}

static LANGUAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*$").unwrap());
static NMTOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.\-:]+$").unwrap());

fn parse_language(v: &str) -> Result<XsdValue> {
    if LANGUAGE_RE.is_match(v) {
        Ok(XsdValue::String(v.to_string()))
    } else {
        Err(decode_error("language", v, "not a language tag"))
    }
}

fn parse_name(v: &str) -> Result<XsdValue> {
    if is_qname(v) {
        Ok(XsdValue::String(v.to_string()))
    } else {
        Err(decode_error("Name", v, "not an XML name"))
    }
}

fn parse_ncname(v: &str) -> Result<XsdValue> {
    if is_ncname(v) {
        Ok(XsdValue::String(v.to_string()))
    } else {
        Err(decode_error("NCName", v, "not an NCName"))
    }
}

fn parse_nmtoken(v: &str) -> Result<XsdValue> {
    if NMTOKEN_RE.is_match(v) {
        Ok(XsdValue::String(v.to_string()))
    } else {
        Err(decode_error("NMTOKEN", v, "not a name token"))
    }
}

fn parse_boolean(v: &str) -> Result<XsdValue> {
    match v {
        "true" | "1" => Ok(XsdValue::Boolean(true)),
        "false" | "0" => Ok(XsdValue::Boolean(false)),
        _ => Err(decode_error("boolean", v, "expected true/false/1/0")),
    }
}

fn parse_decimal(v: &str) -> Result<XsdValue> {
    Decimal::from_str(v)
        .map(XsdValue::Decimal)
        .map_err(|_| decode_error("decimal", v, "not a decimal number"))
}

fn parse_integer_in(v: &str, type_name: &'static str, min: i64, max: i64) -> Result<XsdValue> {
    let parsed = v
        .parse::<i64>()
        .map_err(|_| decode_error(type_name, v, "not an integer"))?;
    if parsed < min || parsed > max {
        return Err(decode_error(
            type_name,
            v,
            format!("out of range [{}, {}]", min, max),
        ));
    }
    Ok(XsdValue::Integer(parsed))
}

macro_rules! integer_parser {
    ($fn_name:ident, $type_name:literal, $min:expr, $max:expr) => {
        fn $fn_name(v: &str) -> Result<XsdValue> {
            parse_integer_in(v, $type_name, $min, $max)
        }
    };
}

integer_parser!(parse_integer, "integer", i64::MIN, i64::MAX);
integer_parser!(parse_long, "long", i64::MIN, i64::MAX);
integer_parser!(parse_int, "int", i32::MIN as i64, i32::MAX as i64);
integer_parser!(parse_short, "short", i16::MIN as i64, i16::MAX as i64);
integer_parser!(parse_byte, "byte", i8::MIN as i64, i8::MAX as i64);
integer_parser!(parse_non_negative, "nonNegativeInteger", 0, i64::MAX);
integer_parser!(parse_positive, "positiveInteger", 1, i64::MAX);
integer_parser!(parse_non_positive, "nonPositiveInteger", i64::MIN, 0);
integer_parser!(parse_negative, "negativeInteger", i64::MIN, -1);
integer_parser!(parse_unsigned_long, "unsignedLong", 0, i64::MAX);
integer_parser!(parse_unsigned_int, "unsignedInt", 0, u32::MAX as i64);
integer_parser!(parse_unsigned_short, "unsignedShort", 0, u16::MAX as i64);
integer_parser!(parse_unsigned_byte, "unsignedByte", 0, u8::MAX as i64);

fn parse_float_value(v: &str, type_name: &'static str) -> Result<XsdValue> {
    match v {
        "INF" => return Ok(XsdValue::Float(f64::INFINITY)),
        "-INF" => return Ok(XsdValue::Float(f64::NEG_INFINITY)),
        "NaN" => return Ok(XsdValue::Float(f64::NAN)),
        _ => {}
    }
    v.parse::<f64>()
        .map(XsdValue::Float)
        .map_err(|_| decode_error(type_name, v, "not a floating point number"))
}

fn parse_float(v: &str) -> Result<XsdValue> {
    parse_float_value(v, "float")
}

fn parse_double(v: &str) -> Result<XsdValue> {
    parse_float_value(v, "double")
}

/// Split a trailing timezone designator off a temporal lexical form
fn split_timezone(v: &str) -> (&str, Option<&str>) {
    if let Some(stripped) = v.strip_suffix('Z') {
        return (stripped, Some("Z"));
    }
    if v.len() > 6 && v.is_char_boundary(v.len() - 6) {
        let (body, tail) = v.split_at(v.len() - 6);
        let bytes = tail.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            return (body, Some(tail));
        }
    }
    (v, None)
}

fn parse_datetime(v: &str) -> Result<XsdValue> {
    let (body, _tz) = split_timezone(v);
    let value = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|_| decode_error("dateTime", v, "not a dateTime"))?;
    Ok(XsdValue::DateTime {
        value,
        lexical: v.to_string(),
    })
}

fn parse_date(v: &str) -> Result<XsdValue> {
    let (body, _tz) = split_timezone(v);
    let value = NaiveDate::parse_from_str(body, "%Y-%m-%d")
        .map_err(|_| decode_error("date", v, "not a date"))?;
    Ok(XsdValue::Date {
        value,
        lexical: v.to_string(),
    })
}

fn parse_time(v: &str) -> Result<XsdValue> {
    let (body, _tz) = split_timezone(v);
    let value = NaiveTime::parse_from_str(body, "%H:%M:%S%.f")
        .map_err(|_| decode_error("time", v, "not a time"))?;
    Ok(XsdValue::Time {
        value,
        lexical: v.to_string(),
    })
}

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^-?P(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+(?:\.\d+)?S)?)?$")
        .unwrap()
});

fn parse_duration(v: &str) -> Result<XsdValue> {
    // The production above also matches a bare "P"/"PT"
    let has_component = v.chars().any(|c| c.is_ascii_digit());
    if DURATION_RE.is_match(v) && has_component {
        Ok(XsdValue::Duration(v.to_string()))
    } else {
        Err(decode_error("duration", v, "not a duration"))
    }
}

macro_rules! gregorian_parser {
    ($fn_name:ident, $type_name:literal, $pattern:literal) => {
        fn $fn_name(v: &str) -> Result<XsdValue> {
            static RE: Lazy<Regex> = Lazy::new(|| Regex::new($pattern).unwrap());
            let (body, _tz) = split_timezone(v);
            if RE.is_match(body) {
                Ok(XsdValue::Gregorian(v.to_string()))
            } else {
                Err(decode_error($type_name, v, "malformed Gregorian value"))
            }
        }
    };
}

gregorian_parser!(parse_gyear, "gYear", r"^-?\d{4,}$");
gregorian_parser!(parse_gyear_month, "gYearMonth", r"^-?\d{4,}-\d{2}$");
gregorian_parser!(parse_gmonth_day, "gMonthDay", r"^--\d{2}-\d{2}$");
gregorian_parser!(parse_gday, "gDay", r"^---\d{2}$");
gregorian_parser!(parse_gmonth, "gMonth", r"^--\d{2}$");

fn parse_hex_binary(v: &str) -> Result<XsdValue> {
    if v.len() % 2 != 0 {
        return Err(decode_error("hexBinary", v, "odd number of hex digits"));
    }
    let mut data = Vec::with_capacity(v.len() / 2);
    let bytes = v.as_bytes();
    for pair in bytes.chunks(2) {
        let hi = (pair[0] as char).to_digit(16);
        let lo = (pair[1] as char).to_digit(16);
        match (hi, lo) {
            (Some(hi), Some(lo)) => data.push((hi * 16 + lo) as u8),
            _ => return Err(decode_error("hexBinary", v, "not a hex digit")),
        }
    }
    Ok(XsdValue::HexBinary(data))
}

fn parse_base64_binary(v: &str) -> Result<XsdValue> {
    let compact: String = v.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map(XsdValue::Base64Binary)
        .map_err(|_| decode_error("base64Binary", v, "not base64"))
}

fn parse_any_uri(v: &str) -> Result<XsdValue> {
    // anyURI admits relative references, so full URL parsing is too strict
    if v.contains(char::is_whitespace) {
        Err(decode_error("anyURI", v, "URIs cannot contain whitespace"))
    } else {
        Ok(XsdValue::Uri(v.to_string()))
    }
}

fn parse_qname_value(v: &str) -> Result<XsdValue> {
    if is_qname(v) {
        Ok(XsdValue::QName(v.to_string()))
    } else {
        Err(decode_error("QName", v, "not a QName"))
    }
}

macro_rules! primitive {
    ($name:literal, $category:ident, $ws:ident, $parse:expr) => {
        Primitive {
            name: $name,
            category: PrimitiveCategory::$category,
            white_space: WhiteSpace::$ws,
            parse: $parse,
        }
    };
}

/// The built-in type table
pub static BUILTIN_TYPES: &[Primitive] = &[
    primitive!("anyType", String, Preserve, parse_string),
    primitive!("anySimpleType", String, Preserve, parse_string),
    primitive!("string", String, Preserve, parse_string),
    primitive!("normalizedString", String, Replace, parse_string),
    primitive!("token", String, Collapse, parse_string),
    primitive!("language", String, Collapse, parse_language),
    primitive!("Name", String, Collapse, parse_name),
    primitive!("NCName", String, Collapse, parse_ncname),
    primitive!("ID", String, Collapse, parse_ncname),
    primitive!("IDREF", String, Collapse, parse_ncname),
    primitive!("ENTITY", String, Collapse, parse_ncname),
    primitive!("NMTOKEN", String, Collapse, parse_nmtoken),
    primitive!("boolean", Boolean, Collapse, parse_boolean),
    primitive!("decimal", Decimal, Collapse, parse_decimal),
    primitive!("integer", Decimal, Collapse, parse_integer),
    primitive!("long", Decimal, Collapse, parse_long),
    primitive!("int", Decimal, Collapse, parse_int),
    primitive!("short", Decimal, Collapse, parse_short),
    primitive!("byte", Decimal, Collapse, parse_byte),
    primitive!("nonNegativeInteger", Decimal, Collapse, parse_non_negative),
    primitive!("positiveInteger", Decimal, Collapse, parse_positive),
    primitive!("nonPositiveInteger", Decimal, Collapse, parse_non_positive),
    primitive!("negativeInteger", Decimal, Collapse, parse_negative),
    primitive!("unsignedLong", Decimal, Collapse, parse_unsigned_long),
    primitive!("unsignedInt", Decimal, Collapse, parse_unsigned_int),
    primitive!("unsignedShort", Decimal, Collapse, parse_unsigned_short),
    primitive!("unsignedByte", Decimal, Collapse, parse_unsigned_byte),
    primitive!("float", Float, Collapse, parse_float),
    primitive!("double", Float, Collapse, parse_double),
    primitive!("dateTime", DateTime, Collapse, parse_datetime),
    primitive!("date", DateTime, Collapse, parse_date),
    primitive!("time", DateTime, Collapse, parse_time),
    primitive!("duration", DateTime, Collapse, parse_duration),
    primitive!("gYear", DateTime, Collapse, parse_gyear),
    primitive!("gYearMonth", DateTime, Collapse, parse_gyear_month),
    primitive!("gMonthDay", DateTime, Collapse, parse_gmonth_day),
    primitive!("gDay", DateTime, Collapse, parse_gday),
    primitive!("gMonth", DateTime, Collapse, parse_gmonth),
    primitive!("hexBinary", Binary, Collapse, parse_hex_binary),
    primitive!("base64Binary", Binary, Collapse, parse_base64_binary),
    primitive!("anyURI", AnyUri, Collapse, parse_any_uri),
    primitive!("QName", QName, Collapse, parse_qname_value),
    primitive!("NOTATION", QName, Collapse, parse_qname_value),
];

static BUILTIN_INDEX: Lazy<HashMap<&'static str, &'static Primitive>> =
    Lazy::new(|| BUILTIN_TYPES.iter().map(|p| (p.name, p)).collect());

/// Look up a built-in type by its local name
pub fn builtin(name: &str) -> Option<&'static Primitive> {
    BUILTIN_INDEX.get(name).copied()
}

/// Best-guess coercion used by skip-mode decoding
///
/// Deliberately schema-free: boolean, then integer, then float, else string.
pub fn guess_value(lexical: &str) -> XsdValue {
    let trimmed = lexical.trim();
    match trimmed {
        "true" => return XsdValue::Boolean(true),
        "false" => return XsdValue::Boolean(false),
        _ => {}
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return XsdValue::Integer(i);
    }
    if !trimmed.is_empty() && trimmed != "NaN" {
        if let Ok(f) = trimmed.parse::<f64>() {
            return XsdValue::Float(f);
        }
    }
    XsdValue::String(lexical.to_string())
}
