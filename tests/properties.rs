//! Property-based tests for facet composition and round-tripping

use proptest::prelude::*;

use xsdkit::builtins::{builtin, XsdValue};
use xsdkit::facets::{
    compose_restriction, EffectiveConstraints, Facet, FacetKind, WhiteSpace,
};
use xsdkit::{DecodeOptions, EncodeOptions, XmlSchema};

fn integer_category() -> xsdkit::builtins::PrimitiveCategory {
    builtin("integer").unwrap().category
}

fn parse_integer(v: &str) -> xsdkit::Result<XsdValue> {
    builtin("integer").unwrap().parse(v)
}

proptest! {
    /// A derived bound must be at least as restrictive as its base; widening
    /// always yields a parse error and never silently passes.
    #[test]
    fn derived_lower_bound_never_widens(base in -1000i64..1000, derived in -1000i64..1000) {
        let root = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (level1, errors) = compose_restriction(
            &root,
            &[Facet::new(FacetKind::MinInclusive, base.to_string())],
            integer_category(),
            &parse_integer,
        );
        prop_assert!(errors.is_empty());

        let (level2, errors) = compose_restriction(
            &level1,
            &[Facet::new(FacetKind::MinInclusive, derived.to_string())],
            integer_category(),
            &parse_integer,
        );

        if derived < base {
            prop_assert_eq!(errors.len(), 1);
        } else {
            prop_assert!(errors.is_empty());
        }
        // The effective bound is never weaker than the base's
        let below_base = (base - 1).to_string();
        prop_assert!(level2
            .check(&below_base, &XsdValue::Integer(base - 1))
            .is_err());
    }

    /// Values outside composed bounds are always rejected, values inside
    /// always accepted.
    #[test]
    fn composed_bounds_partition_the_value_space(
        low in -500i64..0,
        high in 1i64..500,
        probe in -1000i64..1000,
    ) {
        let root = EffectiveConstraints::with_white_space(WhiteSpace::Collapse);
        let (constraints, errors) = compose_restriction(
            &root,
            &[
                Facet::new(FacetKind::MinInclusive, low.to_string()),
                Facet::new(FacetKind::MaxInclusive, high.to_string()),
            ],
            integer_category(),
            &parse_integer,
        );
        prop_assert!(errors.is_empty());

        let accepted = constraints
            .check(&probe.to_string(), &XsdValue::Integer(probe))
            .is_ok();
        prop_assert_eq!(accepted, probe >= low && probe <= high);
    }

    /// decode∘encode is the identity on conforming integer instances.
    #[test]
    fn integer_round_trip(n in any::<i64>()) {
        let schema = XmlSchema::from_str(r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="n" type="xs:integer"/>
            </xs:schema>"#).unwrap();

        let xml = format!("<n>{}</n>", n);
        let (value, errors) = schema.decode(&xml, &DecodeOptions::default()).unwrap();
        prop_assert!(errors.is_empty());

        let (element, errors) = schema.encode(&value, &EncodeOptions::default()).unwrap();
        prop_assert!(errors.is_empty());
        prop_assert_eq!(element.to_xml(), xml);
    }

    /// Lexical whitespace never changes the decoded integer value.
    #[test]
    fn whitespace_is_insignificant_for_collapsed_types(n in -10000i64..10000) {
        let schema = XmlSchema::from_str(r#"
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
              <xs:element name="n" type="xs:integer"/>
            </xs:schema>"#).unwrap();

        let padded = format!("<n>  {}\n</n>", n);
        let (value, errors) = schema.decode(&padded, &DecodeOptions::default()).unwrap();
        prop_assert!(errors.is_empty());
        prop_assert_eq!(value, serde_json::json!(n));
    }
}
