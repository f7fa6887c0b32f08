//! Occurrence bounds for particles
//!
//! Every particle of a content model (element, wildcard, nested group)
//! carries minOccurs/maxOccurs bounds. `max = None` means unbounded.

use crate::error::{ParseError, Result};

/// Occurrence bounds (minOccurs, maxOccurs)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded)
    pub max: Option<u32>,
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Default bounds (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if this particle may be absent
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if maxOccurs is 1
    pub fn is_single(&self) -> bool {
        self.max == Some(1)
    }

    /// Check if a count is below the minimum
    pub fn is_missing(&self, count: usize) -> bool {
        (count as u64) < self.min as u64
    }

    /// Check if a count exceeds the maximum
    pub fn is_exceeded(&self, count: usize) -> bool {
        match self.max {
            Some(max) => (count as u64) > max as u64,
            None => false,
        }
    }

    /// Check if a count satisfies both bounds
    pub fn accepts(&self, count: usize) -> bool {
        !self.is_missing(count) && !self.is_exceeded(count)
    }

    /// Check that these bounds are a valid restriction of another particle's
    pub fn is_restriction_of(&self, base: &Occurs) -> bool {
        if self.min < base.min {
            return false;
        }
        match (self.max, base.max) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(own), Some(other)) => own <= other,
        }
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl std::fmt::Display for Occurs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.max {
            Some(max) => write!(f, "({}, {})", self.min, max),
            None => write!(f, "({}, unbounded)", self.min),
        }
    }
}

/// Parse minOccurs/maxOccurs attribute values
pub fn parse_occurs(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Occurs> {
    let mut occurs = Occurs::once();

    if let Some(min) = min_occurs {
        occurs.min = min.parse::<u32>().map_err(|_| {
            ParseError::new(format!(
                "minOccurs must be a non-negative integer, found '{}'",
                min
            ))
        })?;
    }

    match max_occurs {
        Some("unbounded") => occurs.max = None,
        Some(max) => {
            let max = max.parse::<u32>().map_err(|_| {
                ParseError::new(format!(
                    "maxOccurs must be a non-negative integer or 'unbounded', found '{}'",
                    max
                ))
            })?;
            if occurs.min > max {
                return Err(ParseError::new(format!(
                    "minOccurs {} is greater than maxOccurs {}",
                    occurs.min, max
                ))
                .into());
            }
            occurs.max = Some(max);
        }
        None => {
            if occurs.min > 1 {
                return Err(ParseError::new(format!(
                    "minOccurs {} is greater than the default maxOccurs 1",
                    occurs.min
                ))
                .into());
            }
        }
    }

    Ok(occurs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(Occurs::once(), Occurs::new(1, Some(1)));
        assert_eq!(Occurs::optional(), Occurs::new(0, Some(1)));
        assert_eq!(Occurs::zero_or_more(), Occurs::new(0, None));
        assert_eq!(Occurs::one_or_more(), Occurs::new(1, None));
    }

    #[test]
    fn test_counting() {
        let occurs = Occurs::new(2, Some(4));
        assert!(occurs.is_missing(1));
        assert!(!occurs.is_missing(2));
        assert!(!occurs.is_exceeded(4));
        assert!(occurs.is_exceeded(5));
        assert!(occurs.accepts(3));
        assert!(!occurs.accepts(0));

        assert!(!Occurs::zero_or_more().is_exceeded(1000));
    }

    #[test]
    fn test_restriction() {
        let base = Occurs::new(1, Some(3));
        assert!(Occurs::new(2, Some(2)).is_restriction_of(&base));
        assert!(!Occurs::new(0, Some(3)).is_restriction_of(&base));
        assert!(!Occurs::new(1, Some(5)).is_restriction_of(&base));
        assert!(!Occurs::new(1, None).is_restriction_of(&base));
        assert!(Occurs::new(1, None).is_restriction_of(&Occurs::one_or_more()));
    }

    #[test]
    fn test_parse_occurs() {
        assert_eq!(parse_occurs(None, None).unwrap(), Occurs::once());
        assert_eq!(
            parse_occurs(Some("0"), Some("5")).unwrap(),
            Occurs::new(0, Some(5))
        );
        assert_eq!(
            parse_occurs(Some("1"), Some("unbounded")).unwrap(),
            Occurs::one_or_more()
        );

        assert!(parse_occurs(Some("x"), None).is_err());
        assert!(parse_occurs(None, Some("x")).is_err());
        assert!(parse_occurs(Some("5"), Some("3")).is_err());
        assert!(parse_occurs(Some("2"), None).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Occurs::new(1, Some(3)).to_string(), "(1, 3)");
        assert_eq!(Occurs::one_or_more().to_string(), "(1, unbounded)");
    }
}
