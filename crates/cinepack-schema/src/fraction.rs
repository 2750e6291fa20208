use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A rational rate such as an edit rate, written as `"24 1"` in XML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: i32,
    pub denominator: i32,
}

impl Fraction {
    pub const fn new(numerator: i32, denominator: i32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Whole frames-per-second value; a zero denominator yields 0.
    pub fn as_fps(self) -> i32 {
        if self.denominator == 0 {
            0
        } else {
            self.numerator / self.denominator
        }
    }

    /// Multiply the rate by an integer factor, e.g. 2 for interleaved stereo.
    pub fn scaled(self, factor: i32) -> Result<Self, SchemaError> {
        let numerator =
            self.numerator
                .checked_mul(factor)
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "edit rate".to_owned(),
                    value: format!("{self} scaled by {factor}"),
                })?;
        Ok(Self::new(numerator, self.denominator))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.numerator, self.denominator)
    }
}

impl FromStr for Fraction {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SchemaError::InvalidValue {
            field: "fraction".to_owned(),
            value: s.to_owned(),
        };
        let mut parts = s.split_whitespace();
        let numerator = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let denominator = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self::new(numerator, denominator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let f: Fraction = "24 1".parse().unwrap();
        assert_eq!(f, Fraction::new(24, 1));
        assert_eq!(f.to_string(), "24 1");
    }

    #[test]
    fn parse_tolerates_extra_whitespace() {
        let f: Fraction = "  48   1 ".parse().unwrap();
        assert_eq!(f, Fraction::new(48, 1));
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!("24".parse::<Fraction>().is_err());
        assert!("24/1".parse::<Fraction>().is_err());
        assert!("24 1 1".parse::<Fraction>().is_err());
    }

    #[test]
    fn scaled_doubles_numerator() {
        assert_eq!(Fraction::new(24, 1).scaled(2).unwrap(), Fraction::new(48, 1));
    }

    #[test]
    fn scaled_rejects_overflow() {
        let err = Fraction::new(i32::MAX, 1).scaled(2).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidValue { .. }));
    }

    #[test]
    fn fps_of_zero_denominator_is_zero() {
        assert_eq!(Fraction::new(24, 0).as_fps(), 0);
        assert_eq!(Fraction::new(48, 2).as_fps(), 24);
    }
}
