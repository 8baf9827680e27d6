//! Quantity parsing.
//!
//! Quantities are [`Decimal`] so a value read as `25.000` is written back as
//! `25.000`. No floats anywhere in the pipeline.

use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    #[error("empty quantity")]
    Empty,
    #[error("invalid quantity '{0}'")]
    Invalid(String),
}

/// Parse a quantity field. Surrounding whitespace is ignored; sign is kept
/// (callers decide whether negatives are acceptable).
pub fn parse_quantity(raw: &str) -> Result<Decimal, QuantityError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(QuantityError::Empty);
    }
    Decimal::from_str(t).map_err(|_| QuantityError::Invalid(t.to_string()))
}

/// Render a quantity for the output file.
pub fn format_quantity(q: Decimal) -> String {
    q.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_preserved() {
        let q = parse_quantity("25.000").unwrap();
        assert_eq!(format_quantity(q), "25.000");
        assert_eq!(q, Decimal::from(25));
    }

    #[test]
    fn whitespace_trimmed_and_empty_rejected() {
        assert_eq!(parse_quantity(" 12 ").unwrap(), Decimal::from(12));
        assert_eq!(parse_quantity("   "), Err(QuantityError::Empty));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(parse_quantity("12,5"), Err(QuantityError::Invalid(_))));
        assert!(matches!(parse_quantity("abc"), Err(QuantityError::Invalid(_))));
        let e = parse_quantity("12,5").unwrap_err();
        assert_eq!(e.to_string(), "invalid quantity '12,5'");
    }

    #[test]
    fn negative_parses() {
        assert_eq!(parse_quantity("-3").unwrap(), Decimal::from(-3));
    }
}
