//! Useful functions for parsing and accounting.

use crate::{Error, ErrorType, Source};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, ToPrimitive};
use rust_decimal::Decimal;

/// Converts a [`Decimal`] into an exact rational number.
pub fn decimal_to_rational(num: Decimal) -> BigRational {
    BigRational::new(
        BigInt::from(num.mantissa()),
        BigInt::from(10u32).pow(num.scale()),
    )
}

/// Parses a decimal literal such as `-75.00` into an exact rational number.
#[inline]
pub fn parse_decimal(num_str: &str, src: &Source) -> Result<BigRational, Error> {
    match num_str.parse::<Decimal>() {
        Ok(num) => Ok(decimal_to_rational(num)),
        Err(_) => Err(Error {
            msg: format!("Invalid number {}.", num_str),
            src: src.clone(),
            r#type: ErrorType::AmountParse,
        }),
    }
}

/// Renders an amount in minor units with `decimals` decimal places, e.g.
/// `-7500` with 2 decimals as `-75.00`.
pub fn format_minor_units(amount: &BigInt, decimals: u32) -> String {
    if let Some(num) = amount
        .to_i128()
        .and_then(|n| Decimal::try_from_i128_with_scale(n, decimals).ok())
    {
        return num.to_string();
    }
    let digits = amount.abs().to_string();
    let decimals = decimals as usize;
    let padded = format!("{:0>width$}", digits, width = decimals + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - decimals);
    let sign = if amount.is_negative() { "-" } else { "" };
    if decimals == 0 {
        format!("{}{}", sign, int_part)
    } else {
        format!("{}{}.{}", sign, int_part, frac_part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn decimals_are_exact() {
        let src = Source::new(Arc::new("test.ledger".to_string()), 1);
        assert_eq!(
            parse_decimal("75.10", &src).unwrap(),
            BigRational::new(BigInt::from(751), BigInt::from(10))
        );
        assert_eq!(
            parse_decimal("-0.01", &src).unwrap(),
            BigRational::new(BigInt::from(-1), BigInt::from(100))
        );
        let err = parse_decimal("1.2.3", &src).unwrap_err();
        assert_eq!(err.r#type, ErrorType::AmountParse);
    }

    #[test]
    fn minor_units_are_rendered() {
        assert_eq!(format_minor_units(&BigInt::from(7500), 2), "75.00");
        assert_eq!(format_minor_units(&BigInt::from(-5), 2), "-0.05");
        assert_eq!(format_minor_units(&BigInt::from(12), 0), "12");
        let huge: BigInt = "123456789012345678901234567890123456789012".parse().unwrap();
        assert_eq!(
            format_minor_units(&-huge, 8),
            "-1234567890123456789012345678901234.56789012"
        );
    }
}
