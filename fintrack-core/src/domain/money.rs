//! Fixed-point money helpers
//!
//! All monetary values are `Decimal` with exactly two fractional digits on
//! the way out, so `0` is always reported as `0.00`.

use rust_decimal::{Decimal, RoundingStrategy};

use super::result::{Error, Result};

/// Number of fractional digits carried by every amount
pub const SCALE: u32 = 2;

/// `0.00`
pub fn zero() -> Decimal {
    Decimal::new(0, SCALE)
}

/// Rescale to exactly two fractional digits, rounding half away from zero
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(SCALE);
    rounded
}

/// Sum an iterator of amounts, yielding `0.00` for an empty input
pub fn sum<I>(amounts: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    normalize(amounts.into_iter().fold(Decimal::ZERO, |acc, a| acc + a))
}

/// Parse a user-supplied amount ("12", "12.5", "12.50")
///
/// More than two fractional digits is rejected rather than rounded.
pub fn parse(input: &str) -> Result<Decimal> {
    let trimmed = input.trim();
    let value: Decimal = trimmed
        .parse()
        .map_err(|_| Error::validation(format!("invalid amount: '{}'", trimmed)))?;
    if value.scale() > SCALE {
        return Err(Error::validation(format!(
            "amount '{}' has more than {} decimal places",
            trimmed, SCALE
        )));
    }
    Ok(normalize(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_has_two_places() {
        assert_eq!(zero().to_string(), "0.00");
        assert_eq!(sum(Vec::new()).to_string(), "0.00");
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Decimal::new(15, 0)).to_string(), "15.00");
        assert_eq!(normalize(Decimal::new(12345, 3)).to_string(), "12.35");
        assert_eq!(normalize(Decimal::new(-12345, 3)).to_string(), "-12.35");
    }

    #[test]
    fn test_sum_is_exact() {
        // 0.10 added ten times is exactly 1.00 in fixed point
        let total = sum(std::iter::repeat(Decimal::new(10, 2)).take(10));
        assert_eq!(total, Decimal::new(100, 2));
        assert_eq!(total.to_string(), "1.00");
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("150").unwrap().to_string(), "150.00");
        assert_eq!(parse(" 12.5 ").unwrap().to_string(), "12.50");
        assert!(parse("12.345").is_err());
        assert!(parse("abc").is_err());
    }
}
