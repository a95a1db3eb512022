use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::Rate;
use crate::ValuationResult;

/// Present-value factor `(1 + rate)^(-periods)` in decimal arithmetic.
///
/// Period zero is always exactly one. Fails with `NumericOverflow` when the
/// compounded growth leaves the decimal range or the factor rounds to zero.
pub fn discount_factor(rate: Rate, periods: i32) -> ValuationResult<Rate> {
    if rate <= dec!(-1) {
        return Err(ValuationError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    if periods < 0 {
        return Err(ValuationError::InvalidInput {
            field: "periods".into(),
            reason: format!("Period must be non-negative, got {periods}"),
        });
    }
    if periods == 0 {
        return Ok(Decimal::ONE);
    }

    let overflow = || ValuationError::NumericOverflow {
        context: format!("discount factor (1 + {rate})^-{periods}"),
    };

    let growth = (Decimal::ONE + rate)
        .checked_powi(i64::from(periods))
        .ok_or_else(overflow)?;
    let factor = Decimal::ONE.checked_div(growth).ok_or_else(overflow)?;
    if factor.is_zero() {
        return Err(overflow());
    }
    Ok(factor)
}

/// Present-value factor `(1 + rate)^(-periods)` in floating point.
///
/// Rejects factors that are not finite or that underflow to zero.
pub fn discount_factor_f64(rate: f64, periods: u32) -> ValuationResult<f64> {
    if !rate.is_finite() || rate <= -1.0 {
        return Err(ValuationError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be finite and greater than -100%".into(),
        });
    }
    if periods == 0 {
        return Ok(1.0);
    }

    let factor = (1.0 + rate).powf(-f64::from(periods));
    if !factor.is_finite() || factor == 0.0 {
        return Err(ValuationError::NumericOverflow {
            context: format!("discount factor (1 + {rate})^-{periods}"),
        });
    }
    Ok(factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_zero_is_exactly_one() {
        for rate in [dec!(-0.99), dec!(0), dec!(0.25), dec!(7.5)] {
            assert_eq!(discount_factor(rate, 0).unwrap(), Decimal::ONE);
        }
        assert_eq!(discount_factor_f64(0.35, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_decimal_factor_known_values() {
        assert_eq!(discount_factor(dec!(0.25), 1).unwrap(), dec!(0.8));
        assert_eq!(discount_factor(dec!(0.25), 2).unwrap(), dec!(0.64));
        assert_eq!(discount_factor(dec!(0), 9).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_rate_at_minus_one_rejected() {
        assert!(matches!(
            discount_factor(dec!(-1), 3),
            Err(ValuationError::InvalidInput { .. })
        ));
        assert!(matches!(
            discount_factor_f64(-1.5, 3),
            Err(ValuationError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_negative_period_rejected() {
        assert!(discount_factor(dec!(0.1), -1).is_err());
    }

    #[test]
    fn test_decimal_overflow_detected() {
        let err = discount_factor(dec!(1000), 20).unwrap_err();
        assert!(matches!(err, ValuationError::NumericOverflow { .. }));
    }

    #[test]
    fn test_f64_factor_matches_formula() {
        let df = discount_factor_f64(0.35, 7).unwrap();
        assert!((df - 1.0 / 1.35_f64.powi(7)).abs() < 1e-15);
    }

    #[test]
    fn test_f64_overflow_detected() {
        assert!(matches!(
            discount_factor_f64(-0.999_999, 4_000_000),
            Err(ValuationError::NumericOverflow { .. })
        ));
        assert!(matches!(
            discount_factor_f64(1e6, 1_000),
            Err(ValuationError::NumericOverflow { .. })
        ));
    }
}
