use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ValuationError;
use crate::time_value::discount_factor;
use crate::types::{with_metadata, ComputationOutput, Money, Precision, Rate};
use crate::ValuationResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of a discounted cash flow profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRecord {
    pub year: i32,
    pub cash_flow: Money,
    /// `(1 + r)^(-year)`; exactly one in year zero.
    pub discount_factor: Rate,
    /// `cash_flow * discount_factor`
    pub present_value: Money,
}

/// Records ordered by strictly increasing year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CashFlowSeries {
    records: Vec<CashFlowRecord>,
}

impl CashFlowSeries {
    pub fn records(&self) -> &[CashFlowRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CashFlowRecord> {
        self.records.iter()
    }

    /// Sum of nominal cash flows.
    pub fn total_cash_flow(&self) -> Money {
        self.records.iter().map(|r| r.cash_flow).sum()
    }

    /// Sum of present values.
    pub fn net_present_value(&self) -> Money {
        self.records.iter().map(|r| r.present_value).sum()
    }

    pub fn into_records(self) -> Vec<CashFlowRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a CashFlowSeries {
    type Item = &'a CashFlowRecord;
    type IntoIter = std::slice::Iter<'a, CashFlowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A nominal cash flow for a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearCashFlow {
    pub year: i32,
    pub cash_flow: Money,
}

/// Input for a cash flow profile. Missing fields fall back to the reference
/// early-stage company: years 0..=10 discounted at 25%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfProfileInput {
    /// Nominal free cash flows, strictly increasing by year.
    #[serde(default = "reference_cash_flows")]
    pub cash_flows: Vec<YearCashFlow>,
    /// Constant required return used for discounting.
    #[serde(default = "default_discount_rate")]
    pub discount_rate: Rate,
}

impl Default for DcfProfileInput {
    fn default() -> Self {
        Self {
            cash_flows: reference_cash_flows(),
            discount_rate: default_discount_rate(),
        }
    }
}

fn default_discount_rate() -> Rate {
    dec!(0.25)
}

/// Free cash flows (USD m) of the reference company: heavy reinvestment in the
/// first years, turning strongly positive as the business scales.
pub fn reference_cash_flows() -> Vec<YearCashFlow> {
    [-5, -4, -2, 0, 3, 7, 12, 18, 22, 25, 27]
        .into_iter()
        .enumerate()
        .map(|(year, cf)| YearCashFlow {
            year: year as i32,
            cash_flow: Decimal::from(cf),
        })
        .collect()
}

/// Output of a cash flow profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfProfileOutput {
    pub records: CashFlowSeries,
    /// Running sum of present values, aligned with `records`.
    pub cumulative_pv: Vec<Money>,
    pub total_cash_flow: Money,
    pub net_present_value: Money,
    /// First year in which cumulative discounted cash flow is non-negative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakeven_year: Option<i32>,
    pub discount_rate: Rate,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Discount a series of `(year, cash_flow)` pairs at a constant rate.
///
/// Years must be non-negative and strictly increasing; `r` must exceed -100%.
/// The output has one record per input pair, in the same order.
pub fn profile(series_input: &[(i32, Money)], r: Rate) -> ValuationResult<CashFlowSeries> {
    validate_profile_input(series_input, r)?;

    let records = series_input
        .iter()
        .map(|&(year, cash_flow)| {
            let discount_factor = discount_factor(r, year)?;
            let present_value = cash_flow.checked_mul(discount_factor).ok_or_else(|| {
                ValuationError::NumericOverflow {
                    context: format!("present value of year {year}"),
                }
            })?;
            Ok(CashFlowRecord {
                year,
                cash_flow,
                discount_factor,
                present_value,
            })
        })
        .collect::<ValuationResult<Vec<_>>>()?;

    Ok(CashFlowSeries { records })
}

fn validate_profile_input(series_input: &[(i32, Money)], r: Rate) -> ValuationResult<()> {
    if r <= dec!(-1) {
        return Err(ValuationError::InvalidInput {
            field: "discount_rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut previous: Option<i32> = None;
    for &(year, _) in series_input {
        if year < 0 {
            return Err(ValuationError::InvalidInput {
                field: "year".into(),
                reason: format!("Years must be non-negative, got {year}"),
            });
        }
        if let Some(prev) = previous {
            if year <= prev {
                return Err(ValuationError::InvalidInput {
                    field: "year".into(),
                    reason: format!(
                        "Years must be strictly increasing, got {year} after {prev}"
                    ),
                });
            }
        }
        previous = Some(year);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API: profile with summary
// ---------------------------------------------------------------------------

/// Build a free cash flow vs. discounted free cash flow profile, with totals,
/// cumulative present value and the discounted breakeven year.
pub fn run_dcf_profile(
    input: &DcfProfileInput,
) -> ValuationResult<ComputationOutput<DcfProfileOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let pairs: Vec<(i32, Money)> = input
        .cash_flows
        .iter()
        .map(|cf| (cf.year, cf.cash_flow))
        .collect();
    let records = profile(&pairs, input.discount_rate)?;

    let mut running = Decimal::ZERO;
    let mut breakeven_year = None;
    let mut cumulative_pv = Vec::with_capacity(records.len());
    for record in &records {
        running += record.present_value;
        cumulative_pv.push(running);
        if breakeven_year.is_none() && running >= Decimal::ZERO {
            breakeven_year = Some(record.year);
        }
    }

    let net_present_value = records.net_present_value();
    if records.is_empty() {
        warnings.push("No cash flows supplied; profile is empty".into());
    } else if records.iter().all(|r| r.cash_flow <= Decimal::ZERO) {
        warnings.push("No positive cash flow in the profile".into());
    }
    if net_present_value < Decimal::ZERO {
        warnings.push(format!(
            "Net present value is negative ({}) at a {}% discount rate",
            net_present_value.round_dp(4),
            input.discount_rate * dec!(100)
        ));
    }

    let output = DcfProfileOutput {
        total_cash_flow: records.total_cash_flow(),
        net_present_value,
        cumulative_pv,
        breakeven_year,
        discount_rate: input.discount_rate,
        records,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Discounted Free Cash Flow Profile",
        &serde_json::json!({
            "discount_rate": input.discount_rate.to_string(),
            "years": input.cash_flows.len(),
            "discounting": "end-of-year, (1 + r)^-t",
        }),
        warnings,
        elapsed,
        Precision::Decimal,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(flows: &[i64]) -> Vec<(i32, Money)> {
        flows
            .iter()
            .enumerate()
            .map(|(t, cf)| (t as i32, Decimal::from(*cf)))
            .collect()
    }

    #[test]
    fn test_year_zero_factor_is_one() {
        for r in [dec!(-0.5), dec!(0), dec!(0.1), dec!(3)] {
            let series = profile(&pairs(&[10, 10]), r).unwrap();
            assert_eq!(series.records()[0].discount_factor, Decimal::ONE);
            assert_eq!(series.records()[0].present_value, dec!(10));
        }
    }

    #[test]
    fn test_zero_rate_preserves_cash_flows() {
        let series = profile(&pairs(&[-5, 3, 8, 13]), Decimal::ZERO).unwrap();
        for record in &series {
            assert_eq!(record.present_value, record.cash_flow);
        }
    }

    #[test]
    fn test_empty_input_is_empty_series() {
        let series = profile(&[], dec!(0.1)).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.net_present_value(), Decimal::ZERO);
    }

    #[test]
    fn test_sparse_years_allowed() {
        let series = profile(&[(0, dec!(1)), (3, dec!(1)), (10, dec!(1))], dec!(0.25)).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.records()[1].year, 3);
        assert_eq!(series.records()[1].discount_factor, dec!(0.512));
    }

    #[test]
    fn test_duplicate_year_rejected() {
        let err = profile(&[(0, dec!(1)), (1, dec!(1)), (1, dec!(2))], dec!(0.1)).unwrap_err();
        assert!(matches!(err, ValuationError::InvalidInput { ref field, .. } if field == "year"));
    }

    #[test]
    fn test_negative_year_rejected() {
        assert!(profile(&[(-1, dec!(1))], dec!(0.1)).is_err());
    }

    #[test]
    fn test_rate_below_minus_one_rejected() {
        let err = profile(&pairs(&[1]), dec!(-1.2)).unwrap_err();
        assert!(
            matches!(err, ValuationError::InvalidInput { ref field, .. } if field == "discount_rate")
        );
    }

    #[test]
    fn test_reference_profile_summary() {
        let out = run_dcf_profile(&DcfProfileInput::default()).unwrap().result;
        assert_eq!(out.records.len(), 11);
        assert_eq!(out.total_cash_flow, dec!(103));
        assert_eq!(out.cumulative_pv.len(), 11);
        assert_eq!(*out.cumulative_pv.last().unwrap(), out.net_present_value);
        assert!(out.net_present_value > Decimal::ZERO);
        // Cumulative discounted cash flow first turns non-negative in year 7.
        assert_eq!(out.breakeven_year, Some(7));
    }

    #[test]
    fn test_negative_npv_warns() {
        let input = DcfProfileInput {
            cash_flows: vec![
                YearCashFlow { year: 0, cash_flow: dec!(-100) },
                YearCashFlow { year: 1, cash_flow: dec!(10) },
            ],
            discount_rate: dec!(0.25),
        };
        let out = run_dcf_profile(&input).unwrap();
        assert_eq!(out.result.breakeven_year, None);
        assert!(out.warnings.iter().any(|w| w.contains("negative")));
    }

    #[test]
    fn test_empty_profile_warns() {
        let input = DcfProfileInput {
            cash_flows: vec![],
            discount_rate: dec!(0.1),
        };
        let out = run_dcf_profile(&input).unwrap();
        assert!(out.result.records.is_empty());
        assert!(out.warnings.iter().any(|w| w.contains("empty")));
    }

    #[test]
    fn test_input_defaults_from_json() {
        let input: DcfProfileInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.discount_rate, dec!(0.25));
        assert_eq!(input.cash_flows.len(), 11);
        assert_eq!(input.cash_flows[10].cash_flow, dec!(27));
    }
}
