//! Cash-flow schedule for a bullet bond.
//!
//! Each coupon period produces one [`CashFlowEvent`] dated a whole number of
//! months after the valuation date and discounted at the per-period yield
//! with a per-period exponent (no day-count or continuous compounding).

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BondAnalyticsError;
use crate::fixed_income::terms::BondTerms;
use crate::types::{Money, Rate, Years};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A single scheduled payment (coupon, principal, or both).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowEvent {
    /// 1-based period index
    pub period: u32,
    pub payment_date: NaiveDate,
    /// Time of the payment in years (`period / frequency`)
    pub time_years: Years,
    pub coupon_amount: Money,
    /// Face value on the final period, zero otherwise
    pub principal_amount: Money,
    pub total_amount: Money,
    /// `1 / (1 + yield_rate/frequency)^period`
    pub discount_factor: Rate,
    pub present_value: Money,
}

impl CashFlowEvent {
    pub fn is_final(&self) -> bool {
        !self.principal_amount.is_zero()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the full ordered payment schedule for `terms` as seen from
/// `valuation_date`.
///
/// Discount factors are accumulated by iterative multiplication of the
/// one-period factor, never `powd()`.
pub fn generate_schedule(
    terms: &BondTerms,
    valuation_date: NaiveDate,
) -> BondAnalyticsResult<Vec<CashFlowEvent>> {
    terms.validate()?;

    let total_periods = terms.total_periods()?;
    let freq = Decimal::from(terms.frequency);
    let coupon_amount = terms.coupon_amount();
    let one_period_factor = Decimal::ONE / (Decimal::ONE + terms.yield_per_period());

    // Validated terms keep every amount below the undiscounted total.
    let mut events = Vec::with_capacity(total_periods as usize);
    let mut discount_factor = Decimal::ONE;

    for period in 1..=total_periods {
        discount_factor *= one_period_factor;

        let principal_amount = if period == total_periods {
            terms.face_value
        } else {
            Decimal::ZERO
        };
        let total_amount = coupon_amount + principal_amount;

        events.push(CashFlowEvent {
            period,
            payment_date: payment_date(valuation_date, period, terms.frequency)?,
            time_years: Decimal::from(period) / freq,
            coupon_amount,
            principal_amount,
            total_amount,
            discount_factor,
            present_value: total_amount * discount_factor,
        });
    }

    debug!(
        periods = total_periods,
        frequency = terms.frequency,
        %valuation_date,
        "generated cash-flow schedule"
    );

    Ok(events)
}

/// Sum of every scheduled amount (all coupons plus one principal repayment).
pub fn total_cash_flows(events: &[CashFlowEvent]) -> BondAnalyticsResult<Money> {
    events
        .iter()
        .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.total_amount))
        .ok_or_else(|| BondAnalyticsError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Sum of cash flows exceeds the decimal range".into(),
        })
}

// ---------------------------------------------------------------------------
// Date helpers
// ---------------------------------------------------------------------------

/// Whole months between the valuation date and the payment for `period`.
///
/// Equals `(12 / frequency) * period` when the frequency divides twelve;
/// other frequencies truncate to the whole month.
fn months_offset(period: u32, frequency: u32) -> u32 {
    (12 * period as u64 / frequency as u64) as u32
}

/// Offset the valuation date, clamping the day to the end of shorter months.
fn payment_date(
    valuation_date: NaiveDate,
    period: u32,
    frequency: u32,
) -> BondAnalyticsResult<NaiveDate> {
    let months = months_offset(period, frequency);
    valuation_date
        .checked_add_months(Months::new(months))
        .ok_or_else(|| {
            BondAnalyticsError::DateError(format!(
                "payment date for period {period} ({months} months after {valuation_date}) is out of range"
            ))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valuation_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    /// 5-year, 22% semi-annual bond on 1000 face.
    fn semi_annual_terms() -> BondTerms {
        BondTerms {
            face_value: dec!(1000),
            coupon_rate: dec!(0.22),
            yield_rate: dec!(0.225),
            years_to_maturity: dec!(5),
            frequency: 2,
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal, label: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "{label}: expected ~{expected}, got {actual} (diff {diff} > tolerance {tolerance})"
        );
    }

    #[test]
    fn test_period_count_and_amounts() {
        let events = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();

        assert_eq!(events.len(), 10);
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.period, i as u32 + 1);
            assert_eq!(e.coupon_amount, dec!(110));
        }
        assert!(events[..9].iter().all(|e| e.principal_amount.is_zero()));
        assert_eq!(events[9].principal_amount, dec!(1000));
        assert_eq!(events[9].total_amount, dec!(1110));
        assert!(events[9].is_final());
    }

    #[test]
    fn test_present_value_uses_period_exponent() {
        let events = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();

        // First coupon: 110 / 1.1125
        assert_close(
            events[0].present_value,
            dec!(110) / dec!(1.1125),
            dec!(0.0000000001),
            "PV of period 1",
        );
        // Third coupon: 110 / 1.1125^3
        let growth = dec!(1.1125) * dec!(1.1125) * dec!(1.1125);
        assert_close(
            events[2].present_value,
            dec!(110) / growth,
            dec!(0.0000000001),
            "PV of period 3",
        );
    }

    #[test]
    fn test_present_values_decline_until_principal() {
        let events = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();
        for pair in events[..9].windows(2) {
            assert!(pair[1].present_value < pair[0].present_value);
        }
        assert!(events[9].present_value > events[8].present_value);
    }

    #[test]
    fn test_cash_flow_conservation() {
        let terms = semi_annual_terms();
        let events = generate_schedule(&terms, valuation_date()).unwrap();
        assert_eq!(
            total_cash_flows(&events).unwrap(),
            terms.face_value + terms.coupon_amount() * dec!(10)
        );
    }

    #[test]
    fn test_semi_annual_dates_step_six_months() {
        let events = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();
        assert_eq!(
            events[0].payment_date,
            NaiveDate::from_ymd_opt(2024, 7, 15).unwrap()
        );
        assert_eq!(
            events[1].payment_date,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(
            events[9].payment_date,
            NaiveDate::from_ymd_opt(2029, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_month_end_dates_clamp_without_drift() {
        let terms = BondTerms {
            frequency: 12,
            years_to_maturity: dec!(0.25),
            ..semi_annual_terms()
        };
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let events = generate_schedule(&terms, start).unwrap();

        let dates: Vec<NaiveDate> = events.iter().map(|e| e.payment_date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
                NaiveDate::from_ymd_opt(2024, 4, 30).unwrap(),
            ]
        );
    }

    #[test]
    fn test_fractional_maturity_pays_full_final_period() {
        let terms = BondTerms {
            years_to_maturity: dec!(2.3),
            ..semi_annual_terms()
        };
        let events = generate_schedule(&terms, valuation_date()).unwrap();

        assert_eq!(events.len(), 5);
        let last = events.last().unwrap();
        assert_eq!(last.coupon_amount, dec!(110));
        assert_eq!(last.principal_amount, dec!(1000));
        assert_eq!(last.time_years, dec!(2.5));
    }

    #[test]
    fn test_zero_coupon_single_non_zero_flow() {
        let terms = BondTerms {
            coupon_rate: Decimal::ZERO,
            ..semi_annual_terms()
        };
        let events = generate_schedule(&terms, valuation_date()).unwrap();

        let non_zero: Vec<&CashFlowEvent> =
            events.iter().filter(|e| !e.total_amount.is_zero()).collect();
        assert_eq!(non_zero.len(), 1);
        assert_eq!(non_zero[0].period, 10);
        assert_eq!(non_zero[0].total_amount, dec!(1000));
    }

    #[test]
    fn test_non_divisor_frequency_truncates_months() {
        // 5 payments per year: 2.4 months per period
        assert_eq!(months_offset(1, 5), 2);
        assert_eq!(months_offset(3, 5), 7);
        assert_eq!(months_offset(5, 5), 12);
        assert_eq!(months_offset(4, 4), 12);
    }

    #[test]
    fn test_invalid_terms_rejected_before_scheduling() {
        let terms = BondTerms {
            yield_rate: dec!(-0.01),
            ..semi_annual_terms()
        };
        match generate_schedule(&terms, valuation_date()).unwrap_err() {
            BondAnalyticsError::InvalidTerms { field, .. } => assert_eq!(field, "yield_rate"),
            other => panic!("Expected InvalidTerms for yield_rate, got {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_date_is_date_error() {
        let err = generate_schedule(&semi_annual_terms(), NaiveDate::MAX).unwrap_err();
        assert!(matches!(err, BondAnalyticsError::DateError(_)));
    }

    #[test]
    fn test_deep_discount_factors_underflow_to_zero() {
        let terms = BondTerms {
            coupon_rate: Decimal::ZERO,
            yield_rate: dec!(3),
            years_to_maturity: dec!(50),
            frequency: 1,
            ..semi_annual_terms()
        };
        let events = generate_schedule(&terms, valuation_date()).unwrap();

        assert_eq!(events.len(), 50);
        assert!(events[49].discount_factor.is_zero());
        assert!(events[49].present_value.is_zero());
        assert_eq!(events[49].total_amount, dec!(1000));
    }

    #[test]
    fn test_deterministic_for_identical_inputs() {
        let a = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();
        let b = generate_schedule(&semi_annual_terms(), valuation_date()).unwrap();
        assert_eq!(a, b);
    }
}
