//! Bond valuation: price, Macaulay and modified duration, convexity and
//! premium/discount classification, folded from the cash-flow schedule.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BondAnalyticsError;
use crate::fixed_income::schedule::{generate_schedule, total_cash_flows, CashFlowEvent};
use crate::fixed_income::terms::BondTerms;
use crate::types::{Money, Rate, Years};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Relative tolerance inside which a price is treated as par.
pub const PAR_TOLERANCE: Decimal = dec!(0.000000001);

const ONE_BASIS_POINT: Decimal = dec!(0.0001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where the price sits relative to face value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceClassification {
    Premium,
    Discount,
    Par,
}

/// Output of a single bond valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    /// Sum of the present values of every scheduled cash flow
    pub price: Money,
    /// PV-weighted average time to receipt, in years
    pub macaulay_duration: Years,
    /// Macaulay / (1 + y/freq)
    pub modified_duration: Years,
    /// Second-order price sensitivity
    pub convexity: Decimal,
    /// Price change for a one basis point move (modified_duration * price * 0.0001)
    pub dv01: Money,
    /// Annual coupon / price; zero when the price underflows to zero
    pub current_yield: Rate,
    pub classification: PriceClassification,
    pub total_periods: u32,
    /// Coupon paid each period
    pub coupon_amount: Money,
    /// Undiscounted sum of all coupons and the principal
    pub total_cash_flows: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a bond as of today.
///
/// Payment dates never enter the discounting, so the figures are identical
/// for any valuation date.
pub fn value_bond(terms: &BondTerms) -> BondAnalyticsResult<ValuationResult> {
    value_bond_on(terms, Utc::now().date_naive())
}

/// Value a bond from a schedule generated as of `valuation_date`.
pub fn value_bond_on(
    terms: &BondTerms,
    valuation_date: NaiveDate,
) -> BondAnalyticsResult<ValuationResult> {
    let events = generate_schedule(terms, valuation_date)?;
    value_schedule(terms, &events)
}

/// Fold an already generated schedule into a [`ValuationResult`].
pub fn value_schedule(
    terms: &BondTerms,
    events: &[CashFlowEvent],
) -> BondAnalyticsResult<ValuationResult> {
    terms.validate()?;
    if events.is_empty() {
        return Err(BondAnalyticsError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Schedule must contain at least one cash flow".into(),
        });
    }

    let price: Money = events
        .iter()
        .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.present_value))
        .ok_or_else(|| BondAnalyticsError::InvalidInput {
            field: "cash_flows".into(),
            reason: "Sum of present values exceeds the decimal range".into(),
        })?;

    let one_plus_y = Decimal::ONE + terms.yield_per_period();
    let (macaulay_duration, convexity_moment) = time_moments(terms, events)?;

    // --- Modified duration ---
    let modified_duration = macaulay_duration / one_plus_y;

    // --- Convexity: sum[(t^2 + t/freq) * PV] / (P * (1 + y/f)^2) ---
    let convexity = convexity_moment / one_plus_y / one_plus_y;

    let annual_coupon = terms.face_value * terms.coupon_rate;
    let current_yield = annual_coupon.checked_div(price).unwrap_or_default();
    let dv01 = modified_duration
        .checked_mul(price)
        .map(|d| d * ONE_BASIS_POINT)
        .ok_or_else(|| moment_overflow("DV01"))?;

    let result = ValuationResult {
        price,
        macaulay_duration,
        modified_duration,
        convexity,
        dv01,
        current_yield,
        classification: classify(price, terms.face_value),
        total_periods: events.len() as u32,
        coupon_amount: terms.coupon_amount(),
        total_cash_flows: total_cash_flows(events)?,
    };

    debug!(
        price = %result.price,
        macaulay = %result.macaulay_duration,
        classification = ?result.classification,
        "valued bond"
    );

    Ok(result)
}

/// PV-weighted time moments of the schedule: `sum(t * PV) / P` (Macaulay
/// duration) and `sum(t * (t + 1/f) * PV) / P`.
///
/// Weights are discounted from the first non-zero cash flow instead of the
/// valuation date. The ratios are unchanged, but a long or high-yield
/// schedule whose absolute present values underflow to zero still has
/// finite moments.
fn time_moments(
    terms: &BondTerms,
    events: &[CashFlowEvent],
) -> BondAnalyticsResult<(Years, Decimal)> {
    let first = events
        .iter()
        .position(|e| !e.total_amount.is_zero())
        .ok_or_else(|| BondAnalyticsError::DivisionByZero {
            context: "bond valuation: schedule has no non-zero cash flow".into(),
        })?;

    let one_period_factor = Decimal::ONE / (Decimal::ONE + terms.yield_per_period());
    let period_length = Decimal::ONE / Decimal::from(terms.frequency);

    let mut period = events[first].period;
    let mut relative_df = Decimal::ONE;
    let mut weight_sum = Decimal::ZERO;
    let mut first_moment = Decimal::ZERO;
    let mut second_moment = Decimal::ZERO;

    for event in &events[first..] {
        if event.period < period {
            return Err(BondAnalyticsError::InvalidInput {
                field: "cash_flows".into(),
                reason: "Cash flows must be in ascending period order".into(),
            });
        }
        while period < event.period && !relative_df.is_zero() {
            relative_df *= one_period_factor;
            period += 1;
        }
        period = event.period;

        // relative_df <= 1, so each weight is bounded by its cash flow
        let weight = event.total_amount * relative_df;
        weight_sum = weight_sum
            .checked_add(weight)
            .ok_or_else(|| moment_overflow("duration"))?;

        let timed = event
            .time_years
            .checked_mul(weight)
            .ok_or_else(|| moment_overflow("duration"))?;
        first_moment = first_moment
            .checked_add(timed)
            .ok_or_else(|| moment_overflow("duration"))?;
        second_moment = event
            .time_years
            .checked_add(period_length)
            .and_then(|t| t.checked_mul(timed))
            .and_then(|m| second_moment.checked_add(m))
            .ok_or_else(|| moment_overflow("convexity"))?;
    }

    let zero_weight = || BondAnalyticsError::DivisionByZero {
        context: "bond valuation: cash-flow weights sum to zero".into(),
    };
    Ok((
        first_moment.checked_div(weight_sum).ok_or_else(zero_weight)?,
        second_moment.checked_div(weight_sum).ok_or_else(zero_weight)?,
    ))
}

fn moment_overflow(measure: &str) -> BondAnalyticsError {
    BondAnalyticsError::InvalidTerms {
        field: "face_value".into(),
        reason: format!("Face value too large to compute {measure} within the decimal range"),
    }
}

/// Classify a price against face value with a relative [`PAR_TOLERANCE`].
pub fn classify(price: Money, face_value: Money) -> PriceClassification {
    let band = face_value * PAR_TOLERANCE;
    let difference = price - face_value;
    if difference > band {
        PriceClassification::Premium
    } else if difference < -band {
        PriceClassification::Discount
    } else {
        PriceClassification::Par
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
