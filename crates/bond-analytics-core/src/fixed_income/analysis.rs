//! One-call bond analysis: valuation, cash-flow schedule and yield
//! sensitivity wrapped in the standard computation envelope.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BondAnalyticsError;
use crate::fixed_income::schedule::{generate_schedule, CashFlowEvent};
use crate::fixed_income::sensitivity::{
    flagged_base_index, sensitivity_curve_on, shift_grid, SensitivityPoint, ShiftRange,
};
use crate::fixed_income::terms::BondTerms;
use crate::fixed_income::valuation::{value_schedule, ValuationResult};
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::BondAnalyticsResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A valuation request: bond terms plus optional context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondAnalysisInput {
    #[serde(flatten)]
    pub terms: BondTerms,
    /// Date the schedule is generated from (defaults to today)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valuation_date: Option<NaiveDate>,
    /// Yield shifts for the sensitivity curve (defaults to +/-5% in 50 bp steps)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_range: Option<ShiftRange>,
    /// Externally solved yield to maturity, carried through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_ytm: Option<Rate>,
}

impl From<BondTerms> for BondAnalysisInput {
    fn from(terms: BondTerms) -> Self {
        BondAnalysisInput {
            terms,
            valuation_date: None,
            shift_range: None,
            market_ytm: None,
        }
    }
}

/// Everything a presentation layer needs for one bond.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BondAnalysisOutput {
    pub valuation_date: NaiveDate,
    pub valuation: ValuationResult,
    pub cash_flows: Vec<CashFlowEvent>,
    pub sensitivity: Vec<SensitivityPoint>,
    /// Index into `sensitivity` of the point flagged as current yield
    pub base_point_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_ytm: Option<Rate>,
    /// (market_ytm - yield_rate) in basis points
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_ytm_spread_bps: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value a bond, lay out its cash flows and sweep its yield sensitivity.
pub fn analyze_bond(
    input: &BondAnalysisInput,
) -> BondAnalyticsResult<ComputationOutput<BondAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let terms = &input.terms;
    terms.validate()?;

    let valuation_date = input
        .valuation_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let shift_range = input.shift_range.unwrap_or_default();

    // --- Schedule and valuation ---
    let cash_flows = generate_schedule(terms, valuation_date)?;
    let valuation = value_schedule(terms, &cash_flows)?;

    if terms.has_fractional_maturity() {
        warnings.push(format!(
            "Maturity of {} years at frequency {} rounded up to {} full periods; final coupon is not prorated",
            terms.years_to_maturity, terms.frequency, valuation.total_periods
        ));
    }
    if terms.is_zero_coupon() {
        warnings.push("Zero-coupon bond: principal is the only non-zero cash flow".into());
    }

    // --- Sensitivity ---
    let sensitivity = sensitivity_curve_on(terms, &shift_range, valuation_date)?;
    let requested_points = shift_grid(&shift_range)?.len();
    if sensitivity.is_empty() {
        warnings.push(
            "No yield shift in the requested range produces a positive yield; sensitivity curve is empty"
                .into(),
        );
    } else if sensitivity.len() < requested_points {
        warnings.push(format!(
            "{} yield shift(s) omitted because the shifted yield is zero or negative",
            requested_points - sensitivity.len()
        ));
    }
    let base_point_index = flagged_base_index(&sensitivity);

    let market_ytm_spread_bps = input
        .market_ytm
        .map(|ytm| {
            ytm.checked_sub(terms.yield_rate)
                .and_then(|spread| spread.checked_mul(dec!(10000)))
                .ok_or_else(|| BondAnalyticsError::InvalidInput {
                    field: "market_ytm".into(),
                    reason: "Spread to yield_rate exceeds the decimal range".into(),
                })
        })
        .transpose()?;

    debug!(
        periods = valuation.total_periods,
        curve_points = sensitivity.len(),
        warnings = warnings.len(),
        "bond analysis complete"
    );

    let output = BondAnalysisOutput {
        valuation_date,
        valuation,
        cash_flows,
        sensitivity,
        base_point_index,
        market_ytm: input.market_ytm,
        market_ytm_spread_bps,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    let assumptions = serde_json::json!({
        "instrument": "fixed-coupon bullet bond",
        "periods": "ceil(years_to_maturity * frequency)",
        "discounting": "per-period yield, per-period exponent",
        "payment_dates": "whole-month offsets from valuation date",
        "shift_range": shift_range,
        "par_tolerance": "1e-9 relative",
    });

    Ok(with_metadata(
        "Bond Valuation & Yield Sensitivity (period discounting, full re-valuation per shift)",
        &assumptions,
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
