//! Price-vs-yield sensitivity curve built from independent full re-valuations
//! under parallel yield shifts.

use chrono::{NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::BondAnalyticsError;
use crate::fixed_income::terms::BondTerms;
use crate::fixed_income::valuation::{value_bond_on, ValuationResult};
use crate::types::{Money, Rate};
use crate::BondAnalyticsResult;

/// Largest number of grid points a single sweep may request.
pub const MAX_SWEEP_POINTS: usize = 10_000;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Symmetric or asymmetric range of parallel yield shifts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShiftRange {
    pub min: Rate,
    pub max: Rate,
    pub step: Rate,
}

impl Default for ShiftRange {
    /// -5% to +5% in 50 bp steps.
    fn default() -> Self {
        ShiftRange {
            min: dec!(-0.05),
            max: dec!(0.05),
            step: dec!(0.005),
        }
    }
}

/// One point of the price-vs-yield curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub yield_shift: Rate,
    pub shifted_yield: Rate,
    /// Exact price re-computed at `shifted_yield`
    pub price_at_shift: Money,
    /// `price_at_shift - base price`
    pub price_change: Money,
    /// `price_change / base price`
    pub price_change_pct: Decimal,
    /// Price predicted by the duration + convexity approximation
    pub duration_convexity_estimate: Money,
    /// Nearest point to a zero shift (within half a step)
    pub is_base: bool,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Build the sensitivity curve for `terms` over `range`.
///
/// Shifts whose shifted yield is zero or negative are left out; a range with
/// no positive shifted yield yields an empty curve rather than an error.
pub fn sensitivity_curve(
    terms: &BondTerms,
    range: &ShiftRange,
) -> BondAnalyticsResult<Vec<SensitivityPoint>> {
    sensitivity_curve_on(terms, range, Utc::now().date_naive())
}

/// As [`sensitivity_curve`], generating every schedule as of `valuation_date`.
pub fn sensitivity_curve_on(
    terms: &BondTerms,
    range: &ShiftRange,
    valuation_date: NaiveDate,
) -> BondAnalyticsResult<Vec<SensitivityPoint>> {
    let base = value_bond_on(terms, valuation_date)?;
    let shifts = shift_grid(range)?;
    let requested = shifts.len();

    let mut retained: Vec<(Rate, Rate)> = Vec::with_capacity(requested);
    for shift in shifts {
        let shifted_yield = terms.yield_rate.checked_add(shift).ok_or_else(|| {
            range_error("shift_range.max", "Shifted yield exceeds the decimal range")
        })?;
        if shifted_yield > Decimal::ZERO {
            retained.push((shift, shifted_yield));
        }
    }

    let reprice = |point: &(Rate, Rate)| -> BondAnalyticsResult<SensitivityPoint> {
        let (shift, shifted_yield) = *point;
        let shifted = value_bond_on(&terms.with_yield(shifted_yield), valuation_date)?;
        build_point(&base, shift, shifted_yield, shifted.price)
    };

    #[cfg(feature = "parallel")]
    let mut points: Vec<SensitivityPoint> = retained
        .par_iter()
        .map(reprice)
        .collect::<BondAnalyticsResult<Vec<_>>>()?;

    #[cfg(not(feature = "parallel"))]
    let mut points: Vec<SensitivityPoint> = retained
        .iter()
        .map(reprice)
        .collect::<BondAnalyticsResult<Vec<_>>>()?;

    if let Some(idx) = base_point_index(&points, range.step) {
        points[idx].is_base = true;
    }

    debug!(
        requested,
        retained = points.len(),
        skipped = requested - points.len(),
        "built sensitivity curve"
    );

    Ok(points)
}

/// Position of the flagged base point, if any.
pub fn flagged_base_index(points: &[SensitivityPoint]) -> Option<usize> {
    points.iter().position(|p| p.is_base)
}

/// Shifts `min + i * step` for every `i` that stays within `max`, before
/// any shift is dropped for a non-positive yield.
///
/// Each shift is computed from the index rather than by accumulation, so the
/// grid carries no rounding drift. `max` is included when the step lands on
/// it exactly.
pub fn shift_grid(range: &ShiftRange) -> BondAnalyticsResult<Vec<Rate>> {
    if range.step <= Decimal::ZERO {
        return Err(range_error("shift_range.step", "Step must be positive"));
    }
    if range.min > range.max {
        return Err(range_error("shift_range.min", "Min must be <= max"));
    }

    let too_many = || {
        range_error(
            "shift_range.step",
            &format!("Sweep must not exceed {MAX_SWEEP_POINTS} points"),
        )
    };
    let intervals = range
        .max
        .checked_sub(range.min)
        .and_then(|span| span.checked_div(range.step))
        .ok_or_else(too_many)?
        .floor()
        .to_usize()
        .filter(|n| *n < MAX_SWEEP_POINTS)
        .ok_or_else(too_many)?;

    // min + step * i never passes max, so stays in range
    Ok((0..=intervals)
        .map(|i| range.min + range.step * Decimal::from(i))
        .collect())
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn build_point(
    base: &ValuationResult,
    yield_shift: Rate,
    shifted_yield: Rate,
    price_at_shift: Money,
) -> BondAnalyticsResult<SensitivityPoint> {
    let price_change = price_at_shift - base.price;

    // P * (1 - D_mod * dy + 0.5 * C * dy^2)
    let duration_convexity_estimate = yield_shift
        .checked_mul(yield_shift)
        .and_then(|dy2| dy2.checked_mul(base.convexity))
        .and_then(|c| c.checked_mul(dec!(0.5)))
        .and_then(|c| {
            base.modified_duration
                .checked_mul(yield_shift)
                .and_then(|d| Decimal::ONE.checked_add(c)?.checked_sub(d))
        })
        .and_then(|factor| base.price.checked_mul(factor))
        .ok_or_else(|| {
            range_error(
                "shift_range",
                "Shift too large for the duration-convexity estimate",
            )
        })?;

    Ok(SensitivityPoint {
        yield_shift,
        shifted_yield,
        price_at_shift,
        price_change,
        // Zero when the base price underflows to zero
        price_change_pct: price_change.checked_div(base.price).unwrap_or_default(),
        duration_convexity_estimate,
        is_base: false,
    })
}

fn range_error(field: &str, reason: &str) -> BondAnalyticsError {
    BondAnalyticsError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

/// Point nearest a zero shift, provided it lies within half a step of zero.
fn base_point_index(points: &[SensitivityPoint], step: Rate) -> Option<usize> {
    let half_step = step / dec!(2);
    points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.yield_shift.abs() <= half_step)
        .min_by_key(|(_, p)| p.yield_shift.abs())
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn valuation_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn bond(yield_rate: Rate) -> BondTerms {
        BondTerms {
            face_value: dec!(1000),
            coupon_rate: dec!(0.22),
            yield_rate,
            years_to_maturity: dec!(5),
            frequency: 2,
        }
    }

    #[test]
    fn test_default_range_is_plus_minus_five_percent() {
        let grid = shift_grid(&ShiftRange::default()).unwrap();
        assert_eq!(grid.len(), 21);
        assert_eq!(grid[0], dec!(-0.05));
        assert_eq!(grid[10], Decimal::ZERO);
        assert_eq!(grid[20], dec!(0.05));
    }

    #[test]
    fn test_grid_excludes_unreachable_max() {
        let range = ShiftRange {
            min: dec!(0),
            max: dec!(0.01),
            step: dec!(0.003),
        };
        assert_eq!(
            shift_grid(&range).unwrap(),
            vec![dec!(0), dec!(0.003), dec!(0.006), dec!(0.009)]
        );
    }

    #[test]
    fn test_single_point_range() {
        let range = ShiftRange {
            min: dec!(0.01),
            max: dec!(0.01),
            step: dec!(0.005),
        };
        assert_eq!(shift_grid(&range).unwrap(), vec![dec!(0.01)]);
    }

    #[test]
    fn test_invalid_ranges_rejected() {
        let zero_step = ShiftRange {
            step: Decimal::ZERO,
            ..ShiftRange::default()
        };
        assert_eq!(
            shift_grid(&zero_step).unwrap_err().field(),
            Some("shift_range.step")
        );

        let inverted = ShiftRange {
            min: dec!(0.05),
            max: dec!(-0.05),
            step: dec!(0.005),
        };
        assert_eq!(
            shift_grid(&inverted).unwrap_err().field(),
            Some("shift_range.min")
        );

        let too_fine = ShiftRange {
            step: dec!(0.000001),
            ..ShiftRange::default()
        };
        assert!(shift_grid(&too_fine).is_err());
    }

    #[test]
    fn test_full_curve_has_every_point() {
        let curve =
            sensitivity_curve_on(&bond(dec!(0.225)), &ShiftRange::default(), valuation_date())
                .unwrap();
        assert_eq!(curve.len(), 21);
    }

    #[test]
    fn test_price_strictly_decreasing_in_shift() {
        let curve =
            sensitivity_curve_on(&bond(dec!(0.225)), &ShiftRange::default(), valuation_date())
                .unwrap();
        for pair in curve.windows(2) {
            assert!(pair[1].yield_shift > pair[0].yield_shift);
            assert!(
                pair[1].price_at_shift < pair[0].price_at_shift,
                "price at {} ({}) should be below price at {} ({})",
                pair[1].yield_shift,
                pair[1].price_at_shift,
                pair[0].yield_shift,
                pair[0].price_at_shift
            );
        }
    }

    #[test]
    fn test_low_yield_skips_non_positive_shifts() {
        let curve =
            sensitivity_curve_on(&bond(dec!(0.02)), &ShiftRange::default(), valuation_date())
                .unwrap();

        // Shifts -0.05 ..= -0.02 give yields <= 0 and are dropped: 21 - 7 = 14
        assert_eq!(curve.len(), 14);
        let min_yield = curve.iter().map(|p| p.shifted_yield).min().unwrap();
        assert!(min_yield > Decimal::ZERO);
        assert_eq!(curve[0].yield_shift, dec!(-0.015));
    }

    #[test]
    fn test_entirely_non_positive_range_is_empty() {
        let range = ShiftRange {
            min: dec!(-0.10),
            max: dec!(-0.05),
            step: dec!(0.01),
        };
        let curve = sensitivity_curve_on(&bond(dec!(0.02)), &range, valuation_date()).unwrap();
        assert!(curve.is_empty());
        assert_eq!(flagged_base_index(&curve), None);
    }

    #[test]
    fn test_base_point_flagged_once_at_zero_shift() {
        let curve =
            sensitivity_curve_on(&bond(dec!(0.225)), &ShiftRange::default(), valuation_date())
                .unwrap();
        assert_eq!(curve.iter().filter(|p| p.is_base).count(), 1);

        let idx = flagged_base_index(&curve).unwrap();
        assert_eq!(curve[idx].yield_shift, Decimal::ZERO);
        assert!(curve[idx].price_change.is_zero());

        let base = value_bond_on(&bond(dec!(0.225)), valuation_date()).unwrap();
        assert_eq!(curve[idx].price_at_shift, base.price);
    }

    #[test]
    fn test_base_point_within_half_step_of_zero() {
        let range = ShiftRange {
            min: dec!(-0.0125),
            max: dec!(0.0125),
            step: dec!(0.005),
        };
        let curve = sensitivity_curve_on(&bond(dec!(0.1)), &range, valuation_date()).unwrap();
        // Shifts: -0.0125, -0.0075, -0.0025, 0.0025, 0.0075, 0.0125
        let flagged: Vec<Rate> = curve
            .iter()
            .filter(|p| p.is_base)
            .map(|p| p.yield_shift)
            .collect();
        assert_eq!(flagged, vec![dec!(-0.0025)]);
    }

    #[test]
    fn test_no_base_point_when_zero_out_of_reach() {
        let range = ShiftRange {
            min: dec!(0.01),
            max: dec!(0.03),
            step: dec!(0.01),
        };
        let curve = sensitivity_curve_on(&bond(dec!(0.1)), &range, valuation_date()).unwrap();
        assert_eq!(curve.len(), 3);
        assert!(curve.iter().all(|p| !p.is_base));
    }

    #[test]
    fn test_convexity_keeps_exact_price_above_estimate_line() {
        let terms = bond(dec!(0.225));
        let base = value_bond_on(&terms, valuation_date()).unwrap();
        let curve =
            sensitivity_curve_on(&terms, &ShiftRange::default(), valuation_date()).unwrap();

        for p in curve.iter().filter(|p| !p.yield_shift.is_zero()) {
            // First-order line always lies below a convex price curve
            let linear = base.price * (Decimal::ONE - base.modified_duration * p.yield_shift);
            assert!(p.price_at_shift > linear);
        }
    }

    #[test]
    fn test_points_match_independent_valuations() {
        let terms = bond(dec!(0.225));
        let curve =
            sensitivity_curve_on(&terms, &ShiftRange::default(), valuation_date()).unwrap();
        let p = &curve[3];
        let direct = value_bond_on(&terms.with_yield(p.shifted_yield), valuation_date()).unwrap();
        assert_eq!(p.price_at_shift, direct.price);
    }

    #[test]
    fn test_extreme_ranges_rejected_without_panic() {
        let full_span = ShiftRange {
            min: Decimal::MIN,
            max: Decimal::MAX,
            step: dec!(0.005),
        };
        assert_eq!(
            shift_grid(&full_span).unwrap_err().field(),
            Some("shift_range.step")
        );

        let tiny_step = ShiftRange {
            step: Decimal::new(1, 28),
            ..ShiftRange::default()
        };
        assert_eq!(
            shift_grid(&tiny_step).unwrap_err().field(),
            Some("shift_range.step")
        );

        let past_max_yield = ShiftRange {
            min: Decimal::MAX - dec!(1),
            max: Decimal::MAX,
            step: dec!(1),
        };
        let err = sensitivity_curve_on(&bond(dec!(0.1)), &past_max_yield, valuation_date())
            .unwrap_err();
        assert!(matches!(err, BondAnalyticsError::InvalidInput { .. }));
    }

    #[test]
    fn test_curve_survives_underflowing_prices() {
        let terms = BondTerms {
            coupon_rate: Decimal::ZERO,
            years_to_maturity: dec!(50),
            frequency: 1,
            ..bond(dec!(3))
        };
        let curve =
            sensitivity_curve_on(&terms, &ShiftRange::default(), valuation_date()).unwrap();

        assert_eq!(curve.len(), 21);
        assert!(curve.iter().all(|p| p.price_at_shift.is_zero()));
        assert!(curve.iter().all(|p| p.price_change_pct.is_zero()));
        assert_eq!(flagged_base_index(&curve), Some(10));
    }

    #[test]
    fn test_invalid_terms_propagate() {
        let terms = BondTerms {
            face_value: dec!(-1),
            ..bond(dec!(0.1))
        };
        let err = sensitivity_curve(&terms, &ShiftRange::default()).unwrap_err();
        assert_eq!(err.field(), Some("face_value"));
    }
}
