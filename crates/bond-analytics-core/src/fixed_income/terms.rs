//! Contractual terms of a plain-vanilla bullet bond.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BondAnalyticsError;
use crate::types::{Money, Rate, Years};
use crate::BondAnalyticsResult;

/// Upper bound on the number of coupon periods a single bond may generate.
pub const MAX_PERIODS: u32 = 12_000;

/// Input parameters describing a fixed-coupon bullet bond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondTerms {
    /// Par / face value (e.g. 1000)
    pub face_value: Money,
    /// Annual coupon rate as a decimal (0.22 = 22%)
    pub coupon_rate: Rate,
    /// Annual market yield used for discounting, as a decimal
    pub yield_rate: Rate,
    /// Years remaining until maturity; fractional values are allowed
    pub years_to_maturity: Years,
    /// Coupon payments per year: 1 (annual), 2 (semi), 4 (quarterly), 12 (monthly)
    #[serde(alias = "coupon_frequency")]
    pub frequency: u32,
}

impl BondTerms {
    /// Check every field against its domain constraint.
    ///
    /// The first violated field is reported; nothing is computed on failure.
    /// Validated terms keep every coupon, principal, present value and
    /// their undiscounted total inside the decimal range.
    pub fn validate(&self) -> BondAnalyticsResult<()> {
        if self.face_value <= Decimal::ZERO {
            return Err(invalid("face_value", "Face value must be positive"));
        }
        if self.coupon_rate < Decimal::ZERO {
            return Err(invalid("coupon_rate", "Coupon rate cannot be negative"));
        }
        if self.yield_rate <= Decimal::ZERO {
            return Err(invalid("yield_rate", "Yield rate must be positive"));
        }
        if self.frequency == 0 {
            return Err(invalid(
                "frequency",
                "Coupon frequency must be at least one payment per year",
            ));
        }
        if self.years_to_maturity <= Decimal::ZERO {
            return Err(invalid(
                "years_to_maturity",
                "Years to maturity must be positive",
            ));
        }
        self.total_periods()?;
        if Decimal::ONE.checked_add(self.yield_per_period()).is_none() {
            return Err(invalid("yield_rate", "Yield rate exceeds the decimal range"));
        }
        self.checked_total_cash_flows().map(|_| ())
    }

    /// Undiscounted sum of every coupon and the principal, or an error naming
    /// the field that pushes it past the decimal range.
    pub fn checked_total_cash_flows(&self) -> BondAnalyticsResult<Money> {
        let periods = self.total_periods()?;
        let annual_coupon = self
            .face_value
            .checked_mul(self.coupon_rate)
            .ok_or_else(|| invalid("coupon_rate", "Coupon exceeds the decimal range"))?;
        (annual_coupon / Decimal::from(self.frequency))
            .checked_mul(Decimal::from(periods))
            .and_then(|coupons| coupons.checked_add(self.face_value))
            .ok_or_else(|| invalid("face_value", "Total cash flows exceed the decimal range"))
    }

    /// Total number of coupon periods: `ceil(years_to_maturity * frequency)`.
    ///
    /// A fractional final period is rounded up and still pays a full coupon
    /// plus principal.
    pub fn total_periods(&self) -> BondAnalyticsResult<u32> {
        let raw = self
            .years_to_maturity
            .checked_mul(Decimal::from(self.frequency))
            .ok_or_else(|| invalid("years_to_maturity", "Maturity is too large"))?;
        match raw.ceil().to_u32() {
            Some(n) if (1..=MAX_PERIODS).contains(&n) => Ok(n),
            _ => Err(invalid(
                "years_to_maturity",
                &format!("Bond must have between 1 and {MAX_PERIODS} coupon periods"),
            )),
        }
    }

    /// True when `years_to_maturity * frequency` is not a whole number.
    pub fn has_fractional_maturity(&self) -> bool {
        self.years_to_maturity
            .checked_mul(Decimal::from(self.frequency))
            .is_some_and(|raw| raw.fract() != Decimal::ZERO)
    }

    /// Coupon paid each period: `face_value * coupon_rate / frequency`.
    ///
    /// Only meaningful for terms that passed [`BondTerms::validate`].
    pub fn coupon_amount(&self) -> Money {
        self.face_value * self.coupon_rate / Decimal::from(self.frequency)
    }

    /// Discount rate applied per coupon period: `yield_rate / frequency`.
    pub fn yield_per_period(&self) -> Rate {
        self.yield_rate / Decimal::from(self.frequency)
    }

    /// A copy of these terms discounted at a different yield.
    pub fn with_yield(&self, yield_rate: Rate) -> BondTerms {
        BondTerms {
            yield_rate,
            ..*self
        }
    }

    /// True when the bond pays principal only.
    pub fn is_zero_coupon(&self) -> bool {
        self.coupon_rate.is_zero()
    }
}

fn invalid(field: &str, reason: &str) -> BondAnalyticsError {
    BondAnalyticsError::InvalidTerms {
        field: field.into(),
        reason: reason.into(),
    }
}
